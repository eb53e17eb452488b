#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    /// Backtick-quoted identifier
    Backticked,
    LineComment,
    BlockComment,
}

pub(super) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub(super) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan a dotted identifier path (`a`, `t.a`, `s.t.a`) starting at `start`.
///
/// Returns the end index (exclusive).
pub(super) fn scan_identifier_path(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    loop {
        while idx < bytes.len() && is_ident_byte(bytes[idx]) {
            idx += 1;
        }
        if bytes.get(idx) == Some(&b'.') && bytes.get(idx + 1).is_some_and(|b| is_ident_start(*b))
        {
            idx += 1;
        } else {
            return idx;
        }
    }
}

/// Skip a numeric literal such as `12`, `1.5` or `1e10`.
pub(super) fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && (is_ident_byte(bytes[idx]) || bytes[idx] == b'.') {
        idx += 1;
    }
    idx
}
