pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    (bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-'))
        || bytes.get(idx) == Some(&b'#')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Reduce a quoted literal to the characters an integer filter keeps: digits, `+` and `-`.
pub(super) fn integer_chars(literal: &str) -> String {
    literal
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+' || *c == '-')
        .collect()
}

/// Parse an optionally signed run of digits, saturating at the `i64` bounds.
///
/// Anything else (empty, bare sign, embedded signs) is not an integer.
pub(super) fn parse_saturating_int(filtered: &str) -> Option<i64> {
    let (negative, digits) = match filtered.as_bytes().first()? {
        b'-' => (true, &filtered[1..]),
        b'+' => (false, &filtered[1..]),
        _ => (false, filtered),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let parsed = if negative {
        format!("-{digits}").parse::<i64>()
    } else {
        digits.parse::<i64>()
    };
    Some(parsed.unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}
