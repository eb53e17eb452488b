use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

mod parsers;
mod scanner;

use parsers::{
    integer_chars, is_block_comment_end, is_block_comment_start, is_line_comment_start,
    parse_saturating_int,
};
use scanner::{State, is_ident_start, scan_identifier_path, scan_number};

static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'[^']*'").expect("static regex"));
static RAND_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bRAND\(\)").expect("static regex"));

/// Rewrite framework SQL into something Spanner accepts.
///
/// - A single-quoted literal that still reads as an integer once everything but digits, `+`
///   and `-` is dropped is replaced by that integer, unquoted: `'0042'` becomes `42`,
///   `'12ab'` becomes `12`. Literals without digits stay as they are.
/// - A standalone `RAND()` call in any case becomes the constant `1`; `my_rand()` and
///   `operand()` are left alone.
///
/// Warning: this is a textual rewrite, not a parser. A quoted string that merely contains
/// digits (a phone number, a SKU) is turned into a number too.
///
/// ```rust
/// use spanner_adapter::sanitize_sql;
///
/// let sql = "SELECT * FROM t WHERE id = '10' AND name = 'bob' ORDER BY rand()";
/// assert_eq!(sanitize_sql(sql), "SELECT * FROM t WHERE id = 10 AND name = 'bob' ORDER BY 1");
/// ```
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn sanitize_sql(sql: &str) -> Cow<'_, str> {
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    for literal in QUOTED_LITERAL.find_iter(sql) {
        if let Some(value) = parse_saturating_int(&integer_chars(literal.as_str())) {
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
            buf.push_str(&sql[copied_to..literal.start()]);
            buf.push_str(&value.to_string());
            copied_to = literal.end();
        }
    }

    match out {
        None => RAND_CALL.replace_all(sql, "1"),
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            if RAND_CALL.is_match(&buf) {
                Cow::Owned(RAND_CALL.replace_all(&buf, "1").into_owned())
            } else {
                Cow::Owned(buf)
            }
        }
    }
}

/// Wrap every reference to `column` in `cast(<ref> as <ty>)`.
///
/// References are whole identifiers outside string literals, quoted identifiers and
/// comments. An unqualified `column` also matches qualified references such as `e.column`,
/// and the qualifier stays inside the cast.
///
/// ```rust
/// use spanner_adapter::add_cast;
///
/// assert_eq!(add_cast("SELECT a FROM t", "a", "INT64"), "SELECT cast(a as INT64) FROM t");
/// assert_eq!(
///     add_cast("SELECT e.a, name FROM t e WHERE x = 'a'", "a", "STRING"),
///     "SELECT cast(e.a as STRING), name FROM t e WHERE x = 'a'",
/// );
/// ```
#[must_use]
pub fn add_cast<'a>(sql: &'a str, column: &str, ty: &str) -> Cow<'a, str> {
    if column.is_empty() {
        return Cow::Borrowed(sql);
    }

    let qualified = column.contains('.');
    let suffix = format!(".{column}");
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                _ if b.is_ascii_digit() => {
                    idx = scan_number(bytes, idx);
                    continue;
                }
                _ if is_ident_start(b) => {
                    let end = scan_identifier_path(bytes, idx);
                    let token = &sql[idx..end];
                    let matches = token == column || (!qualified && token.ends_with(&suffix));
                    if matches {
                        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
                        buf.push_str(&sql[copied_to..idx]);
                        buf.push_str("cast(");
                        buf.push_str(token);
                        buf.push_str(" as ");
                        buf.push_str(ty);
                        buf.push(')');
                        copied_to = end;
                    }
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\\' {
                    idx += 1;
                } else if b == b'\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if b == b'\\' {
                    idx += 1;
                } else if b == b'"' {
                    state = State::Normal;
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// Undo MySQL-style backslash escapes in a raw string.
///
/// Longest escape wins, so `\000` is a NUL byte rather than `\0` followed by `00`.
#[must_use]
pub fn unquote(raw: &str) -> Cow<'_, str> {
    const ESCAPES: [(&str, &str); 7] = [
        ("\\000", "\0"),
        ("\\032", "\x1a"),
        ("\\n", "\n"),
        ("\\r", "\r"),
        ("\\\\", "\\"),
        ("\\'", "'"),
        ("\\\"", "\""),
    ];

    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ESCAPES.iter().find(|(from, _)| rest.starts_with(from)) {
            Some((from, to)) => {
                out.push_str(to);
                rest = &rest[from.len()..];
            }
            None => {
                out.push('\\');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquotes_numeric_literals() {
        let sql = "SELECT * FROM t WHERE a = '1' AND b = '0042'";
        assert_eq!(sanitize_sql(sql), "SELECT * FROM t WHERE a = 1 AND b = 42");
    }

    #[test]
    fn strips_noise_around_digits() {
        assert_eq!(sanitize_sql("WHERE a = ' 12 '"), "WHERE a = 12");
        assert_eq!(sanitize_sql("WHERE a = 'id-7'"), "WHERE a = -7");
        assert_eq!(sanitize_sql("WHERE a = '1.5'"), "WHERE a = 15");
    }

    #[test]
    fn leaves_text_literals_alone() {
        let sql = "SELECT * FROM t WHERE name = 'alice' AND code = ''";
        let res = sanitize_sql(sql);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    #[test]
    fn signs_in_the_middle_are_not_integers() {
        assert_eq!(sanitize_sql("WHERE d = '2024-01-02'"), "WHERE d = '2024-01-02'");
    }

    #[test]
    fn replaces_rand_in_any_case() {
        let sql = "SELECT * FROM t ORDER BY RAND(), rand(), Rand()";
        assert_eq!(sanitize_sql(sql), "SELECT * FROM t ORDER BY 1, 1, 1");
    }

    #[test]
    fn rand_inside_other_names_is_kept() {
        let sql = "SELECT operand(), my_rand(), RANDOM() FROM t";
        let res = sanitize_sql(sql);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
        assert_eq!(sanitize_sql("SELECT (RAND()) FROM t"), "SELECT (1) FROM t");
    }

    #[test]
    fn rewrites_both_literals_and_rand() {
        let sql = "SELECT * FROM t WHERE id IN ('3', '4') ORDER BY RAND()";
        assert_eq!(sanitize_sql(sql), "SELECT * FROM t WHERE id IN (3, 4) ORDER BY 1");
    }

    #[test]
    fn casts_plain_column() {
        assert_eq!(
            add_cast("SELECT a FROM t", "a", "INT64"),
            "SELECT cast(a as INT64) FROM t"
        );
    }

    #[test]
    fn casts_every_reference() {
        assert_eq!(
            add_cast("SELECT id FROM t WHERE id > 3 ORDER BY t.id", "id", "STRING"),
            "SELECT cast(id as STRING) FROM t WHERE cast(id as STRING) > 3 ORDER BY cast(t.id as STRING)"
        );
    }

    #[test]
    fn cast_skips_substrings_literals_and_comments() {
        let sql = "SELECT ida, \"a\", `a`, 'a' FROM t -- a\n/* a */ WHERE xa = 1";
        let res = add_cast(sql, "a", "INT64");
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    #[test]
    fn qualified_cast_requires_exact_match() {
        assert_eq!(
            add_cast("SELECT e.id, f.id FROM e, f", "e.id", "INT64"),
            "SELECT cast(e.id as INT64), f.id FROM e, f"
        );
    }

    #[test]
    fn cast_keeps_non_ascii_text() {
        assert_eq!(
            add_cast("SELECT a, 'héllo' FROM t", "a", "INT64"),
            "SELECT cast(a as INT64), 'héllo' FROM t"
        );
    }

    #[test]
    fn unquote_translates_escapes() {
        assert_eq!(unquote(r"it\'s\n"), "it's\n");
        assert_eq!(unquote(r"a\\b"), "a\\b");
        assert_eq!(unquote(r"\000\032"), "\0\x1a");
        assert_eq!(unquote(r"\q"), "\\q");
        assert!(matches!(unquote("plain"), Cow::Borrowed(_)));
    }
}
