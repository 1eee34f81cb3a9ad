//! Comment stripping for JSON-with-comments config files.
//!
//! Comic config files traditionally carry `/* ... */` blocks documenting each
//! entry, and sometimes `//` line comments. Standard JSON parsers reject
//! both, so comments are removed before parsing. The stripper is
//! string-literal aware: comment markers inside quoted strings (regexps love
//! slashes) are left alone.

/// Removes `/* ... */` and `//` comments from JSON text.
///
/// Comment bytes are replaced rather than removed where it matters for
/// nothing; the output is simply the input with comments dropped. An
/// unterminated block comment swallows the rest of the input, which the JSON
/// parser will then report as a syntax error with the right general shape.
#[must_use]
pub fn strip_comments(input: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        InString,
        InStringEscape,
        InLineComment,
        InBlockComment,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '"' => {
                    state = State::InString;
                    out.push(c);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::InLineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = State::InBlockComment;
                    }
                    _ => out.push(c),
                },
                _ => out.push(c),
            },
            State::InString => {
                out.push(c);
                match c {
                    '\\' => state = State::InStringEscape,
                    '"' => state = State::Normal,
                    _ => {}
                }
            }
            State::InStringEscape => {
                out.push(c);
                state = State::InString;
            }
            State::InLineComment => {
                if c == '\n' {
                    out.push(c);
                    state = State::Normal;
                }
            }
            State::InBlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_block_comments() {
        let input = r#"{ /* the daily strips */ "threads": 4 }"#;
        assert_eq!(strip_comments(input), r#"{  "threads": 4 }"#);
    }

    #[test]
    fn test_strips_multiline_block_comments() {
        let input = "{\n/* one\n   two\n*/ \"a\": 1 }";
        assert_eq!(strip_comments(input), "{\n \"a\": 1 }");
    }

    #[test]
    fn test_strips_line_comments() {
        let input = "{\n// header\n\"a\": 1 // trailing\n}";
        assert_eq!(strip_comments(input), "{\n\n\"a\": 1 \n}");
    }

    #[test]
    fn test_preserves_markers_inside_strings() {
        let input = r#"{ "url": "http://a.com/x", "re": "a/*b//c" }"#;
        assert_eq!(strip_comments(input), input);
    }

    #[test]
    fn test_preserves_escaped_quote_in_string() {
        let input = r#"{ "re": "say \"hi\" /* not a comment */" }"#;
        assert_eq!(strip_comments(input), input);
    }

    #[test]
    fn test_plain_json_untouched() {
        let input = r#"{"comics": [{"url": "http://a.com"}]}"#;
        assert_eq!(strip_comments(input), input);
    }
}
