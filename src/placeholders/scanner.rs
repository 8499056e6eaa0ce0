/// Lexical context of the byte under the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

/// Lexical rules of the SQL being scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    /// Quotes escape only by doubling (`''`); `#` starts temp-table names.
    Tsql,
    /// Quotes also escape with a backslash (`\'`); `#` starts a line comment.
    Mysql,
}

fn is_line_comment_start(bytes: &[u8], idx: usize, flavor: Flavor) -> bool {
    (bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-'))
        || (flavor == Flavor::Mysql && bytes.get(idx) == Some(&b'#'))
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Call `visit(idx, byte)` for every byte of `sql` that is plain SQL text, skipping string
/// literals, quoted identifiers and comments.
///
/// Only ASCII bytes are ever reported as code, so `idx` is always a char boundary.
pub(crate) fn scan_code(sql: &str, flavor: Flavor, mut visit: impl FnMut(usize, u8)) {
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx, flavor) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                _ if b.is_ascii() => visit(idx, b),
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if state == State::SingleQuoted { b'\'' } else { b'"' };
                if b == b'\\' && flavor == Flavor::Mysql {
                    idx += 1; // skip escaped byte
                } else if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // skip doubled quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(sql: &str, flavor: Flavor) -> String {
        let mut out = String::new();
        scan_code(sql, flavor, |_, b| out.push(b as char));
        out
    }

    #[test]
    fn skips_literals_and_identifiers() {
        assert_eq!(code("a 'b?' \"c\" `d` [e] f", Flavor::Tsql), "a     f");
    }

    #[test]
    fn doubled_quotes_stay_inside_literal() {
        assert_eq!(code("x 'it''s ?' y", Flavor::Tsql), "x  y");
    }

    #[test]
    fn hash_is_a_comment_only_in_mysql() {
        assert_eq!(code("from #tmp where a = ?", Flavor::Tsql), "from #tmp where a = ?");
        assert_eq!(code("a # ?\nb", Flavor::Mysql), "a b");
    }

    #[test]
    fn backslash_escapes_only_in_mysql() {
        assert_eq!(code(r"x 'a\'b' y", Flavor::Mysql), "x  y");
        // Without backslash escapes the literal ends at the second quote.
        assert_eq!(code(r"x 'a\'b' y", Flavor::Tsql), "x b");
    }

    #[test]
    fn skips_comments() {
        assert_eq!(code("a -- b\nc /* d /* e */ f */ g # h\ni", Flavor::Mysql), "a c  g i");
    }
}
