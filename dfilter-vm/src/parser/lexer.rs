use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    DotDot,
    // Slice-range tokens, produced only between `[` and `]`.
    LBracket,
    RBracket,
    Colon,
    Hyphen,
    Integer(i64),
    // Operators.
    TestAnd,
    TestOr,
    TestNot,
    TestAnyEq,
    TestAnyNe,
    TestAllNe,
    TestGt,
    TestGe,
    TestLt,
    TestLe,
    TestBitwiseAnd,
    TestContains,
    TestMatches,
    TestIn,
    // Literals.
    Quoted(String),
    CharConst(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-')
}

/// Tokenize a filter expression.
///
/// The scanner runs in two modes: inside `[...]` a small range grammar
/// applies (integers, `:`, `-`, `,`), everywhere else `:`, `.` and `-` are
/// ordinary word characters so byte strings, dotted names and addresses lex
/// as single words.
pub(crate) fn lex(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let bytes: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut in_brackets = false;

    while i < bytes.len() {
        let c = bytes[i];
        let pos = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if in_brackets {
            match c {
                ']' => {
                    tokens.push(Token { kind: TokenKind::RBracket, pos });
                    in_brackets = false;
                    i += 1;
                }
                ':' => {
                    tokens.push(Token { kind: TokenKind::Colon, pos });
                    i += 1;
                }
                ',' => {
                    tokens.push(Token { kind: TokenKind::Comma, pos });
                    i += 1;
                }
                '-' if matches!(tokens.last(), Some(Token { kind: TokenKind::Integer(_), .. })) => {
                    // Separator of the `start-end` form; a minus not preceded
                    // by a number is a sign instead.
                    tokens.push(Token { kind: TokenKind::Hyphen, pos });
                    i += 1;
                }
                '-' | '0'..='9' => {
                    let neg = c == '-';
                    if neg {
                        i += 1;
                    }
                    let start = i;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    if start == i {
                        return Err(ParseError::new("Invalid range offset.", pos));
                    }
                    let digits: String = bytes[start..i].iter().collect();
                    let value: i64 = digits
                        .parse()
                        .map_err(|_| ParseError::new(format!("\"{digits}\" is not a valid range offset."), pos))?;
                    tokens.push(Token {
                        kind: TokenKind::Integer(if neg { -value } else { value }),
                        pos,
                    });
                }
                _ => {
                    return Err(ParseError::new(
                        format!("\"{c}\" was unexpected inside a range."),
                        pos,
                    ))
                }
            }
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, pos });
                i += 1;
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, pos });
                i += 1;
            }
            '{' => {
                tokens.push(Token { kind: TokenKind::LBrace, pos });
                i += 1;
            }
            '}' => {
                tokens.push(Token { kind: TokenKind::RBrace, pos });
                i += 1;
            }
            ',' => {
                tokens.push(Token { kind: TokenKind::Comma, pos });
                i += 1;
            }
            '[' => {
                tokens.push(Token { kind: TokenKind::LBracket, pos });
                in_brackets = true;
                i += 1;
            }
            '"' => {
                let (s, next) = lex_quoted(&bytes, i)?;
                tokens.push(Token { kind: TokenKind::Quoted(s), pos });
                i = next;
            }
            '\'' => {
                let (raw, next) = lex_charconst(&bytes, i)?;
                tokens.push(Token { kind: TokenKind::CharConst(raw), pos });
                i = next;
            }
            '!' => {
                if bytes.get(i + 1) == Some(&'=') && bytes.get(i + 2) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::TestAllNe, pos });
                    i += 3;
                } else if bytes.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::TestAnyNe, pos });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::TestNot, pos });
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::TestAnyEq, pos });
                    i += 2;
                } else {
                    return Err(ParseError::new("\"=\" was unexpected in this context.", pos));
                }
            }
            '~' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::TestAnyNe, pos });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::TestMatches, pos });
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::TestGe, pos });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::TestGt, pos });
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::TestLe, pos });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::TestLt, pos });
                    i += 1;
                }
            }
            '&' => {
                if bytes.get(i + 1) == Some(&'&') {
                    tokens.push(Token { kind: TokenKind::TestAnd, pos });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::TestBitwiseAnd, pos });
                    i += 1;
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&'|') {
                    tokens.push(Token { kind: TokenKind::TestOr, pos });
                    i += 2;
                } else {
                    return Err(ParseError::new("\"|\" was unexpected in this context.", pos));
                }
            }
            '.' if bytes.get(i + 1) == Some(&'.') => {
                tokens.push(Token { kind: TokenKind::DotDot, pos });
                i += 2;
            }
            c if is_word_char(c) => {
                let start = i;
                while i < bytes.len() && is_word_char(bytes[i]) {
                    // `..` terminates a word so set ranges like `80..90` split.
                    if bytes[i] == '.' && bytes.get(i + 1) == Some(&'.') {
                        break;
                    }
                    i += 1;
                }
                let word: String = bytes[start..i].iter().collect();
                tokens.push(Token { kind: keyword_or_word(word), pos });
            }
            _ => {
                return Err(ParseError::new(
                    format!("\"{c}\" was unexpected in this context."),
                    pos,
                ))
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_word(word: String) -> TokenKind {
    match word.as_str() {
        "and" => TokenKind::TestAnd,
        "or" => TokenKind::TestOr,
        "not" => TokenKind::TestNot,
        "eq" => TokenKind::TestAnyEq,
        "ne" => TokenKind::TestAnyNe,
        "gt" => TokenKind::TestGt,
        "ge" => TokenKind::TestGe,
        "lt" => TokenKind::TestLt,
        "le" => TokenKind::TestLe,
        "bitwise_and" => TokenKind::TestBitwiseAnd,
        "contains" => TokenKind::TestContains,
        "matches" => TokenKind::TestMatches,
        "in" => TokenKind::TestIn,
        _ => TokenKind::Word(word),
    }
}

fn lex_quoted(bytes: &[char], start: usize) -> Result<(String, usize), ParseError> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            '"' => return Ok((out, i + 1)),
            '\\' => {
                let next = bytes
                    .get(i + 1)
                    .ok_or_else(|| ParseError::new("The string is missing its closing quote.", start))?;
                match next {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'x' => {
                        let digits: String = bytes[i + 2..]
                            .iter()
                            .take(2)
                            .take_while(|c| c.is_ascii_hexdigit())
                            .collect();
                        if digits.is_empty() {
                            return Err(ParseError::new("Invalid \\x escape in string.", i));
                        }
                        let code = u8::from_str_radix(&digits, 16)
                            .map_err(|_| ParseError::new("Invalid \\x escape in string.", i))?;
                        out.push(code as char);
                        i += digits.len();
                    }
                    c => out.push(*c),
                }
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(ParseError::new("The string is missing its closing quote.", start))
}

/// Character constants are kept raw (quotes included); the value library
/// decodes them.
fn lex_charconst(bytes: &[char], start: usize) -> Result<(String, usize), ParseError> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            '\\' => i += 2,
            '\'' => {
                let raw: String = bytes[start..=i].iter().collect();
                return Ok((raw, i + 1));
            }
            _ => i += 1,
        }
    }
    Err(ParseError::new("The character constant is missing its closing quote.", start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        lex(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn words_keep_dots_and_colons() {
        assert_eq!(
            kinds("ip.src == 10.0.0.1"),
            vec![
                TokenKind::Word("ip.src".into()),
                TokenKind::TestAnyEq,
                TokenKind::Word("10.0.0.1".into()),
            ]
        );
        assert_eq!(kinds("0a:00"), vec![TokenKind::Word("0a:00".into())]);
    }

    #[test]
    fn operator_variants() {
        assert_eq!(kinds("a != b")[1], TokenKind::TestAnyNe);
        assert_eq!(kinds("a !== b")[1], TokenKind::TestAllNe);
        assert_eq!(kinds("a ~= b")[1], TokenKind::TestAnyNe);
        assert_eq!(kinds("a ~ b")[1], TokenKind::TestMatches);
        assert_eq!(kinds("a && b")[1], TokenKind::TestAnd);
        assert_eq!(kinds("a & b")[1], TokenKind::TestBitwiseAnd);
    }

    #[test]
    fn set_ranges_split_on_double_dot() {
        assert_eq!(
            kinds("{100..200}"),
            vec![
                TokenKind::LBrace,
                TokenKind::Word("100".into()),
                TokenKind::DotDot,
                TokenKind::Word("200".into()),
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn bracket_mode_lexes_range_forms() {
        assert_eq!(
            kinds("f[0:2,3-4,5:]"),
            vec![
                TokenKind::Word("f".into()),
                TokenKind::LBracket,
                TokenKind::Integer(0),
                TokenKind::Colon,
                TokenKind::Integer(2),
                TokenKind::Comma,
                TokenKind::Integer(3),
                TokenKind::Hyphen,
                TokenKind::Integer(4),
                TokenKind::Comma,
                TokenKind::Integer(5),
                TokenKind::Colon,
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn bracket_mode_distinguishes_sign_from_separator() {
        assert_eq!(
            kinds("f[-2:2]"),
            vec![
                TokenKind::Word("f".into()),
                TokenKind::LBracket,
                TokenKind::Integer(-2),
                TokenKind::Colon,
                TokenKind::Integer(2),
                TokenKind::RBracket,
            ]
        );
        assert_eq!(
            kinds("f[1-2]")[2..4],
            [TokenKind::Integer(1), TokenKind::Hyphen]
        );
    }

    #[test]
    fn quoted_strings_unescape() {
        assert_eq!(
            kinds("\"a\\\"b\\\\c\""),
            vec![TokenKind::Quoted("a\"b\\c".into())]
        );
    }

    #[test]
    fn charconst_stays_raw() {
        assert_eq!(kinds("'a'"), vec![TokenKind::CharConst("'a'".into())]);
        assert_eq!(kinds("'\\n'"), vec![TokenKind::CharConst("'\\n'".into())]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(lex("\"abc").is_err());
        assert!(lex("'a").is_err());
    }
}
