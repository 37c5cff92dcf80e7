//! Tokenizer for the body of an eval expression

use super::ElError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Empty,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Question,
    Colon,
    Eof,
}

impl TokenKind {
    /// Short name for error messages
    pub fn name(&self) -> String {
        match self {
            TokenKind::Int(i) => i.to_string(),
            TokenKind::Float(f) => f.to_string(),
            TokenKind::Str(s) => format!("'{}'", s),
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Eof => "end of expression".to_string(),
            other => format!("{:?}", other).to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the expression body
    pub position: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ElError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let peek = chars.get(i + 1).map(|&(_, c)| c);
        let (kind, width) = match (c, peek) {
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('&', Some('&')) => (TokenKind::And, 2),
            ('|', Some('|')) => (TokenKind::Or, 2),
            ('!', _) => (TokenKind::Not, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('?', _) => (TokenKind::Question, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('.', Some(d)) if d.is_ascii_digit() => {
                let (kind, next) = lex_number(&chars, i, input)?;
                tokens.push(Token { kind, position: pos });
                i = next;
                continue;
            }
            ('.', _) => (TokenKind::Dot, 1),
            ('\'', _) | ('"', _) => {
                let (value, next) = lex_string(&chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    position: pos,
                });
                i = next;
                continue;
            }
            (d, _) if d.is_ascii_digit() => {
                let (kind, next) = lex_number(&chars, i, input)?;
                tokens.push(Token { kind, position: pos });
                i = next;
                continue;
            }
            (a, _) if a.is_alphabetic() || a == '_' || a == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].1.is_alphanumeric() || chars[i].1 == '_' || chars[i].1 == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                tokens.push(Token {
                    kind: keyword(&word),
                    position: pos,
                });
                continue;
            }
            _ => {
                return Err(ElError::Syntax {
                    position: pos,
                    message: format!("unexpected character '{}'", c),
                })
            }
        };

        tokens.push(Token { kind, position: pos });
        i += width;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: input.len(),
    });
    Ok(tokens)
}

fn keyword(word: &str) -> TokenKind {
    match word {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "empty" => TokenKind::Empty,
        "eq" => TokenKind::Eq,
        "ne" => TokenKind::NotEq,
        "lt" => TokenKind::Lt,
        "gt" => TokenKind::Gt,
        "le" => TokenKind::LtEq,
        "ge" => TokenKind::GtEq,
        "div" => TokenKind::Slash,
        "mod" => TokenKind::Percent,
        _ => TokenKind::Ident(word.to_string()),
    }
}

fn lex_number(
    chars: &[(usize, char)],
    start: usize,
    input: &str,
) -> Result<(TokenKind, usize), ElError> {
    let mut i = start;
    let mut is_float = false;

    while i < chars.len() && chars[i].1.is_ascii_digit() {
        i += 1;
    }
    if i < chars.len()
        && chars[i].1 == '.'
        && chars.get(i + 1).is_some_and(|&(_, c)| c.is_ascii_digit())
    {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].1.is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i].1 == 'e' || chars[i].1 == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j].1 == '+' || chars[j].1 == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].1.is_ascii_digit() {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].1.is_ascii_digit() {
                i += 1;
            }
        }
    }

    let begin = chars[start].0;
    let end = chars.get(i).map_or(input.len(), |&(p, _)| p);
    let text = &input[begin..end];

    let kind = if is_float {
        text.parse::<f64>().map(TokenKind::Float).ok()
    } else {
        text.parse::<i64>().map(TokenKind::Int).ok()
    };

    kind.map(|k| (k, i)).ok_or_else(|| ElError::Syntax {
        position: begin,
        message: format!("invalid number literal '{}'", text),
    })
}

fn lex_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), ElError> {
    let quote = chars[start].1;
    let mut value = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i].1 {
            '\\' => match chars.get(i + 1).map(|&(_, c)| c) {
                Some(c @ ('\\' | '\'' | '"')) => {
                    value.push(c);
                    i += 2;
                }
                _ => {
                    value.push('\\');
                    i += 1;
                }
            },
            c if c == quote => return Ok((value, i + 1)),
            c => {
                value.push(c);
                i += 1;
            }
        }
    }

    Err(ElError::Syntax {
        position: chars[start].0,
        message: "unterminated string literal".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            kinds("a.b < 3 and not empty c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("b".to_string()),
                TokenKind::Lt,
                TokenKind::Int(3),
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Empty,
                TokenKind::Ident("c".to_string()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("x >= 1 || y != 2"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::GtEq,
                TokenKind::Int(1),
                TokenKind::Or,
                TokenKind::Ident("y".to_string()),
                TokenKind::NotEq,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1.5"), vec![TokenKind::Float(1.5), TokenKind::Eof]);
        assert_eq!(kinds(".5"), vec![TokenKind::Float(0.5), TokenKind::Eof]);
        assert_eq!(kinds("2e3"), vec![TokenKind::Float(2000.0), TokenKind::Eof]);
        assert_eq!(kinds("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#"'it\'s' "q\"x""#),
            vec![
                TokenKind::Str("it's".to_string()),
                TokenKind::Str("q\"x".to_string()),
                TokenKind::Eof,
            ]
        );
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a # b").unwrap_err();
        assert_eq!(
            err,
            ElError::Syntax {
                position: 2,
                message: "unexpected character '#'".to_string(),
            }
        );
    }
}
