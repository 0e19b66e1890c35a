//! Tokenizer for the filter expression sub-language.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
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
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Dot,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Ident(s) => write!(f, "{s}"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Null => write!(f, "null"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::Eof => write!(f, "<eof>"),
        }
    }
}

/// A token plus the byte offset it started at, for caret diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub const fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the entire input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(Spanned { token: Token::Eof, offset: start });
                break;
            };
            let token = match c {
                b'(' => {
                    self.pos += 1;
                    Token::LParen
                }
                b')' => {
                    self.pos += 1;
                    Token::RParen
                }
                b',' => {
                    self.pos += 1;
                    Token::Comma
                }
                b'.' => {
                    self.pos += 1;
                    Token::Dot
                }
                b'+' => {
                    self.pos += 1;
                    Token::Plus
                }
                b'-' => {
                    self.pos += 1;
                    Token::Minus
                }
                b'*' => {
                    self.pos += 1;
                    Token::Star
                }
                b'/' => {
                    self.pos += 1;
                    Token::Slash
                }
                b'%' => {
                    self.pos += 1;
                    Token::Percent
                }
                b'=' => {
                    self.expect_seq("==", start)?;
                    Token::Eq
                }
                b'!' => {
                    self.expect_seq("!=", start)?;
                    Token::Ne
                }
                b'<' => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        Token::Le
                    } else {
                        Token::Lt
                    }
                }
                b'>' => {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        Token::Ge
                    } else {
                        Token::Gt
                    }
                }
                b'\'' | b'"' => self.lex_string(c)?,
                b'0'..=b'9' => self.lex_number(),
                c if c == b'_' || c.is_ascii_alphabetic() => self.lex_ident_or_keyword(),
                _ => {
                    return Err(LexError {
                        message: format!("unexpected character {:?}", c as char),
                        offset: start,
                    })
                }
            };
            tokens.push(Spanned { token, offset: start });
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect_seq(&mut self, seq: &str, start: usize) -> Result<(), LexError> {
        let bytes = seq.as_bytes();
        if self.src.len() >= self.pos + bytes.len() && &self.src[self.pos..self.pos + bytes.len()] == bytes {
            self.pos += bytes.len();
            Ok(())
        } else {
            Err(LexError {
                message: format!("expected {seq:?}"),
                offset: start,
            })
        }
    }

    fn lex_string(&mut self, quote: u8) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        offset: start,
                    })
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(b'r') => out.push('\r'),
                        Some(b'\\') => out.push('\\'),
                        Some(b'\'') => out.push('\''),
                        Some(b'"') => out.push('"'),
                        Some(other) => out.push(other as char),
                        None => {
                            return Err(LexError {
                                message: "unterminated escape".to_string(),
                                offset: self.pos,
                            })
                        }
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c as char);
                    self.pos += 1;
                }
            }
        }
        Ok(Token::Str(out))
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.src.get(self.pos + 1), Some(b'0'..=b'9')) {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("0");
        if is_float {
            Token::Float(text.parse().unwrap_or(0.0))
        } else {
            text.parse::<i64>().map_or_else(|_| Token::Float(text.parse().unwrap_or(0.0)), Token::Int)
        }
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
        match text {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn tokenizes_comparison() {
        assert_eq!(toks("a > 1"), vec![Token::Ident("a".into()), Token::Gt, Token::Int(1), Token::Eof]);
    }

    #[test]
    fn tokenizes_dotted_path() {
        assert_eq!(
            toks("user.profile.city"),
            vec![
                Token::Ident("user".into()),
                Token::Dot,
                Token::Ident("profile".into()),
                Token::Dot,
                Token::Ident("city".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn tokenizes_string_with_escapes() {
        assert_eq!(toks(r#" "a\nb" "#), vec![Token::Str("a\nb".into()), Token::Eof]);
    }

    #[test]
    fn tokenizes_float_and_int() {
        assert_eq!(toks("1.5 2"), vec![Token::Float(1.5), Token::Int(2), Token::Eof]);
    }
}
