//! Recursive-descent parser for the filter expression grammar:
//!
//! ```text
//! expr     := or
//! or       := and ('or' and)*
//! and      := not ('and' not)*
//! not      := 'not' not | cmp
//! cmp      := add (('==' | '!=' | '<' | '<=' | '>' | '>=') add)?
//! add      := mul (('+' | '-') mul)*
//! mul      := unary (('*' | '/' | '%') unary)*
//! unary    := '-' unary | primary
//! primary  := number | string | 'true' | 'false' | 'null'
//!           | path | '(' expr ')'
//!           | func '(' args? ')'
//! path     := IDENT ('.' IDENT)*
//! ```

use std::fmt;

use super::ast::{BinOp, Expr, UnaryOp};
use super::lexer::{Lexer, Spanned, Token};
use crate::path::Path;

/// A parse-time error in an expression, with a byte offset for a
/// caret-position diagnostic.
#[derive(Clone, PartialEq, thiserror::Error)]
#[error("expression parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    /// Render a two-line "source\n      ^" caret diagnostic.
    #[must_use]
    pub fn caret_diagnostic(&self, source: &str) -> String {
        let caret = " ".repeat(self.offset) + "^";
        format!("{source}\n{caret}\n{}", self.message)
    }
}

/// Parse a filter expression, producing the AST. Parsed once and cached by
/// callers.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(|e| ParseError { message: e.message, offset: e.offset })?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].offset
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if matches!(self.peek(), Token::Eof) {
            Ok(())
        } else {
            Err(self.err(format!("unexpected trailing token {}", self.peek())))
        }
    }

    fn err(&self, message: String) -> ParseError {
        ParseError { message, offset: self.offset() }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {token}, found {}", self.peek())))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Token::Eq => BinOp::Eq,
            Token::Ne => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::Le => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::Ge => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_add()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Token::Minus) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            Token::Float(n) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                self.advance();
                if matches!(self.peek(), Token::LParen) {
                    self.parse_call(name)
                } else {
                    self.parse_path_rest(name)
                }
            }
            other => Err(self.err(format!("unexpected token {other}"))),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            args.push(self.parse_or()?);
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                args.push(self.parse_or()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(Expr::Call(name, args))
    }

    fn parse_path_rest(&mut self, first: String) -> Result<Expr, ParseError> {
        let mut tokens = vec![first];
        while matches!(self.peek(), Token::Dot) {
            self.advance();
            match self.peek().clone() {
                Token::Ident(name) => {
                    self.advance();
                    tokens.push(name);
                }
                other => return Err(self.err(format!("expected identifier after '.', found {other}"))),
            }
        }
        Ok(Expr::Path(Path::from_tokens(tokens)))
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError {{ offset: {}, message: {:?} }}", self.offset, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comparison() {
        let expr = parse("a > 1").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(BinOp::Gt, Box::new(Expr::Path(Path::from_tokens(vec!["a".into()]))), Box::new(Expr::Int(1)))
        );
    }

    #[test]
    fn parses_and_or_precedence() {
        // `and` binds tighter than `or`
        let expr = parse("a or b and c").unwrap();
        match expr {
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Path(_)));
                assert!(matches!(*rhs, Expr::Binary(BinOp::And, _, _)));
            }
            _ => panic!("expected top-level or"),
        }
    }

    #[test]
    fn parses_function_call() {
        let expr = parse("lower(name)").unwrap();
        assert!(matches!(expr, Expr::Call(name, args) if name == "lower" && args.len() == 1));
    }

    #[test]
    fn parses_nested_path() {
        let expr = parse("user.profile.city").unwrap();
        assert_eq!(expr, Expr::Path(Path::from_tokens(vec!["user".into(), "profile".into(), "city".into()])));
    }

    #[test]
    fn reports_caret_diagnostic_offset() {
        let err = parse("a >").unwrap_err();
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("a b").is_err());
    }
}
