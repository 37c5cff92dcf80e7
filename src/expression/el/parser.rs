//! Expression parsing.
//!
//! Precedence, lowest first:
//! - Conditional: `a ? b : c`
//! - Logical: `||`/`or`, `&&`/`and`
//! - Equality: `==`/`eq`, `!=`/`ne`
//! - Relational: `<`, `>`, `<=`, `>=` and their keyword forms
//! - Additive: `+`, `-`
//! - Multiplicative: `*`, `/`/`div`, `%`/`mod`
//! - Unary: `-`, `!`/`not`, `empty`
//! - Postfix: `.property`, `[index]`

use super::lexer::{Token, TokenKind};
use super::ElError;
use serde_json::Value;

/// Deepest nesting of sub-expressions a parse accepts
pub const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(mut self) -> Result<Expr, ElError> {
        let expr = self.parse_conditional()?;
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    fn peek(&self) -> &Token {
        // tokenize() always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ElError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.name()))
        }
    }

    fn unexpected(&self, expected: &str) -> ElError {
        let token = self.peek();
        ElError::Syntax {
            position: token.position,
            message: format!("expected {}, found {}", expected, token.kind.name()),
        }
    }

    /// Enter one nesting level; parentheses, indexes, `?:`, unary chains and
    /// operator chains all count
    fn descend(&mut self) -> Result<(), ElError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ElError::Syntax {
                position: self.peek().position,
                message: format!("expression nested deeper than {} levels", MAX_DEPTH),
            });
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn parse_conditional(&mut self) -> Result<Expr, ElError> {
        self.descend()?;
        let condition = self.parse_or()?;

        let expr = if self.check(&TokenKind::Question) {
            self.advance();
            let then = self.parse_conditional()?;
            self.expect(&TokenKind::Colon)?;
            let otherwise = self.parse_conditional()?;
            Expr::Conditional(Box::new(condition), Box::new(then), Box::new(otherwise))
        } else {
            condition
        };

        self.ascend(1);
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ElError> {
        let mut left = self.parse_and()?;
        let mut folds = 0;

        while self.check(&TokenKind::Or) {
            self.advance();
            self.descend()?;
            folds += 1;
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }

        self.ascend(folds);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ElError> {
        let mut left = self.parse_equality()?;
        let mut folds = 0;

        while self.check(&TokenKind::And) {
            self.advance();
            self.descend()?;
            folds += 1;
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }

        self.ascend(folds);
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ElError> {
        let mut left = self.parse_relational()?;
        let mut folds = 0;

        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            self.descend()?;
            folds += 1;
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        self.ascend(folds);
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ElError> {
        let mut left = self.parse_additive()?;
        let mut folds = 0;

        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            self.descend()?;
            folds += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        self.ascend(folds);
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ElError> {
        let mut left = self.parse_multiplicative()?;
        let mut folds = 0;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            folds += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        self.ascend(folds);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ElError> {
        let mut left = self.parse_unary()?;
        let mut folds = 0;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            self.descend()?;
            folds += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        self.ascend(folds);
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ElError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Empty => UnaryOp::Empty,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.descend()?;
        let operand = self.parse_unary()?;
        self.ascend(1);
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ElError> {
        let mut expr = self.parse_primary()?;
        let mut folds = 0;

        loop {
            if self.check(&TokenKind::LBracket) || self.check(&TokenKind::Dot) {
                self.descend()?;
                folds += 1;
            }
            if self.check(&TokenKind::Dot) {
                self.advance();
                let token = self.advance();
                let name = match token.kind {
                    TokenKind::Ident(name) => name,
                    // keywords are valid property names after a dot
                    TokenKind::Empty => "empty".to_string(),
                    other => {
                        return Err(ElError::Syntax {
                            position: token.position,
                            message: format!("expected property name, found {}", other.name()),
                        })
                    }
                };
                expr = Expr::Property(Box::new(expr), name);
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                let index = self.parse_conditional()?;
                self.expect(&TokenKind::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }

        self.ascend(folds);
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ElError> {
        let token = self.peek().clone();

        let expr = match token.kind {
            TokenKind::Int(i) => Expr::Literal(Value::from(i)),
            TokenKind::Float(f) => Expr::Literal(Value::from(f)),
            TokenKind::Str(s) => Expr::Literal(Value::String(s)),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::Null => Expr::Literal(Value::Null),
            TokenKind::Ident(name) => Expr::Ident(name),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_conditional()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("a value")),
        };

        self.advance();
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::el::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Result<Expr, ElError> {
        Parser::new(tokenize(input)?).parse()
    }

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    #[test]
    fn test_property_comparison() {
        assert_eq!(
            parse("bean.start < bean.end").unwrap(),
            Expr::Binary(
                BinaryOp::Lt,
                Box::new(Expr::Property(ident("bean"), "start".to_string())),
                Box::new(Expr::Property(ident("bean"), "end".to_string())),
            )
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("a || b && c").unwrap(),
            Expr::Binary(
                BinaryOp::Or,
                ident("a"),
                Box::new(Expr::Binary(BinaryOp::And, ident("b"), ident("c"))),
            )
        );
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Literal(Value::from(1))),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Literal(Value::from(2))),
                    Box::new(Expr::Literal(Value::from(3))),
                )),
            )
        );
    }

    #[test]
    fn test_index_and_conditional() {
        assert_eq!(
            parse("empty a['k'] ? 1 : 2").unwrap(),
            Expr::Conditional(
                Box::new(Expr::Unary(
                    UnaryOp::Empty,
                    Box::new(Expr::Index(
                        ident("a"),
                        Box::new(Expr::Literal(Value::String("k".to_string()))),
                    )),
                )),
                Box::new(Expr::Literal(Value::from(1))),
                Box::new(Expr::Literal(Value::from(2))),
            )
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("a <").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("a.1").is_err());
        assert!(parse("a ? b").is_err());
    }

    fn nesting_error(result: Result<Expr, ElError>) -> bool {
        matches!(result, Err(ElError::Syntax { message, .. }) if message.contains("nested deeper"))
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}true{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse(&shallow).unwrap(), Expr::Literal(Value::Bool(true)));
        assert!(parse(&format!("{}1", "-".repeat(20))).is_ok());
        assert!(parse(&vec!["1"; 30].join(" + ")).is_ok());

        let deep = format!("{}true{}", "(".repeat(2000), ")".repeat(2000));
        assert!(nesting_error(parse(&deep)));
        assert!(nesting_error(parse(&format!("{}a", "!".repeat(200_000)))));
        assert!(nesting_error(parse(&format!("{}1", "a[".repeat(500)))));
        assert!(nesting_error(parse(&vec!["a"; 500].join(" && "))));
        assert!(nesting_error(parse(&vec!["a"; 500].join("."))));
        assert!(nesting_error(parse(&"a ? b : ".repeat(500))));
    }
}
