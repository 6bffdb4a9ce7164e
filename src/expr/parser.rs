use std::fmt;

use kstring::KString;

use crate::value::Value;
use super::lexer::{Token, Spanned, tokenize};


#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: KString,
    /// Byte offset into the expression source.
    pub position: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.position)
    }
}

impl std::error::Error for SyntaxError {}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
}

/// Operators that may skip evaluating their right side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(KString),
    Array(Vec<Expr>),
    Object(Vec<(KString, Expr)>),
    Member(Box<Expr>, KString),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}


pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>, source_len: usize) -> Self {
        Self { tokens, pos: 0, end: source_len }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(self.end)
    }

    fn error<T>(&self, message: impl Into<KString>) -> Result<T, SyntaxError> {
        Err(SyntaxError { message: message.into(), position: self.position() })
    }

    fn consume(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Consume the next token if it equals `token`.
    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), SyntaxError> {
        if self.eat(&token) {
            Ok(())
        } else {
            match self.peek() {
                Some(t) => self.error(format!("expected {token}, got {t}")),
                None => self.error(format!("expected {token}, got end of input")),
            }
        }
    }

    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        let e = self.parse_expr()?;
        match self.peek() {
            None => Ok(e),
            Some(t) => self.error(format!("unexpected {t}")),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.parse_or()?;
        if self.eat(&Token::Question) {
            let then = self.parse_conditional()?;
            self.expect(Token::Colon)?;
            let otherwise = self.parse_conditional()?;
            Ok(Expr::Conditional(Box::new(test), Box::new(then), Box::new(otherwise)))
        } else {
            Ok(test)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        loop {
            let op = match self.peek() {
                Some(Token::OrOr) => LogicalOp::Or,
                Some(Token::Nullish) => LogicalOp::Nullish,
                _ => return Ok(left)
            };
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Logical(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_eq()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_eq()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_eq(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_rel()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::EqEqEq) => BinaryOp::StrictEq,
                Some(Token::NotEqEq) => BinaryOp::StrictNotEq,
                _ => return Ok(left)
            };
            self.pos += 1;
            let right = self.parse_rel()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_rel(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left)
            };
            self.pos += 1;
            let right = self.parse_add()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_add(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left)
            };
            self.pos += 1;
            let right = self.parse_mul()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left)
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Ident(s)) if s == "typeof" => UnaryOp::TypeOf,
            _ => return self.parse_postfix()
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.consume() {
                        Some(Token::Ident(name)) => {
                            e = Expr::Member(Box::new(e), name);
                        }
                        _ => {
                            self.pos -= 1;
                            return self.error("expected property name after '.'")
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    e = Expr::Index(Box::new(e), Box::new(index));
                }
                Some(Token::LParen) => {
                    self.pos += 1;
                    let args = self.parse_list(Token::RParen)?;
                    e = Expr::Call(Box::new(e), args);
                }
                _ => return Ok(e)
            }
        }
    }

    /// Comma separated expressions up to `close`, which is consumed. A
    /// trailing comma is allowed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.eat(&close) {
                return Ok(items)
            }
            items.push(self.parse_expr()?);
            if ! self.eat(&Token::Comma) {
                self.expect(close)?;
                return Ok(items)
            }
        }
    }

    fn parse_object(&mut self) -> Result<Expr, SyntaxError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries))
            }
            let key = match self.consume() {
                Some(Token::Ident(s)) | Some(Token::Str(s)) => s,
                Some(Token::Number(n)) => KString::from_string(crate::value::format_number(n)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return self.error("expected property key")
                }
            };
            self.expect(Token::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if ! self.eat(&Token::Comma) {
                self.expect(Token::RBrace)?;
                return Ok(Expr::Object(entries))
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let t = match self.consume() {
            Some(t) => t,
            None => return self.error("unexpected end of expression")
        };
        match t {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(s) => Ok(match s.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                "undefined" => Expr::Literal(Value::Undefined),
                _ => Expr::Ident(s)
            }),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Token::LBracket => Ok(Expr::Array(self.parse_list(Token::RBracket)?)),
            Token::LBrace => self.parse_object(),
            t => {
                self.pos -= 1;
                self.error(format!("unexpected {t}"))
            }
        }
    }
}

pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens, source.len()).parse()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Box<Expr> {
        Box::new(Expr::Ident(KString::from_ref(s)))
    }

    #[test]
    fn t_precedence() -> anyhow::Result<()> {
        assert_eq!(parse_expression("a || b && c")?,
                   Expr::Logical(LogicalOp::Or, ident("a"),
                                 Box::new(Expr::Logical(LogicalOp::And,
                                                        ident("b"), ident("c")))));
        assert_eq!(parse_expression("!a.b")?,
                   Expr::Unary(UnaryOp::Not,
                               Box::new(Expr::Member(ident("a"), "b".into()))));
        assert_eq!(parse_expression("1 + 2 * 3")?,
                   Expr::Binary(BinaryOp::Add,
                                Box::new(Expr::Literal(Value::Number(1.))),
                                Box::new(Expr::Binary(
                                    BinaryOp::Mul,
                                    Box::new(Expr::Literal(Value::Number(2.))),
                                    Box::new(Expr::Literal(Value::Number(3.)))))));
        Ok(())
    }

    #[test]
    fn t_postfix() -> anyhow::Result<()> {
        assert_eq!(parse_expression("f(x, 'y')[0].z")?,
                   Expr::Member(
                       Box::new(Expr::Index(
                           Box::new(Expr::Call(ident("f"),
                                               vec![Expr::Ident("x".into()),
                                                    Expr::Literal(Value::from("y"))])),
                           Box::new(Expr::Literal(Value::Number(0.))))),
                       "z".into()));
        Ok(())
    }

    #[test]
    fn t_literals() -> anyhow::Result<()> {
        assert_eq!(parse_expression("{a: 1, 'b c': [true, null,],}")?,
                   Expr::Object(vec![
                       ("a".into(), Expr::Literal(Value::Number(1.))),
                       ("b c".into(), Expr::Array(vec![Expr::Literal(Value::Bool(true)),
                                                       Expr::Literal(Value::Null)]))]));
        assert!(matches!(parse_expression("a ? b : c ? d : e")?,
                         Expr::Conditional(_, _, e) if matches!(*e, Expr::Conditional(..))));
        Ok(())
    }

    #[test]
    fn t_errors() {
        assert_eq!(parse_expression("a +").unwrap_err().position, 3);
        assert_eq!(parse_expression("a b").unwrap_err().position, 2);
        assert!(parse_expression("(a").is_err());
        assert!(parse_expression("a.").is_err());
        assert!(parse_expression("").is_err());
        assert_eq!(parse_expression("a b").unwrap_err().message.as_str(), "unexpected 'b'");
        assert_eq!(parse_expression("(a").unwrap_err().message.as_str(),
                   "expected ')', got end of input");
    }
}
