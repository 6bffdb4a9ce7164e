//! The binding expression language: a small JavaScript subset that is
//! parsed once when a template is compiled and interpreted against a
//! `Context` at render time. Other languages can be plugged in by
//! implementing `Evaluator`.

pub mod lexer;
pub mod parser;
pub mod eval;

use std::{fmt, sync::Arc};

use kstring::KString;

use crate::context::Context;
use crate::value::Value;
pub use parser::{Expr, SyntaxError};
pub use eval::ExprEvaluator;


#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("{0} is not defined")]
    UnknownName(KString),
    #[error("cannot read property {:?} of {base}", property.as_str())]
    NullishAccess { property: KString, base: &'static str },
    #[error("{0} is not a function")]
    NotAFunction(KString),
    #[error("syntax error in {:?}: {error}", expr.as_str())]
    Syntax { expr: KString, error: SyntaxError },
    #[error("{function}: expected {expected} argument(s), got {got}")]
    Arguments { function: KString, expected: &'static str, got: usize },
    /// Raised by host functions.
    #[error("{0}")]
    Native(KString),
}


/// A binding expression as written in the template, plus the result
/// of parsing it.
#[derive(Clone)]
pub struct Expression {
    source: KString,
    ast: Result<Arc<Expr>, SyntaxError>,
}

impl Expression {
    pub fn parse(source: &str) -> Expression {
        let source = source.trim();
        Expression {
            source: KString::from_ref(source),
            ast: parser::parse_expression(source).map(Arc::new),
        }
    }

    /// `!(source)`, for `ifnot`.
    pub fn parse_negated(source: &str) -> Expression {
        Expression::parse(&format!("!({})", source.trim()))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> Result<&Expr, EvalError> {
        match &self.ast {
            Ok(ast) => Ok(ast),
            Err(error) => Err(EvalError::Syntax {
                expr: self.source.clone(),
                error: error.clone(),
            })
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({:?})", self.source.as_str())
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}


pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expr: &Expression, scope: &Context) -> Result<Value, EvalError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_expression() {
        let e = Expression::parse("  a.b ");
        assert_eq!(e.source(), "a.b");
        assert!(e.ast().is_ok());
        assert_eq!(Expression::parse_negated("x || y").source(), "!(x || y)");
        let bad = Expression::parse("a +");
        assert!(matches!(bad.ast(), Err(EvalError::Syntax { .. })));
        assert_eq!(bad.ast().err().map(|e| e.to_string()).unwrap_or_default(),
                   "syntax error in \"a +\": unexpected end of expression at offset 3");
    }
}
