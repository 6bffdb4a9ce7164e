use std::cmp::Ordering;

use kstring::KString;

use crate::context::Context;
use crate::value::{Value, format_number};
use super::{Evaluator, EvalError, Expression};
use super::parser::{Expr, UnaryOp, BinaryOp, LogicalOp};


/// The default evaluator, interpreting the parsed expression tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, expr: &Expression, scope: &Context) -> Result<Value, EvalError> {
        eval(expr.ast()?, scope)
    }
}


/// Own properties of `$data` shadow the context names, which shadow
/// aliases.
fn resolve(name: &str, scope: &Context) -> Result<Value, EvalError> {
    if let Some(v) = scope.data().get(name) {
        return Ok(v.clone())
    }
    scope.lookup(name).ok_or_else(|| EvalError::UnknownName(KString::from_ref(name)))
}

fn nullish_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        _ => "undefined"
    }
}

fn array_index(key: &Value) -> Option<usize> {
    let n = match key {
        Value::Number(n) => *n,
        Value::String(s) => s.parse().ok()?,
        _ => return None
    };
    if n >= 0. && n.fract() == 0. && n < usize::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// `base[key]` / `base.key`, not including methods.
fn get_member(base: &Value, key: &Value) -> Result<Value, EvalError> {
    match base {
        Value::Undefined | Value::Null => Err(EvalError::NullishAccess {
            property: KString::from_ref(&key.to_display_string()),
            base: nullish_name(base),
        }),
        Value::Object(o) => Ok(o.get(&*key.to_display_string())
                               .cloned().unwrap_or_default()),
        Value::Array(a) => {
            if key.as_str() == Some("length") {
                Ok(Value::from(a.len()))
            } else {
                Ok(array_index(key).and_then(|i| a.get(i)).cloned().unwrap_or_default())
            }
        }
        Value::String(s) => {
            if key.as_str() == Some("length") {
                Ok(Value::from(s.encode_utf16().count()))
            } else {
                Ok(array_index(key).and_then(|i| s.chars().nth(i))
                   .map(|c| Value::from(c.to_string()))
                   .unwrap_or_default())
            }
        }
        Value::Bool(_) | Value::Number(_) | Value::Function(_) => Ok(Value::Undefined),
    }
}

fn arg(args: &[Value], i: usize) -> &Value {
    const UNDEFINED: &Value = &Value::Undefined;
    args.get(i).unwrap_or(UNDEFINED)
}

/// Relative index as used by `slice`/`substring` style methods.
fn clamp_index(v: &Value, len: usize, negative_from_end: bool) -> usize {
    let n = v.to_number();
    if n.is_nan() {
        return 0
    }
    let n = n.trunc();
    if n < 0. {
        if negative_from_end {
            let from_end = len as f64 + n;
            if from_end < 0. { 0 } else { from_end as usize }
        } else {
            0
        }
    } else if n > len as f64 {
        len
    } else {
        n as usize
    }
}

fn call_string_method(s: &str, name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let chars = || s.chars();
    Some(Ok(match name {
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "toString" => Value::from(s),
        "indexOf" => {
            let needle = arg(args, 0).to_display_string();
            match s.find(&*needle) {
                Some(byte_pos) => Value::from(s[..byte_pos].chars().count()),
                None => Value::from(-1),
            }
        }
        "charAt" => {
            let i = arg(args, 0).to_number();
            let i = if i.is_nan() { 0. } else { i };
            if i < 0. {
                Value::from("")
            } else {
                Value::from(chars().nth(i as usize).map(|c| c.to_string()).unwrap_or_default())
            }
        }
        "substring" => {
            let len = chars().count();
            let a = clamp_index(arg(args, 0), len, false);
            let b = match arg(args, 1) {
                Value::Undefined => len,
                v => clamp_index(v, len, false),
            };
            let (a, b) = if a <= b { (a, b) } else { (b, a) };
            Value::from(chars().skip(a).take(b - a).collect::<String>())
        }
        "split" => match arg(args, 0) {
            Value::Undefined => Value::array([Value::from(s)]),
            sep => {
                let sep = sep.to_display_string();
                if sep.is_empty() {
                    Value::array(chars().map(|c| Value::from(c.to_string())))
                } else {
                    Value::array(s.split(&*sep).map(Value::from))
                }
            }
        },
        _ => return None
    }))
}

fn call_array_method(items: &[Value], name: &str, args: &[Value])
                     -> Option<Result<Value, EvalError>>
{
    Some(Ok(match name {
        "join" => {
            let sep = match arg(args, 0) {
                Value::Undefined => KString::from_static(","),
                v => KString::from_ref(&v.to_display_string()),
            };
            let parts: Vec<String> = items.iter().map(
                |v| if v.is_nullish() { String::new() } else { v.to_display_string().into() }
            ).collect();
            Value::from(parts.join(sep.as_str()))
        }
        "toString" => Value::from(Value::array(items.iter().cloned()).to_display_string()
                                  .into_owned()),
        "indexOf" => {
            let needle = arg(args, 0);
            match items.iter().position(|v| v.strict_eq(needle)) {
                Some(i) => Value::from(i),
                None => Value::from(-1),
            }
        }
        "slice" => {
            let len = items.len();
            let a = clamp_index(arg(args, 0), len, true);
            let b = match arg(args, 1) {
                Value::Undefined => len,
                v => clamp_index(v, len, true),
            };
            if a < b {
                Value::array(items[a..b].iter().cloned())
            } else {
                Value::array([])
            }
        }
        _ => return None
    }))
}

fn call_number_method(n: f64, name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    Some(Ok(match name {
        "toString" => Value::from(format_number(n)),
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0., 100.) as usize };
            Value::from(format!("{n:.digits$}"))
        }
        _ => return None
    }))
}

/// `this.name(args)`
fn call_method(this: &Value, name: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let own = get_member(this, name)?;
    if let Value::Function(f) = &own {
        return f.call(this, args)
    }
    let method = name.to_display_string();
    let builtin = match this {
        Value::String(s) => call_string_method(s, &method, args),
        Value::Array(a) => call_array_method(a, &method, args),
        Value::Number(n) => call_number_method(*n, &method, args),
        Value::Bool(_) if method == "toString" => Some(Ok(Value::from(this.to_display_string()
                                                                      .into_owned()))),
        _ => None
    };
    builtin.unwrap_or_else(|| Err(EvalError::NotAFunction(KString::from_ref(&method))))
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> bool {
    let ordering = match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => a.to_number().partial_cmp(&b.to_number())
    };
    match ordering {
        None => false,
        Some(o) => match op {
            BinaryOp::Lt => o == Ordering::Less,
            BinaryOp::Le => o != Ordering::Greater,
            BinaryOp::Gt => o == Ordering::Greater,
            BinaryOp::Ge => o != Ordering::Less,
            _ => false
        }
    }
}

fn binary(op: BinaryOp, a: &Value, b: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let is_stringy = |v: &Value| matches!(
                v, Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_));
            if is_stringy(a) || is_stringy(b) {
                let mut s = a.to_display_string().into_owned();
                s.push_str(&b.to_display_string());
                Value::from(s)
            } else {
                Value::Number(a.to_number() + b.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(a.to_number() - b.to_number()),
        BinaryOp::Mul => Value::Number(a.to_number() * b.to_number()),
        BinaryOp::Div => Value::Number(a.to_number() / b.to_number()),
        BinaryOp::Rem => Value::Number(a.to_number() % b.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge =>
            Value::Bool(compare(op, a, b)),
        BinaryOp::Eq => Value::Bool(a.loose_eq(b)),
        BinaryOp::NotEq => Value::Bool(! a.loose_eq(b)),
        BinaryOp::StrictEq => Value::Bool(a.strict_eq(b)),
        BinaryOp::StrictNotEq => Value::Bool(! a.strict_eq(b)),
    }
}

pub fn eval(expr: &Expr, scope: &Context) -> Result<Value, EvalError> {
    Ok(match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Ident(name) => resolve(name, scope)?,
        Expr::Array(items) => Value::array(
            items.iter().map(|e| eval(e, scope)).collect::<Result<Vec<_>, _>>()?),
        Expr::Object(entries) => Value::object(
            entries.iter().map(|(k, e)| Ok((k.clone(), eval(e, scope)?)))
                .collect::<Result<Vec<_>, EvalError>>()?),
        Expr::Member(base, name) => {
            get_member(&eval(base, scope)?, &Value::String(name.clone()))?
        }
        Expr::Index(base, key) => {
            let base = eval(base, scope)?;
            get_member(&base, &eval(key, scope)?)?
        }
        Expr::Call(callee, args) => {
            let (this, method) = match &**callee {
                Expr::Member(base, name) => (Some(eval(base, scope)?),
                                             Value::String(name.clone())),
                Expr::Index(base, key) => (Some(eval(base, scope)?), eval(key, scope)?),
                _ => (None, Value::Undefined),
            };
            let args = args.iter().map(|e| eval(e, scope)).collect::<Result<Vec<_>, _>>()?;
            match this {
                Some(this) => call_method(&this, &method, &args)?,
                None => match eval(callee, scope)? {
                    Value::Function(f) => f.call(&Value::Undefined, &args)?,
                    _ => {
                        let name = match &**callee {
                            Expr::Ident(name) => name.clone(),
                            _ => KString::from_static("expression"),
                        };
                        return Err(EvalError::NotAFunction(name))
                    }
                }
            }
        }
        Expr::Unary(op, operand) => {
            let v = match (op, &**operand) {
                // typeof does not fail on undeclared names
                (UnaryOp::TypeOf, Expr::Ident(name)) =>
                    resolve(name, scope).unwrap_or(Value::Undefined),
                _ => eval(operand, scope)?
            };
            match op {
                UnaryOp::Not => Value::Bool(! v.is_truthy()),
                UnaryOp::Neg => Value::Number(- v.to_number()),
                UnaryOp::Plus => Value::Number(v.to_number()),
                UnaryOp::TypeOf => Value::from(v.type_of()),
            }
        }
        Expr::Binary(op, a, b) => {
            let a = eval(a, scope)?;
            let b = eval(b, scope)?;
            binary(*op, &a, &b)
        }
        Expr::Logical(op, a, b) => {
            let a = eval(a, scope)?;
            let take_left = match op {
                LogicalOp::And => ! a.is_truthy(),
                LogicalOp::Or => a.is_truthy(),
                LogicalOp::Nullish => ! a.is_nullish(),
            };
            if take_left { a } else { eval(b, scope)? }
        }
        Expr::Conditional(test, then, otherwise) => {
            if eval(test, scope)?.is_truthy() {
                eval(then, scope)?
            } else {
                eval(otherwise, scope)?
            }
        }
    })
}
