//! Run-time values that templates are rendered against, with the
//! loose typing rules binding expressions rely on (truthiness,
//! string conversion, `==` vs `===`).

use std::{borrow::Cow, collections::BTreeMap, fmt::{self, Debug, Display}, sync::Arc};

use kstring::KString;

use crate::expr::EvalError;


pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A host function stored in the data. Gets the receiver (`this`,
/// `Value::Undefined` for plain calls) and the evaluated arguments.
#[derive(Clone)]
pub struct Function {
    name: KString,
    f: Arc<NativeFn>,
}

impl Function {
    pub fn new<F>(name: impl Into<KString>, f: F) -> Self
        where F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static
    {
        Function { name: name.into(), f: Arc::new(f) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.f)(this, args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:?})", self.name.as_str())
    }
}


#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(KString),
    Array(Arc<Vec<Value>>),
    Object(Arc<BTreeMap<KString, Value>>),
    Function(Function),
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

/// Formats like JavaScript's `Number.prototype.toString` for the
/// common cases.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0. { "Infinity".into() } else { "-Infinity".into() }
    } else if n == 0. {
        // also -0
        "0".into()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let s = format!("{:e}", n);
        match s.split_once('e') {
            Some((mantissa, exp)) if ! exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        }
    } else if n.fract() == 0. {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl Value {
    pub fn string(s: impl Into<KString>) -> Value {
        Value::String(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    pub fn object<K: Into<KString>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(Arc::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()))
    }

    pub fn function<F>(name: impl Into<KString>, f: F) -> Value
        where F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static
    {
        Value::Function(Function::new(name, f))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => ! (*n == 0. || n.is_nan()),
            Value::String(s) => ! s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// The result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<KString, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None
        }
    }

    /// Own property of an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.,
            Value::Bool(b) => if *b { 1. } else { 0. },
            Value::Number(n) => *n,
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.
                } else {
                    s.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) =>
                Value::String(KString::from_ref(&self.to_display_string())).to_number(),
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// String conversion as done by string concatenation.
    pub fn to_display_string(&self) -> Cow<str> {
        match self {
            Value::Undefined => Cow::Borrowed("undefined"),
            Value::Null => Cow::Borrowed("null"),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Array(items) => {
                let parts: Vec<Cow<str>> = items.iter().map(|v| {
                    if v.is_nullish() {
                        Cow::Borrowed("")
                    } else {
                        v.to_display_string()
                    }
                }).collect();
                Cow::Owned(parts.join(","))
            }
            Value::Object(_) => Cow::Borrowed("[object Object]"),
            Value::Function(f) => Cow::Owned(format!("function {}() {{ [native code] }}",
                                                     f.name())),
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false
        }
    }

    /// `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Number(_), String(_)) | (String(_), Number(_)) =>
                self.to_number() == other.to_number(),
            (Bool(_), _) => Number(self.to_number()).loose_eq(other),
            (_, Bool(_)) => self.loose_eq(&Number(other.to_number())),
            (Array(_) | Object(_) | Function(_), Number(_) | String(_)) =>
                Value::String(KString::from_ref(&self.to_display_string())).loose_eq(other),
            (Number(_) | String(_), Array(_) | Object(_) | Function(_)) =>
                self.loose_eq(&Value::String(KString::from_ref(&other.to_display_string()))),
            _ => self.strict_eq(other)
        }
    }
}

/// Structural equality (unlike `strict_eq`, arrays and objects are
/// compared by contents). NaN is unequal to itself.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => self.strict_eq(other)
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}


impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}
impl From<i32> for Value {
    fn from(n: i32) -> Self { Value::Number(n.into()) }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self { Value::Number(n as f64) }
}
impl From<usize> for Value {
    fn from(n: usize) -> Self { Value::Number(n as f64) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(KString::from_ref(s)) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(KString::from_string(s)) }
}
impl From<KString> for Value {
    fn from(s: KString) -> Self { Value::String(s) }
}
impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self { Value::Array(Arc::new(v)) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null
        }
    }
}
impl From<&Value> for Value {
    fn from(v: &Value) -> Self { v.clone() }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(KString::from_ref(s)),
            serde_json::Value::Array(a) => Value::array(a.iter().map(Value::from)),
            serde_json::Value::Object(o) =>
                Value::object(o.iter().map(|(k, v)| (KString::from_ref(k), Value::from(v)))),
        }
    }
}
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from(&v)
    }
}
