//! Binding contexts: which values the implicit names (`$data`,
//! `$parent`, ...) denote at a given point of a render.

use kstring::KString;

use crate::value::Value;


/// One scope of a render. Child scopes borrow their parent, so a
/// context chain lives exactly as long as the render call that built
/// it, and is never changed after construction.
#[derive(Debug, Clone)]
pub struct Context<'p> {
    root: Value,
    data: Value,
    parent: Option<&'p Context<'p>>,
    index: Option<usize>,
    // Append only; lookup takes the last entry with a given name.
    aliases: Vec<(KString, Value)>,
}

impl Context<'static> {
    pub fn root(data: Value) -> Self {
        Context {
            root: data.clone(),
            data,
            parent: None,
            index: None,
            aliases: Vec::new(),
        }
    }
}

impl<'p> Context<'p> {
    /// Scope for `with`.
    pub fn derive_for<'c>(&'c self, data: Value) -> Context<'c> {
        Context {
            root: self.root.clone(),
            data,
            parent: Some(self),
            index: None,
            aliases: self.aliases.clone(),
        }
    }

    /// Scope for one `foreach` iteration; `alias` names the item in
    /// addition to `$data`.
    pub fn derive_for_iteration<'c>(
        &'c self,
        item: Value,
        index: usize,
        alias: Option<&KString>,
    ) -> Context<'c> {
        let mut c = self.derive_for(item);
        c.index = Some(index);
        if let Some(name) = alias {
            let item = c.data.clone();
            c.aliases.push((name.clone(), item));
        }
        c
    }

    /// The same scope with another `$data`, for rendering with a
    /// caller-supplied context.
    pub fn rescoped(&self, data: Value) -> Context<'p> {
        Context {
            root: self.root.clone(),
            data,
            parent: self.parent,
            index: self.index,
            aliases: self.aliases.clone(),
        }
    }

    pub fn with_alias(mut self, name: impl Into<KString>, value: Value) -> Self {
        self.aliases.push((name.into(), value));
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn root_data(&self) -> &Value {
        &self.root
    }

    pub fn parent_context(&self) -> Option<&'p Context<'p>> {
        self.parent
    }

    pub fn parent_data(&self) -> Option<&Value> {
        self.parent.map(|p| &p.data)
    }

    /// `$data` of every enclosing scope, innermost first.
    pub fn parents(&self) -> Vec<Value> {
        let mut v = Vec::new();
        let mut c = self.parent;
        while let Some(p) = c {
            v.push(p.data.clone());
            c = p.parent;
        }
        v
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn alias(&self, name: &str) -> Option<&Value> {
        self.aliases.iter().rev().find(|(k, _)| k.as_str() == name).map(|(_, v)| v)
    }

    /// The `$...` names and the aliases, but not the properties of
    /// `$data`.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "$data" | "$rawData" => Some(self.data.clone()),
            "$root" => Some(self.root.clone()),
            "$parent" => self.parent_data().cloned(),
            "$parents" => Some(Value::array(self.parents())),
            "$parentContext" => self.parent.map(|p| p.to_value()),
            "$index" => self.index.map(Value::from),
            "$context" => Some(self.to_value()),
            _ => self.alias(name).cloned()
        }
    }

    /// The context as an object, as seen by expressions through
    /// `$context` and `$parentContext`.
    pub fn to_value(&self) -> Value {
        let mut entries: Vec<(KString, Value)> = vec![
            ("$data".into(), self.data.clone()),
            ("$rawData".into(), self.data.clone()),
            ("$root".into(), self.root.clone()),
            ("$parents".into(), Value::array(self.parents())),
        ];
        if let Some(p) = self.parent {
            entries.push(("$parent".into(), p.data.clone()));
            entries.push(("$parentContext".into(), p.to_value()));
        }
        if let Some(i) = self.index {
            entries.push(("$index".into(), Value::from(i)));
        }
        entries.extend(self.aliases.iter().cloned());
        Value::object(entries)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn t_root() {
        let c = Context::root(Value::from(json!({"a": 1})));
        assert_eq!(c.lookup("$root"), Some(Value::from(json!({"a": 1}))));
        assert_eq!(c.lookup("$data"), c.lookup("$rawData"));
        assert_eq!(c.lookup("$parent"), None);
        assert_eq!(c.lookup("$parents"), Some(Value::array([])));
        assert_eq!(c.lookup("$index"), None);
        assert_eq!(c.lookup("a"), None);
    }

    #[test]
    fn t_derive() {
        let root = Context::root(Value::from("r"));
        let w = root.derive_for(Value::from("w"));
        let k = KString::from_static("item");
        let it = w.derive_for_iteration(Value::from("x"), 2, Some(&k));
        assert_eq!(it.data(), &Value::from("x"));
        assert_eq!(it.root_data(), &Value::from("r"));
        assert_eq!(it.parent_data(), Some(&Value::from("w")));
        assert_eq!(it.parents(), vec![Value::from("w"), Value::from("r")]);
        assert_eq!(it.lookup("$index"), Some(Value::from(2)));
        assert_eq!(it.lookup("item"), Some(Value::from("x")));
        // aliases are inherited, the index is not
        let inner = it.derive_for(Value::Null);
        assert_eq!(inner.lookup("item"), Some(Value::from("x")));
        assert_eq!(inner.index(), None);
        let inner2 = inner.derive_for_iteration(Value::from("y"), 0, Some(&k));
        assert_eq!(inner2.lookup("item"), Some(Value::from("y")));
    }

    #[test]
    fn t_context_value() {
        let root = Context::root(Value::from(1));
        let c = root.derive_for(Value::from(2));
        let v = c.to_value();
        assert_eq!(v.get("$data"), Some(&Value::from(2)));
        assert_eq!(v.get("$parent"), Some(&Value::from(1)));
        assert_eq!(v.get("$parentContext").and_then(|p| p.get("$data")),
                   Some(&Value::from(1)));
    }
}
