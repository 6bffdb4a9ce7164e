//! Recognizing bindings: the binding attribute of elements
//! (container form) and the `ko ...`/`hz ...` comments (containerless
//! form).

use chj_util::warn;
use kstring::KString;

use crate::config::Config;
use crate::error::{CompileError, CompileErrorKind, Warning};
use crate::expr::Expression;
use crate::objlit::{parse_object_literal, unquote, ObjectLiteralError};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    If,
    IfNot,
    Foreach,
    With,
    Text,
    Html,
    Attr,
    Css,
    Style,
}

impl BindingKind {
    pub fn from_name(name: &str) -> Option<BindingKind> {
        use BindingKind::*;
        Some(match name {
            "if" => If,
            "ifnot" => IfNot,
            "foreach" => Foreach,
            "with" => With,
            "text" => Text,
            "html" => Html,
            "attr" => Attr,
            "css" => Css,
            "style" => Style,
            _ => return None
        })
    }

    pub fn name(self) -> &'static str {
        use BindingKind::*;
        match self {
            If => "if",
            IfNot => "ifnot",
            Foreach => "foreach",
            With => "with",
            Text => "text",
            Html => "html",
            Attr => "attr",
            Css => "css",
            Style => "style",
        }
    }

    /// At most one of these may be given on an element.
    pub fn controls_descendants(self) -> bool {
        use BindingKind::*;
        matches!(self, If | IfNot | Foreach | Text | Html)
    }

    /// The kinds that can be used in comment form.
    pub fn is_containerless(self) -> bool {
        ! matches!(self, BindingKind::Attr | BindingKind::Css | BindingKind::Style)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub kind: BindingKind,
    /// Expression source text as written.
    pub expr: KString,
}

impl Binding {
    /// The condition of `if` and `ifnot` bindings, the latter turned
    /// into `if: !(expr)`.
    pub fn condition(&self) -> Option<Expression> {
        match self.kind {
            BindingKind::If => Some(Expression::parse(&self.expr)),
            BindingKind::IfNot => Some(Expression::parse_negated(&self.expr)),
            _ => None
        }
    }

    pub fn expression(&self) -> Expression {
        self.condition().unwrap_or_else(|| Expression::parse(&self.expr))
    }
}


/// Parse the value of an element's binding attribute. Unknown binding
/// kinds are ignored; repeated ones are dropped with a warning.
pub fn parse_container_bindings(
    source: &str,
    tag_name: &str,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Binding>, CompileError> {
    let entries = parse_object_literal(source).map_err(
        |error| CompileErrorKind::ObjectLiteral { binding: KString::from_ref(source), error })?;
    let mut bindings: Vec<Binding> = Vec::new();
    for (name, expr) in entries {
        let kind = match BindingKind::from_name(&name) {
            Some(kind) => kind,
            None => continue
        };
        if bindings.iter().any(|b| b.kind == kind) {
            let w = Warning::DuplicateBinding {
                tag_name: KString::from_ref(tag_name),
                kind: kind.name(),
            };
            warn!("{w}");
            warnings.push(w);
            continue
        }
        bindings.push(Binding { kind, expr });
    }
    let mut exclusive = bindings.iter().filter(|b| b.kind.controls_descendants());
    if let (Some(a), Some(b)) = (exclusive.next(), exclusive.next()) {
        return Err(CompileErrorKind::ConflictingBindings(a.kind.name(), b.kind.name()).into())
    }
    Ok(bindings)
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Open(Binding),
    Close,
}

/// Recognize a containerless binding comment (`ko if: cond`, `/ko`;
/// `hz` works the same). With `no_conflict`, `ko` comments are not
/// directives.
pub fn parse_directive(comment: &str, config: &Config) -> Option<Directive> {
    let s = comment.trim();
    if config.no_conflict && (s.starts_with("ko ") || s == "/ko") {
        return None
    }
    if s == "/ko" || s == "/hz" {
        return Some(Directive::Close)
    }
    let rest = s.strip_prefix("ko").or_else(|| s.strip_prefix("hz"))?;
    let name_part = rest.trim_start_matches(' ');
    if name_part.len() == rest.len() {
        return None
    }
    let (name, expr) = name_part.split_once(':')?;
    let kind = BindingKind::from_name(name.trim_end_matches(' '))?;
    let expr = expr.trim();
    if ! kind.is_containerless() || expr.is_empty() {
        return None
    }
    Some(Directive::Open(Binding { kind, expr: KString::from_ref(expr) }))
}


/// `foreach: items` or `foreach: {data: items, as: 'item'}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeachSpec {
    pub items: KString,
    pub alias: Option<KString>,
}

pub fn parse_foreach(expr: &str) -> Result<ForeachSpec, ObjectLiteralError> {
    let expr = expr.trim();
    if ! expr.starts_with('{') {
        return Ok(ForeachSpec { items: KString::from_ref(expr), alias: None })
    }
    let mut items = KString::from_static("undefined");
    let mut alias = None;
    for (key, value) in parse_object_literal(expr)? {
        match key.as_str() {
            "data" => items = value,
            "as" => alias = Some(KString::from_ref(unquote(&value).unwrap_or(value.as_str()))),
            _ => {}
        }
    }
    Ok(ForeachSpec { items, alias })
}


#[cfg(test)]
mod tests {
    use super::*;

    fn open(kind: BindingKind, expr: &str) -> Option<Directive> {
        Some(Directive::Open(Binding { kind, expr: KString::from_ref(expr) }))
    }

    #[test]
    fn t_parse_directive() {
        let c = Config::default();
        assert_eq!(parse_directive(" ko if: a.b ", &c), open(BindingKind::If, "a.b"));
        assert_eq!(parse_directive("hz  foreach : {data: xs, as: 'x'}", &c),
                   open(BindingKind::Foreach, "{data: xs, as: 'x'}"));
        assert_eq!(parse_directive("ko ifnot: x", &c), open(BindingKind::IfNot, "x"));
        assert_eq!(parse_directive("/ko", &c), Some(Directive::Close));
        assert_eq!(parse_directive(" /hz ", &c), Some(Directive::Close));
        assert_eq!(parse_directive("koif: a", &c), None);
        assert_eq!(parse_directive("ko css: a", &c), None);
        assert_eq!(parse_directive("ko if:", &c), None);
        assert_eq!(parse_directive("a comment", &c), None);
    }

    #[test]
    fn t_parse_directive_no_conflict() {
        let c = Config { no_conflict: true, ..Default::default() };
        assert_eq!(parse_directive("ko if: a", &c), None);
        assert_eq!(parse_directive("/ko", &c), None);
        assert_eq!(parse_directive("hz if: a", &c), open(BindingKind::If, "a"));
        assert_eq!(parse_directive("/hz", &c), Some(Directive::Close));
    }

    #[test]
    fn t_container_bindings() -> anyhow::Result<()> {
        let mut w = Vec::new();
        let b = parse_container_bindings("css: {a: x}, click: f, text: t, css: y",
                                         "div", &mut w)?;
        assert_eq!(b.iter().map(|b| b.kind).collect::<Vec<_>>(),
                   [BindingKind::Css, BindingKind::Text]);
        assert_eq!(w, [Warning::DuplicateBinding { tag_name: "div".into(), kind: "css" }]);
        Ok(())
    }

    #[test]
    fn t_conflicting_bindings() {
        let mut w = Vec::new();
        let e = parse_container_bindings("if: a, with: w, text: t", "p", &mut w).unwrap_err();
        assert!(matches!(e.kind(), CompileErrorKind::ConflictingBindings("if", "text")));
        let e = parse_container_bindings("text: (", "p", &mut w).unwrap_err();
        assert!(matches!(e.kind(), CompileErrorKind::ObjectLiteral { .. }));
    }

    #[test]
    fn t_conditions() {
        let b = Binding { kind: BindingKind::IfNot, expr: "a || b".into() };
        assert_eq!(b.condition().map(|e| e.source().to_string()), Some("!(a || b)".into()));
        let b = Binding { kind: BindingKind::Text, expr: "a".into() };
        assert!(b.condition().is_none());
    }

    #[test]
    fn t_parse_foreach() -> anyhow::Result<()> {
        assert_eq!(parse_foreach(" items ")?, ForeachSpec { items: "items".into(), alias: None });
        assert_eq!(parse_foreach("{data: $root.items, as: 'item'}")?,
                   ForeachSpec { items: "$root.items".into(), alias: Some("item".into()) });
        assert_eq!(parse_foreach("{as: \"x\"}")?,
                   ForeachSpec { items: "undefined".into(), alias: Some("x".into()) });
        assert!(parse_foreach("{data: [}").is_err());
        Ok(())
    }
}
