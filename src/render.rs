//! What the bindings do at render time.

use std::borrow::Cow;

use ahtml::{html_escape, push_attribute, Print};
use chj_util::warn;
use itertools::Itertools;
use kstring::KString;

use crate::context::Context;
use crate::expr::Expression;
use crate::markup::parse_fragment;
use crate::plan::{ClassBinding, RenderPlan, Runtime};
use crate::value::Value;


/// `null`, `undefined` and `false` omit the attribute, anything else
/// (including `""` and `0`) is rendered.
pub fn attr(rt: &Runtime, scope: &Context, name: &str, expr: &Expression, out: &mut String) {
    match rt.eval(expr, scope) {
        Value::Undefined | Value::Null | Value::Bool(false) => {}
        v => push_attribute(out, name, &v.to_display_string()),
    }
}

pub fn text(rt: &Runtime, scope: &Context, expr: &Expression, out: &mut String) {
    let v = rt.eval(expr, scope);
    if ! v.is_nullish() {
        out.push_str(&html_escape(&v.to_display_string()));
    }
}

/// The value is parsed as markup and serialized again, unescaped.
pub fn html(rt: &Runtime, scope: &Context, expr: &Expression, out: &mut String) {
    let v = rt.eval(expr, scope);
    if v.is_nullish() {
        return
    }
    let s = v.to_display_string();
    if s.is_empty() {
        return
    }
    match parse_fragment(&s) {
        Ok(fragment) => fragment.print_html_fragment(out, &fragment),
        Err(e) => warn!("html binding {:?}: {e}", expr.source()),
    }
}

pub fn with(rt: &Runtime, scope: &Context, expr: &Expression, plan: &RenderPlan,
            out: &mut String)
{
    let data = rt.eval(expr, scope);
    let inner = scope.derive_for(data);
    plan.execute(rt, &inner, out);
}

pub fn if_(rt: &Runtime, scope: &Context, condition: &Expression, plan: &RenderPlan,
           out: &mut String)
{
    if rt.eval(condition, scope).is_truthy() {
        plan.execute(rt, scope, out);
    }
}

/// Anything but an array gives zero iterations.
pub fn foreach(rt: &Runtime, scope: &Context, items: &Expression, alias: Option<&KString>,
               plan: &RenderPlan, out: &mut String)
{
    let items = rt.eval(items, scope);
    if let Some(items) = items.as_array() {
        for (i, item) in items.iter().enumerate() {
            let inner = scope.derive_for_iteration(item.clone(), i, alias);
            plan.execute(rt, &inner, out);
        }
    }
}

pub fn class(rt: &Runtime, scope: &Context, fixed: &[KString], dynamic: &ClassBinding,
             out: &mut String)
{
    let mut classes: Vec<Cow<str>> = fixed.iter().map(|c| Cow::Borrowed(c.as_str())).collect();
    match dynamic {
        ClassBinding::Conditional(entries) => {
            for (names, expr) in entries {
                if rt.eval(expr, scope).is_truthy() {
                    classes.extend(names.split_whitespace().map(Cow::Borrowed));
                }
            }
        }
        ClassBinding::Expression(expr) => {
            let v = rt.eval(expr, scope);
            if v.is_truthy() {
                let names = v.to_display_string().into_owned();
                classes.extend(names.split_whitespace().map(|s| Cow::Owned(s.to_string())));
            }
        }
    }
    push_attribute(out, "class", &classes.iter().unique().join(" "));
}

pub fn style(rt: &Runtime, scope: &Context, fixed: &[(KString, KString)],
             dynamic: &[(KString, Expression)], out: &mut String)
{
    let fixed = fixed.iter().map(|(prop, value)| format!("{prop}:{value};"));
    let dynamic = dynamic.iter().filter_map(|(prop, expr)| {
        let v = rt.eval(expr, scope);
        if v.is_truthy() {
            Some(format!("{prop}:{};", v.to_display_string()))
        } else {
            None
        }
    });
    push_attribute(out, "style", &fixed.chain(dynamic).join(" "));
}
