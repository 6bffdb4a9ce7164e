//! Turning a node sequence into a `RenderPlan`.

use ahtml::{html_escape, print_comment, push_attribute, Element, Fragment, Node, NodeId,
            Print};
use itertools::Itertools;
use kstring::KString;

use crate::binding::{parse_container_bindings, parse_directive, parse_foreach, Binding,
                     BindingKind, Directive};
use crate::blocks::BlockIndex;
use crate::config::Config;
use crate::css::{css_property_name, parse_declarations};
use crate::error::{CompileError, CompileErrorKind, Warning};
use crate::expr::Expression;
use crate::objlit::{parse_object_literal, ObjectLiteralError};
use crate::plan::{ClassBinding, RenderPlan, Step};
use crate::walker::{walk, Visit, Walk};


fn objlit_error(source: &str) -> impl FnOnce(ObjectLiteralError) -> CompileError + '_ {
    move |error| CompileErrorKind::ObjectLiteral { binding: KString::from_ref(source), error }
        .into()
}

/// Remove the attribute `name`, returning its value.
fn take_attribute(attr: &mut Vec<(KString, KString)>, name: &str) -> Option<KString> {
    let i = attr.iter().position(|(k, _)| k.as_str() == name)?;
    Some(attr.remove(i).1)
}

/// Compiles one node sequence; nested sequences (bodies of blocks and
/// of elements with scope bindings) get their own `Compiler`.
pub struct Compiler<'c> {
    fragment: &'c Fragment,
    blocks: &'c BlockIndex,
    config: &'c Config,
    warnings: &'c mut Vec<Warning>,
    steps: Vec<Step>,
    // End marker of the block being skipped.
    skip_until: Option<NodeId>,
    error: Option<CompileError>,
}

impl<'c> Compiler<'c> {
    pub fn new(
        fragment: &'c Fragment,
        blocks: &'c BlockIndex,
        config: &'c Config,
        warnings: &'c mut Vec<Warning>,
    ) -> Self {
        Compiler {
            fragment,
            blocks,
            config,
            warnings,
            steps: Vec::new(),
            skip_until: None,
            error: None,
        }
    }

    pub fn compile(mut self, nodes: &[NodeId]) -> Result<RenderPlan, CompileError> {
        let fragment = self.fragment;
        walk(fragment, nodes, |visit| self.visit(visit));
        if let Some(e) = self.error.take() {
            return Err(e)
        }
        Ok(RenderPlan::new(self.steps))
    }

    fn nested(&mut self, nodes: &[NodeId]) -> Result<RenderPlan, CompileError> {
        Compiler::new(self.fragment, self.blocks, self.config, &mut *self.warnings).compile(nodes)
    }

    fn push_literal(&mut self, s: &str) {
        if let Some(Step::Literal(last)) = self.steps.last_mut() {
            let mut joined = String::with_capacity(last.len() + s.len());
            joined.push_str(last);
            joined.push_str(s);
            *last = KString::from_string(joined);
        } else {
            self.steps.push(Step::Literal(KString::from_ref(s)));
        }
    }

    fn extend(&mut self, steps: Vec<Step>) {
        for step in steps {
            match step {
                Step::Literal(s) => self.push_literal(&s),
                step => self.steps.push(step),
            }
        }
    }

    fn visit(&mut self, visit: Visit) -> Walk {
        match self.try_visit(visit) {
            Ok(w) => w,
            Err(e) => {
                self.error = Some(e);
                Walk::Return
            }
        }
    }

    fn try_visit(&mut self, visit: Visit) -> Result<Walk, CompileError> {
        if let Some(end) = self.skip_until {
            if visit.is_open && visit.node == end {
                self.skip_until = None;
            }
            return Ok(Walk::Continue)
        }
        let fragment = self.fragment;
        let node = fragment.node(visit.node);
        if ! visit.is_open {
            if let Node::Element(e) = node {
                self.push_literal(&format!("</{}>", e.tag_name));
            }
            return Ok(Walk::Descend)
        }
        match node {
            Node::Text(t) => {
                self.steps.push(Step::EscapedText(KString::from_ref(&html_escape(t))));
            }
            Node::Comment(text) => self.comment(visit.node, text)?,
            Node::Raw(r) => {
                self.steps.push(Step::Raw(KString::from_string(
                    r.to_html_fragment_string(fragment))));
            }
            Node::Directive(d) => self.push_literal(&format!("<{d}>")),
            Node::Element(e) => return self.element(visit.node, e),
        }
        Ok(Walk::Continue)
    }

    fn comment(&mut self, id: NodeId, text: &str) -> Result<(), CompileError> {
        let blocks = self.blocks;
        match parse_directive(text, self.config) {
            Some(Directive::Open(_)) => match blocks.get(id) {
                Some(block) => {
                    let step = self.scope_step(&block.binding, &block.body)?;
                    self.steps.extend(step);
                    self.skip_until = Some(block.end);
                }
                // not reachable from the walked sequence of the block
                // matcher
                None => {}
            },
            // Matched end markers are skipped along with their block,
            // others are dropped.
            Some(Directive::Close) => {}
            None => {
                let mut s = String::new();
                print_comment(&mut s, text);
                self.push_literal(&s);
            }
        }
        Ok(())
    }

    /// The step for a binding that decides what its `body` renders
    /// to.
    fn scope_step(&mut self, binding: &Binding, body: &[NodeId])
                  -> Result<Option<Step>, CompileError>
    {
        Ok(Some(match binding.kind {
            BindingKind::If | BindingKind::IfNot => Step::If {
                condition: binding.expression(),
                plan: self.nested(body)?,
            },
            BindingKind::Foreach => {
                let spec = parse_foreach(&binding.expr).map_err(objlit_error(&binding.expr))?;
                Step::Foreach {
                    items: Expression::parse(&spec.items),
                    alias: spec.alias,
                    plan: self.nested(body)?,
                }
            }
            BindingKind::With => Step::With {
                expr: binding.expression(),
                plan: self.nested(body)?,
            },
            BindingKind::Text => Step::Text(binding.expression()),
            BindingKind::Html => Step::Html(binding.expression()),
            BindingKind::Attr | BindingKind::Css | BindingKind::Style => return Ok(None),
        }))
    }

    fn element(&mut self, id: NodeId, e: &Element) -> Result<Walk, CompileError> {
        let binding_attribute = self.config.binding_attribute();
        let is_void = ! e.has_closing_tag();
        let source = match e.get_attribute(binding_attribute) {
            Some(source) => source,
            None => {
                let mut s = format!("<{}", e.tag_name);
                for (k, v) in &e.attr {
                    push_attribute(&mut s, k, v);
                }
                s.push_str(if is_void { " />" } else { ">" });
                self.push_literal(&s);
                return Ok(if is_void { Walk::Continue } else { Walk::Descend })
            }
        };
        let bindings = parse_container_bindings(source, &e.tag_name, &mut *self.warnings)?;
        let mut attr: Vec<(KString, KString)> = e.attr.iter()
            .filter(|(k, _)| k.as_str() != binding_attribute)
            .cloned()
            .collect();

        let mut steps = vec![Step::Literal(KString::from_string(format!("<{}", e.tag_name)))];
        for binding in &bindings {
            match binding.kind {
                BindingKind::Css => steps.push(class_step(binding, &mut attr)?),
                BindingKind::Style => steps.push(style_step(binding, &mut attr)?),
                BindingKind::Attr => {
                    let entries = parse_object_literal(&binding.expr).map_err(
                        objlit_error(&binding.expr))?;
                    for (name, expr) in entries {
                        take_attribute(&mut attr, &name);
                        steps.push(Step::Attr { name, expr: Expression::parse(&expr) });
                    }
                }
                _ => {}
            }
        }
        if ! attr.is_empty() {
            let mut s = String::new();
            for (k, v) in &attr {
                push_attribute(&mut s, k, v);
            }
            steps.push(Step::Attributes(KString::from_string(s)));
        }
        steps.push(Step::Literal(KString::from_static(if is_void { " />" } else { ">" })));

        let condition = bindings.iter().find_map(Binding::condition);
        let with = bindings.iter().find(|b| b.kind == BindingKind::With);
        let content = bindings.iter().find(
            |b| matches!(b.kind, BindingKind::Foreach | BindingKind::Text | BindingKind::Html));
        if condition.is_none() && with.is_none() && content.is_none() {
            self.extend(steps);
            return Ok(if is_void { Walk::Continue } else { Walk::Descend })
        }

        if ! is_void {
            let children = self.fragment.children(id);
            let mut inner: Vec<Step> = match content {
                Some(b) => self.scope_step(b, children)?.into_iter().collect(),
                None => self.nested(children)?.into_steps(),
            };
            if let Some(w) = with {
                inner = vec![Step::With {
                    expr: w.expression(),
                    plan: RenderPlan::new(inner),
                }];
            }
            steps.extend(inner);
            steps.push(Step::Literal(KString::from_string(format!("</{}>", e.tag_name))));
        }
        match condition {
            Some(condition) => self.steps.push(Step::If {
                condition,
                plan: RenderPlan::new(steps),
            }),
            None => self.extend(steps),
        }
        Ok(Walk::Continue)
    }
}

/// Fixed classes come from the `class` attribute, minus those the
/// binding sets.
fn class_step(binding: &Binding, attr: &mut Vec<(KString, KString)>)
              -> Result<Step, CompileError>
{
    let literal = take_attribute(attr, "class").unwrap_or_default();
    let mut fixed: Vec<KString> = literal.split_whitespace().unique()
        .map(KString::from_ref).collect();
    let expr = binding.expr.trim();
    let dynamic = if expr.starts_with('{') {
        let entries: Vec<(KString, Expression)> = parse_object_literal(expr)
            .map_err(objlit_error(expr))?
            .into_iter()
            .map(|(names, e)| (names, Expression::parse(&e)))
            .collect();
        fixed.retain(|c| ! entries.iter().any(
            |(names, _)| names.split_whitespace().any(|n| n == c.as_str())));
        ClassBinding::Conditional(entries)
    } else {
        ClassBinding::Expression(Expression::parse(expr))
    };
    Ok(Step::Class { fixed, dynamic })
}

/// Fixed declarations come from the `style` attribute, minus the
/// properties the binding sets.
fn style_step(binding: &Binding, attr: &mut Vec<(KString, KString)>)
              -> Result<Step, CompileError>
{
    let mut fixed = take_attribute(attr, "style")
        .map(|s| parse_declarations(&s))
        .unwrap_or_default();
    let dynamic: Vec<(KString, Expression)> = parse_object_literal(&binding.expr)
        .map_err(objlit_error(&binding.expr))?
        .into_iter()
        .map(|(prop, e)| (css_property_name(&prop), Expression::parse(&e)))
        .collect();
    fixed.retain(|(prop, _)| ! dynamic.iter().any(|(p, _)| p == prop));
    Ok(Step::Style { fixed, dynamic })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::match_blocks;
    use crate::markup::parse_fragment;
    use anyhow::Result;

    fn compile(s: &str) -> Result<RenderPlan> {
        let f = parse_fragment(s)?;
        let config = Config::default();
        let mut warnings = Vec::new();
        let blocks = match_blocks(&f, f.roots(), &config, &mut warnings)?;
        Ok(Compiler::new(&f, &blocks, &config, &mut warnings).compile(f.roots())?)
    }

    #[test]
    fn t_literal_steps_are_joined() -> Result<()> {
        let plan = compile("<div id=\"a\"><p>x</p><br><!-- c --></div>")?;
        assert_eq!(plan.steps(), &[
            Step::Literal("<div id=\"a\"><p>".into()),
            Step::EscapedText("x".into()),
            Step::Literal("</p><br /><!-- c --></div>".into()),
        ]);
        Ok(())
    }

    #[test]
    fn t_if_wraps_element() -> Result<()> {
        let plan = compile("<p data-bind=\"if: a\" class=\"c\">x</p>")?;
        assert_eq!(plan.steps().len(), 1);
        match &plan.steps()[0] {
            Step::If { condition, plan } => {
                assert_eq!(condition.source(), "a");
                assert_eq!(plan.steps(), &[
                    Step::Literal("<p".into()),
                    Step::Attributes(" class=\"c\"".into()),
                    Step::Literal(">".into()),
                    Step::EscapedText("x".into()),
                    Step::Literal("</p>".into()),
                ]);
            }
            s => panic!("unexpected step {s:?}")
        }
        Ok(())
    }

    #[test]
    fn t_block_body_is_skipped() -> Result<()> {
        let plan = compile("a<!-- ko ifnot: b -->c<!-- /ko -->d")?;
        assert_eq!(plan.steps().len(), 3);
        match &plan.steps()[1] {
            Step::If { condition, plan } => {
                assert_eq!(condition.source(), "!(b)");
                assert_eq!(plan.steps(), &[Step::EscapedText("c".into())]);
            }
            s => panic!("unexpected step {s:?}")
        }
        assert_eq!(plan.steps()[2], Step::EscapedText("d".into()));
        Ok(())
    }

    #[test]
    fn t_class_and_style_steps() -> Result<()> {
        let plan = compile("<i data-bind=\"css: {b: x}, style: {fontSize: s}\" \
                            class=\"a b a\" style=\"color: red; font-size: 1px\"></i>")?;
        assert_eq!(plan.steps()[1], Step::Class {
            fixed: vec!["a".into()],
            dynamic: ClassBinding::Conditional(vec![("b".into(), Expression::parse("x"))]),
        });
        assert_eq!(plan.steps()[2], Step::Style {
            fixed: vec![("color".into(), "red".into())],
            dynamic: vec![("font-size".into(), Expression::parse("s"))],
        });
        Ok(())
    }
}
