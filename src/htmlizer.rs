use std::sync::Arc;

use ahtml::{Fragment, NodeId};
use lazy_static::lazy_static;

use crate::blocks::match_blocks;
use crate::compiler::Compiler;
use crate::config::Config;
use crate::context::Context;
use crate::error::{CompileError, Warning};
use crate::expr::{Evaluator, ExprEvaluator};
use crate::markup::parse_fragment;
use crate::plan::{RenderPlan, Runtime};
use crate::value::Value;


lazy_static! {
    static ref DEFAULT_EVALUATOR: Arc<dyn Evaluator> = Arc::new(ExprEvaluator);
}

/// A compiled template. Compile once, then `render` any number of
/// times, from any number of threads.
pub struct Htmlizer {
    plan: RenderPlan,
    config: Config,
    evaluator: Arc<dyn Evaluator>,
    warnings: Vec<Warning>,
}

impl Htmlizer {
    pub fn new(markup: &str, config: Config) -> Result<Htmlizer, CompileError> {
        let fragment = parse_fragment(markup)?;
        Htmlizer::from_fragment(&fragment, config)
    }

    pub fn from_fragment(fragment: &Fragment, config: Config) -> Result<Htmlizer, CompileError> {
        Htmlizer::from_nodes(fragment, fragment.roots(), config)
    }

    /// Compile just `nodes` (and their descendants) out of `fragment`.
    pub fn from_nodes(fragment: &Fragment, nodes: &[NodeId], config: Config)
                      -> Result<Htmlizer, CompileError>
    {
        let mut warnings = Vec::new();
        let blocks = match_blocks(fragment, nodes, &config, &mut warnings)?;
        let plan = Compiler::new(fragment, &blocks, &config, &mut warnings).compile(nodes)?;
        Ok(Htmlizer {
            plan,
            config,
            evaluator: DEFAULT_EVALUATOR.clone(),
            warnings,
        })
    }

    /// Replace the expression language.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    fn runtime(&self) -> Runtime<'_> {
        Runtime { evaluator: &*self.evaluator, config: &self.config }
    }

    pub fn render(&self, data: &Value) -> String {
        self.plan.render(&self.runtime(), &Context::root(data.clone()))
    }

    /// Render with `data` as `$data`, taking the other context names
    /// and aliases from `context`.
    pub fn render_with(&self, data: &Value, context: &Context) -> String {
        self.plan.render(&self.runtime(), &context.rescoped(data.clone()))
    }

    pub fn render_json(&self, data: &serde_json::Value) -> String {
        self.render(&Value::from(data))
    }

    /// Problems found while compiling, in the order they were found.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::expr::{EvalError, Expression};
    use anyhow::Result;
    use serde_json::json;

    fn render(template: &str, data: serde_json::Value) -> Result<String> {
        Ok(Htmlizer::new(template, Config::default())?.render_json(&data))
    }

    #[test]
    fn t_literal_roundtrip() -> Result<()> {
        let template = "<!DOCTYPE html><html><head><title>T</title>\
                        <script>if (a < b && c) {}</script></head>\
                        <body class=\"x y\"><p id=\"p1\">Hi &amp; bye<!-- note --></p>\
                        </body></html>";
        let h = Htmlizer::new(template, Config::default())?;
        assert_eq!(h.render_json(&json!(null)), template);
        assert_eq!(h.render_json(&json!({"anything": [1, 2]})), template);
        assert_eq!(render("<p>1 < 2 > 0</p>", json!(null))?, "<p>1 &lt; 2 &gt; 0</p>");
        Ok(())
    }

    #[test]
    fn t_idempotence() -> Result<()> {
        let h = Htmlizer::new("<ul data-bind=\"foreach: xs\"><li data-bind=\"text: $data\"></li>\
                               </ul>", Config::default())?;
        let plan_before = h.plan().clone();
        let a = json!({"xs": [1, 2]});
        let b = json!({"xs": ["z"]});
        let first = h.render_json(&a);
        assert_eq!(first, "<ul><li>1</li><li>2</li></ul>");
        assert_eq!(h.render_json(&a), first);
        assert_eq!(h.render_json(&b), "<ul><li>z</li></ul>");
        assert_eq!(h.render_json(&a), first);
        assert_eq!(h.plan(), &plan_before);
        Ok(())
    }

    #[test]
    fn t_nesting() -> Result<()> {
        let balanced = "<!-- ko if: a --><!-- ko foreach: b --><i></i><!-- /ko -->\
                        <p><!-- ko with: c --><!-- /ko --></p><!-- /ko -->";
        Htmlizer::new(balanced, Config::default())?;
        let e = Htmlizer::new("<!-- ko if: a --><!-- ko foreach: b --><i></i><!-- /ko -->",
                              Config::default()).err().unwrap();
        assert!(matches!(e.kind(), CompileErrorKind::UnclosedBlock { start }
                         if start == "ko if: a"));
        Ok(())
    }

    #[test]
    fn t_conflicting_bindings() {
        let e = Htmlizer::new("<div data-bind=\"if: a, text: b\"></div>", Config::default())
            .err().unwrap();
        assert!(matches!(e.kind(), CompileErrorKind::ConflictingBindings("if", "text")));
        assert_eq!(e.to_string(),
                   "multiple bindings (if and text) are trying to control descendant \
                    bindings of the same element; you cannot use these bindings together \
                    on the same element");
    }

    #[test]
    fn t_error_messages() {
        let message = |t: &str| match Htmlizer::new(t, Config::default()) {
            Ok(_) => String::new(),
            Err(e) => e.to_string(),
        };
        assert_eq!(message("<!-- ko if: a -->x"),
                   "cannot find closing comment tag to match: \"ko if: a\"");
        assert_eq!(message("<!-- ko if: a --><div><!-- /ko --></div>"),
                   "closing comment tag for \"ko if: a\" is not under the same parent");
        assert_eq!(message("<p data-bind=\"text name\"></p>"),
                   "invalid binding \"text name\": missing ':' in \"text name\"");
        assert_eq!(message("<p data-bind=\"text: a, : b\"></p>"),
                   "invalid binding \"text: a, : b\": empty key in \": b\"");
    }

    #[test]
    fn t_text() -> Result<()> {
        let t = "<div data-bind=\"text: name\"></div>";
        assert_eq!(render(t, json!({"name": "A&B"}))?, "<div>A&B</div>");
        assert_eq!(render(t, json!({"name": "<script>"}))?, "<div>&lt;script&gt;</div>");
        assert_eq!(render(t, json!({"name": 0}))?, "<div>0</div>");
        assert_eq!(render(t, json!({"name": null}))?, "<div></div>");
        assert_eq!(render(t, json!({"name": 1e21}))?, "<div>1e+21</div>");
        // children are replaced
        assert_eq!(render("<p data-bind=\"text: n\">old <b>stuff</b></p>", json!({"n": 1}))?,
                   "<p>1</p>");
        assert_eq!(render("a<!-- ko text: n -->old<!-- /ko -->b", json!({"n": "x"}))?, "axb");
        Ok(())
    }

    #[test]
    fn t_foreach() -> Result<()> {
        assert_eq!(render("<!--ko foreach: items--><span data-bind=\"text: $data\"></span>\
                           <!--/ko-->", json!({"items": ["x", "y"]}))?,
                   "<span>x</span><span>y</span>");
        assert_eq!(render("<ul data-bind=\"foreach: {data: items, as: 'item'}\">\
                           <li data-bind=\"text: $index + ':' + item\"></li></ul>",
                          json!({"items": ["x", "y"]}))?,
                   "<ul><li>0:x</li><li>1:y</li></ul>");
        assert_eq!(render("<ul data-bind=\"foreach: items\"><li>.</li></ul>",
                          json!({"items": {"not": "an array"}}))?,
                   "<ul></ul>");
        Ok(())
    }

    #[test]
    fn t_if() -> Result<()> {
        let t = "<div data-bind=\"if: show\">Y</div>";
        assert_eq!(render(t, json!({"show": false}))?, "");
        assert_eq!(render(t, json!({"show": true}))?, "<div>Y</div>");
        let t = "<div data-bind=\"ifnot: show\">N</div>";
        assert_eq!(render(t, json!({"show": false}))?, "<div>N</div>");
        assert_eq!(render(t, json!({"show": 1}))?, "");
        let t = "[<!-- ko ifnot: a.length -->empty<!-- /ko -->]";
        assert_eq!(render(t, json!({"a": []}))?, "[empty]");
        assert_eq!(render(t, json!({"a": [1]}))?, "[]");
        Ok(())
    }

    #[test]
    fn t_css() -> Result<()> {
        let t = "<div data-bind=\"css: {active: isActive}\" class=\"box\"></div>";
        assert_eq!(render(t, json!({"isActive": true}))?, "<div class=\"box active\"></div>");
        assert_eq!(render(t, json!({"isActive": false}))?, "<div class=\"box\"></div>");
        let t = "<input data-bind=\"css: cls\" class=\"a\" type=\"text\">";
        assert_eq!(render(t, json!({"cls": "b c"}))?,
                   "<input class=\"a b c\" type=\"text\" />");
        Ok(())
    }

    #[test]
    fn t_style_and_attr() -> Result<()> {
        assert_eq!(render("<p style=\"color: red; font-weight: normal\" \
                           data-bind=\"style: {fontWeight: w}\"></p>",
                          json!({"w": "bold"}))?,
                   "<p style=\"color:red; font-weight:bold;\"></p>");
        let t = "<a href=\"#\" data-bind=\"attr: {href: url, title: t}\" id=\"l\">x</a>";
        assert_eq!(render(t, json!({"url": "/u?a=\"1\"", "t": null}))?,
                   "<a href=\"/u?a=&quot;1&quot;\" id=\"l\">x</a>");
        assert_eq!(render(t, json!({"url": false, "t": ""}))?,
                   "<a title=\"\" id=\"l\">x</a>");
        Ok(())
    }

    #[test]
    fn t_html() -> Result<()> {
        let t = "<div data-bind=\"html: content\">x</div>";
        assert_eq!(render(t, json!({"content": "<b>bold</b><br>"}))?,
                   "<div><b>bold</b><br/></div>");
        assert_eq!(render(t, json!({"content": ""}))?, "<div></div>");
        Ok(())
    }

    #[test]
    fn t_with_inside_foreach() -> Result<()> {
        let t = "<!-- ko foreach: items --><div data-bind=\"with: detail\">\
                 <span data-bind=\"text: $parent.name\"></span>\
                 <b data-bind=\"text: $root.title\"></b>\
                 <i data-bind=\"text: $parents.length + '/' + x\"></i>\
                 </div><!-- /ko -->";
        let data = json!({"title": "T", "items": [
            {"name": "a", "detail": {"x": 1}},
            {"name": "b", "detail": {"x": 2}}
        ]});
        assert_eq!(render(t, data)?,
                   "<div><span>a</span><b>T</b><i>2/1</i></div>\
                    <div><span>b</span><b>T</b><i>2/2</i></div>");
        let t = "<!-- ko with: a --><!-- ko with: b -->\
                 <!-- ko text: $root.r + $parents[1].r + $parent.n + v --><!-- /ko -->\
                 <!-- /ko --><!-- /ko -->";
        assert_eq!(render(t, json!({"r": "R", "a": {"n": "N", "b": {"v": "V"}}}))?, "RRNV");
        Ok(())
    }

    #[test]
    fn t_no_conflict() -> Result<()> {
        let t = "<p data-bind=\"text: a\" data-htmlizer=\"text: b\"></p>\
                 <!-- ko text: a --><!-- /ko --><!-- hz text: a --><!-- /hz -->";
        let config = Config { no_conflict: true, ..Default::default() };
        let h = Htmlizer::new(t, config)?;
        assert_eq!(h.render_json(&json!({"a": "A", "b": "B"})),
                   "<p data-bind=\"text: a\">B</p><!-- ko text: a --><!-- /ko -->A");
        assert!(h.warnings().is_empty());
        Ok(())
    }

    #[test]
    fn t_warnings() -> Result<()> {
        let h = Htmlizer::new("x<!-- /ko --><p data-bind=\"text: a, text: b\"></p>",
                              Config::default())?;
        assert_eq!(h.warnings(), &[
            Warning::DanglingEnd { marker: "/ko".into() },
            Warning::DuplicateBinding { tag_name: "p".into(), kind: "text" },
        ]);
        assert_eq!(h.render_json(&json!({"a": 1, "b": 2})), "x<p>1</p>");
        Ok(())
    }

    #[test]
    fn t_evaluation_failures_are_not_fatal() -> Result<()> {
        let t = "<p data-bind=\"text: missing.deep\"></p><b data-bind=\"if: nope()\">x</b>\
                 <i data-bind=\"attr: {title: 1 +}\"></i><u data-bind=\"with: gone\">\
                 <!-- ko text: $data --><!-- /ko --></u>";
        let config = Config { warn_eval_errors: true, ..Default::default() };
        let h = Htmlizer::new(t, config)?;
        assert_eq!(h.render_json(&json!({})), "<p></p><i></i><u></u>");
        Ok(())
    }

    #[test]
    fn t_markup_errors() {
        let e = Htmlizer::new("<p>x<!-- y</p>", Config::default()).err().unwrap();
        assert!(matches!(e.kind(), CompileErrorKind::Markup(_)));
        let e = Htmlizer::new("<p data-bind=\"text: f(\"></p>", Config::default())
            .err().unwrap();
        assert!(matches!(e.kind(), CompileErrorKind::ObjectLiteral { .. }));
    }

    #[test]
    fn t_render_with_context() -> Result<()> {
        let h = Htmlizer::new("<p data-bind=\"text: $root.title + who + name\"></p>",
                              Config::default())?;
        let context = Context::root(Value::from(json!({"title": "R"})))
            .with_alias("who", Value::from("W"));
        assert_eq!(h.render_with(&Value::from(json!({"name": "N"})), &context), "<p>RWN</p>");
        Ok(())
    }

    struct Shouting;

    impl Evaluator for Shouting {
        fn evaluate(&self, expr: &Expression, _scope: &Context) -> Result<Value, EvalError> {
            Ok(Value::from(expr.source().to_uppercase()))
        }
    }

    #[test]
    fn t_custom_evaluator() -> Result<()> {
        let h = Htmlizer::new("<p data-bind=\"text: hello\"></p>", Config::default())?
            .with_evaluator(Arc::new(Shouting));
        assert_eq!(h.render(&Value::Null), "<p>HELLO</p>");
        Ok(())
    }

    #[test]
    fn t_concurrent_renders() -> Result<()> {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Htmlizer>();

        let h = Htmlizer::new("<!-- ko foreach: xs --><i data-bind=\"text: $data * 2\"></i>\
                               <!-- /ko -->", Config::default())?;
        let outputs: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|n| {
                let h = &h;
                s.spawn(move || h.render_json(&json!({"xs": [n, n + 1]})))
            }).collect();
            handles.into_iter().map(|t| t.join().unwrap_or_default()).collect()
        });
        for (n, out) in outputs.iter().enumerate() {
            assert_eq!(out, &format!("<i>{}</i><i>{}</i>", 2 * n, 2 * n + 2));
        }
        Ok(())
    }
}
