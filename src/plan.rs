//! Compiled templates: a list of steps, each contributing a piece of
//! the output when run against a `Context`.

use chj_util::warn;
use kstring::KString;

use crate::config::Config;
use crate::context::Context;
use crate::expr::{Evaluator, Expression};
use crate::render;
use crate::value::Value;


#[derive(Debug, Clone, PartialEq)]
pub enum ClassBinding {
    /// `css: {name: cond, ...}`; a name may hold several classes
    /// separated by spaces.
    Conditional(Vec<(KString, Expression)>),
    /// `css: expr`, giving the class name(s).
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Markup fixed at compile time: tags, comments, declarations.
    Literal(KString),
    /// A text node, escaped at compile time.
    EscapedText(KString),
    /// The literal attributes of an element, serialized.
    Attributes(KString),
    /// `script` and `style` elements, serialized.
    Raw(KString),
    /// One entry of an `attr` binding.
    Attr { name: KString, expr: Expression },
    Class { fixed: Vec<KString>, dynamic: ClassBinding },
    Style { fixed: Vec<(KString, KString)>, dynamic: Vec<(KString, Expression)> },
    If { condition: Expression, plan: RenderPlan },
    Foreach { items: Expression, alias: Option<KString>, plan: RenderPlan },
    With { expr: Expression, plan: RenderPlan },
    Text(Expression),
    Html(Expression),
}


/// What a render needs besides the plan and the scope.
#[derive(Clone, Copy)]
pub struct Runtime<'r> {
    pub evaluator: &'r dyn Evaluator,
    pub config: &'r Config,
}

impl<'r> Runtime<'r> {
    /// Failing expressions give `undefined`, so that the binding
    /// renders as if its value were empty or false.
    pub fn eval(&self, expr: &Expression, scope: &Context) -> Value {
        match self.evaluator.evaluate(expr, scope) {
            Ok(v) => v,
            Err(e) => {
                if self.config.warn_eval_errors {
                    warn!("evaluating {:?}: {e}", expr.source());
                }
                Value::Undefined
            }
        }
    }
}


#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPlan {
    steps: Vec<Step>,
}

impl RenderPlan {
    pub fn new(steps: Vec<Step>) -> Self {
        RenderPlan { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn execute(&self, rt: &Runtime, scope: &Context, out: &mut String) {
        for step in &self.steps {
            step.execute(rt, scope, out);
        }
    }

    pub fn render(&self, rt: &Runtime, scope: &Context) -> String {
        let mut out = String::new();
        self.execute(rt, scope, &mut out);
        out
    }
}

impl Step {
    pub fn execute(&self, rt: &Runtime, scope: &Context, out: &mut String) {
        match self {
            Step::Literal(s) | Step::EscapedText(s) | Step::Attributes(s) | Step::Raw(s) =>
                out.push_str(s),
            Step::Attr { name, expr } => render::attr(rt, scope, name, expr, out),
            Step::Class { fixed, dynamic } => render::class(rt, scope, fixed, dynamic, out),
            Step::Style { fixed, dynamic } => render::style(rt, scope, fixed, dynamic, out),
            Step::If { condition, plan } => render::if_(rt, scope, condition, plan, out),
            Step::Foreach { items, alias, plan } =>
                render::foreach(rt, scope, items, alias.as_ref(), plan, out),
            Step::With { expr, plan } => render::with(rt, scope, expr, plan, out),
            Step::Text(expr) => render::text(rt, scope, expr, out),
            Step::Html(expr) => render::html(rt, scope, expr, out),
        }
    }
}
