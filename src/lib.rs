#[macro_use]
pub mod boxed_error;
pub mod util;
pub mod config;
pub mod value;
pub mod expr;
pub mod context;
pub mod markup;
pub mod objlit;
pub mod css;
pub mod walker;
pub mod error;
pub mod binding;
pub mod blocks;
pub mod plan;
pub mod render;
pub mod compiler;
pub mod htmlizer;

pub use config::Config;
pub use context::Context;
pub use error::{CompileError, CompileErrorKind, Warning};
pub use expr::{EvalError, Evaluator, ExprEvaluator, Expression};
pub use htmlizer::Htmlizer;
pub use plan::RenderPlan;
pub use value::Value;
