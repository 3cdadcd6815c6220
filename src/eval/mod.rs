/*!
 * Evaluation Module
 * Values and the expression evaluator used by PRINT, conditions and tracepoints
 */

mod evaluator;
pub mod parser;
mod value;

pub use evaluator::{ExpressionEvaluator, SimpleEvaluator};
pub use parser::{parse, Expr};
pub use value::Value;
