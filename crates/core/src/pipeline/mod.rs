pub mod batch;
pub mod context;
pub mod evaluator;
pub mod options;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchReport, BatchRunner, TickerOutcome};
pub use evaluator::{Evaluation, Evaluator, EvaluatorDeps};
pub use options::EvaluationOptions;
