use mendgraph_model::DocumentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fixer `{fixer}` reads decisions of `{dependency}`, which runs after it")]
    OrderViolation {
        fixer: &'static str,
        dependency: &'static str,
    },

    #[error("fixer `{fixer}` reads decisions of `{dependency}`, which is not in the pipeline")]
    MissingDependency {
        fixer: &'static str,
        dependency: &'static str,
    },

    #[error("fixer `{0}` appears more than once")]
    DuplicateFixer(&'static str),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
