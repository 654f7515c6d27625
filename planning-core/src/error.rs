use thiserror::Error;

/// Planner core error.
///
/// Infeasibility is deliberately NOT represented here: an unsatisfiable
/// constraint program is a regular outcome (`PlanOutcome::Failed`), while
/// these variants cover broken inputs, store failures, and compiler bugs.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Assignment store error: {0}")]
    Store(String),

    #[error("Internal invariant violation: {0}")]
    Internal(String),
}
