//! Error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Failure reported by a [`DynamicSystem`](crate::DynamicSystem) evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("system evaluation failed at t = {t}: {message}")]
pub struct SystemError {
    pub t: f64,
    pub message: String,
}

impl SystemError {
    pub fn new(t: f64, message: impl Into<String>) -> Self {
        SystemError {
            t,
            message: message.into(),
        }
    }
}

/// Fault raised by an ODE step evaluator while attempting a step.
///
/// Everything except [`StepFault::Unimplemented`] is downgraded to a
/// convergence failure by the DAE step wrapper.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepFault {
    #[error(transparent)]
    System(#[from] SystemError),
    #[error("non-finite value produced at t = {0}")]
    NonFinite(f64),
    #[error("{0}")]
    Other(String),
    /// The method does not provide the named step hook.
    #[error("method does not implement `{0}`")]
    Unimplemented(&'static str),
}

/// The projector's internal solve did not converge.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("constraint projection failed at t = {t}: residual {residual} after {iterations} iterations")]
pub struct ProjectionFailure {
    pub t: f64,
    pub residual: f64,
    pub iterations: usize,
}

/// Fatal failures reported to the caller of the integrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("expected {expected} state variables, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("requested time {requested} is before the current time {current}")]
    TimeInPast { requested: f64, current: f64 },
    #[error("{0} is NaN")]
    NanTime(&'static str),
    #[error("step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),
    #[error("required step size {required} is smaller than min allowable step size {allowable} at t = {t}")]
    StepSizeTooSmall {
        t: f64,
        required: f64,
        allowable: f64,
    },
    #[error("step from t = {t} failed to converge {failures} times in a row")]
    ConvergenceFailure { t: f64, failures: usize },
    #[error("method `{method}` does not implement `{hook}`")]
    UnimplementedMethod {
        method: &'static str,
        hook: &'static str,
    },
    #[error("interpolation time {t} outside of last step [{previous}, {advanced}]")]
    InterpolationOutOfRange {
        t: f64,
        previous: f64,
        advanced: f64,
    },
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Projection(#[from] ProjectionFailure),
}
