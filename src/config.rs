//! Integrator settings.

use thiserror::Error;

/// Settings for an [`Integrator`](crate::Integrator).
///
/// All fields are public; start from `IntegratorConfig::default()` and
/// override what you need. The settings are checked by
/// [`validate`](IntegratorConfig::validate) when the integrator is created.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorConfig {
    /// Requested accuracy. A step is accepted when the weighted RMS norm of
    /// its error estimate does not exceed this value.
    pub accuracy: f64,
    /// Weighted RMS constraint violation considered satisfied.
    pub constraint_tolerance: f64,
    /// Size of the first step, or `None` to pick one heuristically.
    pub initial_step_size: Option<f64>,
    /// Smallest allowed step size, or `None` for about ten ulps of the current
    /// time.
    pub min_step_size: Option<f64>,
    /// Largest allowed step size. May be `INFINITY`.
    pub max_step_size: f64,
    /// Time at which the simulation ends, or `None` for no end.
    pub final_time: Option<f64>,
    /// Project onto the constraint manifold after every step, even when the
    /// constraints are already satisfied.
    pub project_every_step: bool,
    /// Step past report times and answer them by interpolation instead of
    /// stopping exactly on them.
    pub allow_interpolation: bool,
    /// Consecutive convergence failures tolerated within one step. An
    /// error-test rejection in between starts the count again.
    pub max_convergence_failures: usize,
    /// Multiply steps computed from asymptotic behaviour of errors by this.
    pub safety: f64,
    /// Minimum allowed decrease in a step size.
    pub min_factor: f64,
    /// Maximum allowed increase in a step size.
    pub max_factor: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig {
            accuracy: 1e-3,
            constraint_tolerance: 1e-3,
            initial_step_size: None,
            min_step_size: None,
            max_step_size: std::f64::INFINITY,
            final_time: None,
            project_every_step: false,
            allow_interpolation: false,
            max_convergence_failures: 20,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("accuracy must be positive and finite, got {0}")]
    AccuracyNotPositive(f64),
    #[error("constraint tolerance must be positive and finite, got {0}")]
    ConstraintToleranceNotPositive(f64),
    #[error("{name} must be positive, got {value}")]
    StepSizeNotPositive { name: &'static str, value: f64 },
    #[error("min step size {min} exceeds max step size {max}")]
    StepBoundsInverted { min: f64, max: f64 },
    #[error("final time is not finite")]
    FinalTimeNotFinite,
    #[error("step size factors must satisfy 0 < min_factor < 1 < max_factor and 0 < safety <= 1")]
    BadFactors,
    #[error("max_convergence_failures must be at least 1")]
    NoConvergenceRetries,
}

impl IntegratorConfig {
    /// Checks that the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.accuracy > 0. && self.accuracy.is_finite()) {
            return Err(ConfigError::AccuracyNotPositive(self.accuracy));
        }
        if !(self.constraint_tolerance > 0. && self.constraint_tolerance.is_finite()) {
            return Err(ConfigError::ConstraintToleranceNotPositive(
                self.constraint_tolerance,
            ));
        }
        if !(self.max_step_size > 0.) {
            return Err(ConfigError::StepSizeNotPositive {
                name: "max_step_size",
                value: self.max_step_size,
            });
        }
        if let Some(h) = self.initial_step_size {
            if !(h > 0. && h.is_finite()) {
                return Err(ConfigError::StepSizeNotPositive {
                    name: "initial_step_size",
                    value: h,
                });
            }
        }
        if let Some(min) = self.min_step_size {
            if !(min > 0.) {
                return Err(ConfigError::StepSizeNotPositive {
                    name: "min_step_size",
                    value: min,
                });
            }
            if min > self.max_step_size {
                return Err(ConfigError::StepBoundsInverted {
                    min,
                    max: self.max_step_size,
                });
            }
        }
        if matches!(self.final_time, Some(t) if !t.is_finite()) {
            return Err(ConfigError::FinalTimeNotFinite);
        }
        if !(self.min_factor > 0.
            && self.min_factor < 1.
            && self.max_factor > 1.
            && self.safety > 0.
            && self.safety <= 1.)
        {
            return Err(ConfigError::BadFactors);
        }
        if self.max_convergence_failures == 0 {
            return Err(ConfigError::NoConvergenceRetries);
        }
        Ok(())
    }

    /// Final time, or `INFINITY` when the simulation has no end.
    pub fn end_time(&self) -> f64 {
        self.final_time.unwrap_or(std::f64::INFINITY)
    }
}
