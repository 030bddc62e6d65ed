//! Error test and step-size selection.

use ndarray::prelude::*;

use crate::config::IntegratorConfig;
use crate::error::SystemError;
use crate::norm::weighted_rms_norm;
use crate::system::DynamicSystem;

/// Result of the error test on a converged step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDecision {
    /// Whether the step meets the requested accuracy.
    pub accept: bool,
    /// Step size to try next.
    pub next_step_size: f64,
}

/// Turns error estimates into accept/reject decisions and new step sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeAdapter {
    pub accuracy: f64,
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    pub max_step_size: f64,
}

impl StepSizeAdapter {
    pub fn new(config: &IntegratorConfig) -> Self {
        StepSizeAdapter {
            accuracy: config.accuracy,
            safety: config.safety,
            min_factor: config.min_factor,
            max_factor: config.max_factor,
            max_step_size: config.max_step_size,
        }
    }

    /// Decides whether a step with weighted error norm `error_norm` is
    /// accepted, and picks the next step size.
    ///
    /// * `current`: step size that was proposed for the step.
    /// * `attempted`: step size actually used, smaller than `current` when the
    ///   step was clipped to a boundary.
    /// * `error_order`: the error estimate behaves like `h^(error_order + 1)`.
    /// * `was_limited`: the step was clipped. The same boundary is likely to
    ///   cut the next step short too, so an accepted step never grows.
    ///
    /// Accepted steps never shrink. Rejected steps shrink from `attempted`.
    pub fn adjust_step_size(
        &self,
        current: f64,
        attempted: f64,
        error_norm: f64,
        error_order: usize,
        was_limited: bool,
    ) -> StepDecision {
        let accept = error_norm <= self.accuracy;
        let factor = if error_norm == 0. {
            self.max_factor
        } else {
            self.safety * (self.accuracy / error_norm).powf(1. / (error_order as f64 + 1.))
        };
        let next = if accept {
            if was_limited {
                current
            } else {
                current * self.max_factor.min(factor.max(1.))
            }
        } else {
            attempted * factor.max(self.min_factor).min(1.)
        };
        StepDecision {
            accept,
            next_step_size: next.min(self.max_step_size),
        }
    }
}

/// Empirically select a good initial step.
///
/// The algorithm is described in (ref 1). The system's error weights divided
/// by `accuracy` play the role of the usual `1 / (atol + rtol * |y|)` scale.
///
/// # Parameters
///
/// * system: The system being integrated.
/// * t0: Initial value of the independent variable.
/// * y0: Initial value of the dependent variable.
/// * f0: Initial value of the derivative.
/// * order: Error order of the method.
/// * accuracy: Requested accuracy.
///
/// # Returns
///
/// Suggested initial step, or `INFINITY` for an empty state.
///
/// # References
///
/// 1. E. Hairer, S. P. Norsett G. Wanner, "Solving Ordinary Differential
///    Equations I: Nonstiff Problems", Sec. II.4.
pub fn select_initial_step<S>(
    system: &mut S,
    t0: f64,
    y0: ArrayView1<'_, f64>,
    f0: ArrayView1<'_, f64>,
    order: usize,
    accuracy: f64,
) -> Result<f64, SystemError>
where
    S: DynamicSystem + ?Sized,
{
    if y0.is_empty() {
        return Ok(std::f64::INFINITY);
    }

    let mut weights = Array1::zeros(y0.len());
    system.error_weights(y0, weights.view_mut());
    weights.mapv_inplace(|w| w / accuracy);

    let d0 = weighted_rms_norm(y0, weights.view());
    let d1 = weighted_rms_norm(f0, weights.view());
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    let y1 = h0 * &f0 + &y0;
    let mut f1 = Array1::zeros(y0.len());
    system.derivatives(t0 + h0, y1.view(), f1.view_mut())?;
    let d2 = weighted_rms_norm((&f1 - &f0).view(), weights.view()) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1. / (order as f64 + 1.))
    };

    Ok((100. * h0).min(h1))
}
