//! The per-method ODE step hook.

use ndarray::prelude::*;

use crate::error::StepFault;
use crate::system::DynamicSystem;

/// Static description of an integration method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: &'static str,
    min_order: usize,
    max_order: usize,
    has_error_control: bool,
}

impl MethodDescriptor {
    pub const fn new(
        name: &'static str,
        min_order: usize,
        max_order: usize,
        has_error_control: bool,
    ) -> Self {
        MethodDescriptor {
            name,
            min_order,
            max_order,
            has_error_control,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn min_order(&self) -> usize {
        self.min_order
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Whether the method produces error estimates worth controlling.
    /// Methods without error control take every converged step.
    pub fn has_error_control(&self) -> bool {
        self.has_error_control
    }
}

/// A single trial step from `(t0, y0, ydot0)` to `t1`.
///
/// The stepper writes the trial state into `y1` and the estimated absolute
/// error of each element into `y_err_est`.
pub struct TrialStep<'a> {
    pub t0: f64,
    pub t1: f64,
    pub y0: ArrayView1<'a, f64>,
    pub ydot0: ArrayView1<'a, f64>,
    pub y1: ArrayViewMut1<'a, f64>,
    pub y_err_est: ArrayViewMut1<'a, f64>,
}

impl TrialStep<'_> {
    pub fn h(&self) -> f64 {
        self.t1 - self.t0
    }
}

/// Outcome of an ODE step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OdeStep {
    /// Whether the step converged. Explicit methods always converge.
    pub converged: bool,
    /// Exponent relating the error estimate to the step size.
    pub error_order: usize,
    /// Internal iterations used, `1` for non-iterative methods.
    pub iterations: usize,
}

impl OdeStep {
    pub fn converged(error_order: usize, iterations: usize) -> Self {
        OdeStep {
            converged: true,
            error_order,
            iterations,
        }
    }

    pub fn diverged(iterations: usize) -> Self {
        OdeStep {
            converged: false,
            error_order: 0,
            iterations,
        }
    }
}

/// Method-specific ODE step formula.
///
/// Implementations must report divergence through [`OdeStep::converged`].
/// Returned faults are treated as convergence failures, except
/// [`StepFault::Unimplemented`], which aborts the integration.
///
/// The stepper should not evaluate derivatives at the final trial state for
/// the caller's benefit: the state is projected onto the constraint manifold
/// first and the integrator evaluates the derivatives afterwards.
pub trait OdeStepper<S: DynamicSystem + ?Sized> {
    fn descriptor(&self) -> &MethodDescriptor;

    fn attempt_ode_step(&mut self, system: &mut S, trial: TrialStep<'_>)
        -> Result<OdeStep, StepFault>;
}
