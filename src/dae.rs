//! One constraint-respecting step attempt.
//!
//! The ODE step comes from the method's [`OdeStepper`]; this module decides
//! whether the result is worth projecting onto the constraint manifold and
//! does so. It is shared by every method.

use tracing::debug;

use crate::error::{IntegratorError, StepFault};
use crate::method::{OdeStep, OdeStepper, TrialStep};
use crate::norm::{constraint_violation_norm, error_norm};
use crate::projection::ConstraintProjector;
use crate::state::IntegratorState;
use crate::system::DynamicSystem;

/// Accuracy settings for a step attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaeSettings {
    pub accuracy: f64,
    pub constraint_tolerance: f64,
    pub project_every_step: bool,
}

/// Largest constraint violation the projector is trusted to correct:
/// `max(2 * tol, sqrt(tol))`.
pub fn projection_limit(constraint_tolerance: f64) -> f64 {
    (2. * constraint_tolerance).max(constraint_tolerance.sqrt())
}

/// Attempts a step from `state.previous` to `t1`, leaving the trial point in
/// `state.advanced` and its error estimate in `state.y_err_est`.
///
/// A converged result means the error estimate is meaningful, not that the
/// step meets the accuracy requirement. On convergence `state.advanced.ydot`
/// holds the derivative at the trial point, unless the error estimate is so
/// large that the step will certainly be rejected.
///
/// # Errors
///
/// Only a stepper reporting [`StepFault::Unimplemented`] is an error; every
/// other fault is reported as a non-converged step.
pub fn attempt_dae_step<S, M, P>(
    system: &mut S,
    stepper: &mut M,
    projector: &mut P,
    state: &mut IntegratorState,
    t1: f64,
    settings: &DaeSettings,
) -> Result<OdeStep, IntegratorError>
where
    S: DynamicSystem + ?Sized,
    M: OdeStepper<S>,
    P: ConstraintProjector<S>,
{
    let IntegratorState {
        previous,
        advanced,
        y_err_est,
        ..
    } = state;
    advanced.t = t1;

    let trial = TrialStep {
        t0: previous.t,
        t1,
        y0: previous.y.view(),
        ydot0: previous.ydot.view(),
        y1: advanced.y.view_mut(),
        y_err_est: y_err_est.view_mut(),
    };
    let ode = match stepper.attempt_ode_step(system, trial) {
        Ok(ode) => ode,
        Err(StepFault::Unimplemented(hook)) => {
            return Err(IntegratorError::UnimplementedMethod {
                method: stepper.descriptor().name(),
                hook,
            });
        }
        Err(fault) => {
            debug!(t0 = previous.t, t1, %fault, "ODE step faulted");
            return Ok(OdeStep::diverged(1));
        }
    };
    if !ode.converged {
        return Ok(ode);
    }

    // Don't bother projecting a step that would fail even at half the size.
    if stepper.descriptor().has_error_control() {
        let err = error_norm(&*system, advanced.y.view(), y_err_est.view());
        if err > 2f64.powi(ode.error_order as i32) * settings.accuracy {
            return Ok(ode);
        }
    }

    let tol = settings.constraint_tolerance;
    let violation = constraint_violation_norm(&*system, t1, advanced.y.view());
    if violation > projection_limit(tol) {
        debug!(t1, violation, "constraint violation too large to project");
        return Ok(OdeStep::diverged(ode.iterations));
    }

    if settings.project_every_step || violation > tol {
        if let Err(failure) =
            projector.project(&*system, t1, advanced.y.view_mut(), y_err_est.view_mut(), tol)
        {
            debug!(%failure, "projection failed");
            return Ok(OdeStep::diverged(ode.iterations));
        }
    }

    if let Err(err) = system.derivatives(t1, advanced.y.view(), advanced.ydot.view_mut()) {
        debug!(%err, "derivative evaluation failed at trial point");
        return Ok(OdeStep::diverged(ode.iterations));
    }
    Ok(ode)
}
