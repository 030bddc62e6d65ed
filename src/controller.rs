//! The adaptive step controller.

use ndarray::prelude::*;
use tracing::{debug, trace, warn};

use crate::config::IntegratorConfig;
use crate::dae::{attempt_dae_step, DaeSettings};
use crate::error::IntegratorError;
use crate::interpolate::hermite;
use crate::method::{MethodDescriptor, OdeStepper};
use crate::norm::{constraint_violation_norm, error_norm};
use crate::projection::{ConstraintProjector, Unconstrained};
use crate::state::{IntegratorState, Point, StepSizeState};
use crate::stats::Statistics;
use crate::step_size::{select_initial_step, StepDecision, StepSizeAdapter};
use crate::system::DynamicSystem;
use crate::{DaeIntegrate, StepStatus};

/// Factor applied to the step size after a convergence failure.
const CONVERGENCE_SHRINK: f64 = 0.5;

/// Returns `true` if `a` and `b` are the same time for reporting purposes.
///
/// Finite times closer than ten ulps of their magnitude (or of one, near
/// zero) coincide.
pub fn times_coincide(a: f64, b: f64) -> bool {
    a == b
        || (a.is_finite()
            && b.is_finite()
            && (a - b).abs() <= 10. * std::f64::EPSILON * a.abs().max(b.abs()).max(1.))
}

/// Smallest step size the integrator will try from time `t`.
///
/// About ten ulps of `t` unless the configuration sets a larger minimum.
fn min_step_size(config: &IntegratorConfig, t: f64) -> f64 {
    let ulps = (10. * std::f64::EPSILON * t.abs()).max(std::f64::MIN_POSITIVE);
    config.min_step_size.map_or(ulps, |min| min.max(ulps))
}

/// Adaptive DAE integrator.
///
/// Owns the system, the method's ODE stepper and the constraint projector,
/// and advances the solution one accepted step per call to
/// [`step_to`](Integrator::step_to).
pub struct Integrator<S, M, P = Unconstrained>
where
    S: DynamicSystem,
    M: OdeStepper<S>,
    P: ConstraintProjector<S>,
{
    system: S,
    stepper: M,
    projector: P,
    config: IntegratorConfig,
    adapter: StepSizeAdapter,
    state: IntegratorState,
    step_size: StepSizeState,
    stats: Statistics,
    /// Interpolated state answering the last report, if the report time fell
    /// inside the last step.
    reported: Option<Point>,
    last_status: StepStatus,
}

impl<S, M, P> Integrator<S, M, P>
where
    S: DynamicSystem,
    M: OdeStepper<S>,
    P: ConstraintProjector<S>,
{
    /// Creates an integrator and initializes it at `(t0, y0)`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or if
    /// [`initialize`](Integrator::initialize) fails.
    pub fn new(
        system: S,
        stepper: M,
        projector: P,
        config: IntegratorConfig,
        t0: f64,
        y0: Array1<f64>,
    ) -> Result<Self, IntegratorError> {
        config.validate()?;
        let step_size = StepSizeState::new(stepper.descriptor(), &config, 1.)?;
        let mut integrator = Integrator {
            adapter: StepSizeAdapter::new(&config),
            state: IntegratorState::new(Point::new(t0, Array1::zeros(0))),
            step_size,
            stats: Statistics::default(),
            reported: None,
            last_status: StepStatus::Invalid,
            system,
            stepper,
            projector,
            config,
        };
        integrator.initialize(t0, y0)?;
        Ok(integrator)
    }

    /// Starts a new integration from `(t0, y0)`.
    ///
    /// Projects the initial state onto the constraint manifold if needed,
    /// evaluates its derivative, picks the first step size and resets the
    /// statistics.
    pub fn initialize(&mut self, t0: f64, y0: Array1<f64>) -> Result<(), IntegratorError> {
        let expected = self.system.layout().len();
        if y0.len() != expected {
            return Err(IntegratorError::DimensionMismatch {
                expected,
                found: y0.len(),
            });
        }

        let mut initial = Point::new(t0, y0);
        let tol = self.config.constraint_tolerance;
        if self.config.project_every_step
            || constraint_violation_norm(&self.system, t0, initial.y.view()) > tol
        {
            let mut y_err_est = Array1::zeros(initial.len());
            self.projector.project(
                &self.system,
                t0,
                initial.y.view_mut(),
                y_err_est.view_mut(),
                tol,
            )?;
        }
        self.system
            .derivatives(t0, initial.y.view(), initial.ydot.view_mut())?;

        let h = match self.config.initial_step_size {
            Some(h) => h,
            None => select_initial_step(
                &mut self.system,
                t0,
                initial.y.view(),
                initial.ydot.view(),
                self.stepper.descriptor().max_order(),
                self.config.accuracy,
            )?,
        };
        self.step_size = StepSizeState::new(
            self.stepper.descriptor(),
            &self.config,
            h.min(self.config.max_step_size),
        )?;
        self.state = IntegratorState::new(initial);
        self.stats.reset();
        self.reported = None;
        self.last_status = StepStatus::Invalid;
        Ok(())
    }

    /// Advances toward `report_time`, stopping at `scheduled_event_time` and
    /// at the final time.
    ///
    /// Takes at most one accepted step. If a boundary has already been
    /// reached no step is taken. When both the report time and the event time
    /// are reached, the event is reported.
    ///
    /// # Errors
    ///
    /// Fails if a requested time is NaN or lies in the past, or if no
    /// acceptable step can be found (repeated convergence failures or a step
    /// size below the minimum). The state is left at the last accepted step.
    pub fn step_to(
        &mut self,
        report_time: f64,
        scheduled_event_time: f64,
    ) -> Result<StepStatus, IntegratorError> {
        if report_time.is_nan() {
            return Err(IntegratorError::NanTime("report time"));
        }
        if scheduled_event_time.is_nan() {
            return Err(IntegratorError::NanTime("scheduled event time"));
        }
        let t = self.state.advanced.t;
        let earliest_report = if self.config.allow_interpolation {
            self.state.previous.t
        } else {
            t
        };
        if report_time < earliest_report && !times_coincide(report_time, earliest_report) {
            return Err(IntegratorError::TimeInPast {
                requested: report_time,
                current: t,
            });
        }
        if scheduled_event_time < t && !times_coincide(scheduled_event_time, t) {
            return Err(IntegratorError::TimeInPast {
                requested: scheduled_event_time,
                current: t,
            });
        }
        self.reported = None;

        if let Some(status) = self.boundary_status(report_time, scheduled_event_time)? {
            self.last_status = status;
            return Ok(status);
        }

        let mut t_max = scheduled_event_time.min(self.config.end_time());
        if !self.config.allow_interpolation {
            t_max = t_max.min(report_time);
        }
        self.state.begin_step();
        if let Err(err) = self.take_one_step(t_max) {
            warn!(t, %err, "step failed");
            self.state.discard_trial();
            return Err(err);
        }

        let status = self
            .boundary_status(report_time, scheduled_event_time)?
            .unwrap_or(StepStatus::ReachedStepLimit);
        self.last_status = status;
        Ok(status)
    }

    /// Status for boundaries reached at the advanced time, in priority order.
    fn boundary_status(
        &mut self,
        report_time: f64,
        scheduled_event_time: f64,
    ) -> Result<Option<StepStatus>, IntegratorError> {
        let t = self.state.advanced.t;
        if times_coincide(t, scheduled_event_time) {
            return Ok(Some(StepStatus::ReachedScheduledEvent));
        }
        if report_time <= t || times_coincide(t, report_time) {
            let inside = report_time > self.state.previous.t
                && report_time < t
                && !times_coincide(t, report_time);
            if inside {
                self.reported = Some(self.create_interpolated_state(report_time)?);
            }
            return Ok(Some(StepStatus::ReachedReportTime));
        }
        let end = self.config.end_time();
        if t >= end || times_coincide(t, end) {
            return Ok(Some(StepStatus::EndOfSimulation));
        }
        Ok(None)
    }

    /// Takes one accepted step from `state.previous`, not past `t_max`.
    fn take_one_step(&mut self, t_max: f64) -> Result<(), IntegratorError> {
        let t0 = self.state.previous.t;
        let min_step = min_step_size(&self.config, t0);
        let settings = DaeSettings {
            accuracy: self.config.accuracy,
            constraint_tolerance: self.config.constraint_tolerance,
            project_every_step: self.config.project_every_step,
        };
        let mut convergence_failures = 0;

        loop {
            let current = self.step_size.current();
            // Land exactly on `t_max` rather than overshooting it or stopping
            // a few ulps short of it.
            let limited = t_max - t0 < current || times_coincide(t0 + current, t_max);
            let t1 = if limited { t_max } else { t0 + current };
            if !t1.is_finite() {
                return Err(IntegratorError::InvalidStepSize(current));
            }
            let h = t1 - t0;
            self.state.step_was_limited = limited;

            let ode = attempt_dae_step(
                &mut self.system,
                &mut self.stepper,
                &mut self.projector,
                &mut self.state,
                t1,
                &settings,
            )?;

            if !ode.converged {
                self.stats.record_convergence_failure(ode.iterations);
                convergence_failures += 1;
                if convergence_failures >= self.config.max_convergence_failures {
                    return Err(IntegratorError::ConvergenceFailure {
                        t: t0,
                        failures: convergence_failures,
                    });
                }
                let next = h * CONVERGENCE_SHRINK;
                if next < min_step {
                    return Err(IntegratorError::StepSizeTooSmall {
                        t: t0,
                        required: next,
                        allowable: min_step,
                    });
                }
                debug!(t0, h, "step did not converge, shrinking");
                self.step_size.propose(next)?;
                continue;
            }

            self.stats.record_attempt(ode.iterations);
            let decision = if self.stepper.descriptor().has_error_control() {
                let err = error_norm(
                    &self.system,
                    self.state.advanced.y.view(),
                    self.state.y_err_est.view(),
                );
                self.adapter
                    .adjust_step_size(current, h, err, ode.error_order, limited)
            } else {
                StepDecision {
                    accept: true,
                    next_step_size: current,
                }
            };

            if !decision.accept {
                self.stats.record_error_test_failure();
                convergence_failures = 0;
                if decision.next_step_size < min_step {
                    return Err(IntegratorError::StepSizeTooSmall {
                        t: t0,
                        required: decision.next_step_size,
                        allowable: min_step,
                    });
                }
                debug!(t0, h, next = decision.next_step_size, "error test failed");
                self.step_size.propose(decision.next_step_size)?;
                continue;
            }

            self.stats.record_step_taken();
            self.step_size.record_taken(h);
            self.step_size.propose(decision.next_step_size.max(min_step))?;
            trace!(t0, t1, next = self.step_size.current(), "step accepted");
            return Ok(());
        }
    }

    fn check_in_last_step(&self, t: f64) -> Result<(), IntegratorError> {
        let previous = self.state.previous.t;
        let advanced = self.state.advanced.t;
        if !(t >= previous && t <= advanced) {
            return Err(IntegratorError::InterpolationOutOfRange {
                t,
                previous,
                advanced,
            });
        }
        Ok(())
    }

    /// Returns the state at `t` inside the last step, interpolated from the
    /// values and derivatives at both ends of the step.
    pub fn create_interpolated_state(&self, t: f64) -> Result<Point, IntegratorError> {
        self.check_in_last_step(t)?;
        Ok(hermite(&self.state.previous, &self.state.advanced, t))
    }

    /// Shortens the last step so that it ends at `t`, replacing the advanced
    /// state with the interpolated one.
    ///
    /// Used after an event has been localized to an interval ending before the
    /// advanced time. The interpolated state is projected if it violates the
    /// constraints and its derivative is re-evaluated.
    pub fn back_up_advanced_state_by_interpolation(
        &mut self,
        t: f64,
    ) -> Result<(), IntegratorError> {
        let mut point = self.create_interpolated_state(t)?;
        let tol = self.config.constraint_tolerance;
        if constraint_violation_norm(&self.system, t, point.y.view()) > tol {
            let mut y_err_est = Array1::zeros(point.len());
            self.projector
                .project(&self.system, t, point.y.view_mut(), y_err_est.view_mut(), tol)?;
        }
        self.system
            .derivatives(t, point.y.view(), point.ydot.view_mut())?;

        self.state.advanced = point;
        self.step_size
            .shorten_last_taken(t - self.state.previous.t);
        self.reported = None;
        Ok(())
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn projector(&self) -> &P {
        &self.projector
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    pub fn integrator_state(&self) -> &IntegratorState {
        &self.state
    }

    pub fn step_size_state(&self) -> &StepSizeState {
        &self.step_size
    }

    /// Start of the last step.
    pub fn previous(&self) -> &Point {
        &self.state.previous
    }

    /// End of the last step; the current solution.
    pub fn advanced(&self) -> &Point {
        &self.state.advanced
    }

    /// Interpolated state for the last `ReachedReportTime`, if the report
    /// time fell strictly inside the last step.
    pub fn reported_state(&self) -> Option<&Point> {
        self.reported.as_ref()
    }

    /// Status returned by the last successful `step_to`, or `Invalid`.
    pub fn last_status(&self) -> StepStatus {
        self.last_status
    }

    pub fn actual_initial_step_size_taken(&self) -> Option<f64> {
        self.step_size.initial_taken()
    }

    pub fn previous_step_size_taken(&self) -> Option<f64> {
        self.step_size.last_taken()
    }

    pub fn predicted_next_step_size(&self) -> f64 {
        self.step_size.current()
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    pub fn method(&self) -> &MethodDescriptor {
        self.stepper.descriptor()
    }
}

impl<S, M, P> DaeIntegrate for Integrator<S, M, P>
where
    S: DynamicSystem,
    M: OdeStepper<S>,
    P: ConstraintProjector<S>,
{
    fn len(&self) -> usize {
        self.state.len()
    }

    fn step_to(
        &mut self,
        report_time: f64,
        scheduled_event_time: f64,
    ) -> Result<StepStatus, IntegratorError> {
        Integrator::step_to(self, report_time, scheduled_event_time)
    }

    fn time(&self) -> f64 {
        self.state.advanced.t
    }

    fn final_time(&self) -> f64 {
        self.config.end_time()
    }

    fn state(&self) -> ArrayView1<'_, f64> {
        self.state.advanced.y.view()
    }
}
