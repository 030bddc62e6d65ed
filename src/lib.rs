//! Adaptive step-size integration of differential-algebraic equations.
//!
//! An [`Integrator`] advances a [`DynamicSystem`] with a method-specific
//! [`OdeStepper`], keeps the solution on the constraint manifold with a
//! [`ConstraintProjector`], and answers report and event times inside a step
//! by Hermite interpolation.

pub mod config;
pub mod controller;
pub mod dae;
pub mod error;
pub mod interpolate;
pub mod method;
pub mod norm;
pub mod projection;
pub mod rk;
pub mod state;
pub mod stats;
pub mod step_size;
pub mod system;

pub use crate::config::{ConfigError, IntegratorConfig};
pub use crate::controller::Integrator;
pub use crate::error::{IntegratorError, ProjectionFailure, StepFault, SystemError};
pub use crate::method::{MethodDescriptor, OdeStep, OdeStepper, TrialStep};
pub use crate::projection::{ConstraintProjector, Unconstrained};
pub use crate::state::{IntegratorState, Point, StepSizeState};
pub use crate::stats::Statistics;
pub use crate::system::{DynamicSystem, OdeFn, StateLayout};

use ndarray::prelude::*;

/// Why a call to `step_to` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The report time was reached, either exactly or by interpolation.
    ReachedReportTime,
    /// The scheduled event time was reached. Takes priority over the report
    /// time when both coincide.
    ReachedScheduledEvent,
    /// A step was taken without reaching any boundary.
    ReachedStepLimit,
    /// The final time was reached.
    EndOfSimulation,
    /// No step has been requested since initialization.
    Invalid,
}

impl Default for StepStatus {
    fn default() -> Self {
        StepStatus::Invalid
    }
}

pub trait DaeIntegrate {
    /// Returns the number of elements in the state.
    fn len(&self) -> usize;
    /// Advance by at most one accepted step toward `report_time`, stopping at
    /// `scheduled_event_time`.
    fn step_to(
        &mut self,
        report_time: f64,
        scheduled_event_time: f64,
    ) -> Result<StepStatus, IntegratorError>;
    /// Current time.
    fn time(&self) -> f64;
    /// The time at which the simulation ends; `INFINITY` if it doesn't.
    fn final_time(&self) -> f64;
    /// Current state.
    fn state(&self) -> ArrayView1<'_, f64>;
    /// Returns `true` if the integration has reached `final_time`.
    fn finished(&self) -> bool {
        let (t, end) = (self.time(), self.final_time());
        t >= end || controller::times_coincide(t, end)
    }
    /// Integrate until reaching `report_time` or the end of the simulation.
    fn run_to(&mut self, report_time: f64) -> Result<StepStatus, IntegratorError> {
        loop {
            match self.step_to(report_time, std::f64::INFINITY)? {
                StepStatus::ReachedStepLimit => continue,
                status => return Ok(status),
            }
        }
    }
}
