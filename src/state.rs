//! Integrator state and step-size bookkeeping.

use ndarray::prelude::*;
use ndarray::s;

use crate::config::IntegratorConfig;
use crate::error::IntegratorError;
use crate::method::MethodDescriptor;
use crate::system::StateLayout;

/// A point on the solution trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub t: f64,
    /// Continuous state `y = (q, u, z)`.
    pub y: Array1<f64>,
    /// Time derivative of `y`.
    pub ydot: Array1<f64>,
}

impl Point {
    /// Creates a point whose derivative has not been evaluated yet.
    pub fn new(t: f64, y: Array1<f64>) -> Self {
        let ydot = Array1::zeros(y.len());
        Point { t, y, ydot }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Generalized positions.
    pub fn q(&self, layout: &StateLayout) -> ArrayView1<'_, f64> {
        self.y.slice(s![..layout.nq])
    }

    /// Generalized velocities.
    pub fn u(&self, layout: &StateLayout) -> ArrayView1<'_, f64> {
        self.y.slice(s![layout.nq..layout.nq + layout.nu])
    }

    /// Auxiliary variables.
    pub fn z(&self, layout: &StateLayout) -> ArrayView1<'_, f64> {
        self.y.slice(s![layout.nq + layout.nu..])
    }
}

/// The two ends of the current step plus the error estimate of the last
/// attempt.
///
/// `advanced` receives trial values while a step is being attempted; they only
/// become the solution once the step is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorState {
    /// Start of the last step.
    pub previous: Point,
    /// End of the last step, or the trial point during an attempt.
    pub advanced: Point,
    /// Absolute error estimate for each element of `advanced.y`.
    pub y_err_est: Array1<f64>,
    /// Whether the last attempted step was shortened to land on a boundary.
    pub step_was_limited: bool,
}

impl IntegratorState {
    pub fn new(initial: Point) -> Self {
        let y_err_est = Array1::zeros(initial.len());
        IntegratorState {
            previous: initial.clone(),
            advanced: initial,
            y_err_est,
            step_was_limited: false,
        }
    }

    pub fn len(&self) -> usize {
        self.advanced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advanced.is_empty()
    }

    /// Makes the advanced point the start of the next step.
    pub(crate) fn begin_step(&mut self) {
        self.previous.clone_from(&self.advanced);
    }

    /// Throws away trial values in the advanced point.
    pub(crate) fn discard_trial(&mut self) {
        self.advanced.clone_from(&self.previous);
    }
}

/// Step sizes and the accuracy settings they are controlled against.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSizeState {
    current: f64,
    last_taken: Option<f64>,
    initial_taken: Option<f64>,
    pub min_order: usize,
    pub max_order: usize,
    pub accuracy: f64,
    pub constraint_tolerance: f64,
}

impl StepSizeState {
    pub fn new(
        method: &MethodDescriptor,
        config: &IntegratorConfig,
        initial_step_size: f64,
    ) -> Result<Self, IntegratorError> {
        let mut state = StepSizeState {
            current: std::f64::NAN,
            last_taken: None,
            initial_taken: None,
            min_order: method.min_order(),
            max_order: method.max_order(),
            accuracy: config.accuracy,
            constraint_tolerance: config.constraint_tolerance,
        };
        state.propose(initial_step_size)?;
        Ok(state)
    }

    /// Step size that will be tried next.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Size of the last accepted step, or `None` if no steps were taken yet.
    pub fn last_taken(&self) -> Option<f64> {
        self.last_taken
    }

    /// Size of the first accepted step.
    pub fn initial_taken(&self) -> Option<f64> {
        self.initial_taken
    }

    /// Sets the step size to try next. The step size must stay positive.
    pub fn propose(&mut self, h: f64) -> Result<(), IntegratorError> {
        if !(h > 0.) {
            return Err(IntegratorError::InvalidStepSize(h));
        }
        self.current = h;
        Ok(())
    }

    pub(crate) fn record_taken(&mut self, h: f64) {
        if self.initial_taken.is_none() {
            self.initial_taken = Some(h);
        }
        self.last_taken = Some(h);
    }

    pub(crate) fn shorten_last_taken(&mut self, h: f64) {
        self.last_taken = Some(h);
    }
}
