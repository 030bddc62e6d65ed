#![allow(dead_code)]

use std::collections::VecDeque;

use ndarray::azip;
use ndarray::prelude::*;

use ndarray_solve_dae::{
    ConstraintProjector, DynamicSystem, MethodDescriptor, OdeStep, OdeStepper, ProjectionFailure,
    StateLayout, StepFault, SystemError, TrialStep,
};

/// `ẏ = -y` with unit error weights and an optional constant constraint
/// residual.
pub struct Decay {
    pub len: usize,
    pub residual: Option<f64>,
}

impl Decay {
    pub fn new(len: usize) -> Self {
        Decay {
            len,
            residual: None,
        }
    }

    pub fn with_residual(len: usize, residual: f64) -> Self {
        Decay {
            len,
            residual: Some(residual),
        }
    }
}

impl DynamicSystem for Decay {
    fn layout(&self) -> StateLayout {
        StateLayout::auxiliary(self.len)
    }

    fn derivatives(
        &mut self,
        _t: f64,
        y: ArrayView1<'_, f64>,
        mut ydot: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SystemError> {
        ydot.assign(&(-&y));
        Ok(())
    }

    fn error_weights(&self, _y: ArrayView1<'_, f64>, mut weights: ArrayViewMut1<'_, f64>) {
        weights.fill(1.);
    }

    fn num_constraints(&self) -> usize {
        if self.residual.is_some() {
            1
        } else {
            0
        }
    }

    fn constraint_errors(&self, _t: f64, _y: ArrayView1<'_, f64>, mut errors: ArrayViewMut1<'_, f64>) {
        errors.fill(self.residual.unwrap_or(0.));
    }
}

/// Rotation on the unit circle: `ẋ = -y`, `ẏ = x`, with `x² + y² = 1`.
pub struct Circle;

impl DynamicSystem for Circle {
    fn layout(&self) -> StateLayout {
        StateLayout::new(2, 0, 0)
    }

    fn derivatives(
        &mut self,
        _t: f64,
        y: ArrayView1<'_, f64>,
        mut ydot: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SystemError> {
        ydot[0] = -y[1];
        ydot[1] = y[0];
        Ok(())
    }

    fn error_weights(&self, _y: ArrayView1<'_, f64>, mut weights: ArrayViewMut1<'_, f64>) {
        weights.fill(1.);
    }

    fn num_constraints(&self) -> usize {
        1
    }

    fn constraint_errors(&self, _t: f64, y: ArrayView1<'_, f64>, mut errors: ArrayViewMut1<'_, f64>) {
        errors[0] = y[0] * y[0] + y[1] * y[1] - 1.;
    }
}

/// Scales the state of [`Circle`] back to unit radius.
#[derive(Default)]
pub struct RadialProjector {
    pub calls: usize,
}

impl ConstraintProjector<Circle> for RadialProjector {
    fn project(
        &mut self,
        _system: &Circle,
        _t: f64,
        mut y: ArrayViewMut1<'_, f64>,
        mut y_err_est: ArrayViewMut1<'_, f64>,
        _tolerance: f64,
    ) -> Result<(), ProjectionFailure> {
        self.calls += 1;
        let r = (y[0] * y[0] + y[1] * y[1]).sqrt();
        y /= r;
        let radial = y_err_est[0] * y[0] + y_err_est[1] * y[1];
        y_err_est[0] -= radial * y[0];
        y_err_est[1] -= radial * y[1];
        Ok(())
    }
}

/// Counts calls and optionally fails.
#[derive(Default)]
pub struct CountingProjector {
    pub calls: usize,
    pub fail: bool,
}

impl<S: DynamicSystem + ?Sized> ConstraintProjector<S> for CountingProjector {
    fn project(
        &mut self,
        _system: &S,
        t: f64,
        _y: ArrayViewMut1<'_, f64>,
        _y_err_est: ArrayViewMut1<'_, f64>,
        _tolerance: f64,
    ) -> Result<(), ProjectionFailure> {
        self.calls += 1;
        if self.fail {
            Err(ProjectionFailure {
                t,
                residual: 1.,
                iterations: 10,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Converged with every element of the error estimate equal to the value.
    Error(f64),
    Diverge,
    Fault,
    Unimplemented,
}

/// Takes forward Euler steps and reports scripted outcomes.
pub struct ScriptedStepper {
    descriptor: MethodDescriptor,
    script: VecDeque<Outcome>,
    fallback: Outcome,
    pub error_order: usize,
    pub calls: usize,
}

impl ScriptedStepper {
    pub fn new(script: &[Outcome], fallback: Outcome) -> Self {
        ScriptedStepper {
            descriptor: MethodDescriptor::new("scripted", 4, 4, true),
            script: script.iter().cloned().collect(),
            fallback,
            error_order: 4,
            calls: 0,
        }
    }

    pub fn without_error_control(mut self) -> Self {
        self.descriptor = MethodDescriptor::new("scripted", 1, 1, false);
        self
    }
}

impl<S: DynamicSystem + ?Sized> OdeStepper<S> for ScriptedStepper {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    fn attempt_ode_step(
        &mut self,
        _system: &mut S,
        mut trial: TrialStep<'_>,
    ) -> Result<OdeStep, StepFault> {
        self.calls += 1;
        let outcome = self.script.pop_front().unwrap_or(self.fallback);
        let h = trial.h();
        azip!((y1 in &mut trial.y1, &y0 in &trial.y0, &f0 in &trial.ydot0) *y1 = y0 + h * f0);
        match outcome {
            Outcome::Error(e) => {
                trial.y_err_est.fill(e);
                Ok(OdeStep::converged(self.error_order, 2))
            }
            Outcome::Diverge => Ok(OdeStep::diverged(3)),
            Outcome::Fault => Err(StepFault::Other("internal fault".into())),
            Outcome::Unimplemented => Err(StepFault::Unimplemented("attempt_ode_step")),
        }
    }
}
