//! Constraint projection hook.

use ndarray::prelude::*;

use crate::error::ProjectionFailure;
use crate::system::DynamicSystem;

/// Moves a state back onto the constraint manifold.
pub trait ConstraintProjector<S: DynamicSystem + ?Sized> {
    /// Projects `y` in place so that the weighted RMS constraint violation is
    /// at most `tolerance`, and removes the components of `y_err_est` that
    /// are normal to the manifold.
    fn project(
        &mut self,
        system: &S,
        t: f64,
        y: ArrayViewMut1<'_, f64>,
        y_err_est: ArrayViewMut1<'_, f64>,
        tolerance: f64,
    ) -> Result<(), ProjectionFailure>;
}

/// Projector for systems without constraints. Leaves the state untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconstrained;

impl<S: DynamicSystem + ?Sized> ConstraintProjector<S> for Unconstrained {
    fn project(
        &mut self,
        _system: &S,
        _t: f64,
        _y: ArrayViewMut1<'_, f64>,
        _y_err_est: ArrayViewMut1<'_, f64>,
        _tolerance: f64,
    ) -> Result<(), ProjectionFailure> {
        Ok(())
    }
}
