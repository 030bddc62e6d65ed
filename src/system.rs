//! The model being integrated.

use ndarray::azip;
use ndarray::prelude::*;

use crate::error::SystemError;

/// Partition of the continuous state `y = (q, u, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    /// Number of generalized positions.
    pub nq: usize,
    /// Number of generalized velocities.
    pub nu: usize,
    /// Number of auxiliary variables.
    pub nz: usize,
}

impl StateLayout {
    pub fn new(nq: usize, nu: usize, nz: usize) -> Self {
        StateLayout { nq, nu, nz }
    }

    /// Layout of a plain ODE whose state has no mechanical structure.
    pub fn auxiliary(nz: usize) -> Self {
        StateLayout { nq: 0, nu: 0, nz }
    }

    /// Total number of state variables.
    pub fn len(&self) -> usize {
        self.nq + self.nu + self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A constrained dynamical system `ẏ = f(t, y)` with algebraic constraints
/// `c(t, y) = 0`.
///
/// Implementations must not keep hidden state between calls: the integrator
/// evaluates them at trial points that may later be discarded.
pub trait DynamicSystem {
    /// Partition of the state vector.
    fn layout(&self) -> StateLayout;

    /// Fills in `ydot` with the derivative of `y` at time `t`.
    fn derivatives(
        &mut self,
        t: f64,
        y: ArrayView1<'_, f64>,
        ydot: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SystemError>;

    /// Fills in the per-variable weights used for the weighted RMS norm of
    /// error estimates. Each weight is the reciprocal of the absolute error
    /// that counts as one unit of accuracy for that variable.
    fn error_weights(&self, y: ArrayView1<'_, f64>, weights: ArrayViewMut1<'_, f64>);

    /// Number of algebraic constraint equations.
    fn num_constraints(&self) -> usize {
        0
    }

    /// Fills in the constraint residuals `c(t, y)`.
    fn constraint_errors(&self, _t: f64, _y: ArrayView1<'_, f64>, _errors: ArrayViewMut1<'_, f64>) {
    }

    /// Fills in the reciprocal of each constraint's unit tolerance.
    fn constraint_weights(&self, mut weights: ArrayViewMut1<'_, f64>) {
        weights.fill(1.);
    }
}

/// An unconstrained ODE given by a closure.
///
/// Error weights are `1 / max(|y|, 1)`: the accuracy is relative for large
/// components and absolute for small ones.
pub struct OdeFn<F>
where
    F: FnMut(f64, ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>),
{
    fun: F,
    len: usize,
}

impl<F> OdeFn<F>
where
    F: FnMut(f64, ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>),
{
    /// Wraps `fun`, where calling `fun(t, y, deriv_y)` should fill in
    /// `deriv_y` with the derivative of `y` at time `t`.
    pub fn new(fun: F, len: usize) -> Self {
        OdeFn { fun, len }
    }
}

impl<F> DynamicSystem for OdeFn<F>
where
    F: FnMut(f64, ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>),
{
    fn layout(&self) -> StateLayout {
        StateLayout::auxiliary(self.len)
    }

    fn derivatives(
        &mut self,
        t: f64,
        y: ArrayView1<'_, f64>,
        ydot: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SystemError> {
        (self.fun)(t, y, ydot);
        Ok(())
    }

    fn error_weights(&self, y: ArrayView1<'_, f64>, mut weights: ArrayViewMut1<'_, f64>) {
        azip!((w in &mut weights, &y in &y) *w = 1. / y.abs().max(1.));
    }
}
