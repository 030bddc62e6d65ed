//! Weighted norms.

use ndarray::prelude::*;
use ndarray::{FoldWhile, Zip};

use crate::system::DynamicSystem;

/// Computes the RMS norm of `x` with each component multiplied by its weight.
///
/// An empty vector has norm zero.
pub fn weighted_rms_norm(x: ArrayView1<'_, f64>, weights: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(x.len(), weights.len());
    if x.is_empty() {
        return 0.;
    }
    (Zip::from(x)
        .and(weights)
        .fold_while(0., |acc, &x, &w| {
            let scaled = x * w;
            FoldWhile::Continue(acc + scaled * scaled)
        })
        .into_inner()
        / x.len() as f64)
        .sqrt()
}

/// Weighted RMS norm of an error estimate against the system's error weights.
pub fn error_norm<S>(system: &S, y: ArrayView1<'_, f64>, y_err_est: ArrayView1<'_, f64>) -> f64
where
    S: DynamicSystem + ?Sized,
{
    let mut weights = Array1::zeros(y.len());
    system.error_weights(y, weights.view_mut());
    weighted_rms_norm(y_err_est, weights.view())
}

/// Weighted RMS norm of the constraint residuals at `(t, y)`.
pub fn constraint_violation_norm<S>(system: &S, t: f64, y: ArrayView1<'_, f64>) -> f64
where
    S: DynamicSystem + ?Sized,
{
    let m = system.num_constraints();
    if m == 0 {
        return 0.;
    }
    let mut errors = Array1::zeros(m);
    let mut weights = Array1::zeros(m);
    system.constraint_errors(t, y, errors.view_mut());
    system.constraint_weights(weights.view_mut());
    weighted_rms_norm(errors.view(), weights.view())
}
