//! Dense output by cubic Hermite interpolation.
//!
//! For a step from `(t0, y0, f0)` to `(t1, y1, f1)` with `h = t1 - t0` and
//! `θ = (t - t0) / h`:
//!
//! ```text
//! y(t) = H00(θ)·y0 + H10(θ)·h·f0 + H01(θ)·y1 + H11(θ)·h·f1
//! ```
//!
//! The interpolant matches `y` and `ẏ` at both ends of the step.

use ndarray::azip;
use ndarray::prelude::*;

use crate::state::Point;

/// Evaluates the Hermite interpolant of the step `previous → advanced` at `t`.
///
/// `ydot` of the result is the derivative of the interpolant. The caller is
/// responsible for `t` lying in `[previous.t, advanced.t]`.
pub fn hermite(previous: &Point, advanced: &Point, t: f64) -> Point {
    let h = advanced.t - previous.t;
    if h == 0. {
        return advanced.clone();
    }
    let theta = (t - previous.t) / h;
    let theta2 = theta * theta;
    let theta3 = theta2 * theta;

    let h00 = 2. * theta3 - 3. * theta2 + 1.;
    let h10 = theta3 - 2. * theta2 + theta;
    let h01 = -2. * theta3 + 3. * theta2;
    let h11 = theta3 - theta2;

    // d/dθ of the basis; d/dt = (1/h) d/dθ.
    let dh00 = 6. * theta2 - 6. * theta;
    let dh10 = 3. * theta2 - 4. * theta + 1.;
    let dh01 = -dh00;
    let dh11 = 3. * theta2 - 2. * theta;

    let mut y = Array1::zeros(previous.len());
    let mut ydot = Array1::zeros(previous.len());
    azip!((
        y in &mut y,
        ydot in &mut ydot,
        &y0 in &previous.y,
        &f0 in &previous.ydot,
        &y1 in &advanced.y,
        &f1 in &advanced.ydot
    ) {
        *y = h00 * y0 + h10 * h * f0 + h01 * y1 + h11 * h * f1;
        *ydot = (dh00 * y0 + dh01 * y1) / h + dh10 * f0 + dh11 * f1;
    });

    Point { t, y, ydot }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn cubic(t: f64) -> f64 {
        2. * t * t * t - t * t + 3. * t - 1.
    }

    fn cubic_deriv(t: f64) -> f64 {
        6. * t * t - 2. * t + 3.
    }

    fn point(t: f64) -> Point {
        Point {
            t,
            y: array![cubic(t)],
            ydot: array![cubic_deriv(t)],
        }
    }

    #[test]
    fn reproduces_cubics() {
        let previous = point(0.5);
        let advanced = point(2.);
        for &t in &[0.5, 0.7, 1.25, 1.9, 2.] {
            let p = hermite(&previous, &advanced, t);
            assert_abs_diff_eq!(p.y[0], cubic(t), epsilon = 1e-12);
            assert_abs_diff_eq!(p.ydot[0], cubic_deriv(t), epsilon = 1e-12);
        }
    }

    #[test]
    fn matches_endpoints() {
        let previous = point(0.);
        let advanced = point(1.);
        assert_eq!(hermite(&previous, &advanced, 0.).y, previous.y);
        assert_eq!(hermite(&previous, &advanced, 1.).y, advanced.y);
    }

    #[test]
    fn repeatable() {
        let previous = point(0.);
        let advanced = point(3.);
        assert_eq!(
            hermite(&previous, &advanced, 1.3),
            hermite(&previous, &advanced, 1.3)
        );
    }
}
