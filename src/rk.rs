//! Explicit Runge–Kutta step formulas.

use lazy_static::lazy_static;
use ndarray::prelude::*;
use ndarray::s;
use std::marker::PhantomData;

use crate::error::StepFault;
use crate::method::{MethodDescriptor, OdeStep, OdeStepper, TrialStep};
use crate::system::DynamicSystem;

/// Embedded explicit Runge–Kutta ODE stepper.
///
/// Steps are taken with the higher order formula and the error is estimated
/// with the embedded lower order one (local extrapolation).
pub struct RungeKutta<O: RKMethod> {
    method: PhantomData<O>,
    descriptor: MethodDescriptor,
    /// Storage array for Runge Kutta stages, shape `O::NUM_STAGES + 1, len`.
    k: Array2<f64>,
}

impl<O: RKMethod> RungeKutta<O> {
    pub fn new() -> Self {
        RungeKutta {
            method: PhantomData,
            descriptor: MethodDescriptor::new(O::NAME, O::ORDER, O::ORDER, true),
            k: Array2::zeros((O::NUM_STAGES + 1, 0)),
        }
    }
}

impl<O: RKMethod> Default for RungeKutta<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, O> OdeStepper<S> for RungeKutta<O>
where
    S: DynamicSystem + ?Sized,
    O: RKMethod,
{
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Perform a single Runge–Kutta step.
    ///
    /// Notation for Butcher tableau is as in (ref 1).
    ///
    /// # References
    ///
    /// 1. E. Hairer, S. P. Norsett G. Wanner, "Solving Ordinary Differential
    ///    Equations I: Nonstiff Problems", Sec. II.4.
    fn attempt_ode_step(
        &mut self,
        system: &mut S,
        mut trial: TrialStep<'_>,
    ) -> Result<OdeStep, StepFault> {
        let n = trial.y0.len();
        if self.k.ncols() != n {
            self.k = Array2::zeros((O::NUM_STAGES + 1, n));
        }
        let h = trial.h();
        let (t, y) = (trial.t0, trial.y0);

        self.k.slice_mut(s![0, ..]).assign(&trial.ydot0);
        for (s, (a, c)) in O::a().iter().zip(O::c()).enumerate() {
            let dy = self.k.slice(s![..s + 1, ..]).t().dot(a) * h;
            system.derivatives(t + c * h, (dy + &y).view(), self.k.slice_mut(s![s + 1, ..]))?;
        }

        let y_new = h * self.k.slice::<Ix2>(s![..-1, ..]).t().dot(&O::b()) + &y;
        system.derivatives(trial.t1, y_new.view(), self.k.slice_mut(s![-1, ..]))?;
        let error = self.k.t().dot(&O::e()) * h;

        if !(y_new.iter().all(|x| x.is_finite()) && error.iter().all(|x| x.is_finite())) {
            return Err(StepFault::NonFinite(trial.t1));
        }
        trial.y1.assign(&y_new);
        trial.y_err_est.assign(&error);
        Ok(OdeStep::converged(O::ORDER, 1))
    }
}

pub trait RKMethod {
    /// Name reported in the method descriptor.
    const NAME: &'static str;

    /// Order of the error estimate.
    const ORDER: usize;

    /// Number of stages in the method.
    const NUM_STAGES: usize;

    /// Coefficients for incrementing time for consecutive RK stages, length
    /// `NUM_STAGES - 1`.
    ///
    /// The value for the first stage is always zero, so it is not included.
    fn c() -> ArrayView1<'static, f64>;

    /// Coefficients for combining previous RK stages to compute the next
    /// stage, length `NUM_STAGES - 1`.
    ///
    /// For explicit methods the coefficients above the main diagonal are
    /// zeros, so `a` is stored as a list of arrays of increasing lengths. The
    /// first stage is always just `f`, thus no coefficients for it are
    /// required.
    fn a() -> &'static [ArrayView1<'static, f64>];

    /// Coefficients for combining RK stages for computing the final
    /// prediction, length `NUM_STAGES`.
    fn b() -> ArrayView1<'static, f64>;

    /// Coefficients for estimating the error of a less accurate method, length
    /// `NUM_STAGES + 1`.
    ///
    /// They are computed as the difference between `b`'s in an extended
    /// tableau.
    fn e() -> ArrayView1<'static, f64>;
}

/// Explicit Runge–Kutta method of order 3(2).
///
/// The Bogacki-Shamping pair of formulas is used (ref 1).
///
/// # References
///
/// 1. P. Bogacki, L.F. Shampine, "A 3(2) Pair of Runge-Kutta Formulas",
///    Appl. Math. Lett. Vol. 2, No. 4. pp. 321-325, 1989.
pub struct RK23;

impl RKMethod for RK23 {
    const NAME: &'static str = "RK23";

    const ORDER: usize = 2;

    const NUM_STAGES: usize = 3;

    fn c() -> ArrayView1<'static, f64> {
        aview1(&[1./2., 3./4.])
    }

    fn a() -> &'static [ArrayView1<'static, f64>] {
        lazy_static! {
            static ref A: [ArrayView1<'static, f64>; 3 - 1] = [
                aview1(&[1./2.]),
                aview1(&[0., 3./4.]),
            ];
        }
        &*A
    }

    fn b() -> ArrayView1<'static, f64> {
        aview1(&[2./9., 1./3., 4./9.])
    }

    fn e() -> ArrayView1<'static, f64> {
        aview1(&[5./72., -1./12., -1./9., 1./8.])
    }
}

/// Explicit Runge–Kutta method of order 5(4).
///
/// The Dormand-Prince pair of formulas is used (ref 1).
///
/// # References
///
/// 1. J. R. Dormand, P. J. Prince, "A family of embedded Runge-Kutta
///    formulae", Journal of Computational and Applied Mathematics, Vol. 6, No.
///    1, pp. 19-26, 1980.
pub struct RK45;

impl RKMethod for RK45 {
    const NAME: &'static str = "RK45";

    const ORDER: usize = 4;

    const NUM_STAGES: usize = 6;

    fn c() -> ArrayView1<'static, f64> {
        aview1(&[1./5., 3./10., 4./5., 8./9., 1.])
    }

    fn a() -> &'static [ArrayView1<'static, f64>] {
        lazy_static! {
            static ref A: [ArrayView1<'static, f64>; 6 - 1] = [
                aview1(&[1./5.]),
                aview1(&[3./40., 9./40.]),
                aview1(&[44./45., -56./15., 32./9.]),
                aview1(&[19372./6561., -25360./2187., 64448./6561., -212./729.]),
                aview1(&[9017./3168., -355./33., 46732./5247., 49./176., -5103./18656.]),
            ];
        }
        &*A
    }

    fn b() -> ArrayView1<'static, f64> {
        aview1(&[35./384., 0., 500./1113., 125./192., -2187./6784., 11./84.])
    }

    fn e() -> ArrayView1<'static, f64> {
        aview1(&[-71./57600., 0., 71./16695., -71./1920., 17253./339200., -22./525., 1./40.])
    }
}
