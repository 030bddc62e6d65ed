mod common;

use approx::assert_relative_eq;
use ndarray::prelude::*;

use common::{CountingProjector, Decay, Outcome, ScriptedStepper};
use ndarray_solve_dae::dae::{attempt_dae_step, projection_limit, DaeSettings};
use ndarray_solve_dae::{IntegratorError, IntegratorState, Point};

fn settings() -> DaeSettings {
    DaeSettings {
        accuracy: 1e-6,
        constraint_tolerance: 0.01,
        project_every_step: false,
    }
}

fn initial_state() -> IntegratorState {
    let y = array![1., 2.];
    let mut point = Point::new(0., y.clone());
    point.ydot = -&y;
    IntegratorState::new(point)
}

#[test]
fn fault_becomes_convergence_failure() {
    let mut system = Decay::new(2);
    let mut stepper = ScriptedStepper::new(&[Outcome::Fault], Outcome::Error(0.));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(!ode.converged);
    assert_eq!(ode.iterations, 1);
    assert_eq!(projector.calls, 0);
}

#[test]
fn divergence_is_passed_through() {
    let mut system = Decay::new(2);
    let mut stepper = ScriptedStepper::new(&[Outcome::Diverge], Outcome::Error(0.));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(!ode.converged);
    assert_eq!(ode.iterations, 3);
}

#[test]
fn unimplemented_hook_is_fatal() {
    let mut system = Decay::new(2);
    let mut stepper = ScriptedStepper::new(&[Outcome::Unimplemented], Outcome::Error(0.));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let err = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap_err();
    assert_eq!(
        err,
        IntegratorError::UnimplementedMethod {
            method: "scripted",
            hook: "attempt_ode_step",
        }
    );
}

#[test]
fn projection_limit_examples() {
    assert_relative_eq!(projection_limit(1e-12), 1e-6);
    assert_relative_eq!(projection_limit(1e-4), 1e-2);
    assert_relative_eq!(projection_limit(0.01), 0.1);
    assert_relative_eq!(projection_limit(0.5), 1.);
    assert_relative_eq!(projection_limit(1.), 2.);
}

#[test]
fn large_violation_is_not_projected() {
    let mut system = Decay::with_residual(2, 0.5);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-8));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(!ode.converged);
    assert_eq!(projector.calls, 0);
}

#[test]
fn doomed_step_skips_projection() {
    let mut system = Decay::with_residual(2, 0.05);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-2));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let settings = DaeSettings {
        project_every_step: true,
        ..settings()
    };
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings)
        .unwrap();
    assert!(ode.converged);
    assert_eq!(projector.calls, 0);
}

#[test]
fn step_near_the_edge_is_still_projected() {
    // 2^4 * 1e-6 = 1.6e-5 is the cutoff for error order 4.
    let mut system = Decay::with_residual(2, 0.05);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1.5e-5));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(ode.converged);
    assert_eq!(projector.calls, 1);
}

#[test]
fn moderate_violation_is_projected() {
    let mut system = Decay::with_residual(2, 0.05);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-8));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(ode.converged);
    assert_eq!(projector.calls, 1);
}

#[test]
fn satisfied_constraints_are_not_projected() {
    let mut system = Decay::with_residual(2, 0.005);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-8));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(ode.converged);
    assert_eq!(projector.calls, 0);

    // Euler step from (1, 2) with slope (-1, -2), and the derivative at the
    // trial point evaluated afterwards.
    assert_eq!(state.advanced.t, 0.1);
    assert_relative_eq!(state.advanced.y[0], 0.9);
    assert_relative_eq!(state.advanced.y[1], 1.8);
    assert_relative_eq!(state.advanced.ydot[0], -0.9);
    assert_relative_eq!(state.advanced.ydot[1], -1.8);
    assert_eq!(state.y_err_est, array![1e-8, 1e-8]);
}

#[test]
fn forced_projection() {
    let mut system = Decay::new(2);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-8));
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let settings = DaeSettings {
        project_every_step: true,
        ..settings()
    };
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings)
        .unwrap();
    assert!(ode.converged);
    assert_eq!(projector.calls, 1);
}

#[test]
fn projection_failure_becomes_convergence_failure() {
    let mut system = Decay::with_residual(2, 0.05);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-8));
    let mut projector = CountingProjector {
        calls: 0,
        fail: true,
    };
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(!ode.converged);
    assert_eq!(projector.calls, 1);
}

#[test]
fn methods_without_error_control_are_always_projected() {
    let mut system = Decay::with_residual(2, 0.05);
    let mut stepper = ScriptedStepper::new(&[], Outcome::Error(1e-2)).without_error_control();
    let mut projector = CountingProjector::default();
    let mut state = initial_state();
    let ode = attempt_dae_step(&mut system, &mut stepper, &mut projector, &mut state, 0.1, &settings())
        .unwrap();
    assert!(ode.converged);
    assert_eq!(projector.calls, 1);
}
