//! Step counters.

/// Counters describing the work done by an integrator.
///
/// Every counter only grows until [`reset`](Statistics::reset) is called.
/// Each attempted step ends in either an accepted step or an error-test
/// failure, so `steps_taken + error_test_failures == steps_attempted`.
/// Steps that fail to converge are not attempts; they are counted in
/// `convergence_test_failures`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    steps_attempted: u64,
    steps_taken: u64,
    error_test_failures: u64,
    convergence_test_failures: u64,
    convergent_iterations: u64,
    divergent_iterations: u64,
}

impl Statistics {
    pub fn steps_attempted(&self) -> u64 {
        self.steps_attempted
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn error_test_failures(&self) -> u64 {
        self.error_test_failures
    }

    pub fn convergence_test_failures(&self) -> u64 {
        self.convergence_test_failures
    }

    /// Iterations of steps that converged.
    pub fn convergent_iterations(&self) -> u64 {
        self.convergent_iterations
    }

    /// Iterations of steps that failed to converge.
    pub fn divergent_iterations(&self) -> u64 {
        self.divergent_iterations
    }

    pub fn iterations(&self) -> u64 {
        self.convergent_iterations + self.divergent_iterations
    }

    pub fn reset(&mut self) {
        *self = Statistics::default();
    }

    pub(crate) fn record_attempt(&mut self, iterations: usize) {
        self.steps_attempted += 1;
        self.convergent_iterations += iterations as u64;
    }

    pub(crate) fn record_step_taken(&mut self) {
        self.steps_taken += 1;
    }

    pub(crate) fn record_error_test_failure(&mut self) {
        self.error_test_failures += 1;
    }

    pub(crate) fn record_convergence_failure(&mut self, iterations: usize) {
        self.convergence_test_failures += 1;
        self.divergent_iterations += iterations as u64;
    }
}
