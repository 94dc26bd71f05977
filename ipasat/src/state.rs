//! Miscellaneous solver state.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Satisfiability state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatState {
    Unknown,
    Sat,
    Unsat,
    UnsatUnderAssumptions,
}

impl Default for SatState {
    fn default() -> SatState {
        SatState::Unknown
    }
}

/// Handle used to request termination of a running solve.
///
/// This is the only solver state that may be touched from another thread or from a signal
/// handler. The store uses release ordering, the polls on the search hot path use relaxed
/// ordering, so a request is observed by the next checkpoint.
#[derive(Clone, Default)]
pub struct TerminateHandle {
    flag: Arc<AtomicBool>,
}

impl TerminateHandle {
    /// Request termination of the current and any future solve.
    ///
    /// The request stays in effect until [`clear`](TerminateHandle::clear) is called.
    pub fn terminate(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Withdraw a termination request.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Whether termination was requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TerminateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TerminateHandle")
            .field("set", &self.is_set())
            .finish()
    }
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be moved into a separate
/// part of [`Context`](crate::context::Context).
#[derive(Default)]
pub struct SolverState {
    pub sat_state: SatState,
    /// Asynchronous termination request flag.
    pub terminate: TerminateHandle,
    /// Set when the current solve was cut short by termination or a limit.
    pub interrupted: bool,
}

impl SolverState {
    /// Poll the asynchronous termination flag.
    pub fn terminate_requested(&self) -> bool {
        self.terminate.is_set()
    }
}
