//! The process state transition table.

use crate::kpanic;

use super::types::{Pid, ProcState};

/// Check a state transition against the lifecycle table and panic if it is
/// illegal. An illegal transition is a scheduler bug, not bad user input:
/// continuing would corrupt shared state, so this is deliberately fatal.
pub(crate) fn assert_state_transition(pid: Pid, old: ProcState, new: ProcState) {
    use ProcState::*;

    let legal = match new {
        // Created is the initial state, never a destination.
        Created => false,
        RunnableS => matches!(old, Created | Waiting),
        RunningS => matches!(old, RunnableS),
        Waiting => matches!(old, RunningS | RunningM),
        // RunningM -> RunnableM is the shrink path (lost its last core).
        RunnableM => matches!(old, Created | RunningM | Waiting),
        RunningM => matches!(old, RunnableM),
        // Death is legal from anywhere, once.
        Dying => !matches!(old, Dying),
    };

    if !legal {
        kpanic!(
            "invalid state transition for pid {}: {} -> {}",
            pid,
            old.as_str(),
            new.as_str()
        );
    }
}
