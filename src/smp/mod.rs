//! SMP support: core identifiers, core sets, and the per-core kernel
//! message queues that stand in for cross-core IPIs.
//!
//! The scheduler never runs code on a remote core synchronously. It posts a
//! kernel message to the target core's queue and moves on; the target core
//! drains its queue and re-validates each message against the registry
//! before acting.

mod kmsg;
mod types;

pub use kmsg::{
    drain_kernel_messages, queued_messages, send_kernel_message, KernelMessage,
};
pub use types::{CoreSet, CoreSetIter, MAX_CORES};

use spin::Mutex;

use crate::process::ProcRef;

/// Which process context each physical core is currently executing, as seen
/// by the core itself (updated when it handles start/stop messages). May lag
/// the registry: that window is the asynchrony the message protocol covers.
static CPU_CURRENT: Mutex<[Option<ProcRef>; MAX_CORES]> = Mutex::new([None; MAX_CORES]);

/// The process context core `core` is running, if any.
pub fn current_on(core: usize) -> Option<ProcRef> {
    CPU_CURRENT.lock()[core]
}

pub(crate) fn set_current(core: usize, proc: Option<ProcRef>) {
    CPU_CURRENT.lock()[core] = proc;
}

/// Reset all per-core state. Called from `ksched::init` at boot.
pub(crate) fn reset() {
    *CPU_CURRENT.lock() = [None; MAX_CORES];
    kmsg::reset();
}
