//! Shared test setup.

use crate::ksched::{self, RequestOutcome};
use crate::process::{Pid, ReqFlags, ResourceRequest};
use crate::smp;

/// Reset the whole scheduling subsystem to a fresh machine with `n` cores.
pub fn boot(n: usize) {
    ksched::init(n);
}

/// Drain every per-core message queue until nothing is in flight. Handlers
/// can stage further messages (e.g. a grant triggered by a reclaim), hence
/// the outer loop.
pub fn drain_all() {
    loop {
        let mut handled = 0;
        for core in 0..ksched::num_cores() {
            handled += smp::drain_kernel_messages(core);
        }
        if handled == 0 {
            break;
        }
    }
}

/// Create a process and request `wanted` cores (minimum `min`) for it.
/// The request is made async so an unmet minimum comes back as `Pending`.
pub fn spawn_mcp(wanted: u32, min: u32) -> (Pid, RequestOutcome) {
    let pid = ksched::create_process(0).unwrap();
    let req = ResourceRequest::new(wanted, min).with_flags(ReqFlags::ASYNC);
    let outcome = ksched::request_cores(pid, req).unwrap();
    (pid, outcome)
}

/// Advance virtual time by `n` ticks.
pub fn run_ticks(n: u64) {
    for _ in 0..n {
        ksched::tick();
    }
}

/// Assert the cross-structure invariants hold, with a readable message.
pub fn assert_consistent() {
    if let Err(what) = ksched::check_consistency() {
        panic!("consistency check failed: {}", what);
    }
}
