//! Scheduler type definitions and global state shape.

use alloc::collections::VecDeque;

use crate::corealloc::CoreMap;
use crate::process::{Pid, ProcRef, ProcState, ProcTable};
use crate::smp::CoreSet;

/// Everything the scheduler lock guards: the PCB arena, the core registry,
/// the FCFS pending-request queue, and counters. One lock, one critical
/// section, no ordering problems.
pub(crate) struct Ksched {
    pub procs: ProcTable,
    pub cores: CoreMap,
    /// Processes with not-fully-granted requests, in arrival order. The
    /// head blocks the line: FCFS means a later request is never serviced
    /// around an earlier one.
    pub pending: VecDeque<ProcRef>,
    pub stats: SchedStats,
}

impl Ksched {
    pub(crate) fn new(num_cores: usize) -> Self {
        Self {
            procs: ProcTable::new(),
            cores: CoreMap::new(num_cores),
            pending: VecDeque::new(),
            stats: SchedStats::new(),
        }
    }
}

/// Scheduler counters, mostly for diagnostics. `forced_reclaims` doubles as
/// the record of revocation deadlines that expired (a policy fallback, not
/// an error).
#[derive(Clone, Copy, Debug, Default)]
pub struct SchedStats {
    pub grants: u64,
    pub preempt_warnings: u64,
    pub cooperative_yields: u64,
    pub forced_reclaims: u64,
    pub stale_kmsgs: u64,
    pub requests_queued: u64,
    pub requests_cancelled: u64,
    pub events_sent: u64,
    pub events_dropped: u64,
}

impl SchedStats {
    pub const fn new() -> Self {
        Self {
            grants: 0,
            preempt_warnings: 0,
            cooperative_yields: 0,
            forced_reclaims: 0,
            stale_kmsgs: 0,
            requests_queued: 0,
            requests_cancelled: 0,
            events_sent: 0,
            events_dropped: 0,
        }
    }
}

/// What a core request accomplished right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Fully granted; the value is the process's current core count.
    Granted(u32),
    /// Accepted but not (fully) satisfiable yet; it stays queued and is
    /// retried on the next idle-core event.
    Pending,
}

/// Read-only process snapshot for diagnostics. Racy by design: it reflects
/// one instant under the lock and may be stale by the time the caller
/// looks at it.
#[derive(Clone, Copy, Debug)]
pub struct ProcSnapshot {
    pub pid: Pid,
    pub ppid: Pid,
    pub state: ProcState,
    pub is_mcp: bool,
    pub owned: CoreSet,
    pub provisioned: CoreSet,
    pub wanted: u32,
    pub wanted_min: u32,
    pub granted: u32,
    pub pending_events: usize,
    pub mailbox_overflows: u64,
}
