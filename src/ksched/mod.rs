//! The kernel scheduler: process lifecycle, core allocation and the
//! asynchronous grant/revoke machinery, all serialized behind one lock.
//!
//! Lock ordering: the scheduler lock is taken first, then (at most one of)
//! the alarm table, a per-core message queue, or the current-process map.
//! Nothing takes the scheduler lock while holding any of those, which is
//! why kernel messages are drained by popping under the queue lock and
//! handling after releasing it.

mod lifecycle;
mod preempt;
mod request;
mod types;

pub use lifecycle::{
    block_process, create_process, deprovision_core, destroy_process, provision_core, run_process,
    wake_process, yield_core,
};
pub use preempt::preempt_core;
pub use request::{cancel_request, request_cores};
pub use types::{ProcSnapshot, RequestOutcome, SchedStats};

pub(crate) use preempt::handle_revoke_deadline;
pub(crate) use types::Ksched;

use core::sync::atomic::{AtomicU64, Ordering};

use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::{Mutex, MutexGuard};

use crate::alarm;
use crate::event::EventMsg;
use crate::process::{Pid, ProcRef};
use crate::smp::{self, KernelMessage};
use crate::{kdebug, kinfo, kpanic, ktrace, kwarn};

lazy_static! {
    static ref KSCHED: Mutex<Ksched> = Mutex::new(Ksched::new(1));
}

/// Virtual time, advanced by [`tick`]. Deadlines and log stamps are in
/// these units.
static GLOBAL_TICK: AtomicU64 = AtomicU64::new(0);

/// Kernel messages staged under the scheduler lock and sent after it is
/// released. Each staged message holds a PCB reference taken by the stager.
pub(crate) type Outbox = Vec<(usize, KernelMessage)>;

pub(crate) fn sched() -> MutexGuard<'static, Ksched> {
    KSCHED.lock()
}

/// Stage a message for a target core, pinning the referenced PCB until the
/// message is handled.
pub(crate) fn stage_kmsg(ks: &mut Ksched, out: &mut Outbox, core: usize, msg: KernelMessage) {
    ks.procs.incref(msg.proc());
    out.push((core, msg));
}

pub(crate) fn dispatch(out: Outbox) {
    for (core, msg) in out {
        smp::send_kernel_message(core, msg);
    }
}

/// (Re)initialize the scheduler for a machine with `num_cores` physical
/// cores. All prior processes, alarms and queued messages are discarded.
pub fn init(num_cores: usize) {
    let mut ks = KSCHED.lock();
    *ks = Ksched::new(num_cores);
    drop(ks);
    alarm::reset();
    smp::reset();
    GLOBAL_TICK.store(0, Ordering::Relaxed);
    kinfo!("ksched: {} cores online, all idle", num_cores);
}

pub fn get_tick() -> u64 {
    GLOBAL_TICK.load(Ordering::Relaxed)
}

/// Advance virtual time by one tick and fire any revocation deadlines that
/// have come due. Returns the new time.
pub fn tick() -> u64 {
    let now = GLOBAL_TICK.fetch_add(1, Ordering::Relaxed) + 1;
    for token in alarm::due(now) {
        handle_revoke_deadline(token);
    }
    now
}

pub fn get_stats() -> SchedStats {
    KSCHED.lock().stats
}

pub fn num_cores() -> usize {
    KSCHED.lock().cores.num_cores()
}

pub fn idle_core_count() -> usize {
    KSCHED.lock().cores.idle_count()
}

/// Pid currently allocated the core, if any.
pub fn core_owner(core: usize) -> Option<Pid> {
    let ks = KSCHED.lock();
    let r = ks.cores.alloc_of(core)?;
    Some(ks.procs.get(r)?.pid)
}

pub fn process_snapshot(pid: Pid) -> Option<ProcSnapshot> {
    let ks = KSCHED.lock();
    let r = ks.procs.by_pid(pid)?;
    let pcb = ks.procs.get(r)?;
    Some(ProcSnapshot {
        pid: pcb.pid,
        ppid: pcb.ppid,
        state: pcb.state,
        is_mcp: pcb.is_mcp,
        owned: pcb.owned,
        provisioned: pcb.provisioned,
        wanted: pcb.wanted,
        wanted_min: pcb.wanted_min,
        granted: pcb.granted,
        pending_events: pcb.mailbox.len(),
        mailbox_overflows: pcb.mailbox.overflows,
    })
}

/// Pop the oldest undelivered event for `pid`, if any.
pub fn pop_event(pid: Pid) -> Option<EventMsg> {
    let mut ks = KSCHED.lock();
    let r = ks.procs.by_pid(pid)?;
    ks.procs.get_mut(r)?.mailbox.pop()
}

/// Push an event into a process mailbox, counting delivery or drop.
pub(crate) fn deliver_event(ks: &mut Ksched, r: ProcRef, msg: EventMsg) {
    let Some(pcb) = ks.procs.get_mut(r) else {
        return;
    };
    let pid = pcb.pid;
    if pcb.mailbox.push(msg) {
        ks.stats.events_sent += 1;
        ktrace!("event to pid {}: {:?}", pid, msg);
    } else {
        ks.stats.events_dropped += 1;
        kwarn!("pid {} mailbox full, dropped {:?}", pid, msg);
    }
}

/// Handler for a drained `StartCore`. Re-validates the grant under the
/// scheduler lock: the registry may have moved on since the message was
/// sent, in which case the signal is stale and ignored.
pub(crate) fn kmsg_startcore(core: usize, proc: ProcRef, seq: u64) {
    let mut guard = KSCHED.lock();
    let ks = &mut *guard;
    let fresh = ks.cores.alloc_of(core) == Some(proc)
        && ks.cores.seq_of(core) == seq
        && ks.procs.get(proc).map_or(false, |p| p.state.is_running());
    if fresh {
        smp::set_current(core, Some(proc));
        kdebug!("core {}: now running (seq {})", core, seq);
    } else {
        ks.stats.stale_kmsgs += 1;
        kdebug!("core {}: dropping stale start (seq {})", core, seq);
    }
    ks.procs.decref(proc);
}

/// Handler for a drained `StopCore`. Clears the core's current process if
/// it still matches; otherwise the stop already happened some other way.
pub(crate) fn kmsg_stopcore(core: usize, proc: ProcRef, seq: u64) {
    let mut ks = KSCHED.lock();
    if smp::current_on(core) == Some(proc) {
        smp::set_current(core, None);
        kdebug!("core {}: stopped (seq {})", core, seq);
    } else {
        ks.stats.stale_kmsgs += 1;
    }
    ks.procs.decref(proc);
}

/// Full cross-structure invariant sweep. Cheap enough to run after every
/// test scenario; returns the first violation found.
pub fn check_consistency() -> Result<(), &'static str> {
    let ks = KSCHED.lock();
    for core in 0..ks.cores.num_cores() {
        match ks.cores.alloc_of(core) {
            Some(r) => {
                if ks.cores.is_idle(core) {
                    return Err("allocated core is on the idle list");
                }
                let Some(pcb) = ks.procs.get(r) else {
                    return Err("core allocated to a dead process");
                };
                if !pcb.owned.contains(core) {
                    return Err("registry says allocated, PCB owned set disagrees");
                }
            }
            None => {
                if !ks.cores.is_idle(core) {
                    return Err("unallocated core missing from the idle list");
                }
            }
        }
    }
    let mut seen = crate::smp::CoreSet::EMPTY;
    for r in ks.procs.live_refs() {
        let Some(pcb) = ks.procs.get(r) else {
            continue;
        };
        if pcb.state.is_running() != !pcb.owned.is_empty() {
            return Err("running state does not match core ownership");
        }
        if pcb.granted != pcb.owned.count() {
            return Err("granted count out of sync with owned set");
        }
        for core in pcb.owned.iter() {
            if seen.contains(core) {
                return Err("core owned by two processes");
            }
            seen.set(core);
            if ks.cores.alloc_of(core) != Some(r) {
                return Err("PCB owns a core the registry gave elsewhere");
            }
        }
    }
    Ok(())
}

/// Invariant sweep that panics on violation, for use at kernel checkpoints.
pub fn assert_consistent() {
    if let Err(what) = check_consistency() {
        kpanic!("scheduler consistency check failed: {}", what);
    }
}

/// PCB access for paths where the reference is known live; the arena is
/// never compacted while the scheduler lock is held, so a miss here means
/// scheduler state is corrupt.
pub(crate) fn pcb_mut(ks: &mut Ksched, r: ProcRef) -> &mut crate::process::Pcb {
    match ks.procs.get_mut(r) {
        Some(pcb) => pcb,
        None => kpanic!("stale process reference in scheduler path"),
    }
}

#[cfg(test)]
pub(crate) fn proc_ref_of(pid: Pid) -> Option<ProcRef> {
    KSCHED.lock().procs.by_pid(pid)
}

#[cfg(test)]
pub(crate) fn hold_ref(r: ProcRef) {
    KSCHED.lock().procs.incref(r);
}

#[cfg(test)]
pub(crate) fn live_process_count() -> usize {
    KSCHED.lock().procs.live_count()
}
