//! Process lifecycle: creation, running, yielding, blocking, destruction,
//! and core provisioning.

use super::request::{ensure_queued, run_pending};
use super::{deliver_event, dispatch, pcb_mut, sched, stage_kmsg, Ksched, Outbox, RequestOutcome};
use crate::alarm;
use crate::errno::{Error, KResult};
use crate::event::EventMsg;
use crate::process::{Pid, ProcRef, ProcState};
use crate::smp::{CoreSet, KernelMessage};
use crate::{kdebug, kinfo, kpanic};

/// Allocate a PCB for a new process. It starts in `Created` with a refcount
/// of one (the creation reference) and owns nothing.
pub fn create_process(ppid: Pid) -> KResult<Pid> {
    let mut ks = sched();
    let Some(r) = ks.procs.alloc(ppid) else {
        return Err(Error::TooManyProcs);
    };
    let pid = pcb_mut(&mut ks, r).pid;
    kinfo!("created pid {} (parent {})", pid, ppid);
    Ok(pid)
}

/// Make a process runnable as a single-core, time-shared process and try
/// to place it. An MCP restarts through here too after losing all cores.
pub fn run_process(pid: Pid) -> KResult<RequestOutcome> {
    let mut out = Outbox::new();
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    {
        let pcb = pcb_mut(&mut ks, r);
        match pcb.state {
            ProcState::Dying => return Err(Error::Dying),
            ProcState::RunningS | ProcState::RunningM | ProcState::Waiting => {
                return Err(Error::Busy)
            }
            ProcState::Created => {
                pcb.wanted = 1;
                pcb.wanted_min = 1;
                pcb.set_state(ProcState::RunnableS);
            }
            ProcState::RunnableS => {
                pcb.wanted = 1;
                pcb.wanted_min = 1;
            }
            ProcState::RunnableM => {
                if pcb.wanted == 0 {
                    pcb.wanted = 1;
                    pcb.wanted_min = 1;
                }
            }
        }
    }
    if ks.procs.get(r).map_or(false, |p| p.wants_more()) {
        ensure_queued(&mut ks, r);
    }
    run_pending(&mut ks, &mut out);
    let (granted, wanted) = match ks.procs.get(r) {
        Some(pcb) => (pcb.granted, pcb.wanted),
        None => (0, 0),
    };
    drop(ks);
    dispatch(out);
    if granted >= wanted {
        Ok(RequestOutcome::Granted(granted))
    } else {
        Ok(RequestOutcome::Pending)
    }
}

/// Give a core back. A yield on a core under a pending revocation is the
/// cooperative half of the revocation handshake: the deadline alarm is
/// disarmed and the freed core goes to whoever the allocator picks next,
/// not back to the yielder. A voluntary yield shrinks the standing request
/// to match; an MCP dropping its last core re-enters the queue wanting one.
pub fn yield_core(pid: Pid, core: usize) -> KResult<()> {
    let mut out = Outbox::new();
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    if !ks.procs.get(r).map_or(false, |p| p.owned.contains(core)) {
        return Err(Error::Inval);
    }
    let revoked = ks.cores.core(core).pending_revoke;
    if let Some(rv) = revoked {
        // If the alarm already fired, its handler is waiting on the
        // scheduler lock and will find the revocation gone; exactly one
        // side reclaims.
        alarm::cancel(rv.alarm);
        ks.stats.cooperative_yields += 1;
    }
    let seq = ks.cores.seq_of(core);
    ks.cores.mark_idle(core);
    stage_kmsg(&mut ks, &mut out, core, KernelMessage::StopCore { proc: r, seq });
    let mut requeue = false;
    {
        let pcb = pcb_mut(&mut ks, r);
        pcb.owned.clear(core);
        pcb.granted -= 1;
        if revoked.is_some() {
            pcb.wanted = pcb.granted;
            match pcb.state {
                ProcState::RunningM if pcb.granted == 0 => pcb.set_state(ProcState::RunnableM),
                ProcState::RunningS => pcb.set_state(ProcState::Waiting),
                _ => {}
            }
        } else {
            match pcb.state {
                ProcState::RunningM => {
                    pcb.wanted = pcb.granted;
                    if pcb.granted == 0 {
                        // Last core gone: park runnable, wanting one core
                        // to restart from the gang's entry context.
                        pcb.wanted = 1;
                        pcb.wanted_min = 1;
                        pcb.set_state(ProcState::RunnableM);
                        requeue = true;
                    }
                }
                ProcState::RunningS => {
                    pcb.set_state(ProcState::Waiting);
                    pcb.set_state(ProcState::RunnableS);
                    pcb.wanted = 1;
                    pcb.wanted_min = 1;
                    requeue = true;
                }
                other => {
                    kpanic!("yield from pid {} in state {}", pid, other.as_str());
                }
            }
        }
    }
    if revoked.is_some() {
        deliver_event(&mut ks, r, EventMsg::PreemptDone { core, forced: false });
    }
    if requeue {
        ensure_queued(&mut ks, r);
    }
    kdebug!("pid {} yielded core {}{}", pid, core, if revoked.is_some() { " (revoked)" } else { "" });
    run_pending(&mut ks, &mut out);
    drop(ks);
    dispatch(out);
    Ok(())
}

/// Park a running process in `Waiting`, releasing every core it holds.
pub fn block_process(pid: Pid) -> KResult<()> {
    let mut out = Outbox::new();
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    let state = ks.procs.get(r).map(|p| p.state);
    match state {
        Some(ProcState::RunningS) | Some(ProcState::RunningM) => {}
        Some(ProcState::Dying) => return Err(Error::Dying),
        _ => return Err(Error::Inval),
    }
    release_all_cores(&mut ks, r, &mut out);
    pcb_mut(&mut ks, r).set_state(ProcState::Waiting);
    ks.pending.retain(|&x| x != r);
    kdebug!("pid {} blocked", pid);
    run_pending(&mut ks, &mut out);
    drop(ks);
    dispatch(out);
    Ok(())
}

/// Unpark a `Waiting` process and let it compete for cores again. Returns
/// false if there was nothing to wake.
pub fn wake_process(pid: Pid) -> bool {
    let mut out = Outbox::new();
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return false;
    };
    {
        let pcb = pcb_mut(&mut ks, r);
        if pcb.state != ProcState::Waiting {
            return false;
        }
        if pcb.is_mcp {
            if pcb.wanted == 0 {
                pcb.wanted = 1;
                pcb.wanted_min = 1;
            }
            pcb.set_state(ProcState::RunnableM);
        } else {
            pcb.wanted = 1;
            pcb.wanted_min = 1;
            pcb.set_state(ProcState::RunnableS);
        }
    }
    ensure_queued(&mut ks, r);
    run_pending(&mut ks, &mut out);
    drop(ks);
    dispatch(out);
    true
}

/// Tear a process down. Idempotent: destroying a `Dying` process is a
/// no-op. All cores are reclaimed immediately (no grace period) and the
/// creation reference is dropped; the PCB slot is actually freed once the
/// last in-flight message referencing it drains.
pub fn destroy_process(pid: Pid) -> KResult<()> {
    let mut out = Outbox::new();
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    if ks.procs.get(r).map_or(true, |p| p.state == ProcState::Dying) {
        return Ok(());
    }
    deliver_event(&mut ks, r, EventMsg::ProcessDying);
    release_all_cores(&mut ks, r, &mut out);
    {
        let pcb = pcb_mut(&mut ks, r);
        pcb.set_state(ProcState::Dying);
        pcb.wanted = 0;
        pcb.wanted_min = 0;
    }
    ks.pending.retain(|&x| x != r);
    kinfo!("destroying pid {}", pid);
    ks.procs.decref(r);
    run_pending(&mut ks, &mut out);
    drop(ks);
    dispatch(out);
    Ok(())
}

/// Release every core `r` owns: registry to idle, revocation alarms
/// cancelled, one `StopCore` per core. Leaves the PCB state untouched.
pub(crate) fn release_all_cores(ks: &mut Ksched, r: ProcRef, out: &mut Outbox) {
    let owned = match ks.procs.get(r) {
        Some(pcb) => pcb.owned,
        None => return,
    };
    for core in owned.iter() {
        if let Some(rv) = ks.cores.core(core).pending_revoke {
            alarm::cancel(rv.alarm);
        }
        let seq = ks.cores.seq_of(core);
        ks.cores.mark_idle(core);
        stage_kmsg(ks, out, core, KernelMessage::StopCore { proc: r, seq });
    }
    let pcb = pcb_mut(ks, r);
    pcb.owned = CoreSet::EMPTY;
    pcb.granted = 0;
}

/// Record a provisioning preference: when `core` is idle and `pid` asks
/// for cores, the allocator hands it out before unprovisioned ones. Any
/// previous provisioning of the core is replaced.
pub fn provision_core(pid: Pid, core: usize) -> KResult<()> {
    let mut ks = sched();
    if core >= ks.cores.num_cores() {
        return Err(Error::Inval);
    }
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    if ks.procs.get(r).map_or(true, |p| p.state == ProcState::Dying) {
        return Err(Error::Dying);
    }
    if let Some(old) = ks.cores.core(core).prov {
        if old == r {
            return Ok(());
        }
        if let Some(old_pcb) = ks.procs.get_mut(old) {
            old_pcb.provisioned.clear(core);
        }
    }
    ks.cores.provision(core, Some(r));
    pcb_mut(&mut ks, r).provisioned.set(core);
    kdebug!("core {} provisioned to pid {}", core, pid);
    Ok(())
}

/// Drop any provisioning preference on `core`. Does not touch the current
/// allocation, only who is preferred next time the core is idle.
pub fn deprovision_core(core: usize) -> KResult<()> {
    let mut ks = sched();
    if core >= ks.cores.num_cores() {
        return Err(Error::Inval);
    }
    if let Some(old) = ks.cores.core(core).prov {
        if let Some(pcb) = ks.procs.get_mut(old) {
            pcb.provisioned.clear(core);
        }
        ks.cores.provision(core, None);
    }
    Ok(())
}
