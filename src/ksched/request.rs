//! Core requests and the FCFS grant loop.

use super::{dispatch, pcb_mut, sched, stage_kmsg, Ksched, Outbox, RequestOutcome};
use crate::errno::{Error, KResult};
use crate::process::{Pid, ProcRef, ProcState, ReqFlags, ResourceRequest};
use crate::smp::KernelMessage;
use crate::{kdebug, kpanic};

/// Ask the scheduler for cores on behalf of `pid`, replacing any standing
/// request. A single-core process making its first request here becomes an
/// MCP: its time-shared core is released and it re-enters the allocator as
/// a gang of one-to-many cores.
///
/// Shrinking below the current allocation is not a request, it is a yield;
/// asking for fewer cores than are already granted clamps the standing
/// request to the allocation and fails with `Inval`.
///
/// If the minimum cannot be met right away the request stays queued either
/// way, but the reported outcome depends on the flavor: an `ASYNC` request
/// gets `Pending` and hears about cores through its event mailbox, a plain
/// one gets `NoFreeEnv` so the caller knows it holds nothing yet.
pub fn request_cores(pid: Pid, req: ResourceRequest) -> KResult<RequestOutcome> {
    req.validate()?;
    let mut out = Outbox::new();
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    let state = match ks.procs.get(r) {
        Some(pcb) => pcb.state,
        None => return Err(Error::BadProc),
    };
    match state {
        ProcState::Dying => return Err(Error::Dying),
        ProcState::RunnableS => return Err(Error::Inval),
        ProcState::RunningS => {
            // Promotion to MCP: park the process, free its core, and let
            // it compete for a gang like everyone else.
            super::lifecycle::release_all_cores(&mut ks, r, &mut out);
            let pcb = pcb_mut(&mut ks, r);
            pcb.set_state(ProcState::Waiting);
        }
        _ => {}
    }
    {
        let pcb = pcb_mut(&mut ks, r);
        pcb.is_mcp = true;
        if req.amt_wanted < pcb.granted {
            pcb.wanted = pcb.granted;
            drop(ks);
            dispatch(out);
            return Err(Error::Inval);
        }
        pcb.wanted = req.amt_wanted;
        pcb.wanted_min = req.amt_wanted_min.max(1);
        pcb.req_flags = req.flags;
        match pcb.state {
            ProcState::Created | ProcState::Waiting => pcb.set_state(ProcState::RunnableM),
            ProcState::RunnableM | ProcState::RunningM => {}
            other => kpanic!("core request from pid {} in state {}", pid, other.as_str()),
        }
    }
    if ks.procs.get(r).map_or(false, |p| p.wants_more()) {
        ensure_queued(&mut ks, r);
    }
    run_pending(&mut ks, &mut out);
    let (granted, wanted, min, flags) = match ks.procs.get(r) {
        Some(pcb) => (pcb.granted, pcb.wanted, pcb.wanted_min, pcb.req_flags),
        None => (0, 0, 0, ReqFlags::empty()),
    };
    drop(ks);
    dispatch(out);
    if granted >= wanted {
        Ok(RequestOutcome::Granted(granted))
    } else if flags.contains(ReqFlags::ASYNC) || granted >= min {
        Ok(RequestOutcome::Pending)
    } else {
        Err(Error::NoFreeEnv)
    }
}

/// Withdraw the unmet part of a standing request. Cores already granted
/// stay granted; the process just stops waiting for more.
pub fn cancel_request(pid: Pid) -> KResult<()> {
    let mut ks = sched();
    let Some(r) = ks.procs.by_pid(pid) else {
        return Err(Error::BadProc);
    };
    {
        let pcb = pcb_mut(&mut ks, r);
        if pcb.state == ProcState::Dying {
            return Err(Error::Dying);
        }
        pcb.wanted = pcb.granted;
        pcb.wanted_min = pcb.wanted_min.min(pcb.wanted);
    }
    ks.pending.retain(|&x| x != r);
    ks.stats.requests_cancelled += 1;
    kdebug!("pid {}: request cancelled", pid);
    Ok(())
}

/// Append `r` to the pending queue if it is not already on it.
pub(crate) fn ensure_queued(ks: &mut Ksched, r: ProcRef) {
    if !ks.pending.contains(&r) {
        ks.pending.push_back(r);
        ks.stats.requests_queued += 1;
    }
}

/// Service the pending queue, strictly in order. The head keeps the line
/// blocked until its request can make progress: a fresh request needs its
/// minimum, a partially-granted one takes any idle core at all. Later
/// entries are never serviced around a blocked head.
pub(crate) fn run_pending(ks: &mut Ksched, out: &mut Outbox) {
    loop {
        let Some(&head) = ks.pending.front() else {
            break;
        };
        let Some(pcb) = ks.procs.get(head) else {
            ks.pending.pop_front();
            continue;
        };
        if !pcb.wants_more() {
            ks.pending.pop_front();
            continue;
        }
        let (granted, wanted, min) = (pcb.granted, pcb.wanted, pcb.wanted_min);
        let remaining = (wanted - granted) as usize;
        let picked = ks.cores.find_idle_cores(remaining, Some(head));
        let need = if granted == 0 { min.max(1) as usize } else { 1 };
        if picked.len() < need {
            break;
        }
        grant_cores(ks, head, &picked, out);
        if ks.procs.get(head).map_or(false, |p| p.wants_more()) {
            // Machine exhausted with the head still hungry; it stays at
            // the front and waits for the next idle core.
            break;
        }
        ks.pending.pop_front();
    }
}

/// Hand every core in `cores` to `r`: registry first, then PCB, then a
/// `StartCore` message per core. The messages carry the grant sequence so
/// the drain side can detect a grant that was undone before delivery.
pub(crate) fn grant_cores(ks: &mut Ksched, r: ProcRef, cores: &[usize], out: &mut Outbox) {
    for &core in cores {
        let seq = ks.cores.mark_allocated(core, r);
        stage_kmsg(ks, out, core, KernelMessage::StartCore { proc: r, seq });
        let pcb = pcb_mut(ks, r);
        pcb.owned.set(core);
        pcb.granted += 1;
        let pid = pcb.pid;
        ks.stats.grants += 1;
        kdebug!("core {} -> pid {} (seq {})", core, pid, seq);
    }
    let pcb = pcb_mut(ks, r);
    match pcb.state {
        ProcState::RunnableM => pcb.set_state(ProcState::RunningM),
        ProcState::RunnableS => pcb.set_state(ProcState::RunningS),
        ProcState::RunningM | ProcState::RunningS => {}
        other => {
            let pid = pcb.pid;
            kpanic!("granted cores to pid {} in state {}", pid, other.as_str());
        }
    }
}
