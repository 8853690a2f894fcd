//! Core revocation: the warn-then-reclaim protocol.

use super::request::run_pending;
use super::{deliver_event, dispatch, get_tick, pcb_mut, sched, stage_kmsg, Outbox};
use crate::alarm::{self, RevokeToken};
use crate::corealloc::RevokeState;
use crate::errno::{Error, KResult};
use crate::event::EventMsg;
use crate::process::ProcState;
use crate::smp::KernelMessage;
use crate::{kdebug, kpanic, kwarn};

/// Begin revoking `core` from its current owner. The owner gets a
/// `PreemptPending` event and `grace` ticks to yield the core on its own;
/// if the deadline passes first, the core is reclaimed by force. At most
/// one revocation per core can be in flight.
pub fn preempt_core(core: usize, grace: u64) -> KResult<()> {
    let mut ks = sched();
    if core >= ks.cores.num_cores() {
        return Err(Error::Inval);
    }
    let Some(owner) = ks.cores.alloc_of(core) else {
        return Err(Error::Inval);
    };
    if ks.cores.core(core).pending_revoke.is_some() {
        return Err(Error::Busy);
    }
    let seq = ks.cores.seq_of(core);
    let deadline = get_tick() + grace;
    // Mark before notifying: an owner that reacts to the event always
    // finds the pending mark when its yield takes the lock.
    let alarm_id = alarm::arm(deadline, RevokeToken { core, seq });
    ks.cores.core_mut(core).pending_revoke = Some(RevokeState {
        seq,
        deadline,
        alarm: alarm_id,
    });
    deliver_event(&mut ks, owner, EventMsg::PreemptPending { core, deadline });
    ks.stats.preempt_warnings += 1;
    kdebug!("core {}: preempt warning, deadline {}", core, deadline);
    Ok(())
}

/// Deadline handler for one revocation alarm. The token's sequence is
/// re-checked under the scheduler lock: a cooperative yield (or process
/// death) in the alarm's race window clears the pending mark, making the
/// token stale and this call a no-op.
pub(crate) fn handle_revoke_deadline(token: RevokeToken) {
    let mut out = Outbox::new();
    let mut ks = sched();
    let core = token.core;
    let live = ks
        .cores
        .core(core)
        .pending_revoke
        .map_or(false, |rv| rv.seq == token.seq);
    if !live {
        return;
    }
    let Some(owner) = ks.cores.alloc_of(core) else {
        kpanic!("pending revocation on idle core {}", core);
    };
    let seq = ks.cores.seq_of(core);
    ks.cores.mark_idle(core);
    stage_kmsg(&mut ks, &mut out, core, KernelMessage::StopCore { proc: owner, seq });
    let pid;
    {
        let pcb = pcb_mut(&mut ks, owner);
        pid = pcb.pid;
        pcb.owned.clear(core);
        pcb.granted -= 1;
        // Forced loss shrinks the standing request; the process must ask
        // again if it still wants the capacity.
        pcb.wanted = pcb.granted;
        match pcb.state {
            ProcState::RunningM if pcb.granted == 0 => pcb.set_state(ProcState::RunnableM),
            ProcState::RunningS => pcb.set_state(ProcState::Waiting),
            _ => {}
        }
    }
    deliver_event(&mut ks, owner, EventMsg::PreemptDone { core, forced: true });
    ks.stats.forced_reclaims += 1;
    kwarn!("core {}: force-reclaimed from pid {} at deadline", core, pid);
    run_pending(&mut ks, &mut out);
    drop(ks);
    dispatch(out);
}
