//! Per-core kernel message queues.
//!
//! A kernel message is the fire-and-forget signal the scheduler uses to make
//! a grant or reclaim physically real on the target core. The sender does
//! not wait; the target core drains its own queue (the IPI handler in a real
//! machine, an explicit pump here and in tests).
//!
//! Every message carries the grant sequence number it was issued under, and
//! a PCB reference is held from enqueue until the message has been handled,
//! so a dying process outlives its queued signals.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::kdebug;
use crate::process::ProcRef;

use super::types::MAX_CORES;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelMessage {
    /// Install `proc`'s context on the target core and start executing it.
    /// `seq` is the registry's grant sequence for the core at send time.
    StartCore { proc: ProcRef, seq: u64 },
    /// Stop executing `proc` on the target core (revocation or death).
    StopCore { proc: ProcRef, seq: u64 },
}

impl KernelMessage {
    pub(crate) fn proc(&self) -> ProcRef {
        match *self {
            KernelMessage::StartCore { proc, .. } => proc,
            KernelMessage::StopCore { proc, .. } => proc,
        }
    }
}

lazy_static! {
    static ref KMSG_QUEUES: Vec<Mutex<VecDeque<KernelMessage>>> = (0..MAX_CORES)
        .map(|_| Mutex::new(VecDeque::new()))
        .collect();
}

/// Post a message to `core`'s queue. Fire-and-forget: no completion signal
/// comes back. The caller must already hold a PCB reference on behalf of
/// the message (see `ksched`).
pub fn send_kernel_message(core: usize, msg: KernelMessage) {
    debug_assert!(core < MAX_CORES);
    kdebug!("kmsg: core {} <- {:?}", core, msg);
    KMSG_QUEUES[core].lock().push_back(msg);
}

/// Messages waiting on `core`'s queue.
pub fn queued_messages(core: usize) -> usize {
    KMSG_QUEUES[core].lock().len()
}

/// Drain and handle every message queued for `core`, in FIFO order. This is
/// the target core's half of the grant/revocation protocol; each message is
/// re-validated against the registry and silently dropped when stale.
/// Returns the number of messages handled.
pub fn drain_kernel_messages(core: usize) -> usize {
    let mut handled = 0;
    loop {
        let msg = {
            let mut queue = KMSG_QUEUES[core].lock();
            queue.pop_front()
        };
        let Some(msg) = msg else { break };
        match msg {
            KernelMessage::StartCore { proc, seq } => {
                crate::ksched::kmsg_startcore(core, proc, seq);
            }
            KernelMessage::StopCore { proc, seq } => {
                crate::ksched::kmsg_stopcore(core, proc, seq);
            }
        }
        handled += 1;
    }
    handled
}

pub(crate) fn reset() {
    for queue in KMSG_QUEUES.iter() {
        queue.lock().clear();
    }
}
