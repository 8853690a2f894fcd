//! Userspace event mailboxes.
//!
//! The scheduler tells a process about asynchronous core loss through its
//! event mailbox: a small fixed ring, read by userspace (or by tests).
//! Delivery is best-effort: a full mailbox drops the message and bumps an
//! overflow counter the process can poll. Overflow is the process's problem.

/// Messages per mailbox before overflow.
pub const EVENT_MAILBOX_DEPTH: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventMsg {
    /// A core the process holds is about to be revoked; yield it before
    /// `deadline` (a scheduler tick) or lose it mid-stream.
    PreemptPending { core: usize, deadline: u64 },
    /// A revocation completed. `forced` is true when the deadline expired
    /// before the process yielded.
    PreemptDone { core: usize, forced: bool },
    /// The process is being torn down.
    ProcessDying,
}

pub struct EventMailbox {
    ring: [Option<EventMsg>; EVENT_MAILBOX_DEPTH],
    head: usize,
    count: usize,
    /// Messages dropped because the ring was full.
    pub overflows: u64,
}

impl EventMailbox {
    pub const fn new() -> Self {
        Self {
            ring: [None; EVENT_MAILBOX_DEPTH],
            head: 0,
            count: 0,
            overflows: 0,
        }
    }

    /// Append a message; returns false (and counts the overflow) when full.
    pub(crate) fn push(&mut self, msg: EventMsg) -> bool {
        if self.count == EVENT_MAILBOX_DEPTH {
            self.overflows += 1;
            return false;
        }
        let tail = (self.head + self.count) % EVENT_MAILBOX_DEPTH;
        self.ring[tail] = Some(msg);
        self.count += 1;
        true
    }

    /// Remove the oldest message, if any.
    pub fn pop(&mut self) -> Option<EventMsg> {
        if self.count == 0 {
            return None;
        }
        let msg = self.ring[self.head].take();
        self.head = (self.head + 1) % EVENT_MAILBOX_DEPTH;
        self.count -= 1;
        msg
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
