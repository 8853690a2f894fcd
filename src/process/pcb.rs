//! The process control block.
//!
//! Only scheduler-visible fields live here: lifecycle state, the owned and
//! provisioned core sets, resource-request accounting, the refcount, and
//! the userspace event mailbox. All of it is mutated exclusively inside the
//! scheduler's critical section.

use crate::event::EventMailbox;
use crate::ktrace;
use crate::smp::CoreSet;

use super::state::assert_state_transition;
use super::types::{Pid, ProcState, ReqFlags};

pub struct Pcb {
    pub pid: Pid,
    pub ppid: Pid,
    pub state: ProcState,
    /// Set once the process makes a many-core request; never unset.
    pub is_mcp: bool,
    /// Cores currently granted to this process.
    pub owned: CoreSet,
    /// Cores this process holds a standing provisioning claim on.
    pub provisioned: CoreSet,
    /// Standing core request: total wanted, minimum for a first grant.
    pub wanted: u32,
    pub wanted_min: u32,
    pub req_flags: ReqFlags,
    /// How many of `wanted` have been granted so far.
    pub granted: u32,
    /// Places this PCB "exists": creation counts 1, each in-flight kernel
    /// message referencing it counts 1. Freed at zero, in Dying only.
    pub refcnt: u32,
    pub mailbox: EventMailbox,
}

impl Pcb {
    pub(crate) fn new(pid: Pid, ppid: Pid) -> Self {
        Self {
            pid,
            ppid,
            state: ProcState::Created,
            is_mcp: false,
            owned: CoreSet::EMPTY,
            provisioned: CoreSet::EMPTY,
            wanted: 0,
            wanted_min: 0,
            req_flags: ReqFlags::empty(),
            granted: 0,
            refcnt: 1,
            mailbox: EventMailbox::new(),
        }
    }

    /// Transition to `new`, enforcing the lifecycle table.
    pub(crate) fn set_state(&mut self, new: ProcState) {
        assert_state_transition(self.pid, self.state, new);
        ktrace!(
            "pid {} state: {} -> {}",
            self.pid,
            self.state.as_str(),
            new.as_str()
        );
        self.state = new;
    }

    /// True while the standing request is not fully granted.
    pub fn wants_more(&self) -> bool {
        self.state != ProcState::Dying && self.granted < self.wanted
    }
}
