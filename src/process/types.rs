//! Process type definitions.

use bitflags::bitflags;

use crate::errno::{Error, KResult};

pub type Pid = u64;

/// PCB arena capacity.
pub const MAX_PROCESSES: usize = 64;

/// Process lifecycle states.
///
/// `_S` states describe a single-core process (one core, one context);
/// `_M` states describe a many-core process that asked for a partition of
/// the machine. Only the scheduler transitions a process between states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcState {
    /// PCB allocated, never run.
    Created,
    /// Single-core process ready to run.
    RunnableS,
    /// Single-core process executing on its one core.
    RunningS,
    /// Blocked; holds no cores.
    Waiting,
    /// Many-core process waiting for cores to be granted.
    RunnableM,
    /// Many-core process holding at least one core.
    RunningM,
    /// Exiting; cores being reclaimed, PCB freed once unreferenced.
    Dying,
}

impl ProcState {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcState::Created => "CREATED",
            ProcState::RunnableS => "RUNNABLE_S",
            ProcState::RunningS => "RUNNING_S",
            ProcState::Waiting => "WAITING",
            ProcState::RunnableM => "RUNNABLE_M",
            ProcState::RunningM => "RUNNING_M",
            ProcState::Dying => "DYING",
        }
    }

    /// True for the two states in which the process must hold cores.
    pub const fn is_running(self) -> bool {
        matches!(self, ProcState::RunningS | ProcState::RunningM)
    }
}

bitflags! {
    /// Resource request flags.
    pub struct ReqFlags: u32 {
        /// The caller does not wait for the grant. An unmet minimum is
        /// reported as a pending outcome rather than an error, and later
        /// grants arrive through the event mailbox.
        const ASYNC = 1 << 0;
    }
}

/// A request for cores: how many are wanted, the minimum acceptable, and
/// flags. Consumed by the allocator in one decision pass; if only partially
/// satisfied it stays pending on the PCB until fully granted or dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceRequest {
    pub amt_wanted: u32,
    pub amt_wanted_min: u32,
    pub flags: ReqFlags,
}

impl ResourceRequest {
    pub fn new(amt_wanted: u32, amt_wanted_min: u32) -> Self {
        Self {
            amt_wanted,
            amt_wanted_min,
            flags: ReqFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: ReqFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn validate(&self) -> KResult<()> {
        if self.amt_wanted == 0 {
            return Err(Error::Inval);
        }
        if self.amt_wanted_min > self.amt_wanted {
            return Err(Error::Inval);
        }
        Ok(())
    }
}
