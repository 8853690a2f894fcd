//! Process control blocks and the process state machine.
//!
//! - `types`: pid, process states, resource requests
//! - `pcb`: the PCB itself (scheduler-visible fields only)
//! - `table`: the PCB arena with generation-tagged weak references
//! - `state`: the legal state transition table

mod pcb;
mod state;
mod table;
mod types;

pub use pcb::Pcb;
pub use table::{ProcRef, ProcTable};
pub use types::{Pid, ProcState, ReqFlags, ResourceRequest, MAX_PROCESSES};
