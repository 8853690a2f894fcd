//! Physical-core registry and the FCFS core allocation policy.
//!
//! The registry (`CoreMap`) is the source of truth for which process owns
//! which core and which process has a standing provisioning claim on it.
//! It is not independently thread-safe: every entry point assumes the
//! caller holds the scheduler lock.

mod fcfs;
mod types;

pub use fcfs::CoreMap;
pub use types::{RevokeState, SchedPcore};
