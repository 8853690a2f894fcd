//! Core registry type definitions.

use crate::alarm::AlarmId;
use crate::process::ProcRef;

/// An in-progress revocation of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevokeState {
    /// Grant sequence the revocation targets; a re-granted core gets a new
    /// sequence, so a stale revocation can never hit the new owner.
    pub seq: u64,
    /// Scheduler tick by which the owner must have yielded.
    pub deadline: u64,
    /// The armed deadline alarm.
    pub alarm: AlarmId,
}

/// Per-physical-core record. The core id is the index into the registry.
pub struct SchedPcore {
    /// Process currently granted this core, or None when idle. Set and
    /// cleared only by the grant/reclaim paths, never optimistically.
    pub alloc: Option<ProcRef>,
    /// Process with a standing provisioning claim, independent of `alloc`.
    pub prov: Option<ProcRef>,
    /// Bumped on every grant; kernel messages carry the value they were
    /// issued under so stale signals can be recognized and dropped.
    pub alloc_seq: u64,
    pub pending_revoke: Option<RevokeState>,
}

impl SchedPcore {
    pub(crate) const fn new() -> Self {
        Self {
            alloc: None,
            prov: None,
            alloc_seq: 0,
            pending_revoke: None,
        }
    }
}
