//! The PCB arena.
//!
//! Fixed-capacity slot table with a generation counter per slot. Everything
//! outside the table (the core registry, kernel messages) refers to a
//! process through a `ProcRef` (slot index plus generation), never a
//! pointer, so a recycled slot invalidates stale references instead of
//! aliasing a new process.

use alloc::vec::Vec;

use crate::kpanic;

use super::pcb::Pcb;
use super::types::{Pid, ProcState, MAX_PROCESSES};

/// Weak reference to a PCB: valid only while the slot generation matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcRef {
    pub(crate) slot: usize,
    pub(crate) gen: u32,
}

struct Slot {
    gen: u32,
    pcb: Option<Pcb>,
}

pub struct ProcTable {
    slots: Vec<Slot>,
    next_pid: Pid,
}

impl ProcTable {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_PROCESSES).map(|_| Slot { gen: 1, pcb: None }).collect(),
            next_pid: 1,
        }
    }

    /// Allocate a fresh PCB in `Created` with refcount 1 (the creation
    /// reference). Fails when the arena is full.
    pub fn alloc(&mut self, ppid: Pid) -> Option<ProcRef> {
        let slot = self.slots.iter().position(|s| s.pcb.is_none())?;
        let pid = self.next_pid;
        self.next_pid += 1;
        self.slots[slot].pcb = Some(Pcb::new(pid, ppid));
        Some(ProcRef {
            slot,
            gen: self.slots[slot].gen,
        })
    }

    pub fn get(&self, r: ProcRef) -> Option<&Pcb> {
        let slot = self.slots.get(r.slot)?;
        if slot.gen != r.gen {
            return None;
        }
        slot.pcb.as_ref()
    }

    pub fn get_mut(&mut self, r: ProcRef) -> Option<&mut Pcb> {
        let slot = self.slots.get_mut(r.slot)?;
        if slot.gen != r.gen {
            return None;
        }
        slot.pcb.as_mut()
    }

    pub fn by_pid(&self, pid: Pid) -> Option<ProcRef> {
        for (slot, s) in self.slots.iter().enumerate() {
            if let Some(pcb) = &s.pcb {
                if pcb.pid == pid {
                    return Some(ProcRef { slot, gen: s.gen });
                }
            }
        }
        None
    }

    /// Take a reference on behalf of something that will hold `r` (e.g. a
    /// queued kernel message).
    pub fn incref(&mut self, r: ProcRef) {
        match self.get_mut(r) {
            Some(pcb) => pcb.refcnt += 1,
            None => kpanic!("incref on dead proc ref {:?}", r),
        }
    }

    /// Drop a reference. When the count hits zero the PCB is freed and the
    /// slot generation advances; the process must already be Dying with no
    /// cores, since live processes always hold their creation reference.
    /// Returns true if the PCB was freed.
    pub fn decref(&mut self, r: ProcRef) -> bool {
        let Some(pcb) = self.get_mut(r) else {
            kpanic!("decref on dead proc ref {:?}", r);
        };
        if pcb.refcnt == 0 {
            kpanic!("refcount underflow on pid {}", pcb.pid);
        }
        pcb.refcnt -= 1;
        if pcb.refcnt > 0 {
            return false;
        }
        if pcb.state != ProcState::Dying || !pcb.owned.is_empty() {
            kpanic!(
                "freeing pid {} in state {} with {} cores",
                pcb.pid,
                pcb.state.as_str(),
                pcb.owned.count()
            );
        }
        let pid = pcb.pid;
        self.slots[r.slot].pcb = None;
        self.slots[r.slot].gen += 1;
        crate::kdebug!("freed PCB for pid {}", pid);
        true
    }

    /// References to every live PCB, in slot order.
    pub fn live_refs(&self) -> impl Iterator<Item = ProcRef> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, s)| {
            s.pcb.as_ref().map(|_| ProcRef { slot, gen: s.gen })
        })
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.pcb.is_some()).count()
    }
}
