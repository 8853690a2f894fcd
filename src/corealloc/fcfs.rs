//! The core registry and the FCFS selection policy.
//!
//! First-come-first-served with no priorities and no preemption-for-fairness:
//! requests are serviced in arrival order, and an already-granted core is
//! never taken away to satisfy a later request. The only preference the
//! policy knows is provisioning, and even that only orders the idle cores a
//! grant picks from.

use alloc::vec::Vec;

use crate::kpanic;
use crate::process::ProcRef;
use crate::smp::{CoreSet, MAX_CORES};

use super::types::SchedPcore;

pub struct CoreMap {
    cores: Vec<SchedPcore>,
    idle: CoreSet,
}

impl CoreMap {
    pub fn new(num_cores: usize) -> Self {
        if num_cores == 0 || num_cores > MAX_CORES {
            kpanic!("corealloc: bad machine size {}", num_cores);
        }
        let cores: Vec<SchedPcore> = (0..num_cores).map(|_| SchedPcore::new()).collect();
        let idle: CoreSet = (0..num_cores).collect();
        Self { cores, idle }
    }

    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }

    pub fn core(&self, id: usize) -> &SchedPcore {
        &self.cores[id]
    }

    pub(crate) fn core_mut(&mut self, id: usize) -> &mut SchedPcore {
        &mut self.cores[id]
    }

    pub fn is_idle(&self, id: usize) -> bool {
        self.idle.contains(id)
    }

    pub fn idle_count(&self) -> usize {
        self.idle.count() as usize
    }

    pub fn idle_cores(&self) -> CoreSet {
        self.idle
    }

    pub fn alloc_of(&self, id: usize) -> Option<ProcRef> {
        self.cores[id].alloc
    }

    pub fn seq_of(&self, id: usize) -> u64 {
        self.cores[id].alloc_seq
    }

    /// Grant `id` to `proc`: record ownership, bump the grant sequence, and
    /// drop the core from the idle set. Returns the new sequence, which the
    /// start-core message must carry. Granting a non-idle core is a bug.
    pub fn mark_allocated(&mut self, id: usize, proc: ProcRef) -> u64 {
        let spc = &mut self.cores[id];
        if spc.alloc.is_some() {
            kpanic!("core {} double-allocated", id);
        }
        spc.alloc = Some(proc);
        spc.alloc_seq += 1;
        self.idle.clear(id);
        spc.alloc_seq
    }

    /// Reclaim `id`: clear ownership and any pending revocation, and return
    /// the core to the idle set. Returns the previous owner. Reclaiming an
    /// idle core is a bug.
    pub fn mark_idle(&mut self, id: usize) -> ProcRef {
        let spc = &mut self.cores[id];
        let Some(prev) = spc.alloc.take() else {
            kpanic!("core {} marked idle twice", id);
        };
        spc.pending_revoke = None;
        self.idle.set(id);
        prev
    }

    /// Adjust the provisioning claim on `id`. Does not move ownership; the
    /// claim is a hint the allocator orders candidates by.
    pub fn provision(&mut self, id: usize, proc: Option<ProcRef>) {
        self.cores[id].prov = proc;
    }

    /// Pick up to `n` idle cores for `prefer`, best candidates first:
    /// idle cores provisioned to `prefer`, then unprovisioned idle cores,
    /// then idle cores provisioned to some other process (borrowed without
    /// stripping the other process's claim). Lowest core id wins ties in
    /// each class. Returns fewer than `n` when the machine is short; the
    /// caller decides whether that meets the request's minimum.
    pub fn find_idle_cores(&self, n: usize, prefer: Option<ProcRef>) -> Vec<usize> {
        let mut picked = Vec::new();
        if n == 0 {
            return picked;
        }

        // Pass 1: idle cores provisioned to the requester.
        for id in self.idle.iter() {
            if picked.len() == n {
                return picked;
            }
            if prefer.is_some() && self.cores[id].prov == prefer {
                picked.push(id);
            }
        }
        // Pass 2: unprovisioned idle cores.
        for id in self.idle.iter() {
            if picked.len() == n {
                return picked;
            }
            if self.cores[id].prov.is_none() {
                picked.push(id);
            }
        }
        // Pass 3: idle cores provisioned to someone else.
        for id in self.idle.iter() {
            if picked.len() == n {
                return picked;
            }
            if self.cores[id].prov.is_some() && self.cores[id].prov != prefer {
                picked.push(id);
            }
        }
        picked
    }
}
