//! SMP type definitions.

use core::fmt;

/// Upper bound on physical cores; the live machine size is set at
/// `ksched::init` and may be smaller.
pub const MAX_CORES: usize = 64;

/// A set of physical core ids, one bit per core.
///
/// Iteration order is lowest core id first, which is what makes allocator
/// decisions deterministic and testable.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreSet(u64);

impl CoreSet {
    pub const EMPTY: CoreSet = CoreSet(0);

    pub fn set(&mut self, core: usize) {
        debug_assert!(core < MAX_CORES);
        self.0 |= 1 << core;
    }

    pub fn clear(&mut self, core: usize) {
        debug_assert!(core < MAX_CORES);
        self.0 &= !(1 << core);
    }

    pub fn contains(&self, core: usize) -> bool {
        core < MAX_CORES && self.0 & (1 << core) != 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> CoreSetIter {
        CoreSetIter(self.0)
    }
}

impl FromIterator<usize> for CoreSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut set = CoreSet::EMPTY;
        for core in iter {
            set.set(core);
        }
        set
    }
}

impl fmt::Debug for CoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over a `CoreSet`, lowest core id first.
pub struct CoreSetIter(u64);

impl Iterator for CoreSetIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let core = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(core)
    }
}
