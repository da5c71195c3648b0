//! Static work partitioning across compute cores
//!
//! `n` elements are split over `C` cores as `base = n / C` contiguous
//! elements per core, starting at `core * base`. The `n mod C` leftover
//! elements at the tail go one each to the lowest-indexed cores:
//! core `i < remainder` additionally owns element `C * base + i`.
//!
//! ```text
//! n = 8, C = 3:   base = 2, remainder = 2
//!
//!   index   0 1 | 2 3 | 4 5 | 6 7
//!   core    0 0 | 1 1 | 2 2 | 0 1
//! ```

use crate::error::{Error, Result};
use serde::Serialize;

/// Index-to-core assignment for one kernel invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionPlan {
    core_count: usize,
    n: usize,
    base: usize,
    remainder: usize,
}

/// Elements owned by one core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoreRange {
    /// First element of the contiguous block
    pub start: usize,
    /// Length of the contiguous block
    pub count: usize,
    /// Remainder element, if this core owns one
    pub extra: Option<usize>,
}

impl CoreRange {
    pub fn has_extra(&self) -> bool {
        self.extra.is_some()
    }

    /// Total elements owned
    pub fn len(&self) -> usize {
        self.count + usize::from(self.has_extra())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned indices in processing order (block, then remainder)
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..self.start + self.count).chain(self.extra)
    }
}

impl PartitionPlan {
    /// Plan `n` elements over `core_count` cores
    pub fn new(n: usize, core_count: usize) -> Result<Self> {
        if core_count == 0 {
            return Err(Error::partition("core count must be at least 1"));
        }
        let base = n / core_count;
        Ok(Self {
            core_count,
            n,
            base,
            remainder: n - base * core_count,
        })
    }

    pub fn core_count(&self) -> usize {
        self.core_count
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Contiguous block length per core
    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of cores that own a remainder element
    pub fn remainder(&self) -> usize {
        self.remainder
    }

    /// Range owned by `core`
    pub fn range(&self, core: usize) -> Result<CoreRange> {
        if core >= self.core_count {
            return Err(Error::partition(format!(
                "core index {} out of range for {} cores",
                core, self.core_count
            )));
        }
        Ok(CoreRange {
            start: core * self.base,
            count: self.base,
            extra: (core < self.remainder).then(|| self.core_count * self.base + core),
        })
    }

    /// Ranges of every core in core order
    pub fn ranges(&self) -> impl Iterator<Item = CoreRange> + '_ {
        (0..self.core_count).filter_map(move |core| self.range(core).ok())
    }

    /// Core that owns element `index`
    pub fn owner_of(&self, index: usize) -> Option<usize> {
        if index >= self.n {
            return None;
        }
        let block_end = self.core_count * self.base;
        if index < block_end {
            Some(index / self.base)
        } else {
            Some(index - block_end)
        }
    }
}

/// Plan `n` elements over `core_count` cores
pub fn plan(n: usize, core_count: usize) -> Result<PartitionPlan> {
    PartitionPlan::new(n, core_count)
}

/// Range owned by `core_index` under `plan`
pub fn my_range(plan: &PartitionPlan, core_index: usize) -> Result<CoreRange> {
    plan.range(core_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_eight_over_three() {
        let plan = plan(8, 3).unwrap();
        assert_eq!(plan.base(), 2);
        assert_eq!(plan.remainder(), 2);

        let r0 = my_range(&plan, 0).unwrap();
        let r1 = my_range(&plan, 1).unwrap();
        let r2 = my_range(&plan, 2).unwrap();

        assert_eq!(r0.indices().collect::<Vec<_>>(), vec![0, 1, 6]);
        assert_eq!(r1.indices().collect::<Vec<_>>(), vec![2, 3, 7]);
        assert_eq!(r2.indices().collect::<Vec<_>>(), vec![4, 5]);
        assert!(!r2.has_extra());
        assert_eq!(r0.extra, Some(6));
    }

    #[test]
    fn test_fewer_elements_than_cores() {
        let plan = plan(3, 8).unwrap();
        assert_eq!(plan.base(), 0);
        let owned: Vec<usize> = plan.ranges().map(|r| r.len()).collect();
        assert_eq!(owned, vec![1, 1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(plan.owner_of(2), Some(2));
    }

    #[test]
    fn test_empty_input() {
        let plan = plan(0, 4).unwrap();
        assert!(plan.ranges().all(|r| r.is_empty()));
        assert_eq!(plan.owner_of(0), None);
    }

    #[test]
    fn test_rejects_zero_cores() {
        assert!(matches!(plan(10, 0), Err(Error::Partition(_))));
    }

    #[test]
    fn test_rejects_foreign_core_index() {
        let plan = plan(10, 4).unwrap();
        assert!(matches!(my_range(&plan, 4), Err(Error::Partition(_))));
    }

    proptest! {
        #[test]
        fn prop_perfect_cover(n in 0usize..2_000, cores in 1usize..17) {
            let plan = plan(n, cores).unwrap();
            let mut seen = vec![0u32; n];
            for (core, range) in plan.ranges().enumerate() {
                for index in range.indices() {
                    prop_assert!(index < n);
                    prop_assert_eq!(plan.owner_of(index), Some(core));
                    seen[index] += 1;
                }
            }
            prop_assert!(seen.iter().all(|&count| count == 1));
        }

        #[test]
        fn prop_exact_multiples_have_no_remainder(base in 0usize..200, cores in 1usize..17) {
            let plan = plan(base * cores, cores).unwrap();
            prop_assert_eq!(plan.remainder(), 0);
            prop_assert!(plan.ranges().all(|r| r.count == base && !r.has_extra()));
        }

        #[test]
        fn prop_load_is_balanced(n in 0usize..2_000, cores in 1usize..17) {
            let plan = plan(n, cores).unwrap();
            let sizes: Vec<usize> = plan.ranges().map(|r| r.len()).collect();
            let max = sizes.iter().copied().max().unwrap_or(0);
            let min = sizes.iter().copied().min().unwrap_or(0);
            prop_assert!(max - min <= 1);
        }
    }
}
