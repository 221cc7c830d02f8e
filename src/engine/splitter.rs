// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Partitioning of the item index into work units.
//!
//! Every entry point produces units that are contiguous, non-overlapping and
//! cover `[0, total_items)` exactly. Only the last unit may be shorter than
//! the unit size; its `end_pos` is clamped to `total_items`.

use crate::config::consts::{DEFAULT_ITEMS_PER_UNIT, DEFAULT_UNIT_COUNT};
use crate::config::JobConfig;
use crate::errors::InvalidPartition;
use crate::payload::WorkUnit;

/// Splits `[0, total_items)` into units of `items_per_unit` items.
pub fn split_by_size(
    total_items: u64,
    items_per_unit: u64,
    proc_count: u32,
) -> Result<Vec<WorkUnit>, InvalidPartition> {
    if total_items == 0 {
        return Err(InvalidPartition::new("total_items must be greater than zero"));
    }
    if items_per_unit == 0 {
        return Err(InvalidPartition::new("items_per_unit must be greater than zero"));
    }
    if proc_count == 0 {
        return Err(InvalidPartition::new("proc_count must be greater than zero"));
    }

    let capacity = usize::try_from(total_items.div_ceil(items_per_unit)).unwrap_or(usize::MAX);
    let mut units = Vec::with_capacity(capacity.min(1 << 20));
    let mut start = 0;
    while start < total_items {
        let end = start.saturating_add(items_per_unit).min(total_items);
        units.push(WorkUnit::new(start, end, proc_count));
        start = end;
    }

    Ok(units)
}

/// Splits `[0, total_items)` into at most `unit_count` units of
/// `ceil(total_items / unit_count)` items. Yields fewer units when the
/// remainder runs out early (10 items over 4 units gives 3, 3, 3, 1; 10 over
/// 6 gives five units of 2).
pub fn split_by_count(
    total_items: u64,
    unit_count: u64,
    proc_count: u32,
) -> Result<Vec<WorkUnit>, InvalidPartition> {
    if unit_count == 0 {
        return Err(InvalidPartition::new("unit_count must be greater than zero"));
    }
    split_by_size(total_items, total_items.div_ceil(unit_count), proc_count)
}

/// `unit_count` units of `items_per_unit` items each, the shape the CLI's
/// `-n` / `-p` flags describe.
pub fn split_invocations(
    unit_count: u64,
    items_per_unit: u64,
    proc_count: u32,
) -> Result<Vec<WorkUnit>, InvalidPartition> {
    if unit_count == 0 {
        return Err(InvalidPartition::new("unit_count must be greater than zero"));
    }
    if items_per_unit == 0 {
        return Err(InvalidPartition::new("items_per_unit must be greater than zero"));
    }
    let total_items = unit_count.checked_mul(items_per_unit).ok_or_else(|| {
        InvalidPartition::new(format!(
            "{} units of {} items overflows the item index",
            unit_count, items_per_unit
        ))
    })?;
    split_by_size(total_items, items_per_unit, proc_count)
}

/// A job's sizing, resolved from the `job` section of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPlan {
    BySize {
        total_items: u64,
        items_per_unit: u64,
        proc_count: u32,
    },
    ByCount {
        total_items: u64,
        unit_count: u64,
        proc_count: u32,
    },
    Invocations {
        unit_count: u64,
        items_per_unit: u64,
        proc_count: u32,
    },
}

impl JobPlan {
    pub fn from_config(job: &JobConfig) -> Result<Self, InvalidPartition> {
        let proc_count = job.proc_count;
        match (job.total_items, job.items_per_unit, job.unit_count) {
            (Some(_), Some(_), Some(_)) => Err(InvalidPartition::new(
                "with total_items set, give items_per_unit or unit_count but not both",
            )),
            (Some(total_items), Some(items_per_unit), None) => Ok(JobPlan::BySize {
                total_items,
                items_per_unit,
                proc_count,
            }),
            (Some(total_items), None, Some(unit_count)) => Ok(JobPlan::ByCount {
                total_items,
                unit_count,
                proc_count,
            }),
            (Some(_), None, None) => Err(InvalidPartition::new(
                "total_items needs either items_per_unit or unit_count",
            )),
            (None, items_per_unit, unit_count) => Ok(JobPlan::Invocations {
                unit_count: unit_count.unwrap_or(DEFAULT_UNIT_COUNT),
                items_per_unit: items_per_unit.unwrap_or(DEFAULT_ITEMS_PER_UNIT),
                proc_count,
            }),
        }
        .and_then(|plan| plan.split().map(|_| plan))
    }

    pub fn split(&self) -> Result<Vec<WorkUnit>, InvalidPartition> {
        match *self {
            JobPlan::BySize {
                total_items,
                items_per_unit,
                proc_count,
            } => split_by_size(total_items, items_per_unit, proc_count),
            JobPlan::ByCount {
                total_items,
                unit_count,
                proc_count,
            } => split_by_count(total_items, unit_count, proc_count),
            JobPlan::Invocations {
                unit_count,
                items_per_unit,
                proc_count,
            } => split_invocations(unit_count, items_per_unit, proc_count),
        }
    }

    /// Upper bound of the item index the plan covers.
    pub fn total_items(&self) -> u64 {
        match *self {
            JobPlan::BySize { total_items, .. } | JobPlan::ByCount { total_items, .. } => {
                total_items
            }
            JobPlan::Invocations {
                unit_count,
                items_per_unit,
                ..
            } => unit_count.saturating_mul(items_per_unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(units: &[WorkUnit]) -> Vec<(u64, u64)> {
        units.iter().map(|u| (u.start_pos, u.end_pos)).collect()
    }

    fn assert_exact_cover(units: &[WorkUnit], total_items: u64) {
        assert_eq!(units.first().map(|u| u.start_pos), Some(0));
        assert_eq!(units.last().map(|u| u.end_pos), Some(total_items));
        for pair in units.windows(2) {
            assert_eq!(pair[0].end_pos, pair[1].start_pos);
        }
        for unit in units {
            assert!(unit.validate().is_ok());
        }
        assert_eq!(units.iter().map(WorkUnit::len).sum::<u64>(), total_items);
    }

    #[test]
    fn test_even_split() {
        let units = split_by_size(1000, 250, 2).unwrap();
        assert_eq!(
            ranges(&units),
            vec![(0, 250), (250, 500), (500, 750), (750, 1000)]
        );
    }

    #[test]
    fn test_remainder_is_clamped() {
        let units = split_by_size(1001, 250, 2).unwrap();
        assert_eq!(units.len(), 5);
        assert_eq!(ranges(&units)[4], (1000, 1001));
    }

    #[test]
    fn test_cover_property_over_many_shapes() {
        for total_items in [1u64, 2, 7, 10, 99, 100, 101, 997, 1000] {
            for items_per_unit in [1u64, 2, 3, 10, 33, 250, 1000, 5000] {
                let units = split_by_size(total_items, items_per_unit, 1).unwrap();
                assert_exact_cover(&units, total_items);
                assert_eq!(units.len() as u64, total_items.div_ceil(items_per_unit));
            }
        }
    }

    #[test]
    fn test_unit_larger_than_total() {
        let units = split_by_size(3, 10, 4).unwrap();
        assert_eq!(units, vec![WorkUnit::new(0, 3, 4)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(split_by_size(0, 10, 1).is_err());
        assert!(split_by_size(10, 0, 1).is_err());
        assert!(split_by_size(10, 5, 0).is_err());
        assert!(split_by_count(10, 0, 1).is_err());
        assert!(split_invocations(0, 2, 1).is_err());
        assert!(split_invocations(5, 0, 1).is_err());
        assert!(split_invocations(u64::MAX, 2, 1).is_err());
    }

    #[test]
    fn test_split_by_count() {
        let units = split_by_count(10, 4, 1).unwrap();
        assert_eq!(ranges(&units), vec![(0, 3), (3, 6), (6, 9), (9, 10)]);

        let units = split_by_count(10, 6, 1).unwrap();
        assert_eq!(units.len(), 5);
        assert_exact_cover(&units, 10);
    }

    #[test]
    fn test_split_invocations_matches_cli_defaults() {
        let units = split_invocations(5, 2, 2).unwrap();
        assert_eq!(
            ranges(&units),
            vec![(0, 2), (2, 4), (4, 6), (6, 8), (8, 10)]
        );
        assert!(units.iter().all(|u| u.proc_count == 2));
    }

    #[test]
    fn test_plan_from_config() {
        let mut job = JobConfig::default();
        assert_eq!(
            JobPlan::from_config(&job).unwrap(),
            JobPlan::Invocations {
                unit_count: 5,
                items_per_unit: 2,
                proc_count: 2
            }
        );

        job.total_items = Some(1001);
        job.items_per_unit = Some(250);
        let plan = JobPlan::from_config(&job).unwrap();
        assert_eq!(plan.total_items(), 1001);
        assert_eq!(plan.split().unwrap().len(), 5);

        job.unit_count = Some(3);
        assert!(JobPlan::from_config(&job).is_err());

        job.items_per_unit = None;
        assert_eq!(
            JobPlan::from_config(&job).unwrap().split().unwrap().len(),
            3
        );
    }

    #[test]
    fn test_plan_rejects_zero_proc_count() {
        let job = JobConfig {
            proc_count: 0,
            ..JobConfig::default()
        };
        assert!(JobPlan::from_config(&job).is_err());
    }
}
