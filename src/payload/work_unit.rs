// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::InvalidPartition;

/// A contiguous half-open range `[start_pos, end_pos)` of the item index,
/// plus how many sub-workers should share it.
///
/// The JSON form carries exactly these three fields. Missing fields are
/// rejected by deserialization; unknown fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    pub start_pos: u64,
    pub end_pos: u64,
    pub proc_count: u32,
}

impl WorkUnit {
    pub fn new(start_pos: u64, end_pos: u64, proc_count: u32) -> Self {
        Self {
            start_pos,
            end_pos,
            proc_count,
        }
    }

    pub fn len(&self) -> u64 {
        self.end_pos.saturating_sub(self.start_pos)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> UnitRange {
        UnitRange::new(self.start_pos, self.end_pos)
    }

    pub fn validate(&self) -> Result<(), InvalidPartition> {
        if self.start_pos >= self.end_pos {
            return Err(InvalidPartition::new(format!(
                "unit {} is empty or reversed",
                self.range()
            )));
        }
        if self.proc_count == 0 {
            return Err(InvalidPartition::new(format!(
                "unit {} asks for zero sub-workers",
                self.range()
            )));
        }
        Ok(())
    }

    /// Storage key of the artifact this unit produces: `{prefix}{start}-{end}{suffix}`.
    pub fn artifact_key(&self, prefix: &str, suffix: &str) -> String {
        format!("{}{}-{}{}", prefix, self.start_pos, self.end_pos, suffix)
    }

    /// The queue message / invocation body for this unit.
    pub fn to_body(&self) -> String {
        serde_json::json!({
            "start_pos": self.start_pos,
            "end_pos": self.end_pos,
            "proc_count": self.proc_count,
        })
        .to_string()
    }

    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Inclusive-exclusive bounds used to report which part of the index a
/// failure or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRange {
    pub start_pos: u64,
    pub end_pos: u64,
}

impl UnitRange {
    pub fn new(start_pos: u64, end_pos: u64) -> Self {
        Self { start_pos, end_pos }
    }

    /// Smallest range covering every unit, or `None` for an empty slice.
    pub fn spanning(units: &[WorkUnit]) -> Option<Self> {
        let start = units.iter().map(|u| u.start_pos).min()?;
        let end = units.iter().map(|u| u.end_pos).max()?;
        Some(Self::new(start, end))
    }
}

impl fmt::Display for UnitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_pos, self.end_pos)
    }
}

/// An ordered group of units handed to one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBatch {
    index: usize,
    units: Vec<WorkUnit>,
}

impl PayloadBatch {
    /// Chunks `units` in index order into batches of at most `max` (at least 1).
    pub fn partition(units: &[WorkUnit], max: usize) -> Vec<PayloadBatch> {
        units
            .chunks(max.max(1))
            .enumerate()
            .map(|(index, chunk)| PayloadBatch {
                index,
                units: chunk.to_vec(),
            })
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn range(&self) -> UnitRange {
        UnitRange::spanning(&self.units).unwrap_or(UnitRange::new(0, 0))
    }

    pub fn into_units(self) -> Vec<WorkUnit> {
        self.units
    }
}
