//! Merge configuration.
//!
//! Settings are passed explicitly to each command rather than held in
//! process-wide state, so independent merges (per TF, per TAD worker) can run
//! side by side with different parameters.

use crate::bed::{BedError, Result};
use crate::interval::Interval;

/// How strictly interval coordinates are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Accept any coordinates, including `start > end` and negatives.
    #[default]
    Permissive,
    /// Reject inverted intervals and negative coordinates.
    Strict,
}

impl ValidationMode {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Permissive
        }
    }

    /// Check an interval against this mode.
    #[inline]
    pub fn check(self, interval: &Interval) -> Result<()> {
        if self == ValidationMode::Permissive {
            return Ok(());
        }
        if interval.start < 0 || interval.end < 0 {
            return Err(BedError::InvalidInterval {
                chrom: interval.chrom.clone(),
                start: interval.start,
                end: interval.end,
                reason: "negative coordinate".to_string(),
            });
        }
        if interval.is_inverted() {
            return Err(BedError::InvalidInterval {
                chrom: interval.chrom.clone(),
                start: interval.start,
                end: interval.end,
                reason: "start > end".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters shared by every merge-based command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeConfig {
    /// Maximum running span width before a new span is forced (unbounded if None).
    pub max_span_width: Option<u64>,
    pub validation: ValidationMode,
}

impl MergeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_span_width(mut self, width: Option<u64>) -> Self {
        self.max_span_width = width;
        self
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }
}
