//! Select peak files from a catalog export and name them for download.

use crate::bed::{open_input, should_skip_line, Result};
use crate::catalog::{group_by_target, select_peak_files, CatalogRecord, SelectionPolicy};
use crate::output::SpanWriter;
use rustc_hash::FxHashMap;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Catalog command configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogCommand {
    pub policy: SelectionPolicy,
}

impl CatalogCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Read catalog rows from a TSV; lines starting with `#` are skipped.
    pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<CatalogRecord>> {
        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if should_skip_line(&line) {
                continue;
            }
            records.push(CatalogRecord::parse(&line, i + 1)?);
        }
        Ok(records)
    }

    /// Apply the selection policy per target. Output is in target order,
    /// then input order within a target.
    pub fn select(&self, records: Vec<CatalogRecord>) -> Vec<CatalogRecord> {
        let mut targets = FxHashMap::default();
        let mut files = Vec::with_capacity(records.len());
        for record in records {
            targets
                .entry(record.file.target_id.clone())
                .or_insert(record.target);
            files.push(record.file);
        }

        let mut selected = Vec::new();
        for (target_id, target_files) in group_by_target(files) {
            let Some(target) = targets.get(&target_id) else {
                continue;
            };
            let kept = select_peak_files(target_files, self.policy);
            log::debug!("{}: kept {} peak files", target_id, kept.len());
            selected.extend(kept.into_iter().map(|file| CatalogRecord {
                target: target.clone(),
                file,
            }));
        }
        selected
    }

    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: W) -> Result<CatalogStats> {
        let reader = BufReader::new(open_input(input.as_ref())?);
        let records = Self::read_records(reader)?;
        let mut stats = CatalogStats {
            records: records.len(),
            ..Default::default()
        };

        let selected = self.select(records);
        let mut writer = SpanWriter::new(output);
        for record in &selected {
            writer.write_line(&record.summary())?;
        }
        writer.flush()?;

        stats.selected = selected.len();
        Ok(stats)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub records: usize,
    pub selected: usize,
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Records: {}, Selected: {}", self.records, self.selected)
    }
}
