//! ENCODE peak-file catalog records.
//!
//! The records themselves come from an external metadata fetch; this module
//! holds their typed form, the rules for choosing which peak files to use
//! per target, and the file naming that [`crate::peaks::PeakSource`] later
//! parses back.

use crate::bed::{BedError, Result};
use std::collections::BTreeMap;
use std::fmt;

pub const ENCODE_BASE_URL: &str = "https://www.encodeproject.org";

/// Output type of ENCODE's uniform peak-calling pipeline.
pub const UNIFORMLY_PROCESSED: &str = "UniformlyProcessedPeakCalls";

/// Accepted peak file formats.
pub const PEAK_FILE_FORMATS: [&str; 2] = ["bed_broadPeak", "bed_narrowPeak"];

/// Which replicate a peak file was called on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReplicateKey {
    /// Called on pooled replicates.
    Merged,
    Replicate { biological: u32, technical: u32 },
}

impl ReplicateKey {
    /// Parse `merged` or `<biological>,<technical>`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("merged") {
            return Some(ReplicateKey::Merged);
        }
        let (bio, tech) = s.split_once(',')?;
        Some(ReplicateKey::Replicate {
            biological: bio.trim().parse().ok()?,
            technical: tech.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for ReplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicateKey::Merged => write!(f, "merged"),
            ReplicateKey::Replicate {
                biological,
                technical,
            } => write!(f, "rep{}-{}", biological, technical),
        }
    }
}

/// A ChIP-seq target (transcription factor).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetInfo {
    pub label: String,
    pub name: String,
    pub uniprot_ids: Vec<String>,
    pub gene_ids: Vec<String>,
}

/// One called-peak file of an experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakFile {
    pub exp_id: String,
    pub target_id: String,
    pub sample_type: String,
    pub rep_key: ReplicateKey,
    /// Biosample accession, `merged` for pooled calls.
    pub bsid: String,
    pub file_format: String,
    pub output_type: String,
    /// Server-relative download path.
    pub file_loc: String,
}

impl PeakFile {
    pub fn is_peak_format(&self) -> bool {
        PEAK_FILE_FORMATS.contains(&self.file_format.as_str())
    }

    pub fn is_merged(&self) -> bool {
        self.rep_key == ReplicateKey::Merged
    }

    pub fn is_uniformly_processed(&self) -> bool {
        self.output_type == UNIFORMLY_PROCESSED
    }

    pub fn url(&self) -> String {
        format!("{}{}", ENCODE_BASE_URL, self.file_loc)
    }
}

/// Peak-file selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Keep only pooled-replicate calls.
    pub only_merged: bool,
    /// When a target has uniformly processed calls, drop the others.
    pub prefer_uniformly_processed: bool,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            only_merged: true,
            prefer_uniformly_processed: true,
        }
    }
}

/// Choose which of one target's peak files to use.
pub fn select_peak_files(files: Vec<PeakFile>, policy: SelectionPolicy) -> Vec<PeakFile> {
    let files: Vec<PeakFile> = files.into_iter().filter(PeakFile::is_peak_format).collect();
    let any_uniform = files.iter().any(PeakFile::is_uniformly_processed);

    files
        .into_iter()
        .filter(|f| {
            (!policy.prefer_uniformly_processed || !any_uniform || f.is_uniformly_processed())
                && (!policy.only_merged || f.is_merged())
        })
        .collect()
}

/// Group peak files by target id, in target order.
pub fn group_by_target(files: Vec<PeakFile>) -> BTreeMap<String, Vec<PeakFile>> {
    let mut targets: BTreeMap<String, Vec<PeakFile>> = BTreeMap::new();
    for file in files {
        targets.entry(file.target_id.clone()).or_default().push(file);
    }
    targets
}

/// Local file name for a downloaded, sorted and bgzipped peak file.
///
/// Starts with `<label>_<name>_` so the factor can be recovered from the
/// name alone.
pub fn human_readable_name(target: &TargetInfo, file: &PeakFile) -> String {
    let name = format!(
        "{}_{}_{}_{}.EXP-{}.{}.{}.{}.bgz",
        target.label,
        target.name,
        file.output_type,
        file.sample_type.replace(' ', "-"),
        file.exp_id,
        file.rep_key,
        file.output_type,
        file.file_format
    );
    name.replace('/', "#FWDSLASH#")
}

/// A catalog row: a peak file with its target, as read from a TSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub target: TargetInfo,
    pub file: PeakFile,
}

impl CatalogRecord {
    /// Minimum number of columns in a catalog TSV row.
    pub const MIN_COLUMNS: usize = 10;

    /// Parse a TSV row: exp_id, target_id, target_label, target_name,
    /// sample_type, replicate, biosample, file_format, output_type,
    /// file_loc, and optionally uniprot ids and gene ids (comma lists).
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < Self::MIN_COLUMNS {
            return Err(BedError::Parse {
                line: line_number,
                message: format!(
                    "Expected at least {} catalog columns, got {}",
                    Self::MIN_COLUMNS,
                    fields.len()
                ),
            });
        }

        let rep_key = ReplicateKey::parse(fields[5]).ok_or_else(|| BedError::Parse {
            line: line_number,
            message: format!("Invalid replicate '{}'", fields[5]),
        })?;
        let list = |i: usize| -> Vec<String> {
            fields
                .get(i)
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|x| !x.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Self {
            target: TargetInfo {
                label: fields[2].to_string(),
                name: fields[3].to_string(),
                uniprot_ids: list(10),
                gene_ids: list(11),
            },
            file: PeakFile {
                exp_id: fields[0].to_string(),
                target_id: fields[1].to_string(),
                sample_type: fields[4].to_string(),
                rep_key,
                bsid: fields[6].to_string(),
                file_format: fields[7].to_string(),
                output_type: fields[8].to_string(),
                file_loc: fields[9].to_string(),
            },
        })
    }

    /// The tab-joined summary row written for a selected file.
    pub fn summary(&self) -> String {
        [
            self.file.exp_id.as_str(),
            self.target.name.as_str(),
            self.target.label.as_str(),
            &self.target.uniprot_ids.join(","),
            &self.target.gene_ids.join(","),
            self.file.sample_type.as_str(),
            self.file.output_type.as_str(),
            &self.file.url(),
            &human_readable_name(&self.target, &self.file),
        ]
        .join("\t")
    }
}
