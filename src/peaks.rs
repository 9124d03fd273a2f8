//! Loading ChIP-seq peak files into per-contig interval sets.
//!
//! Peak files are named `<TF_LABEL>_<TF_NAME>_...`, where the TF name ends
//! in `human` or `mouse`; that suffix picks the assembly prefix prepended to
//! every contig so human and mouse peaks can share one namespace.

use crate::bed::{BedError, BedReader, Result};
use crate::config::ValidationMode;
use crate::interval::Interval;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Peaks keyed by assembly-qualified contig name.
pub type PeakSet = BTreeMap<String, Vec<Interval>>;

/// Factor and assembly information parsed from a peak file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakSource {
    pub path: PathBuf,
    pub tf_label: String,
    pub tf_name: String,
    pub assembly_prefix: &'static str,
}

impl PeakSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |message: &str| BedError::InvalidFileName {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        let basename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid("not a valid UTF-8 file name"))?;

        let mut fields = basename.split('_');
        let tf_label = fields.next().filter(|s| !s.is_empty());
        let tf_name = fields.next().filter(|s| !s.is_empty());
        let (Some(tf_label), Some(tf_name)) = (tf_label, tf_name) else {
            return Err(invalid("expected <TF_LABEL>_<TF_NAME>_..."));
        };

        let assembly_prefix = assembly_prefix(tf_name)
            .ok_or_else(|| invalid("TF name must end in 'human' or 'mouse'"))?;

        Ok(Self {
            path: path.to_path_buf(),
            tf_label: tf_label.to_string(),
            tf_name: tf_name.to_string(),
            assembly_prefix,
        })
    }
}

/// Assembly prefix for a TF name (`CTCF_human` style suffix).
pub fn assembly_prefix(tf_name: &str) -> Option<&'static str> {
    if tf_name.ends_with("human") {
        Some("hg19_")
    } else if tf_name.ends_with("mouse") {
        Some("mm9_")
    } else {
        None
    }
}

/// Read one peak file into `peaks`, labelling each peak with the TF label.
///
/// Returns the number of peaks added.
pub fn load_peaks_from_file(
    source: &PeakSource,
    peaks: &mut PeakSet,
    validation: ValidationMode,
) -> Result<usize> {
    let reader = BedReader::from_path(&source.path)?.with_validation(validation);
    let mut count = 0;

    for record in reader.records() {
        let record = record?;
        let mut interval = record.interval;
        interval.chrom = format!("{}{}", source.assembly_prefix, interval.chrom);
        interval.label = Some(source.tf_label.clone());
        peaks.entry(interval.chrom.clone()).or_default().push(interval);
        count += 1;
    }

    Ok(count)
}

/// Load peak files and group their peaks by TF label.
pub fn load_peaks_grouped_by_tf<P: AsRef<Path>>(
    paths: &[P],
    validation: ValidationMode,
) -> Result<BTreeMap<String, PeakSet>> {
    let mut grouped: BTreeMap<String, PeakSet> = BTreeMap::new();

    for (i, path) in paths.iter().enumerate() {
        let source = PeakSource::from_path(path)?;
        log::info!(
            "Loading {}/{} {} ({})",
            i + 1,
            paths.len(),
            source.path.display(),
            source.tf_label
        );
        let peaks = grouped.entry(source.tf_label.clone()).or_default();
        let n = load_peaks_from_file(&source, peaks, validation)?;
        log::debug!("{} peaks from {}", n, source.path.display());
    }

    Ok(grouped)
}

/// Load peak files into one set spanning every factor.
pub fn load_all_peaks<P: AsRef<Path>>(paths: &[P], validation: ValidationMode) -> Result<PeakSet> {
    let mut peaks = PeakSet::new();
    for path in paths {
        let source = PeakSource::from_path(path)?;
        load_peaks_from_file(&source, &mut peaks, validation)?;
    }
    Ok(peaks)
}

/// Flatten a peak set into a single interval list.
pub fn into_intervals(peaks: PeakSet) -> Vec<Interval> {
    peaks.into_values().flatten().collect()
}
