//! Per-factor peak merging.
//!
//! Replicate and experiment peak files for the same factor are merged into
//! one `<tf>.mergedpeaks.bed` file per factor. Factors are processed in
//! parallel; each factor's merge is independent.

use crate::bed::{BedError, Result};
use crate::commands::flatten::flatten_peaks;
use crate::commands::merge::MergeCommand;
use crate::interval::MergedSpan;
use crate::output::SpanWriter;
use crate::peaks::{load_peaks_grouped_by_tf, PeakSet};
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// File name suffix of per-factor output.
pub const MERGED_PEAKS_SUFFIX: &str = "mergedpeaks.bed";

/// Merge-by-TF command configuration.
#[derive(Debug, Clone)]
pub struct MergeByTfCommand {
    pub merge: MergeCommand,
    pub output_dir: PathBuf,
    /// Also write `mergedpeaks.bed` flattening every factor together.
    pub merge_all: bool,
}

impl MergeByTfCommand {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            merge: MergeCommand::new(),
            output_dir: output_dir.into(),
            merge_all: false,
        }
    }

    pub fn with_merge(mut self, merge: MergeCommand) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_merge_all(mut self, merge_all: bool) -> Self {
        self.merge_all = merge_all;
        self
    }

    /// Merge peaks per factor and write one file per factor.
    ///
    /// Returns the written paths, sorted by factor label (the combined file,
    /// if requested, comes last).
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<Vec<PathBuf>> {
        let grouped = load_peaks_grouped_by_tf(inputs, self.merge.config.validation)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let combined = if self.merge_all {
            let mut all = PeakSet::new();
            for peaks in grouped.values() {
                for (contig, intervals) in peaks {
                    all.entry(contig.clone())
                        .or_default()
                        .extend(intervals.iter().cloned());
                }
            }
            Some(all)
        } else {
            None
        };

        let mut written: Vec<PathBuf> = grouped
            .into_par_iter()
            .map(|(tf, peaks)| {
                log::info!("Merging {}", tf);
                let spans = flatten_peaks(peaks, &self.merge)?;
                check_single_factor(&tf, &spans)?;
                let path = self.output_dir.join(format!("{}.{}", tf, MERGED_PEAKS_SUFFIX));
                write_spans(&path, &spans)?;
                Ok(path)
            })
            .collect::<Result<Vec<_>>>()?;
        written.sort();

        if let Some(all) = combined {
            let spans = flatten_peaks(all, &self.merge)?;
            let path = self.output_dir.join(MERGED_PEAKS_SUFFIX);
            write_spans(&path, &spans)?;
            written.push(path);
        }

        Ok(written)
    }
}

fn check_single_factor(tf: &str, spans: &[MergedSpan]) -> Result<()> {
    for span in spans {
        if span.labels.len() != 1 || span.labels[0] != tf {
            return Err(BedError::InvalidFormat(format!(
                "Merged span {}:{}-{} for {} carries labels [{}]",
                span.chrom,
                span.start,
                span.end,
                tf,
                span.label_list()
            )));
        }
    }
    Ok(())
}

fn write_spans(path: &Path, spans: &[MergedSpan]) -> Result<()> {
    let mut writer = SpanWriter::new(File::create(path)?);
    for span in spans {
        writer.write_span(span)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        write!(File::create(&path).unwrap(), "{}", content).unwrap();
        path
    }

    #[test]
    fn test_merge_by_tf_writes_one_file_per_factor() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let files = vec![
            write_file(input.path(), "SP1_SP1-human_rep1.bed", "chr1\t100\t200\nchr1\t500\t600\n"),
            write_file(input.path(), "SP1_SP1-human_rep2.bed", "chr1\t150\t300\n"),
            write_file(input.path(), "CTCF_CTCF-human_a.bed", "chr1\t250\t350\n"),
        ];

        let written = MergeByTfCommand::new(output.path())
            .with_merge_all(true)
            .run(&files)
            .unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["CTCF.mergedpeaks.bed", "SP1.mergedpeaks.bed", "mergedpeaks.bed"]
        );

        let sp1 = std::fs::read_to_string(output.path().join("SP1.mergedpeaks.bed")).unwrap();
        assert_eq!(sp1, "hg19_chr1\t100\t300\tSP1\nhg19_chr1\t500\t600\tSP1\n");

        let all = std::fs::read_to_string(output.path().join("mergedpeaks.bed")).unwrap();
        assert_eq!(all, "hg19_chr1\t100\t350\tCTCF,SP1\nhg19_chr1\t500\t600\tSP1\n");
    }

    #[test]
    fn test_check_single_factor() {
        let spans = crate::commands::merge::merge_overlapping(
            vec![
                crate::interval::Interval::labeled("chr1", 0, 10, "A"),
                crate::interval::Interval::labeled("chr1", 5, 15, "B"),
            ],
            None,
        );
        assert!(check_single_factor("A", &spans).is_err());
        assert!(check_single_factor("A", &spans[..0]).is_ok());
    }
}
