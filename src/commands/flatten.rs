//! Flatten peaks from many factors into labelled merged sites.

use crate::bed::Result;
use crate::commands::merge::{MergeCommand, MergeStats};
use crate::interval::MergedSpan;
use crate::peaks::{into_intervals, load_all_peaks, PeakSet};
use std::io::Write;
use std::path::Path;

/// Merge a peak set contig by contig; each span carries the sorted set of
/// factors that bind inside it.
pub fn flatten_peaks(peaks: PeakSet, merge: &MergeCommand) -> Result<Vec<MergedSpan>> {
    merge.merge(into_intervals(peaks))
}

/// Flatten command configuration.
#[derive(Debug, Clone, Default)]
pub struct FlattenCommand {
    pub merge: MergeCommand,
}

impl FlattenCommand {
    pub fn new(merge: MergeCommand) -> Self {
        Self { merge }
    }

    /// Load every peak file, flatten across factors and write the sites.
    pub fn run<P: AsRef<Path>, W: Write>(&self, inputs: &[P], output: W) -> Result<MergeStats> {
        let peaks = load_all_peaks(inputs, self.merge.config.validation)?;
        log::info!("Loaded peaks on {} contigs from {} files", peaks.len(), inputs.len());
        self.merge.run_intervals(into_intervals(peaks), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_peaks_collects_factors() {
        let mut peaks = PeakSet::new();
        peaks.insert(
            "hg19_chr1".to_string(),
            vec![
                Interval::labeled("hg19_chr1", 100, 200, "SP1"),
                Interval::labeled("hg19_chr1", 150, 300, "CTCF"),
                Interval::labeled("hg19_chr1", 120, 180, "SP1"),
                Interval::labeled("hg19_chr1", 500, 600, "RAD21"),
            ],
        );
        peaks.insert(
            "mm9_chr1".to_string(),
            vec![Interval::labeled("mm9_chr1", 100, 200, "Ctcf")],
        );

        let spans = flatten_peaks(peaks, &MergeCommand::new()).unwrap();
        let rows: Vec<String> = spans.iter().map(|s| s.to_string()).collect();

        assert_eq!(
            rows,
            vec![
                "hg19_chr1\t100\t300\tCTCF,SP1",
                "hg19_chr1\t500\t600\tRAD21",
                "mm9_chr1\t100\t200\tCtcf",
            ]
        );
    }

    #[test]
    fn test_flatten_command_run() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("SP1_SP1-human_a.bed");
        let b = dir.path().join("CTCF_CTCF-human_b.bed");
        writeln!(std::fs::File::create(&a).unwrap(), "chr1\t100\t200").unwrap();
        writeln!(std::fs::File::create(&b).unwrap(), "chr1\t190\t220").unwrap();

        let mut out = Vec::new();
        let stats = FlattenCommand::default().run(&[a, b], &mut out).unwrap();

        assert_eq!(stats.intervals_read, 2);
        assert_eq!(stats.spans_written, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "hg19_chr1\t100\t220\tCTCF,SP1\n");
    }
}
