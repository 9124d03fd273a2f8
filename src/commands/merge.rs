//! Merge command implementation.
//!
//! O(n log n) stable sort followed by an O(n) single-pass sweep. Each span
//! keeps the intervals it absorbed, so callers can recover which peaks (and
//! which factors) contributed to a merged site.

use crate::bed::{read_intervals, read_labeled_intervals, BedReader, Result};
use crate::config::{MergeConfig, ValidationMode};
use crate::interval::{Interval, MergedSpan};
use crate::output::SpanWriter;
use crate::parallel::{group_by_chromosome, map_chromosomes_sorted, ParallelStats};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

/// Merge intervals that share one coordinate space.
///
/// Intervals are stably sorted by `(start, end)`. An interval opens a new
/// span when it does not reach back into the running span (one starting
/// exactly at the running end is a neighbour, not an overlap), or when the
/// running span is already wider than `max_span_width`. The cap is checked
/// before the next interval is absorbed, so a single wide interval is never
/// split and a capped span can exceed the cap by at most the width of its
/// last member. With a cap, consecutive spans may overlap.
///
/// The chromosome of each interval is not consulted; partition by contig
/// first (see [`MergeCommand::merge`]).
pub fn merge_overlapping(mut intervals: Vec<Interval>, max_span_width: Option<u64>) -> Vec<MergedSpan> {
    intervals.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut iter = intervals.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut result = Vec::new();
    let mut current = MergedSpan::seed(first);

    for interval in iter {
        if interval.start >= current.end || exceeds_cap(&current, max_span_width) {
            let next = MergedSpan::seed(interval);
            result.push(std::mem::replace(&mut current, next).close());
        } else {
            current.absorb(interval);
        }
    }

    result.push(current.close());
    result
}

#[inline]
fn exceeds_cap(span: &MergedSpan, max_span_width: Option<u64>) -> bool {
    match max_span_width {
        // Inverted spans have negative width and never trip the cap.
        Some(cap) => span.width() > 0 && span.width() as u64 > cap,
        None => false,
    }
}

/// Merge command configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    pub config: MergeConfig,
    /// Append the highest member score as a fifth output column.
    pub report_score: bool,
}

impl MergeCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum running span width.
    pub fn with_max_span_width(mut self, width: Option<u64>) -> Self {
        self.config.max_span_width = width;
        self
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.config.validation = mode;
        self
    }

    pub fn with_score(mut self, report_score: bool) -> Self {
        self.report_score = report_score;
        self
    }

    /// Merge intervals from any number of contigs.
    ///
    /// Each contig is merged independently; spans come back ordered by
    /// contig name, then start.
    pub fn merge(&self, intervals: Vec<Interval>) -> Result<Vec<MergedSpan>> {
        if self.config.validation == ValidationMode::Strict {
            for interval in &intervals {
                self.config.validation.check(interval)?;
            }
        }

        if intervals.is_empty() {
            return Ok(Vec::new());
        }

        let groups = group_by_chromosome(intervals);
        let stats = ParallelStats::from_groups(&groups);
        log::debug!(
            "Merging {} intervals across {} contigs",
            stats.total_intervals,
            stats.num_chromosomes
        );

        let cap = self.config.max_span_width;
        let merged = map_chromosomes_sorted(groups, |_, contig| merge_overlapping(contig, cap));

        Ok(merged.into_iter().flat_map(|(_, spans)| spans).collect())
    }

    /// Read a BED file, merge it and write the spans.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: W) -> Result<MergeStats> {
        let intervals = read_intervals(input, self.config.validation)?;
        self.run_intervals(intervals, output)
    }

    /// Merge BED records from any reader (e.g. stdin) and write the spans.
    pub fn run_reader<R: Read, W: Write>(&self, input: R, output: W) -> Result<MergeStats> {
        let reader = BedReader::new(input).with_validation(self.config.validation);
        let intervals = read_labeled_intervals(reader)?;
        self.run_intervals(intervals, output)
    }

    /// Merge in-memory intervals and write the spans.
    pub fn run_intervals<W: Write>(&self, intervals: Vec<Interval>, output: W) -> Result<MergeStats> {
        let mut stats = MergeStats {
            intervals_read: intervals.len(),
            ..Default::default()
        };

        let spans = self.merge(intervals)?;
        let mut writer = SpanWriter::new(output).with_score(self.report_score);
        for span in &spans {
            writer.write_span(span)?;
        }
        writer.flush()?;

        stats.spans_written = spans.len();
        Ok(stats)
    }
}

/// Statistics from a merge run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of labelled intervals read (one per name-column label)
    pub intervals_read: usize,
    /// Number of merged spans written
    pub spans_written: usize,
}

impl MergeStats {
    /// How many input intervals per output span.
    pub fn compression_ratio(&self) -> f64 {
        if self.spans_written == 0 {
            0.0
        } else {
            self.intervals_read as f64 / self.spans_written as f64
        }
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Read: {}, Written: {}, Compression: {:.2}x",
            self.intervals_read,
            self.spans_written,
            self.compression_ratio()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::BedError;

    fn bounds(spans: &[MergedSpan]) -> Vec<(i64, i64)> {
        spans.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn test_overlapping_with_labels() {
        let spans = merge_overlapping(
            vec![
                Interval::labeled("chr1", 10, 20, "A"),
                Interval::labeled("chr1", 15, 25, "B"),
                Interval::labeled("chr1", 30, 40, "A"),
            ],
            None,
        );

        assert_eq!(bounds(&spans), vec![(10, 25), (30, 40)]);
        assert_eq!(spans[0].labels, vec!["A", "B"]);
        assert_eq!(spans[1].labels, vec!["A"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_overlapping(Vec::new(), None).is_empty());
        assert!(merge_overlapping(Vec::new(), Some(10)).is_empty());
    }

    #[test]
    fn test_extreme_coordinates_with_cap() {
        let spans = merge_overlapping(
            vec![
                Interval::labeled("chr1", i64::MIN, i64::MAX, "A"),
                Interval::labeled("chr1", 0, 5, "B"),
            ],
            Some(10),
        );
        assert_eq!(bounds(&spans), vec![(i64::MIN, i64::MAX), (0, 5)]);
        assert_eq!(spans[0].width(), i64::MAX);
    }

    #[test]
    fn test_touching_endpoints_do_not_merge() {
        let spans = merge_overlapping(
            vec![
                Interval::labeled("chr1", 5, 10, "X"),
                Interval::labeled("chr1", 10, 15, "X"),
            ],
            None,
        );
        assert_eq!(bounds(&spans), vec![(5, 10), (10, 15)]);
    }

    #[test]
    fn test_width_cap_closes_before_absorbing() {
        let spans = merge_overlapping(
            vec![
                Interval::labeled("chr1", 0, 5000, "A"),
                Interval::labeled("chr1", 4000, 9000, "A"),
            ],
            Some(3000),
        );
        assert_eq!(bounds(&spans), vec![(0, 5000), (4000, 9000)]);
        assert_eq!(spans[0].labels, vec!["A"]);
        assert_eq!(spans[1].labels, vec!["A"]);
    }

    #[test]
    fn test_width_cap_allows_growth_up_to_cap() {
        // Width 1000 does not exceed 1000, so the third interval still joins.
        let spans = merge_overlapping(
            vec![
                Interval::new("chr1", 0, 600),
                Interval::new("chr1", 500, 1000),
                Interval::new("chr1", 900, 1500),
                Interval::new("chr1", 1400, 1600),
            ],
            Some(1000),
        );
        assert_eq!(bounds(&spans), vec![(0, 1500), (1400, 1600)]);
    }

    #[test]
    fn test_members_keep_input_order_on_ties() {
        let spans = merge_overlapping(
            vec![
                Interval::labeled("chr1", 100, 200, "second_key"),
                Interval::labeled("chr1", 50, 200, "first"),
                Interval::labeled("chr1", 100, 200, "tie_a"),
            ],
            None,
        );
        assert_eq!(spans.len(), 1);
        let order: Vec<&str> = spans[0]
            .members
            .iter()
            .map(|m| m.label.as_deref().unwrap())
            .collect();
        assert_eq!(order, vec!["first", "second_key", "tie_a"]);
    }

    #[test]
    fn test_contained_interval() {
        let spans = merge_overlapping(
            vec![Interval::new("chr1", 100, 400), Interval::new("chr1", 150, 250)],
            None,
        );
        assert_eq!(bounds(&spans), vec![(100, 400)]);
        assert_eq!(spans[0].count(), 2);
    }

    #[test]
    fn test_inverted_intervals_pass_through() {
        let spans = merge_overlapping(
            vec![Interval::new("chr1", 300, 100), Interval::new("chr1", 50, 60)],
            None,
        );
        assert_eq!(bounds(&spans), vec![(50, 60), (300, 100)]);
    }

    #[test]
    fn test_command_partitions_by_contig() {
        let cmd = MergeCommand::new();
        let spans = cmd
            .merge(vec![
                Interval::new("chr2", 100, 200),
                Interval::new("chr1", 150, 250),
                Interval::new("chr2", 150, 300),
                Interval::new("chr1", 100, 200),
            ])
            .unwrap();

        let out: Vec<(&str, i64, i64)> = spans
            .iter()
            .map(|s| (s.chrom.as_str(), s.start, s.end))
            .collect();
        assert_eq!(out, vec![("chr1", 100, 250), ("chr2", 100, 300)]);
    }

    #[test]
    fn test_command_strict_rejects_dirty_input() {
        let cmd = MergeCommand::new().with_validation(ValidationMode::Strict);
        let err = cmd.merge(vec![Interval::new("chr1", 10, 5)]).unwrap_err();
        assert!(matches!(err, BedError::InvalidInterval { .. }));
    }

    #[test]
    fn test_run_intervals_output() {
        let cmd = MergeCommand::new().with_max_span_width(Some(3000));
        let mut out = Vec::new();
        let stats = cmd
            .run_intervals(
                vec![
                    Interval::labeled("chr1", 0, 5000, "A"),
                    Interval::labeled("chr1", 4000, 5500, "B"),
                    Interval::labeled("chr1", 5200, 6000, "C"),
                ],
                &mut out,
            )
            .unwrap();

        assert_eq!(stats.intervals_read, 3);
        assert_eq!(stats.spans_written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t0\t5000\tA\nchr1\t4000\t6000\tB,C\n"
        );
    }

    #[test]
    fn test_run_reader_splits_label_lists() {
        let input = "chr1\t10\t20\tA,B\nchr1\t15\t25\tA\nchr1\t30\t40\tC(motif),A\n";
        let mut out = Vec::new();
        MergeCommand::new().run_reader(input.as_bytes(), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t10\t25\tA,B\nchr1\t30\t40\tA,C\n");
    }

    #[test]
    fn test_remerge_of_written_spans_is_stable() {
        let input = "chr1\t0\t10\tSP1\nchr1\t5\t20\tCTCF\nchr1\t30\t40\tSP1\n";
        let mut first = Vec::new();
        MergeCommand::new().run_reader(input.as_bytes(), &mut first).unwrap();

        let mut second = Vec::new();
        MergeCommand::new().run_reader(first.as_slice(), &mut second).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_run_reader_with_score() {
        let input = "track name=peaks\nchr2\t10\t20\tX\t3.5\nchr2\t15\t30\tY\t7\nchr1\t0\t5\tZ\n";
        let mut out = Vec::new();
        let stats = MergeCommand::new()
            .with_score(true)
            .run_reader(input.as_bytes(), &mut out)
            .unwrap();

        assert_eq!(stats.spans_written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t0\t5\tZ\t.\nchr2\t10\t30\tX,Y\t7.0\n"
        );
    }

    #[test]
    fn test_stats_display() {
        let stats = MergeStats {
            intervals_read: 10,
            spans_written: 4,
        };
        assert_eq!(stats.to_string(), "Read: 10, Written: 4, Compression: 2.50x");
    }
}
