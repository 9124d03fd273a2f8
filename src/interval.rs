//! Core interval types for peak and merged-span representation.

use std::collections::BTreeSet;
use std::fmt;

/// A genomic interval with chromosome, start and end positions.
///
/// Coordinates are signed and deliberately unchecked: peak files from
/// partially-cleaned sources can carry inverted or negative ranges, and
/// they are carried through merging as-is unless strict validation is
/// requested (see [`crate::config::ValidationMode`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    /// Source label, usually a transcription factor identifier.
    pub label: Option<String>,
    /// Auxiliary signal value (e.g. peak intensity).
    pub score: Option<f64>,
}

impl Interval {
    /// Create a new unlabelled interval.
    #[inline]
    pub fn new(chrom: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            label: None,
            score: None,
        }
    }

    /// Create a labelled interval.
    #[inline]
    pub fn labeled(chrom: impl Into<String>, start: i64, end: i64, label: impl Into<String>) -> Self {
        Self::new(chrom, start, end).with_label(label)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Signed width (`end - start`); negative for inverted intervals.
    /// Saturates at the i64 bounds.
    #[inline]
    pub fn width(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if start > end.
    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end)?;
        if let Some(ref label) = self.label {
            write!(f, "\t{}", label)?;
        }
        Ok(())
    }
}

/// The result of merging a group of overlapping intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSpan {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    /// Contributing intervals in merge order.
    pub members: Vec<Interval>,
    /// Sorted, deduplicated member labels.
    pub labels: Vec<String>,
}

impl MergedSpan {
    /// Open a span seeded by a single interval.
    pub(crate) fn seed(interval: Interval) -> Self {
        Self {
            chrom: interval.chrom.clone(),
            start: interval.start,
            end: interval.end,
            members: vec![interval],
            labels: Vec::new(),
        }
    }

    /// Absorb an interval, extending the end if needed.
    #[inline]
    pub(crate) fn absorb(&mut self, interval: Interval) {
        self.end = self.end.max(interval.end);
        self.members.push(interval);
    }

    /// Finish the span: compute the label set from members.
    pub(crate) fn close(mut self) -> Self {
        let labels: BTreeSet<&str> = self
            .members
            .iter()
            .filter_map(|m| m.label.as_deref())
            .collect();
        self.labels = labels.into_iter().map(str::to_string).collect();
        self
    }

    /// Signed width of the span, saturating like [`Interval::width`].
    #[inline]
    pub fn width(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    /// Number of contributing intervals.
    #[inline]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Highest member score, if any member carries one.
    pub fn max_score(&self) -> Option<f64> {
        self.members
            .iter()
            .filter_map(|m| m.score)
            .fold(None, |acc, s| Some(acc.map_or(s, |a: f64| a.max(s))))
    }

    /// Labels joined with commas, the on-disk label list format.
    pub fn label_list(&self) -> String {
        self.labels.join(",")
    }

    /// The span bounds as a plain unlabelled interval.
    pub fn to_interval(&self) -> Interval {
        Interval::new(self.chrom.clone(), self.start, self.end)
    }
}

impl fmt::Display for MergedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.end,
            self.label_list()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_width() {
        let a = Interval::new("chr1", 300, 100);
        assert!(a.is_inverted());
        assert_eq!(a.width(), -200);
    }

    #[test]
    fn test_width_saturates() {
        assert_eq!(Interval::new("chr1", i64::MIN, i64::MAX).width(), i64::MAX);
        assert_eq!(Interval::new("chr1", i64::MAX, i64::MIN).width(), i64::MIN);
    }

    #[test]
    fn test_span_labels_sorted_and_deduplicated() {
        let mut span = MergedSpan::seed(Interval::labeled("chr1", 10, 20, "SP1"));
        span.absorb(Interval::labeled("chr1", 12, 30, "CTCF"));
        span.absorb(Interval::labeled("chr1", 15, 18, "SP1"));
        span.absorb(Interval::new("chr1", 16, 17));
        let span = span.close();

        assert_eq!(span.start, 10);
        assert_eq!(span.end, 30);
        assert_eq!(span.count(), 4);
        assert_eq!(span.labels, vec!["CTCF", "SP1"]);
        assert_eq!(span.to_string(), "chr1\t10\t30\tCTCF,SP1");
    }

    #[test]
    fn test_span_max_score() {
        let mut span = MergedSpan::seed(Interval::new("chr1", 0, 10).with_score(2.5));
        span.absorb(Interval::new("chr1", 5, 15));
        span.absorb(Interval::new("chr1", 6, 12).with_score(7.0));
        assert_eq!(span.close().max_score(), Some(7.0));

        let bare = MergedSpan::seed(Interval::new("chr1", 0, 10)).close();
        assert_eq!(bare.max_score(), None);
    }
}
