//! Per-contig site index for region queries.

use crate::interval::Interval;
use rustc_hash::FxHashMap;

/// Sites organized by chromosome, sorted by start, queried with binary search.
#[derive(Debug, Default)]
pub struct SiteIndex {
    sites_by_chrom: FxHashMap<String, Vec<Interval>>,
    len: usize,
}

impl SiteIndex {
    /// Build an index from a collection of sites.
    pub fn from_intervals(intervals: Vec<Interval>) -> Self {
        let len = intervals.len();
        let mut by_chrom: FxHashMap<String, Vec<Interval>> = FxHashMap::default();

        for interval in intervals {
            by_chrom
                .entry(interval.chrom.clone())
                .or_default()
                .push(interval);
        }

        // Stable, so same-key sites keep load order
        for chrom_sites in by_chrom.values_mut() {
            chrom_sites.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        }

        Self {
            sites_by_chrom: by_chrom,
            len,
        }
    }

    /// Sites on `chrom` whose start lies in `[start, end)`, in start order.
    pub fn starting_within(&self, chrom: &str, start: i64, end: i64) -> &[Interval] {
        let Some(sites) = self.sites_by_chrom.get(chrom) else {
            return &[];
        };
        let lo = sites.partition_point(|s| s.start < start);
        let hi = sites.partition_point(|s| s.start < end);
        if lo >= hi {
            &[]
        } else {
            &sites[lo..hi]
        }
    }

    /// Total number of indexed sites.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SiteIndex {
        SiteIndex::from_intervals(vec![
            Interval::labeled("chr1", 500, 600, "C"),
            Interval::labeled("chr1", 100, 200, "A"),
            Interval::labeled("chr1", 150, 900, "B"),
            Interval::labeled("chr2", 100, 200, "D"),
        ])
    }

    #[test]
    fn test_starting_within() {
        let idx = index();
        let labels: Vec<&str> = idx
            .starting_within("chr1", 100, 500)
            .iter()
            .map(|s| s.label.as_deref().unwrap())
            .collect();
        assert_eq!(labels, vec!["A", "B"]);

        assert_eq!(idx.starting_within("chr1", 0, 1000).len(), 3);
        assert!(idx.starting_within("chr1", 601, 1000).is_empty());
        assert!(idx.starting_within("chr3", 0, 1000).is_empty());
        assert!(idx.starting_within("chr1", 500, 100).is_empty());
    }

    #[test]
    fn test_len_counts_all_contigs() {
        let idx = index();
        assert_eq!(idx.len(), 4);
        assert!(!idx.is_empty());
        assert!(SiteIndex::default().is_empty());
    }
}
