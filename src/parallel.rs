//! Parallel processing utilities using Rayon.

use crate::interval::Interval;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Minimum number of intervals before enabling parallelization.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Group intervals by chromosome, preserving input order within each group.
pub fn group_by_chromosome(intervals: Vec<Interval>) -> FxHashMap<String, Vec<Interval>> {
    let mut groups: FxHashMap<String, Vec<Interval>> = FxHashMap::default();

    for interval in intervals {
        groups
            .entry(interval.chrom.clone())
            .or_default()
            .push(interval);
    }

    groups
}

/// Apply `f` to every chromosome group and return results in ascending
/// chromosome order. Runs in parallel once the total interval count reaches
/// [`PARALLEL_THRESHOLD`].
pub fn map_chromosomes_sorted<F, T>(groups: FxHashMap<String, Vec<Interval>>, f: F) -> Vec<(String, T)>
where
    F: Fn(&str, Vec<Interval>) -> T + Sync + Send,
    T: Send,
{
    let total: usize = groups.values().map(Vec::len).sum();
    let mut groups: Vec<(String, Vec<Interval>)> = groups.into_iter().collect();
    groups.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    if total < PARALLEL_THRESHOLD {
        groups
            .into_iter()
            .map(|(chrom, intervals)| {
                let result = f(&chrom, intervals);
                (chrom, result)
            })
            .collect()
    } else {
        groups
            .into_par_iter()
            .map(|(chrom, intervals)| {
                let result = f(&chrom, intervals);
                (chrom, result)
            })
            .collect()
    }
}

/// Statistics for parallel work distribution.
#[derive(Debug, Clone)]
pub struct ParallelStats {
    pub total_intervals: usize,
    pub num_chromosomes: usize,
}

impl ParallelStats {
    pub fn from_groups(groups: &FxHashMap<String, Vec<Interval>>) -> Self {
        Self {
            total_intervals: groups.values().map(|v| v.len()).sum(),
            num_chromosomes: groups.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_chromosome() {
        let intervals = vec![
            Interval::new("chr1", 100, 200),
            Interval::new("chr2", 100, 200),
            Interval::new("chr1", 300, 400),
        ];

        let groups = group_by_chromosome(intervals);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("chr1").unwrap().len(), 2);
        assert_eq!(groups.get("chr2").unwrap().len(), 1);
        assert_eq!(groups.get("chr1").unwrap()[1].start, 300);
    }

    #[test]
    fn test_map_chromosomes_sorted() {
        let intervals = vec![
            Interval::new("hg19_chr2", 100, 200),
            Interval::new("hg19_chr10", 300, 400),
            Interval::new("hg19_chr1", 100, 200),
            Interval::new("hg19_chr1", 500, 600),
        ];

        let results = map_chromosomes_sorted(group_by_chromosome(intervals), |_, v| v.len());
        let chroms: Vec<&str> = results.iter().map(|(c, _)| c.as_str()).collect();

        assert_eq!(chroms, vec!["hg19_chr1", "hg19_chr10", "hg19_chr2"]);
        assert_eq!(results[0].1, 2);
    }

    #[test]
    fn test_parallel_stats() {
        let groups = group_by_chromosome(vec![
            Interval::new("chr1", 1, 2),
            Interval::new("chr2", 1, 2),
            Interval::new("chr2", 3, 4),
        ]);
        let stats = ParallelStats::from_groups(&groups);
        assert_eq!(stats.total_intervals, 3);
        assert_eq!(stats.num_chromosomes, 2);
    }
}
