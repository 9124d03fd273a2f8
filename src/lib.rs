// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! peakmerge: merging of labelled ChIP-seq peaks
//!
//! Collapses overlapping peaks from many transcription factors into merged
//! binding sites that remember which factors contributed to them.
//!
//! # Features
//!
//! - **Width-capped merging**: optionally stop growing a merged site once it
//!   is wider than a bound, without ever splitting an input peak
//! - **Parallel processing**: contigs and factors are merged on Rayon
//! - **Enhancer calling**: a worker pool scans TADs for multi-factor sites
//!
//! # Example
//!
//! ```rust,no_run
//! use peakmerge::{bed, commands::MergeCommand, config::ValidationMode};
//!
//! let peaks = bed::read_intervals("peaks.bed", ValidationMode::Permissive).unwrap();
//!
//! let cmd = MergeCommand::new().with_max_span_width(Some(3000));
//! let sites = cmd.merge(peaks).unwrap();
//! ```

pub mod annotate;
pub mod bed;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod index;
pub mod interval;
pub mod output;
pub mod parallel;
pub mod peaks;
pub mod sites;

// Re-export commonly used types
pub use bed::{read_intervals, read_records, BedError, BedReader, BedRecord};
pub use commands::merge_overlapping;
pub use config::{MergeConfig, ValidationMode};
pub use index::SiteIndex;
pub use interval::{Interval, MergedSpan};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bed::{read_intervals, read_records, BedReader, Result};
    pub use crate::commands::{
        merge_overlapping, EnhancerCommand, FlattenCommand, MergeByTfCommand, MergeCommand,
    };
    pub use crate::config::{MergeConfig, ValidationMode};
    pub use crate::index::SiteIndex;
    pub use crate::interval::{Interval, MergedSpan};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::bed::parse_intervals;
        use crate::commands::MergeCommand;

        let content = "chr1\t100\t200\tCTCF\nchr1\t150\t250\tSP1\nchr1\t300\t400\tCTCF\n";
        let intervals = parse_intervals(content).unwrap();

        let cmd = MergeCommand::new();
        let merged = cmd.merge(intervals).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start, 100);
        assert_eq!(merged[0].end, 250);
        assert_eq!(merged[0].labels, vec!["CTCF", "SP1"]);
    }

    #[test]
    fn test_enhancer_workflow() {
        use crate::bed::parse_intervals;
        use crate::commands::{EnhancerCommand, Tad};
        use crate::index::SiteIndex;

        let sites = parse_intervals("chr1\t100\t200\tCTCF\nchr1\t150\t250\tSP1\n").unwrap();
        let index = SiteIndex::from_intervals(sites);
        let tads = vec![Tad {
            id: "tad1".to_string(),
            chrom: "chr1".to_string(),
            start: 0,
            end: 1000,
        }];

        let calls = EnhancerCommand::new()
            .with_min_tfs(2)
            .with_workers(2)
            .scan(tads, &index)
            .unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tad_id, "tad1");
    }
}
