//! Command implementations for peakmerge.

pub mod catalog;
pub mod enhancers;
pub mod expression;
pub mod flatten;
pub mod merge;
pub mod tf_merge;

pub use catalog::{CatalogCommand, CatalogStats};
pub use enhancers::{EnhancerCall, EnhancerCommand, EnhancerStats, Tad};
pub use expression::{ExpressionStats, TfExpressionCommand};
pub use flatten::FlattenCommand;
pub use merge::{merge_overlapping, MergeCommand, MergeStats};
pub use tf_merge::MergeByTfCommand;
