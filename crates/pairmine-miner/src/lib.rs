//! Method-pair mining over commits.
//!
//! A [`source::CommitSource`] supplies commit metadata and file contents; the
//! [`miner::Miner`] selects the files worth looking at, runs the per-file
//! [`pipeline`] and writes one record per matched pair.

pub mod git;
pub mod miner;
pub mod pipeline;
pub mod snapshot;
pub mod source;

pub use git::GitSource;
pub use miner::{MineSummary, MinedCommit, MinedFile, Miner};
pub use pipeline::{
    FileChangeContext, FilePairs, MethodPair, MethodSnapshot, PairError, pairs_for_file,
};
pub use snapshot::{SnapshotOutcome, SnapshotSummary, snapshot_dir};
pub use source::{CommitSource, MemorySource, SourceError};
