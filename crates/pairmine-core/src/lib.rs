//! Core types for mining pre/post-change method pairs.
//!
//! Provides commit and changed-file metadata ([`commit::CommitInfo`]), the
//! miner configuration, the pair record layout, and the append-only record
//! sink the pipeline writes to.

pub mod commit;
pub mod config;
pub mod record;
pub mod sink;
