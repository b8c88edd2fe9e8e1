//! Commit-level mining: file selection, state loading and record output.

use crate::pipeline::{FileChangeContext, FilePairs, MethodPair, PairError, pairs_for_file};
use crate::source::{CommitSource, SourceError};
use anyhow::Result;
use pairmine_core::commit::{ChangedFile, CommitInfo, CommitRef};
use pairmine_core::config::MiningConfig;
use pairmine_core::record::{OutputFormat, PairRecord};
use pairmine_core::sink::RecordSink;
use pairmine_parser::{SyntaxTreeProvider, extract_post_change_ranges};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Counters for a mining run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MineSummary {
    pub commits: usize,
    pub commits_failed: usize,
    /// Files left after suffix filtering and the `max_files` cap.
    pub files_seen: usize,
    /// Files whose post-change state could not be read.
    pub files_unavailable: usize,
    pub files_without_pre_state: usize,
    /// Files whose parse failed.
    pub files_failed: usize,
    pub contract_violations: usize,
    pub methods_changed: usize,
    pub pairs: usize,
}

/// Pairs found in one file of a commit.
#[derive(Debug, Clone)]
pub struct MinedFile {
    pub file: ChangedFile,
    pub pairs: Vec<MethodPair>,
}

/// A mined commit: its metadata and the pairs of each eligible file.
#[derive(Debug, Clone)]
pub struct MinedCommit {
    pub commit: CommitInfo,
    pub files: Vec<MinedFile>,
}

impl MinedCommit {
    pub fn pair_count(&self) -> usize {
        self.files.iter().map(|f| f.pairs.len()).sum()
    }

    /// Records in file order, then traversal order within a file.
    pub fn records(&self, include_bodies: bool) -> Vec<PairRecord> {
        self.files
            .iter()
            .flat_map(|f| {
                f.pairs
                    .iter()
                    .map(move |p| p.to_record(&self.commit, &f.file, include_bodies))
            })
            .collect()
    }
}

/// Drives a [`CommitSource`] through the pairing pipeline.
pub struct Miner<S> {
    source: S,
    provider: SyntaxTreeProvider,
    mining: MiningConfig,
}

impl<S: CommitSource> Miner<S> {
    pub fn new(source: S, provider: SyntaxTreeProvider, mining: MiningConfig) -> Self {
        Self {
            source,
            provider,
            mining,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn mining(&self) -> &MiningConfig {
        &self.mining
    }

    /// Load a commit and keep only the files the mining settings select.
    pub fn load_selected(&self, commit: &CommitRef) -> Result<CommitInfo, SourceError> {
        let mut info = self.source.load_commit(commit)?;
        let total = info.files.len();
        info.select_files(&self.mining);
        debug!(
            sha = %info.sha,
            total,
            selected = info.files.len(),
            "selected files"
        );
        Ok(info)
    }

    /// Mine one commit. Per-file problems are logged and counted in
    /// `summary`; only a commit that cannot be loaded is an error.
    pub fn mine_commit(
        &self,
        commit: &CommitRef,
        summary: &mut MineSummary,
    ) -> Result<MinedCommit, SourceError> {
        let info = self.load_selected(commit)?;
        summary.files_seen += info.files.len();

        let mut eligible: Vec<(ChangedFile, FileChangeContext)> = Vec::new();
        for file in &info.files {
            let post = match self.source.post_commit_bytes(&info, file) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!(path = %file.path, "no post-change state");
                    summary.files_unavailable += 1;
                    continue;
                }
                Err(e) => {
                    warn!(path = %file.path, error = %e, "failed to read post-change state");
                    summary.files_unavailable += 1;
                    continue;
                }
            };
            let pre = match self.source.pre_commit_bytes(&info, file) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!(path = %file.path, "no pre-change state, skipping");
                    summary.files_without_pre_state += 1;
                    continue;
                }
                Err(e) => {
                    warn!(path = %file.path, error = %e, "failed to read pre-change state");
                    summary.files_unavailable += 1;
                    continue;
                }
            };
            let ranges = extract_post_change_ranges(file.patch.as_deref().unwrap_or_default());
            eligible.push((
                file.clone(),
                FileChangeContext {
                    post,
                    pre: Some(pre),
                    ranges,
                },
            ));
        }

        // Borrow only the provider: the source need not be Sync.
        let provider = &self.provider;
        // Indexed collect keeps file order, so output matches a sequential run.
        let results: Vec<Result<FilePairs, PairError>> = if self.mining.parallel {
            eligible
                .par_iter()
                .map(|(_, ctx)| pairs_for_file(provider, ctx))
                .collect()
        } else {
            eligible
                .iter()
                .map(|(_, ctx)| pairs_for_file(provider, ctx))
                .collect()
        };

        let mut files = Vec::new();
        for ((file, _), result) in eligible.into_iter().zip(results) {
            match result {
                Ok(found) => {
                    summary.methods_changed += found.changed_methods;
                    summary.pairs += found.pairs.len();
                    if !found.pairs.is_empty() {
                        files.push(MinedFile {
                            file,
                            pairs: found.pairs,
                        });
                    }
                }
                Err(e) if e.is_contract_violation() => {
                    warn!(path = %file.path, error = %e, "skipping file");
                    summary.contract_violations += 1;
                }
                Err(e) => {
                    warn!(path = %file.path, error = %e, "skipping file");
                    summary.files_failed += 1;
                }
            }
        }

        Ok(MinedCommit {
            commit: info,
            files,
        })
    }

    /// Mine every commit into `sink`. Commits that fail to load are counted
    /// and skipped; `on_commit` runs after each commit either way.
    pub fn mine_into(
        &self,
        commits: &[CommitRef],
        sink: &mut RecordSink,
        mut on_commit: impl FnMut(&CommitRef, &MineSummary),
    ) -> Result<MineSummary> {
        let include_bodies = sink.format() == OutputFormat::Jsonl;
        let mut summary = MineSummary::default();

        for commit in commits {
            match self.mine_commit(commit, &mut summary) {
                Ok(mined) => {
                    summary.commits += 1;
                    info!(
                        repo = %mined.commit.repo,
                        sha = %mined.commit.sha,
                        pairs = mined.pair_count(),
                        "mined commit"
                    );
                    sink.append_all(&mined.records(include_bodies))?;
                }
                Err(e) => {
                    warn!(repo = %commit.repo, sha = %commit.sha, error = %e, "skipping commit");
                    summary.commits_failed += 1;
                }
            }
            on_commit(commit, &summary);
        }

        sink.flush()?;
        Ok(summary)
    }
}
