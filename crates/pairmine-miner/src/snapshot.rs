//! Export the pre- and post-change states of a commit's files to disk.
//!
//! Layout: `<out>/<owner>_<name>_<sha>/pre_<filename>` and `post_<filename>`,
//! one pair per file that has both states.

use crate::miner::Miner;
use crate::source::CommitSource;
use anyhow::{Context, Result};
use pairmine_core::commit::{CommitRef, sanitize_repo};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What happened to one commit's snapshot directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotOutcome {
    /// New files were written.
    Written { files: usize },
    /// The directory already had entries and was left alone.
    AlreadyPresent,
    /// No file had both states; the directory was removed.
    NoPairs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub commits_written: usize,
    pub commits_present: usize,
    pub commits_without_pairs: usize,
    pub commits_failed: usize,
    pub files_written: usize,
}

/// Directory holding the snapshot of one commit.
pub fn snapshot_dir(out: &Path, repo: &str, sha: &str) -> PathBuf {
    out.join(format!("{}_{}", sanitize_repo(repo), sha))
}

impl<S: CommitSource> Miner<S> {
    /// Write the pre/post file pairs of one commit under `out`.
    pub fn export_snapshot(&self, commit: &CommitRef, out: &Path) -> Result<SnapshotOutcome> {
        let info = self
            .load_selected(commit)
            .with_context(|| format!("failed to load commit {}", commit.sha))?;
        let dir = snapshot_dir(out, &info.repo, &info.sha);

        if dir.is_dir()
            && fs::read_dir(&dir)
                .with_context(|| format!("failed to read {}", dir.display()))?
                .next()
                .is_some()
        {
            debug!(dir = %dir.display(), "snapshot already present");
            return Ok(SnapshotOutcome::AlreadyPresent);
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut written = 0;
        for file in &info.files {
            let pre = match self.source().pre_commit_bytes(&info, file) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %file.path, error = %e, "failed to read pre-change state");
                    continue;
                }
            };
            let post = match self.source().post_commit_bytes(&info, file) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %file.path, error = %e, "failed to read post-change state");
                    continue;
                }
            };

            let name = file.filename();
            for (prefix, bytes) in [("pre", &pre), ("post", &post)] {
                let target = dir.join(format!("{prefix}_{name}"));
                fs::write(&target, bytes)
                    .with_context(|| format!("failed to write {}", target.display()))?;
            }
            written += 1;
        }

        if written == 0 {
            fs::remove_dir(&dir).with_context(|| format!("failed to remove {}", dir.display()))?;
            return Ok(SnapshotOutcome::NoPairs);
        }
        Ok(SnapshotOutcome::Written { files: written })
    }

    /// Export every commit, counting outcomes. A commit that fails is
    /// logged and skipped; `on_commit` runs after each commit either way.
    pub fn export_snapshots(
        &self,
        commits: &[CommitRef],
        out: &Path,
        mut on_commit: impl FnMut(&CommitRef, &SnapshotSummary),
    ) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        for commit in commits {
            match self.export_snapshot(commit, out) {
                Ok(SnapshotOutcome::Written { files }) => {
                    summary.commits_written += 1;
                    summary.files_written += files;
                }
                Ok(SnapshotOutcome::AlreadyPresent) => summary.commits_present += 1,
                Ok(SnapshotOutcome::NoPairs) => summary.commits_without_pairs += 1,
                Err(e) => {
                    warn!(sha = %commit.sha, error = %e, "snapshot failed");
                    summary.commits_failed += 1;
                }
            }
            on_commit(commit, &summary);
        }
        summary
    }
}
