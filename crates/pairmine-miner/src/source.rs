//! Where commits and file contents come from.

use pairmine_core::commit::{ChangedFile, CommitInfo, CommitRef};
use std::collections::HashMap;

/// Errors from a commit source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("repository {requested} is not served by this source ({served})")]
    UnknownRepo { requested: String, served: String },
    #[error("commit {sha} not found in {repo}")]
    CommitNotFound { repo: String, sha: String },
    #[error("{path} is not valid UTF-8")]
    NonUtf8Path { path: String },
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Supplies commit metadata and the two states of each changed file.
///
/// `Ok(None)` from the byte accessors means the state does not exist (a file
/// added by the commit has no pre-change state, a root commit has no parent).
/// `Err` means the state exists but could not be read.
pub trait CommitSource {
    fn load_commit(&self, commit: &CommitRef) -> Result<CommitInfo, SourceError>;

    fn post_commit_bytes(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
    ) -> Result<Option<Vec<u8>>, SourceError>;

    fn pre_commit_bytes(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
    ) -> Result<Option<Vec<u8>>, SourceError>;
}

/// A commit held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCommit {
    parent_sha: Option<String>,
    files: Vec<MemoryFile>,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    file: ChangedFile,
    pre: Option<Vec<u8>>,
    post: Option<Vec<u8>>,
}

impl MemoryCommit {
    /// Add a changed file with its pre- and post-change contents.
    pub fn add_file(
        &mut self,
        file: ChangedFile,
        pre: Option<&str>,
        post: Option<&str>,
    ) -> &mut Self {
        self.files.push(MemoryFile {
            file,
            pre: pre.map(|s| s.as_bytes().to_vec()),
            post: post.map(|s| s.as_bytes().to_vec()),
        });
        self
    }

    fn find(&self, file: &ChangedFile) -> Option<&MemoryFile> {
        self.files.iter().find(|f| f.file.path == file.path)
    }
}

/// An in-memory [`CommitSource`], keyed by `(repo, sha)`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    commits: HashMap<(String, String), MemoryCommit>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a commit and return it for adding files.
    pub fn add_commit(
        &mut self,
        repo: &str,
        sha: &str,
        parent_sha: Option<&str>,
    ) -> &mut MemoryCommit {
        let commit = self
            .commits
            .entry((repo.to_string(), sha.to_string()))
            .or_default();
        commit.parent_sha = parent_sha.map(str::to_string);
        commit
    }

    fn get(&self, repo: &str, sha: &str) -> Result<&MemoryCommit, SourceError> {
        self.commits
            .get(&(repo.to_string(), sha.to_string()))
            .ok_or_else(|| SourceError::CommitNotFound {
                repo: repo.to_string(),
                sha: sha.to_string(),
            })
    }
}

impl CommitSource for MemorySource {
    fn load_commit(&self, commit: &CommitRef) -> Result<CommitInfo, SourceError> {
        let stored = self.get(&commit.repo, &commit.sha)?;
        Ok(CommitInfo {
            repo: commit.repo.clone(),
            sha: commit.sha.clone(),
            parent_sha: stored.parent_sha.clone(),
            label: commit.label.clone(),
            files: stored.files.iter().map(|f| f.file.clone()).collect(),
        })
    }

    fn post_commit_bytes(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        let stored = self.get(&commit.repo, &commit.sha)?;
        Ok(stored.find(file).and_then(|f| f.post.clone()))
    }

    fn pre_commit_bytes(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        if commit.parent_sha.is_none() {
            return Ok(None);
        }
        let stored = self.get(&commit.repo, &commit.sha)?;
        Ok(stored.find(file).and_then(|f| f.pre.clone()))
    }
}
