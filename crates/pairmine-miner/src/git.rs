//! Commit source backed by a local git repository.

use crate::source::{CommitSource, SourceError};
use pairmine_core::commit::{ChangedFile, CommitInfo, CommitRef, repo_from_url};
use pairmine_core::config::SourceConfig;
use std::path::Path;
use tracing::debug;

/// Reads commits, patches and blobs from a repository on disk with git2.
pub struct GitSource {
    repo: git2::Repository,
    name: String,
    remote: SourceConfig,
}

impl GitSource {
    /// Open the repository at `path`. Its `owner/name` identifier is taken
    /// from the `origin` remote when there is one, otherwise from the
    /// directory name.
    pub fn open(path: &Path, remote: SourceConfig) -> Result<Self, SourceError> {
        let repo = git2::Repository::open(path)?;
        let name = repo
            .find_remote("origin")
            .ok()
            .and_then(|r| r.url().map(repo_from_url))
            .unwrap_or_else(|| {
                let dir = repo.workdir().unwrap_or_else(|| repo.path());
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "local".to_string())
            });
        Ok(Self { repo, name, remote })
    }

    /// Override the repository identifier used in records and URLs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn find_commit(&self, sha: &str) -> Result<git2::Commit<'_>, SourceError> {
        self.repo
            .revparse_single(sha)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| SourceError::CommitNotFound {
                repo: self.name.clone(),
                sha: sha.to_string(),
            })
    }

    fn blob_at(&self, commit: &git2::Commit<'_>, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = entry.to_object(&self.repo)?;
        Ok(object.as_blob().map(|blob| blob.content().to_vec()))
    }
}

fn utf8_path(path: Option<&Path>) -> Result<Option<String>, SourceError> {
    match path {
        None => Ok(None),
        Some(p) => p
            .to_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| SourceError::NonUtf8Path {
                path: p.to_string_lossy().into_owned(),
            }),
    }
}

impl CommitSource for GitSource {
    fn load_commit(&self, commit: &CommitRef) -> Result<CommitInfo, SourceError> {
        if commit.repo != self.name {
            return Err(SourceError::UnknownRepo {
                requested: commit.repo.clone(),
                served: self.name.clone(),
            });
        }

        let found = self.find_commit(&commit.sha)?;
        let sha = found.id().to_string();
        let parent = if found.parent_count() > 0 {
            Some(found.parent(0)?)
        } else {
            None
        };

        let new_tree = found.tree()?;
        let old_tree = parent.as_ref().map(git2::Commit::tree).transpose()?;
        let mut diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)?;
        let mut find = git2::DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut files = Vec::new();
        for (idx, delta) in diff.deltas().enumerate() {
            let previous_path = match delta.status() {
                // A deleted file has no post-change state to mine.
                git2::Delta::Deleted => continue,
                git2::Delta::Renamed => utf8_path(delta.old_file().path())?,
                _ => None,
            };
            let Some(path) = utf8_path(delta.new_file().path())? else {
                continue;
            };

            let patch = match git2::Patch::from_diff(&diff, idx)? {
                Some(mut patch) => {
                    let buf = patch.to_buf()?;
                    Some(String::from_utf8_lossy(&buf).into_owned())
                }
                None => None,
            };

            debug!(path = %path, status = ?delta.status(), "changed file");
            files.push(ChangedFile {
                raw_url: self.remote.raw_url(&self.name, &sha, &path),
                path,
                previous_path,
                patch,
            });
        }

        Ok(CommitInfo {
            repo: self.name.clone(),
            sha,
            parent_sha: parent.map(|p| p.id().to_string()),
            label: commit.label.clone(),
            files,
        })
    }

    fn post_commit_bytes(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        let found = self.find_commit(&commit.sha)?;
        self.blob_at(&found, &file.path)
    }

    fn pre_commit_bytes(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
    ) -> Result<Option<Vec<u8>>, SourceError> {
        let Some(parent_sha) = commit.parent_sha.as_deref() else {
            return Ok(None);
        };
        let parent = self.find_commit(parent_sha)?;
        self.blob_at(&parent, file.pre_commit_path())
    }
}
