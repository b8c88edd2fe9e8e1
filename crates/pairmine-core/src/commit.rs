//! Commit and changed-file metadata.

use crate::config::MiningConfig;
use serde::{Deserialize, Serialize};

/// A commit to mine, as listed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    /// Repository identifier in `owner/name` form.
    pub repo: String,
    pub sha: String,
    /// Free-form dataset label, carried into JSON output untouched.
    #[serde(default)]
    pub label: String,
}

/// A line of a commit list could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitListError {
    #[error("line {line}: expected `<repo> <sha> [label]` or `<sha>`")]
    Malformed { line: usize },
    #[error("line {line}: commit `{sha}` has no repository and no default was given")]
    MissingRepo { line: usize, sha: String },
}

impl CommitRef {
    pub fn new(repo: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            sha: sha.into(),
            label: String::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Parse a commit list: one commit per line as `<repo> <sha> [label]`,
    /// or a bare `<sha>` when `default_repo` is given. Repositories may be
    /// URLs; they are normalized with [`repo_from_url`]. Blank lines and
    /// `#` comments are ignored.
    pub fn parse_list(
        text: &str,
        default_repo: Option<&str>,
    ) -> Result<Vec<CommitRef>, CommitListError> {
        let mut commits = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            let commit = match parts.as_slice() {
                [sha] => {
                    let repo = default_repo.ok_or_else(|| CommitListError::MissingRepo {
                        line: line_no,
                        sha: (*sha).to_string(),
                    })?;
                    CommitRef::new(repo, *sha)
                }
                [repo, sha] => CommitRef::new(repo_from_url(repo), *sha),
                [repo, sha, label] => CommitRef::new(repo_from_url(repo), *sha).with_label(*label),
                _ => return Err(CommitListError::Malformed { line: line_no }),
            };
            commits.push(commit);
        }
        Ok(commits)
    }
}

/// A commit with its first parent and the files it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub repo: String,
    pub sha: String,
    /// First parent; `None` for a root commit.
    pub parent_sha: Option<String>,
    pub label: String,
    pub files: Vec<ChangedFile>,
}

impl CommitInfo {
    /// Keep the files the mining settings ask for: suffix filter first, then
    /// the `max_files` cap, then files without patch text are dropped.
    pub fn select_files(&mut self, mining: &MiningConfig) {
        let files = std::mem::take(&mut self.files);
        self.files = files
            .into_iter()
            .filter(|f| mining.accepts_path(&f.path))
            .take(mining.max_files)
            .filter(|f| f.patch.as_deref().is_some_and(|p| !p.is_empty()))
            .collect();
    }
}

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Repository-relative path after the commit, `/`-separated.
    pub path: String,
    /// Path before the commit, only set when the file was renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
    /// Raw-content URL of the post-change file.
    pub raw_url: String,
    /// Unified diff text of this file within the commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>, raw_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            previous_path: None,
            raw_url: raw_url.into(),
            patch: None,
        }
    }

    #[must_use]
    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }

    #[must_use]
    pub fn renamed_from(mut self, previous: impl Into<String>) -> Self {
        self.previous_path = Some(previous.into());
        self
    }

    pub fn is_renamed(&self) -> bool {
        self.previous_path.is_some()
    }

    /// Path before the commit: the previous path on rename, otherwise the
    /// current path.
    pub fn pre_commit_path(&self) -> &str {
        self.previous_path.as_deref().unwrap_or(&self.path)
    }

    /// Final path component.
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Raw-content URL of the file as it was at `parent_sha`.
    ///
    /// The post-change URL is cut after its first `raw` segment and the
    /// parent SHA and pre-change path are appended. A URL without a `raw`
    /// segment yields `parent_sha/pre_path`.
    pub fn pre_commit_url(&self, parent_sha: &str) -> String {
        let pre_path = self.pre_commit_path();
        match self.raw_url.find("raw") {
            Some(idx) => format!("{}/{}/{}", &self.raw_url[..idx + 3], parent_sha, pre_path),
            None => format!("{parent_sha}/{pre_path}"),
        }
    }
}

/// Normalize a repository URL (or an `owner/name` slug) to `owner/name`.
///
/// Apache's own git hosts map to `apache/<name>`.
pub fn repo_from_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);

    if trimmed.contains("git-wip-us.apache.org") || trimmed.contains("git.apache.org") {
        let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
        return format!("apache/{stem}");
    }

    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [.., owner, name] => format!("{owner}/{name}"),
        _ => trimmed.to_string(),
    }
}

/// Repository identifier made safe for use as a single path component.
pub fn sanitize_repo(repo: &str) -> String {
    repo.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ChangedFile {
        ChangedFile::new(path, format!("https://github.com/o/r/raw/abc/{path}"))
            .with_patch("@@ -1,1 +1,1 @@")
    }

    #[test]
    fn test_pre_commit_path_falls_back_to_current() {
        let f = file("src/A.java");
        assert_eq!(f.pre_commit_path(), "src/A.java");
        let f = f.renamed_from("src/Old.java");
        assert_eq!(f.pre_commit_path(), "src/Old.java");
        assert!(f.is_renamed());
    }

    #[test]
    fn test_pre_commit_url() {
        let f = ChangedFile::new("src/A.java", "https://github.com/o/r/raw/abc123/src/A.java");
        assert_eq!(
            f.pre_commit_url("def456"),
            "https://github.com/o/r/raw/def456/src/A.java"
        );
        let f = f.renamed_from("src/Old.java");
        assert_eq!(
            f.pre_commit_url("def456"),
            "https://github.com/o/r/raw/def456/src/Old.java"
        );
    }

    #[test]
    fn test_pre_commit_url_without_raw_segment() {
        let f = ChangedFile::new("A.java", "file:///tmp/A.java");
        assert_eq!(f.pre_commit_url("p"), "p/A.java");
    }

    #[test]
    fn test_filename() {
        assert_eq!(file("a/b/C.java").filename(), "C.java");
        assert_eq!(file("C.java").filename(), "C.java");
    }

    #[test]
    fn test_repo_from_url() {
        assert_eq!(
            repo_from_url("https://github.com/igniterealtime/Openfire"),
            "igniterealtime/Openfire"
        );
        assert_eq!(
            repo_from_url("https://github.com/apache/struts.git"),
            "apache/struts"
        );
        assert_eq!(
            repo_from_url("https://git-wip-us.apache.org/repos/asf/cxf.git"),
            "apache/cxf"
        );
        assert_eq!(repo_from_url("owner/name"), "owner/name");
        assert_eq!(repo_from_url("https://github.com/o/r/"), "o/r");
    }

    #[test]
    fn test_select_files_filters_caps_and_drops_patchless() {
        let mining = MiningConfig {
            max_files: 3,
            ..MiningConfig::default()
        };
        let mut no_patch = file("C.java");
        no_patch.patch = None;
        let mut commit = CommitInfo {
            repo: "o/r".into(),
            sha: "abc".into(),
            parent_sha: Some("p".into()),
            label: String::new(),
            files: vec![
                file("A.java"),
                file("README.md"),
                file("B.java"),
                no_patch,
                file("D.java"),
            ],
        };
        commit.select_files(&mining);
        let paths: Vec<&str> = commit.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["A.java", "B.java"]);
    }

    #[test]
    fn test_parse_commit_list() {
        let text = "\
# fixing and introducing commits
https://github.com/apache/struts e05d71ba 1
igniterealtime/Openfire 6088e21c

deadbeef   # uses the default repo
";
        let commits = CommitRef::parse_list(text, Some("local/repo")).unwrap();
        assert_eq!(
            commits,
            vec![
                CommitRef::new("apache/struts", "e05d71ba").with_label("1"),
                CommitRef::new("igniterealtime/Openfire", "6088e21c"),
                CommitRef::new("local/repo", "deadbeef"),
            ]
        );
    }

    #[test]
    fn test_parse_commit_list_errors() {
        assert_eq!(
            CommitRef::parse_list("abc", None),
            Err(CommitListError::MissingRepo {
                line: 1,
                sha: "abc".into()
            })
        );
        assert_eq!(
            CommitRef::parse_list("\na b c d", None),
            Err(CommitListError::Malformed { line: 2 })
        );
    }
}
