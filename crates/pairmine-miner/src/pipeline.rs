//! Per-file pairing: changed post-change methods matched to their
//! pre-change counterparts.

use pairmine_core::commit::{ChangedFile, CommitInfo};
use pairmine_core::record::PairRecord;
use pairmine_parser::{
    LineRange, MethodDeclaration, MethodError, ParseError, Position, SyntaxTreeProvider,
    collect_all_methods, collect_methods_in_ranges, find_pre_change_match,
};
use serde::Serialize;
use std::borrow::Cow;
use tracing::debug;

/// Everything the pipeline needs to know about one changed file.
#[derive(Debug, Clone)]
pub struct FileChangeContext {
    pub post: Vec<u8>,
    /// `None` when the file did not exist before the commit.
    pub pre: Option<Vec<u8>>,
    pub ranges: Vec<LineRange>,
}

/// Errors that abort the pairing of one file.
#[derive(Debug, thiserror::Error)]
pub enum PairError {
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("contract violation: {0}")]
    Contract(#[from] MethodError),
}

impl PairError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

/// One side of a pair, detached from its syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSnapshot {
    pub name: String,
    pub start: Position,
    pub end: Position,
    /// Declaration source text, signature included.
    pub body: String,
}

impl MethodSnapshot {
    pub fn of(method: &MethodDeclaration<'_>) -> Self {
        let body = method.text();
        if matches!(body, Cow::Owned(_)) {
            debug!(method = method.name(), "method body is not valid UTF-8, replaced invalid bytes");
        }
        Self {
            name: method.name().to_string(),
            start: method.start(),
            end: method.end(),
            body: body.into_owned(),
        }
    }
}

/// A changed method and the pre-change method with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodPair {
    pub post: MethodSnapshot,
    pub pre: MethodSnapshot,
}

impl MethodPair {
    /// Name of the pair, taken from the pre-change side.
    pub fn name(&self) -> &str {
        &self.pre.name
    }

    pub fn to_record(
        &self,
        commit: &CommitInfo,
        file: &ChangedFile,
        include_bodies: bool,
    ) -> PairRecord {
        let parent = commit.parent_sha.as_deref().unwrap_or_default();
        PairRecord {
            repository: commit.repo.clone(),
            before_url: file.pre_commit_url(parent),
            after_url: file.raw_url.clone(),
            before_path: file.pre_commit_path().to_string(),
            after_path: file.path.clone(),
            before_line_col: self.pre.start.one_based(),
            after_line_col: self.post.start.one_based(),
            method_name: self.pre.name.clone(),
            before_commit: parent.to_string(),
            after_commit: commit.sha.clone(),
            label: commit.label.clone(),
            before_body: include_bodies.then(|| self.pre.body.clone()),
            after_body: include_bodies.then(|| self.post.body.clone()),
        }
    }
}

/// Result of pairing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePairs {
    /// Post-change methods overlapping a changed range.
    pub changed_methods: usize,
    pub pairs: Vec<MethodPair>,
}

/// Pair every changed method of a file with its pre-change counterpart.
///
/// A file without a pre-change state, or without ranges, yields nothing.
/// Changed methods without a same-named pre-change method are skipped.
pub fn pairs_for_file(
    provider: &SyntaxTreeProvider,
    ctx: &FileChangeContext,
) -> Result<FilePairs, PairError> {
    let Some(pre_bytes) = ctx.pre.as_deref() else {
        return Ok(FilePairs::default());
    };
    if ctx.ranges.is_empty() {
        return Ok(FilePairs::default());
    }

    let post_tree = provider.parse(&ctx.post)?;
    let changed = collect_methods_in_ranges(&post_tree, &ctx.ranges)?;
    if changed.is_empty() {
        return Ok(FilePairs::default());
    }

    let pre_tree = provider.parse(pre_bytes)?;
    let pre_methods = collect_all_methods(&pre_tree)?;

    let mut pairs = Vec::new();
    for post in &changed {
        match find_pre_change_match(post, &pre_methods) {
            Some(pre) => pairs.push(MethodPair {
                post: MethodSnapshot::of(post),
                pre: MethodSnapshot::of(pre),
            }),
            None => debug!(method = post.name(), "no pre-change method with this name"),
        }
    }

    Ok(FilePairs {
        changed_methods: changed.len(),
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairmine_parser::Grammar;

    fn provider() -> SyntaxTreeProvider {
        SyntaxTreeProvider::new(Grammar::Java).unwrap()
    }

    fn ctx(pre: Option<&str>, post: &str, ranges: Vec<LineRange>) -> FileChangeContext {
        FileChangeContext {
            post: post.as_bytes().to_vec(),
            pre: pre.map(|s| s.as_bytes().to_vec()),
            ranges,
        }
    }

    const PRE: &str = "class A {\n  int add(int a, int b) { return a + b; }\n}\n";
    const POST: &str = "class A {\n  int add(int a, int b) {\n    return a + b; }\n}\n";

    #[test]
    fn test_changed_method_is_paired() {
        let result = pairs_for_file(&provider(), &ctx(Some(PRE), POST, vec![LineRange::new(1, 3)])).unwrap();
        assert_eq!(result.changed_methods, 1);
        assert_eq!(result.pairs.len(), 1);
        let pair = &result.pairs[0];
        assert_eq!(pair.name(), "add");
        assert_eq!(pair.pre.start.one_based(), "2:3");
        assert_eq!(pair.post.end.row, 2);
        assert!(pair.post.body.contains("return a + b;"));
    }

    #[test]
    fn test_new_file_yields_nothing() {
        let result = pairs_for_file(&provider(), &ctx(None, POST, vec![LineRange::new(1, 3)])).unwrap();
        assert_eq!(result, FilePairs::default());
    }

    #[test]
    fn test_renamed_method_has_no_match() {
        let post = POST.replace("add", "sum");
        let result = pairs_for_file(&provider(), &ctx(Some(PRE), &post, vec![LineRange::new(1, 3)])).unwrap();
        assert_eq!(result.changed_methods, 1);
        assert!(result.pairs.is_empty());
    }

    #[test]
    fn test_nameless_method_aborts_the_file() {
        let pre = "class A {\n  void (String s) {}\n}\n";
        let post = "class A {\n  void (int a) { a++; }\n}\n";
        let err = pairs_for_file(&provider(), &ctx(Some(pre), post, vec![LineRange::new(1, 2)])).unwrap_err();
        assert!(err.is_contract_violation(), "got {err:?}");
        assert!(matches!(err, PairError::Contract(MethodError::MissingIdentifier { .. })));
    }

    #[test]
    fn test_non_utf8_body_is_kept_lossily() {
        let pre = b"class A {\n  int add(int a, int b) { return a + b; }\n}\n".to_vec();
        let post = b"class A {\n  int add(int a, int b) {\n    // \xff\n    return a + b; }\n}\n".to_vec();
        let context = FileChangeContext {
            post,
            pre: Some(pre),
            ranges: vec![LineRange::new(1, 4)],
        };
        let result = pairs_for_file(&provider(), &context).unwrap();
        assert_eq!(result.pairs.len(), 1);
        let body = &result.pairs[0].post.body;
        assert!(body.contains('\u{fffd}'));
        assert!(body.contains("return a + b;"));
    }

    #[test]
    fn test_record_fields() {
        let result = pairs_for_file(&provider(), &ctx(Some(PRE), POST, vec![LineRange::new(1, 3)])).unwrap();
        let commit = CommitInfo {
            repo: "o/r".into(),
            sha: "c".into(),
            parent_sha: Some("p".into()),
            label: "1".into(),
            files: Vec::new(),
        };
        let file = ChangedFile::new("src/A.java", "https://github.com/o/r/raw/c/src/A.java")
            .renamed_from("src/Old.java");

        let record = result.pairs[0].to_record(&commit, &file, false);
        assert_eq!(record.before_url, "https://github.com/o/r/raw/p/src/Old.java");
        assert_eq!(record.after_url, "https://github.com/o/r/raw/c/src/A.java");
        assert_eq!(record.before_path, "src/Old.java");
        assert_eq!(record.after_path, "src/A.java");
        assert_eq!(record.before_commit, "p");
        assert_eq!(record.after_commit, "c");
        assert_eq!(record.method_name, "add");
        assert_eq!(record.label, "1");
        assert!(record.before_body.is_none());

        let with_bodies = result.pairs[0].to_record(&commit, &file, true);
        assert!(with_bodies.after_body.unwrap().contains("return"));
    }
}
