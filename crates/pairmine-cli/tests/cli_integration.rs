//! Integration tests for pairmine-cli functionality.
//! Tests the underlying library functions that the CLI commands invoke.

use git2::{Repository, Signature};
use pairmine_core::commit::CommitRef;
use pairmine_core::config::MinerConfig;
use pairmine_core::record::{OutputFormat, PairRecord};
use pairmine_core::sink::RecordSink;
use pairmine_miner::{GitSource, Miner};
use pairmine_parser::{Grammar, SyntaxTreeProvider};
use std::path::Path;

fn write_and_commit(repo: &Repository, path: &str, content: &str, message: &str) -> String {
    let root = repo.workdir().unwrap().to_path_buf();
    std::fs::create_dir_all(root.join(path).parent().unwrap()).unwrap();
    std::fs::write(root.join(path), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
        .to_string()
}

fn python_project() -> (tempfile::TempDir, String, String) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    repo.remote("origin", "https://github.com/acme/tools.git")
        .unwrap();
    let first = write_and_commit(
        &repo,
        "tools/math.py",
        "def add(a, b):\n    return a + b\n\n\ndef neg(a):\n    return -a\n",
        "initial",
    );
    let second = write_and_commit(
        &repo,
        "tools/math.py",
        "def add(a, b):\n    total = a + b\n    return total\n\n\ndef neg(a):\n    return -a\n",
        "refactor add",
    );
    (dir, first, second)
}

#[test]
fn test_mine_python_repo_with_project_config() {
    let (dir, first, second) = python_project();
    let config_dir = dir.path().join(".pairmine");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[mining]\nlanguage = \"python\"\nfile_types = [\".py\"]\n\n[output]\nformat = \"jsonl\"\npath = \"out/pairs.jsonl\"\n",
    )
    .unwrap();

    let config = MinerConfig::load(dir.path()).unwrap();
    let grammar = Grammar::from_name(&config.mining.language).unwrap();
    let source = GitSource::open(dir.path(), config.source.clone()).unwrap();
    assert_eq!(source.name(), "acme/tools");

    let list = format!("# fixing commits\nhttps://github.com/acme/tools {second} 1\n");
    let commits = CommitRef::parse_list(&list, Some(source.name())).unwrap();
    assert_eq!(commits[0].repo, "acme/tools");

    let miner = Miner::new(
        source,
        SyntaxTreeProvider::new(grammar).unwrap(),
        config.mining.clone(),
    );
    let out = dir.path().join(&config.output.path);
    let mut sink = RecordSink::open(&out, config.output.format).unwrap();
    let summary = miner.mine_into(&commits, &mut sink, |_, _| {}).unwrap();
    assert_eq!(summary.commits, 1);
    assert!(summary.pairs >= 1);

    let content = std::fs::read_to_string(&out).unwrap();
    let records: Vec<PairRecord> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let add = records.iter().find(|r| r.method_name == "add").unwrap();
    assert_eq!(add.repository, "acme/tools");
    assert_eq!(add.before_commit, first);
    assert_eq!(add.after_commit, second);
    assert_eq!(add.label, "1");
    assert_eq!(
        add.after_url,
        format!("https://github.com/acme/tools/raw/{second}/tools/math.py")
    );
    assert_eq!(
        add.before_url,
        format!("https://github.com/acme/tools/raw/{first}/tools/math.py")
    );
    assert!(add.after_body.as_deref().unwrap().contains("total = a + b"));
    assert!(add.before_body.as_deref().unwrap().contains("return a + b"));
}

#[test]
fn test_mining_twice_appends_without_second_header() {
    let (dir, _first, second) = python_project();
    let source = GitSource::open(dir.path(), MinerConfig::default().source).unwrap();
    let mut mining = MinerConfig::default().mining;
    mining.language = "python".into();
    mining.file_types = vec![".py".into()];
    let commits = vec![CommitRef::new(source.name(), second)];
    let miner = Miner::new(
        source,
        SyntaxTreeProvider::new(Grammar::Python).unwrap(),
        mining,
    );

    let out = dir.path().join("pairs.csv");
    for _ in 0..2 {
        let mut sink = RecordSink::open(&out, OutputFormat::Csv).unwrap();
        miner.mine_into(&commits, &mut sink, |_, _| {}).unwrap();
    }

    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(content.matches("Repository,").count(), 1);
    let rows = content.lines().skip(1).count();
    assert!(rows >= 2 && rows % 2 == 0, "got {rows} rows");
}

#[test]
fn test_snapshot_export_from_git() {
    let (dir, _first, second) = python_project();
    let mut mining = MinerConfig::default().mining;
    mining.file_types = vec!["any".into()];
    let source = GitSource::open(dir.path(), MinerConfig::default().source).unwrap();
    let commits = vec![CommitRef::new(source.name(), second.clone())];
    let miner = Miner::new(
        source,
        SyntaxTreeProvider::new(Grammar::Python).unwrap(),
        mining,
    );

    let out = tempfile::tempdir().unwrap();
    let summary = miner.export_snapshots(&commits, out.path(), |_, _| {});
    assert_eq!(summary.commits_written, 1);
    assert_eq!(summary.files_written, 1);

    let snap = out.path().join(format!("acme_tools_{second}"));
    assert!(snap.join("pre_math.py").exists());
    assert!(snap.join("post_math.py").exists());
}

#[test]
fn test_config_env_override_for_output() {
    let tmp = tempfile::tempdir().unwrap();
    // SAFETY: this is the only test in this binary touching PAIRMINE_OUTPUT.
    unsafe { std::env::set_var("PAIRMINE_OUTPUT", "elsewhere.csv") };
    let config = MinerConfig::load(tmp.path()).unwrap();
    unsafe { std::env::remove_var("PAIRMINE_OUTPUT") };
    assert_eq!(config.output.path, Path::new("elsewhere.csv"));
}
