//! CLI binary for pairmine: mine pre/post-change method pairs from git commits.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pairmine_core::commit::CommitRef;
use pairmine_core::config::MinerConfig;
use pairmine_core::sink::RecordSink;
use pairmine_miner::{GitSource, MethodSnapshot, Miner};
use pairmine_parser::{
    Grammar, LineRange, SyntaxTreeProvider, collect_all_methods, collect_methods_in_ranges,
    extract_post_change_ranges,
};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pairmine", about = "Mine pre/post-change method pairs from commits")]
struct Cli {
    /// Project root holding .pairmine/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which commits of which repository to read.
#[derive(Args)]
struct CommitArgs {
    /// Local git repository (defaults to the project root)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Repository identifier as `owner/name` (defaults to the origin remote)
    #[arg(long)]
    name: Option<String>,

    /// File listing commits, one `<repo> <sha> [label]` or `<sha>` per line
    #[arg(short, long)]
    commits: Option<PathBuf>,

    /// Commit SHAs to mine, in addition to --commits
    shas: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine method pairs for commits of a local repository
    Mine {
        #[command(flatten)]
        target: CommitArgs,

        /// Output file (defaults to output.path from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: csv, jsonl
        #[arg(short, long)]
        format: Option<String>,

        /// Grammar used to parse changed files
        #[arg(short, long)]
        lang: Option<String>,

        /// Parse the files of each commit in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// List the method declarations of a source file
    Methods {
        /// Source file to parse
        file: PathBuf,

        /// Grammar (detected from the file extension if not specified)
        #[arg(short, long)]
        lang: Option<String>,

        /// Only methods touching these rows, e.g. "1-4,8-12" (0-based)
        #[arg(long, value_delimiter = ',')]
        ranges: Vec<LineRange>,

        /// Print JSON instead of one line per method
        #[arg(long)]
        json: bool,
    },

    /// Print the post-change line ranges of a unified diff
    Ranges {
        /// Patch file (reads stdin if omitted)
        patch: Option<PathBuf>,
    },

    /// Export the pre/post states of each commit's files
    Snapshot {
        #[command(flatten)]
        target: CommitArgs,

        /// Directory receiving one sub-directory per commit
        #[arg(long)]
        out: PathBuf,
    },
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Mine {
            target,
            output,
            format,
            lang,
            parallel,
        } => cmd_mine(&project_root, target, output, format, lang, parallel),
        Commands::Methods {
            file,
            lang,
            ranges,
            json,
        } => cmd_methods(&project_root, &file, lang.as_deref(), &ranges, json),
        Commands::Ranges { patch } => cmd_ranges(patch.as_deref()),
        Commands::Snapshot { target, out } => cmd_snapshot(&project_root, target, &out),
    }
}

fn parse_grammar(name: &str) -> Result<Grammar> {
    Grammar::from_name(name)
        .or_else(|| Grammar::from_extension(name))
        .ok_or_else(|| {
            let known: Vec<&str> = Grammar::ALL.iter().map(|g| g.name()).collect();
            anyhow::anyhow!("unsupported language: {} (known: {})", name, known.join(", "))
        })
}

/// Open the repository and gather the commits named on the command line.
fn open_target(
    project_root: &Path,
    config: &MinerConfig,
    target: CommitArgs,
) -> Result<(GitSource, Vec<CommitRef>)> {
    let repo_dir = target.repo.unwrap_or_else(|| project_root.to_path_buf());
    let mut source = GitSource::open(&repo_dir, config.source.clone())
        .with_context(|| format!("failed to open git repository {}", repo_dir.display()))?;
    if let Some(name) = target.name {
        source = source.with_name(name);
    }

    let mut commits = Vec::new();
    if let Some(list) = &target.commits {
        let text = std::fs::read_to_string(list)
            .with_context(|| format!("failed to read commit list {}", list.display()))?;
        commits.extend(CommitRef::parse_list(&text, Some(source.name()))?);
    }
    commits.extend(
        target
            .shas
            .into_iter()
            .map(|sha| CommitRef::new(source.name(), sha)),
    );

    if commits.is_empty() {
        anyhow::bail!("no commits given. Pass SHAs or --commits FILE.");
    }
    Ok((source, commits))
}

fn commit_progress(total: usize, label: &str) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "  {label} [{{bar:30.cyan/blue}}] {{pos}}/{{len}} commits {{msg}}"
            ))
            .expect("valid template")
            .progress_chars("##-"),
    );
    pb
}

fn cmd_mine(
    project_root: &Path,
    target: CommitArgs,
    output: Option<PathBuf>,
    format: Option<String>,
    lang: Option<String>,
    parallel: bool,
) -> Result<()> {
    let mut config = MinerConfig::load(project_root)?;

    if let Some(l) = lang {
        let grammar = parse_grammar(&l)?;
        let accepts_any = config.mining.file_types.iter().any(|t| t == "any");
        if grammar.name() != config.mining.language && !accepts_any {
            config.mining.file_types = grammar
                .extensions()
                .iter()
                .map(|e| format!(".{e}"))
                .collect();
        }
        config.mining.language = grammar.name().to_string();
    }
    if parallel {
        config.mining.parallel = true;
    }
    if let Some(path) = output {
        config.output.path = path;
    }
    if let Some(f) = format {
        config.output.format = f.parse()?;
    }

    let grammar = parse_grammar(&config.mining.language)?;
    let provider = SyntaxTreeProvider::new(grammar)?;
    let (source, commits) = open_target(project_root, &config, target)?;

    let output_path = if config.output.path.is_absolute() {
        config.output.path.clone()
    } else {
        project_root.join(&config.output.path)
    };
    let mut sink = RecordSink::open(&output_path, config.output.format)?;

    eprintln!(
        "Mining {} commit(s) of {} ({}, {})",
        commits.len(),
        source.name(),
        grammar,
        config.mining.file_types.join(" ")
    );

    let miner = Miner::new(source, provider, config.mining.clone());
    let pb = commit_progress(commits.len(), "Mining");
    let summary = miner.mine_into(&commits, &mut sink, |_, summary| {
        pb.set_message(format!("{} pairs", summary.pairs));
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    eprintln!("\nMining complete!");
    eprintln!("  Commits: {} ({} failed)", summary.commits, summary.commits_failed);
    eprintln!("  Files: {}", summary.files_seen);
    eprintln!("  Without pre-change state: {}", summary.files_without_pre_state);
    eprintln!("  Unavailable: {}", summary.files_unavailable);
    eprintln!(
        "  Skipped: {} contract violation(s), {} parse failure(s)",
        summary.contract_violations, summary.files_failed
    );
    eprintln!("  Changed methods: {}", summary.methods_changed);
    eprintln!("  Pairs: {}", summary.pairs);
    eprintln!(
        "  Written to: {} ({})",
        sink.path().display(),
        sink.format()
    );
    if summary.pairs == 0 && summary.commits > 0 {
        eprintln!("\nTip: check mining.file_types and --lang; no changed method matched.");
    }

    Ok(())
}

fn cmd_methods(
    project_root: &Path,
    file: &Path,
    lang: Option<&str>,
    ranges: &[LineRange],
    json: bool,
) -> Result<()> {
    let grammar = match lang {
        Some(l) => parse_grammar(l)?,
        None => match file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Grammar::from_extension)
        {
            Some(g) => g,
            None => parse_grammar(&MinerConfig::load(project_root)?.mining.language)?,
        },
    };

    let source =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let tree = SyntaxTreeProvider::new(grammar)?.parse(&source)?;
    if tree.has_errors() {
        tracing::warn!(file = %file.display(), "source has syntax errors; results are best-effort");
    }

    let methods = if ranges.is_empty() {
        collect_all_methods(&tree)?
    } else {
        collect_methods_in_ranges(&tree, ranges)?
    };
    let snapshots: Vec<MethodSnapshot> = methods.iter().map(MethodSnapshot::of).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        for m in &snapshots {
            println!("{}\t{}\t{}", m.start.one_based(), m.end.one_based(), m.name);
        }
        eprintln!("{} method(s)", snapshots.len());
    }
    Ok(())
}

fn cmd_ranges(patch: Option<&Path>) -> Result<()> {
    let text = match patch {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read patch from stdin")?;
            buf
        }
    };

    let ranges = extract_post_change_ranges(&text);
    for range in &ranges {
        println!("{range}");
    }
    if ranges.is_empty() {
        eprintln!("No hunk headers found.");
    }
    Ok(())
}

fn cmd_snapshot(project_root: &Path, target: CommitArgs, out: &Path) -> Result<()> {
    let config = MinerConfig::load(project_root)?;
    let grammar = parse_grammar(&config.mining.language)?;
    let provider = SyntaxTreeProvider::new(grammar)?;
    let (source, commits) = open_target(project_root, &config, target)?;

    let miner = Miner::new(source, provider, config.mining.clone());
    let pb = commit_progress(commits.len(), "Exporting");
    let summary = miner.export_snapshots(&commits, out, |_, _| pb.inc(1));
    pb.finish_and_clear();

    eprintln!("\nSnapshot export complete!");
    eprintln!(
        "  Written: {} commit(s), {} file pair(s)",
        summary.commits_written, summary.files_written
    );
    eprintln!("  Already present: {}", summary.commits_present);
    eprintln!("  Without pairs: {}", summary.commits_without_pairs);
    eprintln!("  Failed: {}", summary.commits_failed);
    eprintln!("  Output: {}", out.display());
    Ok(())
}
