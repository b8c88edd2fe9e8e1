//! Configuration for commit mining.
//!
//! Load order: `.pairmine/config.toml` → environment variables → defaults.

use crate::record::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level miner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub mining: MiningConfig,
    pub output: OutputConfig,
    pub source: SourceConfig,
}

/// Which files of a commit are mined, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Grammar name used to parse every selected file.
    pub language: String,
    /// Filename suffixes to keep. `"any"` keeps every file.
    pub file_types: Vec<String>,
    /// Cap on files per commit, applied after the suffix filter.
    pub max_files: usize,
    /// Process the files of one commit on the rayon pool.
    /// Output order is the same as a sequential run.
    pub parallel: bool,
}

/// Where pair records go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// How raw-content URLs are built for locally read repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Web base of the hosting service; `{repo}` is replaced by `owner/name`.
    pub remote: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            language: "java".to_string(),
            file_types: vec![".java".to_string()],
            max_files: 50,
            parallel: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("method_pairs.csv"),
            format: OutputFormat::Csv,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            remote: "https://github.com/{repo}".to_string(),
        }
    }
}

impl MiningConfig {
    /// Whether a file path passes the suffix filter.
    pub fn accepts_path(&self, path: &str) -> bool {
        self.file_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case("any") || path.ends_with(t.as_str()))
    }
}

impl SourceConfig {
    /// `{remote}/raw/{sha}/{path}` with `{repo}` substituted.
    pub fn raw_url(&self, repo: &str, sha: &str, path: &str) -> String {
        let base = self.remote.replace("{repo}", repo);
        format!("{}/raw/{}/{}", base.trim_end_matches('/'), sha, path)
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl MinerConfig {
    /// Path of the config file for a project root.
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(".pairmine").join("config.toml")
    }

    /// Load config from `.pairmine/config.toml` in the project root, with env
    /// var overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = Self::path(project_root);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // "any" swallows every other suffix.
        if config
            .mining
            .file_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case("any"))
        {
            config.mining.file_types = vec!["any".to_string()];
        }

        env_override("PAIRMINE_LANGUAGE", &mut config.mining.language);
        env_override("PAIRMINE_MAX_FILES", &mut config.mining.max_files);
        env_override("PAIRMINE_PARALLEL", &mut config.mining.parallel);
        env_override("PAIRMINE_OUTPUT", &mut config.output.path);
        env_override("PAIRMINE_REMOTE", &mut config.source.remote);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mining.max_files == 0 {
            anyhow::bail!("mining.max_files must be at least 1");
        }
        if self.mining.file_types.is_empty() {
            anyhow::bail!("mining.file_types must list at least one suffix (or \"any\")");
        }
        if self.mining.language.trim().is_empty() {
            anyhow::bail!("mining.language must name a grammar");
        }
        Ok(())
    }
}
