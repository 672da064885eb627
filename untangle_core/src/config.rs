use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{display_path, Error, Result};

/// Default configuration file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "untangle.toml";
/// Default ground-truth file name inside a commit's evaluation directory.
pub const DEFAULT_TRUTH_FILE: &str = "truth.csv";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Diff cleaning switches.
    #[serde(default)]
    pub cleaning: CleaningConfig,
    /// File names used by per-commit evaluation.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Switches for the individual cleaning steps and the file filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Demote changed comment lines to context.
    pub strip_comments: bool,
    /// Demote changed `import` lines to context.
    pub strip_imports: bool,
    /// Demote changed blank lines to context.
    pub strip_blank_lines: bool,
    /// Demote adjacent added/removed pairs with equal trimmed text.
    pub cancel_redundant_pairs: bool,
    /// Keep only files with one of these extensions; empty keeps every file.
    pub extensions: Vec<String>,
    /// Drop test files from the cleaned diff.
    pub exclude_tests: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            strip_comments: true,
            strip_imports: true,
            strip_blank_lines: true,
            cancel_redundant_pairs: true,
            extensions: Vec::new(),
            exclude_tests: false,
        }
    }
}

/// File names read from a commit's evaluation directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Ground truth written by the `truth` step.
    pub truth_file: String,
    /// SmartCommit decomposition.
    pub smartcommit_file: String,
    /// Flexeme decomposition.
    pub flexeme_file: String,
    /// File-based baseline decomposition.
    pub file_untangling_file: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            truth_file: DEFAULT_TRUTH_FILE.to_string(),
            smartcommit_file: "smartcommit.csv".to_string(),
            flexeme_file: "flexeme.csv".to_string(),
            file_untangling_file: "file_untangling.csv".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file exists but cannot be read and
    /// [`Error::Config`] when it is not valid TOML for this schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: display_path(path),
            source,
        })?;
        let parsed: Self = toml::from_str(&raw).map_err(|source| Error::Config {
            path: display_path(path),
            source,
        })?;
        Ok(normalize_config(parsed))
    }
}

fn normalize_config(mut config: Config) -> Config {
    config.cleaning.extensions = config
        .cleaning
        .extensions
        .iter()
        .map(|extension| extension.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|extension| !extension.is_empty())
        .collect();

    let defaults = EvaluationConfig::default();
    let evaluation = &mut config.evaluation;
    for (value, default) in [
        (&mut evaluation.truth_file, defaults.truth_file),
        (&mut evaluation.smartcommit_file, defaults.smartcommit_file),
        (&mut evaluation.flexeme_file, defaults.flexeme_file),
        (
            &mut evaluation.file_untangling_file,
            defaults.file_untangling_file,
        ),
    ] {
        if value.trim().is_empty() {
            *value = default;
        }
    }

    config
}
