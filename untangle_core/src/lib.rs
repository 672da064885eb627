//! Core library for building commit-untangling ground truth and scoring tools.
//!
//! The crate is layered around three primary responsibilities:
//! - diff cleaning and three-way line alignment into ground truth
//! - normalization and scoring of third-party tool decompositions
//! - descriptive metrics and repository access for the study's inputs

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

use std::path::Path;

pub use untangle_api as api;

/// Three-way alignment of changed lines into ground truth.
pub mod align;
/// Comment, import and redundant-edit suppression for parsed diffs.
pub mod clean;
/// Workspace configuration loaded from `untangle.toml`.
pub mod config;
/// Per-commit evaluation of every registered tool.
pub mod evaluation;
/// Descriptive statistics over diffs and ground truth.
pub mod metrics;
/// Joining tool output onto the ground-truth line set.
pub mod normalize;
/// Git repository access for rendering commit diffs.
pub mod repository;
/// Rand Index scoring with purely-other group collapsing.
pub mod score;
/// Tool adapter registry and invocation.
pub mod tools;
/// CSV and diff file input/output.
pub mod truth;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input file does not exist.
    #[error("required input not found: {path}")]
    MissingInput {
        /// Path of the missing file.
        path: String,
    },
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// A diff file could not be parsed.
    #[error("failed to parse diff {path}: {source}")]
    Parse {
        /// Path of the diff being parsed.
        path: String,
        /// Parser failure.
        #[source]
        source: api::ParseError,
    },
    /// Reading or writing a CSV file failed.
    #[error("csv error in {path}: {source}")]
    Csv {
        /// Path of the CSV file.
        path: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// The configuration file is not valid TOML for the expected schema.
    #[error("invalid configuration in {path}: {source}")]
    Config {
        /// Path of the configuration file.
        path: String,
        /// TOML deserialization failure.
        #[source]
        source: toml::de::Error,
    },
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error bubbled up by the core library.
        #[from]
        source: git2::Error,
    },
    /// Provided path does not correspond to a git repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// Fix, non-fix and original changed-line counts are inconsistent.
    #[error(
        "tangled line count is not whole: fix={fix} nonfix={nonfix} total={total} differ by an odd amount"
    )]
    ParityViolation {
        /// Changed lines in the bug-fixing diff.
        fix: usize,
        /// Changed lines in the non-bug-fixing diff.
        nonfix: usize,
        /// Changed lines in the original diff.
        total: usize,
    },
    /// A tool adapter produced no rows.
    #[error("tool '{tool}' produced an empty decomposition")]
    EmptyDecomposition {
        /// Identifier of the tool.
        tool: String,
    },
    /// A tool adapter failed.
    #[error("tool '{tool}' failed: {source}")]
    Tool {
        /// Identifier of the tool.
        tool: String,
        /// Error reported by the adapter.
        #[source]
        source: untangle_tool_api::ToolError,
    },
    /// No adapter is registered under the requested identifier.
    #[error("tool '{tool}' is not registered")]
    ToolNotRegistered {
        /// Requested tool identifier.
        tool: String,
    },
}

impl Error {
    /// Map an I/O failure on `path`, turning a missing file into [`Error::MissingInput`].
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingInput {
                path: display_path(path),
            }
        } else {
            Self::Io {
                path: display_path(path),
                source,
            }
        }
    }
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
