use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use untangle_api::GroundTruthRow;

/// Summary information about a registered tool adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Stable identifier for the adapter.
    pub id: String,
    /// Human-friendly label for display.
    pub label: String,
    /// Default file name of the normalized decomposition.
    pub output_file: String,
}

/// Inputs handed to an adapter for one commit.
#[derive(Debug, Clone, Copy)]
pub struct DecompositionRequest<'a> {
    /// Raw tool output (a file or a directory, depending on the tool).
    pub result_path: &'a Path,
    /// Ground truth of the commit being decomposed.
    pub truth: &'a [GroundTruthRow],
}

impl<'a> DecompositionRequest<'a> {
    /// Construct a request for the given raw output and ground truth.
    #[must_use]
    pub const fn new(result_path: &'a Path, truth: &'a [GroundTruthRow]) -> Self {
        Self { result_path, truth }
    }
}

/// Errors surfaced by tool adapters.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool did not produce the expected output.
    #[error("tool output not found at {}", path.display())]
    MissingOutput {
        /// Location where the output was expected.
        path: PathBuf,
    },
    /// Reading the tool output failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The tool output could not be interpreted.
    #[error("malformed tool output in {}: {message}", path.display())]
    Malformed {
        /// File holding the malformed content.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },
}

impl ToolError {
    /// Helper to construct a malformed-output error from any displayable message.
    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map an I/O failure, treating a missing file as missing tool output.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingOutput { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Convenience result alias for adapter operations.
pub type ToolResult<T> = std::result::Result<T, ToolError>;
