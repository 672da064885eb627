//! Reading and writing the CSV files and diffs exchanged between steps.

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use untangle_api::{Diff, GroundTruthRow, ScoreRow, ToolGroupAssignment};

use crate::{display_path, Error, Result};

/// Read and parse a unified diff, decoding it as Latin-1.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] when the file does not exist and
/// [`Error::Parse`] when it is not a valid diff.
pub fn read_diff(path: &Path) -> Result<Diff> {
    let bytes = fs::read(path).map_err(|source| Error::io(path, source))?;
    parse_diff_bytes(path, &bytes)
}

/// Parse diff bytes read from `origin` (used in error messages).
///
/// # Errors
///
/// Returns [`Error::Parse`] when the bytes are not a valid diff.
pub fn parse_diff_bytes(origin: &Path, bytes: &[u8]) -> Result<Diff> {
    Diff::from_latin1(bytes).map_err(|source| Error::Parse {
        path: display_path(origin),
        source,
    })
}

/// Write `diff` as Latin-1 encoded unified-diff text.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be written.
pub fn write_diff(path: &Path, diff: &Diff) -> Result<()> {
    let bytes = untangle_api::encode_latin1(&diff.to_string());
    fs::write(path, bytes).map_err(|source| Error::Io {
        path: display_path(path),
        source,
    })
}

/// Read a ground-truth CSV.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] for a missing file and [`Error::Csv`]
/// for rows that do not match the schema.
pub fn read_ground_truth(path: &Path) -> Result<Vec<GroundTruthRow>> {
    read_rows(path)
}

/// Write a ground-truth CSV with a `file,source,target,group` header.
///
/// # Errors
///
/// Returns [`Error::Csv`] when the file cannot be written.
pub fn write_ground_truth(path: &Path, rows: &[GroundTruthRow]) -> Result<()> {
    write_rows(path, rows)
}

/// Read a tool decomposition CSV; `None` when the tool produced no file.
///
/// # Errors
///
/// Returns [`Error::Csv`] for unreadable or malformed files.
pub fn read_tool_assignments(path: &Path) -> Result<Option<Vec<ToolGroupAssignment>>> {
    match read_rows(path) {
        Ok(rows) => Ok(Some(rows)),
        Err(Error::MissingInput { .. }) => {
            tracing::debug!(path = %path.display(), "no tool decomposition");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Write a tool decomposition CSV.
///
/// # Errors
///
/// Returns [`Error::Csv`] when the file cannot be written.
pub fn write_tool_assignments(path: &Path, rows: &[ToolGroupAssignment]) -> Result<()> {
    write_rows(path, rows)
}

/// Append a score row, writing the header only when the file is new or empty.
///
/// # Errors
///
/// Returns [`Error::Io`] or [`Error::Csv`] when the file cannot be written.
pub fn append_score(path: &Path, row: &ScoreRow) -> Result<()> {
    let needs_header = fs::metadata(path).map_or(true, |metadata| metadata.len() == 0);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::Io {
            path: display_path(path),
            source,
        })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer.serialize(row).map_err(|source| csv_error(path, source))?;
    writer.flush().map_err(|source| Error::Io {
        path: display_path(path),
        source,
    })
}

/// Render a score row (with header) as CSV text.
///
/// # Errors
///
/// Returns [`Error::Csv`] when serialization fails.
pub fn score_to_csv(row: &ScoreRow) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .serialize(row)
        .map_err(|source| csv_error(Path::new("<stdout>"), source))?;
    let bytes = writer.into_inner().map_err(|err| Error::Io {
        path: "<stdout>".to_string(),
        source: err.into_error(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path).map_err(|source| Error::io(path, source))?;
    csv::Reader::from_reader(file)
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|source| csv_error(path, source))
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| csv_error(path, source))?;
    for row in rows {
        writer.serialize(row).map_err(|source| csv_error(path, source))?;
    }
    writer.flush().map_err(|source| Error::Io {
        path: display_path(path),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

fn csv_error(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: display_path(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use untangle_api::{Group, LineKey};

    use super::*;

    #[test]
    fn ground_truth_csv_uses_empty_fields_for_missing_numbers() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("truth.csv");
        let rows = vec![
            GroundTruthRow::new(LineKey::new("src/A.java", Some(12), None), Group::Fix),
            GroundTruthRow::new(LineKey::new("src/A.java", None, Some(13)), Group::Other),
        ];

        write_ground_truth(&path, &rows).expect("write truth");
        let text = fs::read_to_string(&path).expect("read back");
        assert_eq!(
            text,
            "file,source,target,group\nsrc/A.java,12,,fix\nsrc/A.java,,13,other\n"
        );
        assert_eq!(read_ground_truth(&path).expect("parse truth"), rows);
    }

    #[test]
    fn missing_truth_is_missing_input() {
        let temp = tempdir().expect("tempdir");
        let err = read_ground_truth(&temp.path().join("truth.csv")).expect_err("missing");
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[test]
    fn missing_tool_file_is_none() {
        let temp = tempdir().expect("tempdir");
        let rows = read_tool_assignments(&temp.path().join("flexeme.csv")).expect("read");
        assert!(rows.is_none());
    }

    #[test]
    fn unknown_group_is_csv_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("truth.csv");
        fs::write(&path, "file,source,target,group\nA.java,1,,maybe\n").expect("write");
        let err = read_ground_truth(&path).expect_err("bad group");
        assert!(matches!(err, Error::Csv { .. }));
    }

    #[test]
    fn appended_scores_share_one_header() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("scores.csv");
        let row = ScoreRow {
            project: "Lang".into(),
            bug_id: "1".into(),
            smartcommit_score: 0.5,
            flexeme_score: 1.0,
            file_untangling_score: 0.25,
        };
        append_score(&path, &row).expect("first append");
        append_score(&path, &row).expect("second append");

        let text = fs::read_to_string(&path).expect("read scores");
        assert_eq!(
            text,
            "project,bug_id,smartcommit_score,flexeme_score,file_untangling_score\nLang,1,0.5,1.0,0.25\nLang,1,0.5,1.0,0.25\n"
        );
        assert_eq!(
            score_to_csv(&row).expect("render"),
            text.lines().take(2).collect::<Vec<_>>().join("\n") + "\n"
        );
    }
}
