//! Unified-diff parsing for git-style and plain diffs.
//!
//! Parsing is driven by the hunk header counts: a hunk ends once all of the
//! source and target lines announced by its `@@` header have been read. Text
//! between hunks and files (`index` lines, file modes, `Binary files ...`) is
//! ignored.

use crate::diff::{Diff, DiffLine, FilePatch, Hunk, HunkHeader, NULL_PATH};

/// Errors raised while parsing unified-diff text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A hunk header appeared before any `---`/`+++` or `diff --git` header.
    #[error("line {line}: hunk header found before any file header")]
    HunkOutsideFile {
        /// 1-based line number of the offending header.
        line: usize,
    },
    /// A line starting with `@@` could not be parsed as a hunk header.
    #[error("line {line}: malformed hunk header `{header}`")]
    InvalidHunkHeader {
        /// 1-based line number of the offending header.
        line: usize,
        /// The header text as it appeared in the diff.
        header: String,
    },
    /// The hunk body ended before the lines announced by its header were read.
    #[error(
        "line {line}: hunk ended early ({source_remaining} source and {target_remaining} target lines missing)"
    )]
    TruncatedHunk {
        /// 1-based line number where the hunk body stopped.
        line: usize,
        /// Pre-image lines still expected.
        source_remaining: u32,
        /// Post-image lines still expected.
        target_remaining: u32,
    },
}

impl Diff {
    /// Parse unified-diff text.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for hunk headers outside a file, malformed
    /// hunk headers, and hunks whose bodies are shorter than announced.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::default();
        let mut last_line = 0;
        for (index, raw) in text.split_inclusive('\n').enumerate() {
            last_line = index + 1;
            parser.feed(raw, last_line)?;
        }
        parser.finish(last_line)
    }

    /// Decode bytes as Latin-1 and parse the result.
    ///
    /// # Errors
    ///
    /// See [`Diff::parse`].
    pub fn from_latin1(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::parse(&decode_latin1(bytes))
    }
}

/// Decode bytes as Latin-1: each byte becomes the code point of the same value.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Encode text as Latin-1. Code points above `U+00FF` are written as `?`.
#[must_use]
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(ch).unwrap_or(b'?'))
        .collect()
}

struct ActiveHunk {
    hunk: Hunk,
    source_remaining: u32,
    target_remaining: u32,
    next_source: u32,
    next_target: u32,
}

#[derive(Default)]
struct Parser {
    files: Vec<FilePatch>,
    pending_source: Option<String>,
    // Set after `diff --git` until the `---`/`+++` pair (if any) has been seen.
    awaiting_paths: bool,
    active: Option<ActiveHunk>,
}

impl Parser {
    fn feed(&mut self, raw: &str, line: usize) -> Result<(), ParseError> {
        if self.active.is_some() {
            return self.feed_body(raw, line);
        }

        if let Some(rest) = raw.strip_prefix("diff --git ") {
            let (source, target) = split_git_paths(strip_line_ending(rest));
            self.files.push(FilePatch::new(source, target));
            self.pending_source = None;
            self.awaiting_paths = true;
        } else if let Some(rest) = raw.strip_prefix("--- ") {
            self.pending_source = Some(header_path(rest));
        } else if let Some(rest) = raw.strip_prefix("+++ ") {
            let target = header_path(rest);
            let source = self.pending_source.take();
            match self.files.last_mut() {
                Some(file) if self.awaiting_paths => {
                    if let Some(source) = source {
                        file.source_path = source;
                    }
                    file.target_path = target;
                }
                _ => {
                    let source = source.unwrap_or_else(|| NULL_PATH.to_string());
                    self.files.push(FilePatch::new(source, target));
                }
            }
            self.awaiting_paths = false;
        } else if raw.starts_with("@@") {
            self.start_hunk(raw, line)?;
        }
        Ok(())
    }

    fn start_hunk(&mut self, raw: &str, line: usize) -> Result<(), ParseError> {
        let header = parse_hunk_header(raw, line)?;
        let Some(file) = self.files.last_mut() else {
            return Err(ParseError::HunkOutsideFile { line });
        };
        self.awaiting_paths = false;

        let active = ActiveHunk {
            source_remaining: header.source_length,
            target_remaining: header.target_length,
            next_source: header.source_start,
            next_target: header.target_start,
            hunk: Hunk {
                header,
                lines: Vec::new(),
            },
        };
        if active.source_remaining == 0 && active.target_remaining == 0 {
            file.hunks.push(active.hunk);
        } else {
            self.active = Some(active);
        }
        Ok(())
    }

    fn feed_body(&mut self, raw: &str, line: usize) -> Result<(), ParseError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        let diff_line = match raw.as_bytes().first() {
            Some(b' ') => {
                let diff_line = DiffLine::context(active.next_source, active.next_target, &raw[1..]);
                active.consume_source();
                active.consume_target();
                diff_line
            }
            Some(b'+') => {
                let diff_line = DiffLine::added(active.next_target, &raw[1..]);
                active.consume_target();
                diff_line
            }
            Some(b'-') => {
                let diff_line = DiffLine::removed(active.next_source, &raw[1..]);
                active.consume_source();
                diff_line
            }
            Some(b'\\') => return Ok(()),
            // Some tools strip the single space from empty context lines.
            Some(b'\n' | b'\r') => {
                let diff_line = DiffLine::context(active.next_source, active.next_target, raw);
                active.consume_source();
                active.consume_target();
                diff_line
            }
            _ => {
                return Err(ParseError::TruncatedHunk {
                    line,
                    source_remaining: active.source_remaining,
                    target_remaining: active.target_remaining,
                })
            }
        };
        active.hunk.lines.push(diff_line);

        if active.source_remaining == 0 && active.target_remaining == 0 {
            if let (Some(finished), Some(file)) = (self.active.take(), self.files.last_mut()) {
                file.hunks.push(finished.hunk);
            }
        }
        Ok(())
    }

    fn finish(self, last_line: usize) -> Result<Diff, ParseError> {
        if let Some(active) = self.active {
            return Err(ParseError::TruncatedHunk {
                line: last_line,
                source_remaining: active.source_remaining,
                target_remaining: active.target_remaining,
            });
        }
        Ok(Diff { files: self.files })
    }
}

impl ActiveHunk {
    fn consume_source(&mut self) {
        self.source_remaining = self.source_remaining.saturating_sub(1);
        self.next_source += 1;
    }

    fn consume_target(&mut self) {
        self.target_remaining = self.target_remaining.saturating_sub(1);
        self.next_target += 1;
    }
}

fn strip_line_ending(text: &str) -> &str {
    text.trim_end_matches(&['\r', '\n'][..])
}

/// Path from a `---`/`+++` header; anything after a tab is a timestamp.
fn header_path(rest: &str) -> String {
    let rest = strip_line_ending(rest);
    let path = rest.split('\t').next().unwrap_or(rest);
    path.trim_end().to_string()
}

fn split_git_paths(rest: &str) -> (String, String) {
    if let Some((source, target)) = rest.split_once(" b/") {
        return (source.to_string(), format!("b/{target}"));
    }
    let mut parts = rest.split_whitespace();
    let source = parts.next().unwrap_or_default().to_string();
    let target = parts.next().map_or_else(|| source.clone(), str::to_string);
    (source, target)
}

fn parse_hunk_header(raw: &str, line: usize) -> Result<HunkHeader, ParseError> {
    let text = strip_line_ending(raw);
    let invalid = || ParseError::InvalidHunkHeader {
        line,
        header: text.to_string(),
    };

    let rest = text.strip_prefix("@@ -").ok_or_else(invalid)?;
    let (ranges, section) = rest.split_once(" @@").ok_or_else(invalid)?;
    let (source, target) = ranges.split_once(" +").ok_or_else(invalid)?;
    let (source_start, source_length) = parse_range(source).ok_or_else(invalid)?;
    let (target_start, target_length) = parse_range(target).ok_or_else(invalid)?;

    let section = section.trim();
    Ok(HunkHeader {
        source_start,
        source_length,
        target_start,
        target_length,
        section: (!section.is_empty()).then(|| section.to_string()),
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, length)) => Some((start.parse().ok()?, length.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
