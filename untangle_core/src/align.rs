//! Three-way alignment of an original (tangled) diff against its
//! bug-fixing and non-bug-fixing decompositions.
//!
//! Line numbers drift between independently minimized diffs, so lines are
//! compared by their `(kind, text)` signature. The fix and non-fix changed
//! lines are kept in FIFO queues and consumed in diff order; duplicated
//! contents always resolve to the first remaining occurrence.
//!
//! Blank changed lines carry no code and take no part in the alignment. A
//! rendered cleaned diff writes its demoted lines as blank changes, so it
//! aligns the same way as the in-memory diff it came from.

use std::collections::VecDeque;

use untangle_api::{Diff, DiffLine, FilePatch, Group, GroundTruthRow, LineKey, LineKind};

/// Comparison key for a changed line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineSignature {
    /// Added or removed.
    pub kind: LineKind,
    /// Raw line text, line ending included.
    pub text: String,
}

impl LineSignature {
    /// Signature of a diff line.
    #[must_use]
    pub fn of(line: &DiffLine) -> Self {
        Self {
            kind: line.kind,
            text: line.value.clone(),
        }
    }

    /// Last whitespace-delimited token of the text, if any.
    #[must_use]
    pub fn trailing_token(&self) -> Option<&str> {
        self.text.split_whitespace().next_back()
    }
}

/// A changed line together with the file patch it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ChangedLine<'a> {
    /// File the line was changed in.
    pub file: &'a FilePatch,
    /// The added or removed line.
    pub line: &'a DiffLine,
}

impl ChangedLine<'_> {
    /// Ground-truth identity of the line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(
            self.file.path(),
            self.line.source_line_no,
            self.line.target_line_no,
        )
    }

    /// Comparison key of the line.
    #[must_use]
    pub fn signature(&self) -> LineSignature {
        LineSignature::of(self.line)
    }
}

/// Non-blank changed lines of `diff` in file, hunk and line order.
#[must_use]
pub fn flatten(diff: &Diff) -> Vec<ChangedLine<'_>> {
    diff.changed_lines()
        .filter(|(_, line)| is_alignable(line))
        .map(|(file, line)| ChangedLine { file, line })
        .collect()
}

fn is_alignable(line: &DiffLine) -> bool {
    !line.value.trim().is_empty()
}

/// FIFO of changed-line signatures still waiting to be matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeQueue {
    entries: VecDeque<LineSignature>,
}

impl ChangeQueue {
    /// Queue every non-blank changed line of `diff` in order.
    #[must_use]
    pub fn from_diff(diff: &Diff) -> Self {
        diff.changed_lines()
            .filter(|(_, line)| is_alignable(line))
            .map(|(_, line)| LineSignature::of(line))
            .collect()
    }

    /// Next signature to be consumed.
    #[must_use]
    pub fn front(&self) -> Option<&LineSignature> {
        self.entries.front()
    }

    /// Consume the next signature.
    pub fn pop_front(&mut self) -> Option<LineSignature> {
        self.entries.pop_front()
    }

    /// Remove the first remaining occurrence of `signature`.
    ///
    /// Returns whether an occurrence was found.
    pub fn remove_first(&mut self, signature: &LineSignature) -> bool {
        match self.entries.iter().position(|entry| entry == signature) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of signatures left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether every signature has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<LineSignature> for ChangeQueue {
    fn from_iter<I: IntoIterator<Item = LineSignature>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Classification of one original changed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Only part of the bug fix.
    Fix,
    /// Only part of the unrelated changes.
    Other,
    /// Tangled: part of both.
    Both,
}

impl Label {
    /// Ground-truth groups emitted for the label, fix first.
    #[must_use]
    pub const fn groups(self) -> &'static [Group] {
        match self {
            Self::Fix => &[Group::Fix],
            Self::Other => &[Group::Other],
            Self::Both => &[Group::Fix, Group::Other],
        }
    }
}

/// A labeled original changed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledLine {
    /// Identity of the original line.
    pub key: LineKey,
    /// Assigned label.
    pub label: Label,
}

/// Outcome of matching one original line against the queue fronts.
enum Step {
    Labeled(Label),
    /// The fronts were a cancelling tangled pair and were dropped; the same
    /// original line must be matched again.
    Retry,
    /// The line occurs in neither queue.
    Skipped,
}

/// Mutable state of a single alignment run.
#[derive(Debug)]
struct AlignmentState {
    fix: ChangeQueue,
    nonfix: ChangeQueue,
    pending_tangle: bool,
}

impl AlignmentState {
    fn exhausted(&self) -> bool {
        self.fix.is_empty() && self.nonfix.is_empty()
    }

    fn step(&mut self, signature: &LineSignature) -> Step {
        let matches_fix = self.fix.front() == Some(signature);
        let matches_nonfix = self.nonfix.front() == Some(signature);

        let label = match (matches_fix, matches_nonfix) {
            (true, true) => {
                self.fix.pop_front();
                self.nonfix.pop_front();
                Label::Both
            }
            (true, false) => {
                self.fix.pop_front();
                Label::Fix
            }
            (false, true) => {
                self.nonfix.pop_front();
                Label::Other
            }
            (false, false) => {
                if self.fronts_cancel() {
                    self.fix.pop_front();
                    self.nonfix.pop_front();
                    self.pending_tangle = true;
                    return Step::Retry;
                }
                // Only one queue gives up an entry; the fix queue is searched first.
                if self.fix.remove_first(signature) {
                    Label::Fix
                } else if self.nonfix.remove_first(signature) {
                    Label::Other
                } else {
                    return Step::Skipped;
                }
            }
        };

        if self.pending_tangle && label == Label::Fix {
            self.pending_tangle = false;
            return Step::Labeled(Label::Both);
        }
        Step::Labeled(label)
    }

    /// Fix and non-fix fronts ending in the same token are taken to be two
    /// halves of a change that cancels out in the original diff.
    fn fronts_cancel(&self) -> bool {
        let (Some(fix), Some(nonfix)) = (self.fix.front(), self.nonfix.front()) else {
            return false;
        };
        matches!(
            (fix.trailing_token(), nonfix.trailing_token()),
            (Some(fix_token), Some(nonfix_token)) if fix_token == nonfix_token
        )
    }
}

/// Classifies original changed lines as fix, other or tangled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineAligner;

impl LineAligner {
    /// Create an aligner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Label every alignable changed line of `original`.
    ///
    /// Lines found in neither the fix nor the non-fix diff are left out.
    #[must_use]
    pub fn align(&self, original: &Diff, fix: &Diff, nonfix: &Diff) -> Vec<LabeledLine> {
        let lines = flatten(original);
        let mut state = AlignmentState {
            fix: ChangeQueue::from_diff(fix),
            nonfix: ChangeQueue::from_diff(nonfix),
            pending_tangle: false,
        };
        tracing::debug!(
            original = lines.len(),
            fix = state.fix.len(),
            nonfix = state.nonfix.len(),
            "aligning changed lines"
        );

        let mut labeled = Vec::with_capacity(lines.len());
        let mut index = 0;
        while index < lines.len() {
            if state.exhausted() {
                tracing::warn!(
                    remaining = lines.len() - index,
                    "fix and non-fix lines exhausted, labeling remaining lines as other"
                );
                labeled.extend(lines[index..].iter().map(|line| LabeledLine {
                    key: line.key(),
                    label: Label::Other,
                }));
                break;
            }

            let line = &lines[index];
            match state.step(&line.signature()) {
                Step::Retry => continue,
                Step::Labeled(label) => labeled.push(LabeledLine {
                    key: line.key(),
                    label,
                }),
                Step::Skipped => tracing::warn!(
                    file = line.file.path(),
                    source = ?line.line.source_line_no,
                    target = ?line.line.target_line_no,
                    "changed line found in neither fix nor non-fix diff, skipping"
                ),
            }
            index += 1;
        }
        labeled
    }

    /// Build ground-truth rows for `original`: one row per line, two for
    /// tangled lines.
    #[must_use]
    pub fn classify(&self, original: &Diff, fix: &Diff, nonfix: &Diff) -> Vec<GroundTruthRow> {
        self.align(original, fix, nonfix)
            .into_iter()
            .flat_map(|labeled| {
                labeled
                    .label
                    .groups()
                    .iter()
                    .map(move |group| GroundTruthRow::new(labeled.key.clone(), *group))
            })
            .collect()
    }
}
