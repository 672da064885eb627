//! Commit diff rendering built on top of libgit2.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::{DiffFormat, DiffOptions, ErrorClass, ErrorCode, Repository as GitRepository};
use untangle_api::Diff;

use crate::truth::parse_diff_bytes;
use crate::{display_path, Error, Result};

/// Handle to the repository a commit's version-control diff is taken from.
pub struct Repository {
    inner: GitRepository,
    root: PathBuf,
}

impl Repository {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be canonicalized or does not
    /// resolve to a git repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical = std::fs::canonicalize(original).map_err(|source| Error::Io {
            path: display_path(original),
            source,
        })?;

        let repo = match GitRepository::discover(&canonical) {
            Ok(repo) => repo,
            Err(err)
                if err.class() == ErrorClass::Repository && err.code() == ErrorCode::NotFound =>
            {
                return Err(Error::NotARepository {
                    path: display_path(&canonical),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };

        let root = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Ok(Self { inner: repo, root })
    }

    /// Unified-diff bytes of `rev` against its first parent.
    ///
    /// A root commit is diffed against the empty tree.
    ///
    /// # Errors
    ///
    /// Propagates libgit2 failures, including unknown revisions.
    pub fn commit_patch(&self, rev: &str) -> Result<Vec<u8>> {
        let commit = self.inner.revparse_single(rev)?.peel_to_commit()?;
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() == 0 {
            None
        } else {
            Some(commit.parent(0)?.tree()?)
        };

        let mut options = DiffOptions::new();
        let diff = self.inner.diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&tree),
            Some(&mut options),
        )?;

        let mut patch = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                let mut marker = [0; 4];
                patch.extend_from_slice(line.origin().encode_utf8(&mut marker).as_bytes());
            }
            patch.extend_from_slice(line.content());
            true
        })?;

        tracing::debug!(
            rev,
            commit = %commit.id(),
            files = diff.deltas().len(),
            bytes = patch.len(),
            "rendered commit diff"
        );
        Ok(patch)
    }

    /// Parsed diff of `rev` against its first parent.
    ///
    /// # Errors
    ///
    /// Propagates libgit2 failures and [`Error::Parse`] when the rendered
    /// patch cannot be parsed back.
    pub fn commit_diff(&self, rev: &str) -> Result<Diff> {
        let patch = self.commit_patch(rev)?;
        let origin = self.root.join(rev);
        parse_diff_bytes(&origin, &patch)
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
