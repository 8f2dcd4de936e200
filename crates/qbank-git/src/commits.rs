//! Last-commit lookup for tracked files

use std::path::{Path, PathBuf};

use git2::{Oid, Repository, Sort, Tree};

use crate::{Error, Result};

/// Read-only view of a git working tree used to fingerprint files.
pub struct GitCommits {
    repo: Repository,
    workdir: PathBuf,
}

impl GitCommits {
    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::NotARepository {
                path: path.to_path_buf(),
            })?
            .to_path_buf();
        let workdir = std::fs::canonicalize(&workdir).unwrap_or(workdir);
        Ok(Self { repo, workdir })
    }

    /// The working tree root.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Hash of the most recent commit reachable from HEAD that changed `path`.
    ///
    /// Returns `None` when HEAD is unborn or no commit ever touched the file.
    /// Uncommitted edits are not reflected; the result only moves when the
    /// file is committed.
    pub fn commit_hash_of(&self, path: &Path) -> Result<Option<String>> {
        let relative = self.relative_path(path)?;

        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let head_oid = match head.target() {
            Some(oid) => oid,
            None => return Ok(None),
        };

        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
        walk.push(head_oid)?;

        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            let current = blob_at(&commit.tree()?, &relative);
            if current.is_none() {
                continue;
            }

            // A merge that keeps one parent's version of the file did not change it
            let mut changed = true;
            for parent in commit.parents() {
                if blob_at(&parent.tree()?, &relative) == current {
                    changed = false;
                    break;
                }
            }

            if changed {
                tracing::trace!(path = %relative.display(), commit = %commit.id(), "Resolved last commit");
                return Ok(Some(commit.id().to_string()));
            }
        }

        Ok(None)
    }

    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        resolved
            .strip_prefix(&self.workdir)
            .map(Path::to_path_buf)
            .map_err(|_| Error::OutsideWorkdir {
                path: path.to_path_buf(),
                workdir: self.workdir.clone(),
            })
    }
}

fn blob_at(tree: &Tree<'_>, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}
