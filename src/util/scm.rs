//! Recording created and edited files with source control.
//!
//! Failures here never abort a run: they are logged and the files stay on
//! disk for the user to stage by hand.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use git2::Repository;
use serde::{Deserialize, Serialize};

use crate::util::fs::relative_path;

/// Something that tracks the files a run touches.
pub trait SourceControl {
    /// Files the run created.
    fn add_files(&mut self, paths: &[PathBuf]);

    /// Existing files the run edited.
    fn mark_files_updated(&mut self, paths: &[PathBuf]);
}

/// Which recorder to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmMode {
    /// Git if the module is inside a repository, otherwise nothing
    #[default]
    Auto,
    None,
}

impl FromStr for ScmMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ScmMode::Auto),
            "none" => Ok(ScmMode::None),
            other => Err(format!("invalid scm mode '{}', expected 'auto' or 'none'", other)),
        }
    }
}

/// Records nothing.
#[derive(Debug, Default)]
pub struct NoScm;

impl SourceControl for NoScm {
    fn add_files(&mut self, _paths: &[PathBuf]) {}

    fn mark_files_updated(&mut self, _paths: &[PathBuf]) {}
}

/// Stages created files in the index of the enclosing git repository.
pub struct GitScm {
    repo: Repository,
    updated: Vec<PathBuf>,
}

impl GitScm {
    /// Open the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self, git2::Error> {
        let repo = Repository::discover(path)?;
        if repo.is_bare() {
            return Err(git2::Error::from_str("repository has no working directory"));
        }
        Ok(GitScm {
            repo,
            updated: Vec::new(),
        })
    }

    /// Edited files seen so far, in order.
    pub fn updated(&self) -> &[PathBuf] {
        &self.updated
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<(), git2::Error> {
        let Some(workdir) = self.repo.workdir() else {
            return Ok(());
        };
        let workdir = crate::util::fs::normalize_path(workdir);
        let mut index = self.repo.index()?;
        for path in paths {
            let path = crate::util::fs::normalize_path(path);
            let rel = relative_path(&workdir, &path);
            index.add_path(&rel)?;
            tracing::debug!("staged {}", rel.display());
        }
        index.write()
    }
}

impl SourceControl for GitScm {
    fn add_files(&mut self, paths: &[PathBuf]) {
        if let Err(e) = self.stage(paths) {
            tracing::warn!("could not stage new files with git: {}", e.message());
        }
    }

    fn mark_files_updated(&mut self, paths: &[PathBuf]) {
        for path in paths {
            if !self.updated.contains(path) {
                tracing::debug!("updated {}", path.display());
                self.updated.push(path.clone());
            }
        }
    }
}

/// Pick a recorder for the module at `root`.
pub fn detect_scm(root: &Path, mode: ScmMode) -> Box<dyn SourceControl> {
    match mode {
        ScmMode::None => Box::new(NoScm),
        ScmMode::Auto => match GitScm::discover(root) {
            Ok(git) => {
                tracing::debug!("recording files with git");
                Box::new(git)
            }
            Err(_) => Box::new(NoScm),
        },
    }
}
