//! Idempotent edits to existing build and index files.
//!
//! Three editors live here:
//! - [`cmake`]: parses CMake files into command invocations and appends
//!   arguments to a selected command.
//! - [`lines`]: inserts a line after the line(s) matching a marker regex.
//! - [`region`]: appends a line inside a block delimited by two marker
//!   lines.
//!
//! Every edit is insert-if-absent: applying it twice leaves the file as the
//! first application did. A failed edit is reported as a [`PatchError`];
//! callers decide whether that is fatal.

pub mod cmake;
pub mod lines;
pub mod region;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;
use crate::util::fs::relative_path;

pub use cmake::{CMakeFile, CommandSelector, InsertAt};
pub use lines::{insert_after_marker, InsertMode};
pub use region::append_to_region;

/// Outcome of an edit that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    /// The file was changed.
    Inserted,
    /// The entry was already there; the file is unchanged.
    AlreadyPresent,
}

/// Reasons an edit could not be applied.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no {anchor} found in {}", path.display())]
    AnchorNotFound { path: PathBuf, anchor: String },

    #[error("cannot parse {} at line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl PatchError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The file the failed edit targeted.
    pub fn path(&self) -> &Path {
        match self {
            PatchError::Io { path, .. }
            | PatchError::AnchorNotFound { path, .. }
            | PatchError::Parse { path, .. } => path,
        }
    }
}

/// A skipped edit, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchWarning {
    pub path: PathBuf,
    pub message: String,
}

impl From<&PatchError> for PatchWarning {
    fn from(err: &PatchError) -> Self {
        PatchWarning {
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl PatchWarning {
    /// Report the path relative to `base` (usually the module root).
    pub fn relative_to(mut self, base: &Path) -> Self {
        self.path = relative_path(base, &self.path);
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(self.message.as_str()).with_location(self.path.as_path())
    }
}

impl fmt::Display for PatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub(crate) fn read(path: &Path) -> Result<String, PatchError> {
    std::fs::read_to_string(path).map_err(|e| PatchError::io(path, e))
}

pub(crate) fn write(path: &Path, contents: &str) -> Result<(), PatchError> {
    std::fs::write(path, contents).map_err(|e| PatchError::io(path, e))
}

/// Indentation (leading spaces and tabs) of the line containing `offset`.
pub(crate) fn indentation_at(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let rest = &text[line_start..];
    let width = rest
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(rest.len());
    &rest[..width]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation_at() {
        let text = "a\n    b c\n\td\n";
        assert_eq!(indentation_at(text, 0), "");
        assert_eq!(indentation_at(text, 8), "    ");
        assert_eq!(indentation_at(text, 11), "\t");
    }

    #[test]
    fn test_warning_from_error() {
        let err = PatchError::AnchorNotFound {
            path: PathBuf::from("lib/CMakeLists.txt"),
            anchor: "`install` command".into(),
        };
        let warning = PatchWarning::from(&err);
        assert_eq!(warning.path, PathBuf::from("lib/CMakeLists.txt"));
        assert_eq!(warning.message, "no `install` command found in lib/CMakeLists.txt");
    }

    #[test]
    fn test_warning_diagnostic_is_relative() {
        let err = PatchError::AnchorNotFound {
            path: PathBuf::from("/work/gr-howto/grc/CMakeLists.txt"),
            anchor: "`install` command".into(),
        };
        let warning = PatchWarning::from(&err).relative_to(Path::new("/work/gr-howto"));
        assert_eq!(warning.path, PathBuf::from("grc/CMakeLists.txt"));

        let output = warning.to_diagnostic().format(false);
        assert!(output.starts_with("warning: no `install` command found in /work/gr-howto/grc/CMakeLists.txt\n"));
        assert!(output.contains("  --> grc/CMakeLists.txt\n"));
    }
}
