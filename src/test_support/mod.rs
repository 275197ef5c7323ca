//! Test utilities and mocks for modforge unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use modforge::test_support::{oot_module, MockScm};
//!
//! #[test]
//! fn test_example() {
//!     let (_tmp, layout) = oot_module();
//!     let mut scm = MockScm::default();
//!
//!     // Run an add against `layout`, then inspect `scm.added`...
//! }
//! ```

pub mod fixtures;

use std::path::PathBuf;

use crate::util::scm::SourceControl;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Source control recorder that remembers every call.
#[derive(Debug, Default)]
pub struct MockScm {
    /// Paths passed to `add_files`, in call order.
    pub added: Vec<PathBuf>,
    /// Paths passed to `mark_files_updated`, in call order.
    pub updated: Vec<PathBuf>,
}

impl SourceControl for MockScm {
    fn add_files(&mut self, paths: &[PathBuf]) {
        self.added.extend_from_slice(paths);
    }

    fn mark_files_updated(&mut self, paths: &[PathBuf]) {
        self.updated.extend_from_slice(paths);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_scm_records_calls() {
        let mut scm = MockScm::default();
        scm.add_files(&[PathBuf::from("lib/a.cc")]);
        scm.mark_files_updated(&[PathBuf::from("lib/CMakeLists.txt")]);

        assert_eq!(scm.added, vec![PathBuf::from("lib/a.cc")]);
        assert_eq!(scm.updated, vec![PathBuf::from("lib/CMakeLists.txt")]);
    }
}
