//! modforge - scaffolding for signal-processing blocks in out-of-tree modules
//!
//! This crate provides the library behind the `modforge` CLI: request
//! validation, module layout discovery, template rendering, binding
//! generation and idempotent edits to the module's build files.
//!
//! A run is single-threaded and takes no locks. Two runs against the same
//! module at the same time are not supported.

pub mod bindings;
pub mod core;
pub mod ops;
pub mod patch;
pub mod templates;
pub mod util;

/// Test utilities and mocks for modforge unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides module fixtures on a temporary directory and
/// a recording source-control mock.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    block::{BlockType, BuildVersion, Language},
    layout::ModuleLayout,
    request::{BlockRequest, BlockSpec},
};

pub use ops::{AddReport, BlockAdder};
pub use templates::TemplateSet;
