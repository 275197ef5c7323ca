//! Core data structures for modforge.
//!
//! This module contains the foundational types used throughout modforge:
//! - Block kinds, languages and build versions
//! - Block requests and their validation
//! - Module layout discovery

pub mod block;
pub mod layout;
pub mod request;

pub use block::{BlockType, BuildVersion, Language};
pub use layout::{LayoutError, ModuleDirs, ModuleFiles, ModuleLayout, Subdir};
pub use request::{BlockRequest, BlockSpec, ValidationError};
