//! High-level operations.
//!
//! This module contains the implementation of modforge commands.

pub mod add_block;
pub mod info;
pub mod license;
pub mod resolve;

pub use add_block::{AddError, AddReport, BlockAdder, FileOperation};
pub use info::{format_info, module_info, ModuleInfo, SubdirInfo};
pub use license::{select_license, License, LicenseContext, LicenseError, LicenseSource};
pub use resolve::{resolve, BlockFiles, ResolvedBlock, StructuralError, DEFAULT_COPYRIGHT};
