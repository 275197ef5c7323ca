//! Module layout report.
//!
//! `modforge info` shows what discovery decided about a module before
//! anything is added to it: name, build version, directories, and which
//! subdirectories a run would leave alone.

use std::fmt::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::block::BuildVersion;
use crate::core::layout::{ModuleLayout, Subdir};

/// One subdirectory as seen by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubdirInfo {
    pub subdir: Subdir,
    /// Relative to the module root
    pub path: PathBuf,
    pub skipped: bool,
}

/// Everything discovery knows about a module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub root: PathBuf,
    pub version: BuildVersion,
    pub is_component: bool,
    pub subdirs: Vec<SubdirInfo>,
    /// GRC descriptors already present, as `<module>_<block>` names
    pub blocks: Vec<String>,
}

/// Describe `layout`.
pub fn module_info(layout: &ModuleLayout) -> ModuleInfo {
    let subdirs = Subdir::ALL
        .into_iter()
        .map(|subdir| SubdirInfo {
            subdir,
            path: crate::util::fs::relative_path(&layout.root, &layout.path(subdir)),
            skipped: layout.is_skipped(subdir),
        })
        .collect();

    ModuleInfo {
        name: layout.name.clone(),
        root: layout.root.clone(),
        version: layout.version,
        is_component: layout.is_component,
        subdirs,
        blocks: existing_blocks(layout),
    }
}

fn existing_blocks(layout: &ModuleLayout) -> Vec<String> {
    if layout.is_skipped(Subdir::Grc) {
        return Vec::new();
    }
    let prefix = format!("{}_", layout.name);
    let mut blocks: Vec<String> = walkdir::WalkDir::new(layout.path(Subdir::Grc))
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let stem = name.strip_suffix(".block.yml")?;
            stem.starts_with(&prefix).then(|| stem.to_string())
        })
        .collect();
    blocks.sort();
    blocks
}

/// Format a module report for terminal output.
pub fn format_info(info: &ModuleInfo) -> String {
    let mut output = String::new();

    writeln!(output, "Module: {}", info.name).unwrap();
    writeln!(output, "  Root: {}", info.root.display()).unwrap();
    writeln!(output, "  Version: {}", info.version).unwrap();
    if info.is_component {
        writeln!(output, "  In-tree component").unwrap();
    }

    writeln!(output, "\nDirectories:").unwrap();
    for dir in &info.subdirs {
        let status = if dir.skipped { " (skipped)" } else { "" };
        writeln!(output, "  {:<9}{}{}", dir.subdir.as_str(), dir.path.display(), status).unwrap();
    }

    if !info.blocks.is_empty() {
        writeln!(output, "\nBlocks:").unwrap();
        for block in &info.blocks {
            writeln!(output, "  {}", block).unwrap();
        }
    }

    output
}
