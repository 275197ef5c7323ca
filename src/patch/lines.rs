//! Marker-anchored line insertion.

use std::path::Path;

use regex::Regex;

use super::{read, write, Applied, PatchError};

/// Which marker matches get a copy of the new line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    AfterFirst,
    /// After the last matching line, so that lists grow at their end.
    #[default]
    AfterLast,
    AfterEach,
}

/// Insert `line` after the line(s) of `path` matching `marker`.
///
/// Nothing is written if a line identical to `line` (ignoring surrounding
/// whitespace) already exists.
pub fn insert_after_marker(
    path: &Path,
    marker: &Regex,
    line: &str,
    mode: InsertMode,
) -> Result<Applied, PatchError> {
    let text = read(path)?;
    match insert_into(&text, marker, line, mode) {
        Some(Some(updated)) => {
            write(path, &updated)?;
            Ok(Applied::Inserted)
        }
        Some(None) => Ok(Applied::AlreadyPresent),
        None => Err(PatchError::AnchorNotFound {
            path: path.to_path_buf(),
            anchor: format!("line matching `{}`", marker.as_str()),
        }),
    }
}

/// `None` if no line matches, `Some(None)` if `line` is already present.
fn insert_into(text: &str, marker: &Regex, line: &str, mode: InsertMode) -> Option<Option<String>> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| marker.is_match(l.trim_end_matches(['\r', '\n'])))
        .map(|(i, _)| i)
        .collect();

    let targets: Vec<usize> = match mode {
        InsertMode::AfterFirst => hits.first().copied().into_iter().collect(),
        InsertMode::AfterLast => hits.last().copied().into_iter().collect(),
        InsertMode::AfterEach => hits,
    };
    if targets.is_empty() {
        return None;
    }

    let wanted = line.trim();
    if lines.iter().any(|l| l.trim() == wanted) {
        return Some(None);
    }

    let mut out = String::with_capacity(text.len() + (line.len() + 1) * targets.len());
    for (i, l) in lines.iter().enumerate() {
        out.push_str(l);
        if targets.contains(&i) {
            if !l.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(line);
            out.push('\n');
        }
    }
    Some(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn import_marker() -> Regex {
        Regex::new(r"^(?:from\s.*\simport\s|# import any pure)").unwrap()
    }

    const INIT_PY: &str = "import os\n\ntry:\n    from .howto_python import *\nexcept ModuleNotFoundError:\n    pass\n\n# import any pure python here\n#\n";

    #[test]
    fn test_inserts_after_last_marker() {
        let text = "from .a import a\nfrom .b import b\n\nx = 1\n";
        let out = insert_into(text, &import_marker(), "from .c import c", InsertMode::AfterLast)
            .unwrap()
            .unwrap();
        assert_eq!(out, "from .a import a\nfrom .b import b\nfrom .c import c\n\nx = 1\n");
    }

    #[test]
    fn test_inserts_after_first_marker() {
        let text = "from .a import a\nfrom .b import b\n";
        let out = insert_into(text, &import_marker(), "from .c import c", InsertMode::AfterFirst)
            .unwrap()
            .unwrap();
        assert_eq!(out, "from .a import a\nfrom .c import c\nfrom .b import b\n");
    }

    #[test]
    fn test_inserts_after_each_marker() {
        let marker = Regex::new(r"^// section").unwrap();
        let out = insert_into("// section\nx\n// section\n", &marker, "y", InsertMode::AfterEach)
            .unwrap()
            .unwrap();
        assert_eq!(out, "// section\ny\nx\n// section\ny\n");
    }

    #[test]
    fn test_comment_marker_in_fresh_init_py() {
        let out = insert_into(
            INIT_PY,
            &import_marker(),
            "from .lowpass import lowpass",
            InsertMode::AfterLast,
        )
        .unwrap()
        .unwrap();
        assert!(out.contains("# import any pure python here\nfrom .lowpass import lowpass\n#\n"));
        // The indented pybind import is not a marker
        assert!(out.contains("    from .howto_python import *\nexcept"));
    }

    #[test]
    fn test_marker_on_last_line_without_newline() {
        let out = insert_into("from .a import a", &import_marker(), "from .b import b", InsertMode::AfterLast)
            .unwrap()
            .unwrap();
        assert_eq!(out, "from .a import a\nfrom .b import b\n");
    }

    #[test]
    fn test_existing_line_is_not_duplicated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("__init__.py");
        std::fs::write(&path, INIT_PY).unwrap();

        let line = "from .lowpass import lowpass";
        let first = insert_after_marker(&path, &import_marker(), line, InsertMode::AfterLast).unwrap();
        let second = insert_after_marker(&path, &import_marker(), line, InsertMode::AfterLast).unwrap();

        assert_eq!(first, Applied::Inserted);
        assert_eq!(second, Applied::AlreadyPresent);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches(line).count(), 1);
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("__init__.py");
        std::fs::write(&path, "x = 1\n").unwrap();

        let err = insert_after_marker(&path, &import_marker(), "from .a import a", InsertMode::AfterLast)
            .unwrap_err();
        assert!(matches!(err, PatchError::AnchorNotFound { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = insert_after_marker(
            &tmp.path().join("missing.py"),
            &import_marker(),
            "from .a import a",
            InsertMode::AfterLast,
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::Io { .. }));
    }
}
