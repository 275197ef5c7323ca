//! Appending inside a region delimited by two marker lines, as used by the
//! bindings aggregator:
//!
//! ```text
//! // BINDING_FUNCTION_PROTOTYPES(
//! void bind_square_ff(py::module& m);
//! // ) END BINDING_FUNCTION_PROTOTYPES
//! ```

use std::path::Path;

use super::{indentation_at, read, write, Applied, PatchError};

/// Append `line` as the last entry of the region between the line
/// containing `start` and the next line containing `end`.
///
/// The new line takes the end marker's indentation. Nothing is written if
/// the region already holds an identical line.
pub fn append_to_region(path: &Path, start: &str, end: &str, line: &str) -> Result<Applied, PatchError> {
    let text = read(path)?;
    let not_found = |marker: &str| PatchError::AnchorNotFound {
        path: path.to_path_buf(),
        anchor: format!("`{}` marker", marker.trim()),
    };

    let start_at = text.find(start).ok_or_else(|| not_found(start))?;
    let body_at = text[start_at..]
        .find('\n')
        .map_or(text.len(), |i| start_at + i + 1);
    let end_at = text[body_at..]
        .find(end)
        .map(|i| body_at + i)
        .ok_or_else(|| not_found(end))?;
    let end_line = text[..end_at].rfind('\n').map_or(0, |i| i + 1);

    let wanted = line.trim();
    if text[body_at..end_line].lines().any(|l| l.trim() == wanted) {
        return Ok(Applied::AlreadyPresent);
    }

    let mut updated = String::with_capacity(text.len() + line.len() + 8);
    updated.push_str(&text[..end_line]);
    updated.push_str(indentation_at(&text, end_at));
    updated.push_str(wanted);
    updated.push('\n');
    updated.push_str(&text[end_line..]);

    write(path, &updated)?;
    Ok(Applied::Inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROTO_START: &str = "// BINDING_FUNCTION_PROTOTYPES(";
    const PROTO_END: &str = "// ) END BINDING_FUNCTION_PROTOTYPES";
    const CALLS_START: &str = "// BINDING_FUNCTION_CALLS(";
    const CALLS_END: &str = "// ) END BINDING_FUNCTION_CALLS";

    const BINDINGS: &str = "\
// BINDING_FUNCTION_PROTOTYPES(
// ) END BINDING_FUNCTION_PROTOTYPES

PYBIND11_MODULE(howto_python, m)
{
    py::module::import(\"gnuradio.gr\");

    // BINDING_FUNCTION_CALLS(
    // ) END BINDING_FUNCTION_CALLS
}
";

    fn bindings_file(tmp: &TempDir) -> std::path::PathBuf {
        let path = tmp.path().join("python_bindings.cc");
        std::fs::write(&path, BINDINGS).unwrap();
        path
    }

    #[test]
    fn test_appends_with_end_marker_indentation() {
        let tmp = TempDir::new().unwrap();
        let path = bindings_file(&tmp);

        append_to_region(&path, PROTO_START, PROTO_END, "void bind_lowpass(py::module& m);").unwrap();
        append_to_region(&path, CALLS_START, CALLS_END, "bind_lowpass(m);").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(
            "// BINDING_FUNCTION_PROTOTYPES(\nvoid bind_lowpass(py::module& m);\n// ) END BINDING_FUNCTION_PROTOTYPES"
        ));
        assert!(text.contains(
            "    // BINDING_FUNCTION_CALLS(\n    bind_lowpass(m);\n    // ) END BINDING_FUNCTION_CALLS"
        ));
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let path = bindings_file(&tmp);

        append_to_region(&path, CALLS_START, CALLS_END, "bind_a(m);").unwrap();
        append_to_region(&path, CALLS_START, CALLS_END, "bind_b(m);").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("    bind_a(m);\n    bind_b(m);\n    // ) END"));
    }

    #[test]
    fn test_existing_entry_is_kept_once() {
        let tmp = TempDir::new().unwrap();
        let path = bindings_file(&tmp);

        let first = append_to_region(&path, CALLS_START, CALLS_END, "bind_a(m);").unwrap();
        let second = append_to_region(&path, CALLS_START, CALLS_END, "bind_a(m);").unwrap();

        assert_eq!(first, Applied::Inserted);
        assert_eq!(second, Applied::AlreadyPresent);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("bind_a(m);").count(), 1);
    }

    #[test]
    fn test_missing_marker() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("python_bindings.cc");
        std::fs::write(&path, "// BINDING_FUNCTION_CALLS(\n").unwrap();

        let err = append_to_region(&path, CALLS_START, CALLS_END, "bind_a(m);").unwrap_err();
        match err {
            PatchError::AnchorNotFound { anchor, .. } => {
                assert_eq!(anchor, "`// ) END BINDING_FUNCTION_CALLS` marker")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
