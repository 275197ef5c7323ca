//! Block requests and their validation.
//!
//! A [`BlockRequest`] is whatever the caller handed us: CLI arguments or a
//! TOML request file written by a script. [`BlockRequest::validate`] turns
//! it into an immutable [`BlockSpec`] or rejects it before any file is
//! touched.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::block::{BlockType, Language};

static BLOCK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("block name pattern is valid"));

/// An unvalidated request to add a block.
///
/// The flag fields hold raw values so that a request file saying
/// `add_python_qa = "yes"` is rejected instead of silently coerced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRequest {
    /// Block name, e.g. `lowpass`
    pub name: Option<String>,

    /// One of [`BlockType::ALL`]
    pub block_type: Option<String>,

    /// `cpp`, `c++` or `python`
    pub lang: Option<String>,

    /// Copyright holder for the default license header
    pub copyright: Option<String>,

    /// License file whose contents become the header of every new file
    pub license_file: Option<PathBuf>,

    /// Constructor arguments, e.g. `float gain=1.0, int ntaps`
    pub argument_list: String,

    pub add_python_qa: toml::Value,
    pub add_cpp_qa: toml::Value,
    pub skip_cmakefiles: toml::Value,

    /// Overwrite files left behind by an earlier run for the same block
    pub force: bool,
}

impl Default for BlockRequest {
    fn default() -> Self {
        BlockRequest {
            name: None,
            block_type: None,
            lang: None,
            copyright: None,
            license_file: None,
            argument_list: String::new(),
            add_python_qa: toml::Value::Boolean(false),
            add_cpp_qa: toml::Value::Boolean(false),
            skip_cmakefiles: toml::Value::Boolean(false),
            force: false,
        }
    }
}

/// A validated block request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSpec {
    pub name: String,
    pub block_type: BlockType,
    pub language: Language,
    pub copyright: Option<String>,
    pub license_file: Option<PathBuf>,
    pub argument_list: String,
    pub add_python_qa: bool,
    pub add_cpp_qa: bool,
    pub skip_cmakefiles: bool,
    pub force: bool,
}

/// Reasons a block request is rejected.
#[derive(Debug, Clone, PartialEq, Error, miette::Diagnostic)]
pub enum ValidationError {
    #[error("block name not specified")]
    #[diagnostic(code(modforge::validate::missing_name))]
    MissingName,

    #[error("invalid block name `{0}`")]
    #[diagnostic(
        code(modforge::validate::invalid_name),
        help("block names may only contain letters, digits and underscores")
    )]
    InvalidName(String),

    #[error("block type not specified")]
    #[diagnostic(
        code(modforge::validate::missing_block_type),
        help("pass one of: sink, source, sync, decimator, interpolator, general, tagged_stream, hier, noblock")
    )]
    MissingBlockType,

    #[error("invalid block type `{0}`")]
    #[diagnostic(
        code(modforge::validate::invalid_block_type),
        help("pass one of: sink, source, sync, decimator, interpolator, general, tagged_stream, hier, noblock")
    )]
    InvalidBlockType(String),

    #[error("programming language not specified")]
    #[diagnostic(code(modforge::validate::missing_language), help("pass `cpp` or `python`"))]
    MissingLanguage,

    #[error("invalid programming language `{0}`")]
    #[diagnostic(code(modforge::validate::invalid_language), help("pass `cpp` or `python`"))]
    InvalidLanguage(String),

    #[error("{block_type} blocks are not supported for {language}")]
    #[diagnostic(code(modforge::validate::unsupported))]
    Unsupported {
        block_type: BlockType,
        language: Language,
    },

    #[error("expected a boolean value for `{field}`")]
    #[diagnostic(code(modforge::validate::not_boolean))]
    NotBoolean { field: &'static str },
}

impl BlockRequest {
    /// Check every field against its allowed values.
    pub fn validate(&self) -> Result<BlockSpec, ValidationError> {
        let block_type = match self.block_type.as_deref() {
            None => return Err(ValidationError::MissingBlockType),
            Some(raw) => raw
                .parse::<BlockType>()
                .map_err(|_| ValidationError::InvalidBlockType(raw.to_string()))?,
        };

        let language = match self.lang.as_deref() {
            None => return Err(ValidationError::MissingLanguage),
            Some(raw) => raw
                .parse::<Language>()
                .map_err(|_| ValidationError::InvalidLanguage(raw.to_string()))?,
        };

        if block_type == BlockType::TaggedStream && language == Language::Python {
            return Err(ValidationError::Unsupported {
                block_type,
                language,
            });
        }

        let name = match self.name.as_deref() {
            None | Some("") => return Err(ValidationError::MissingName),
            Some(name) if !BLOCK_NAME_RE.is_match(name) => {
                return Err(ValidationError::InvalidName(name.to_string()))
            }
            Some(name) => name.to_string(),
        };

        Ok(BlockSpec {
            name,
            block_type,
            language,
            copyright: self.copyright.clone(),
            license_file: self.license_file.clone(),
            argument_list: self.argument_list.trim().to_string(),
            add_python_qa: flag(&self.add_python_qa, "add_python_qa")?,
            add_cpp_qa: flag(&self.add_cpp_qa, "add_cpp_qa")?,
            skip_cmakefiles: flag(&self.skip_cmakefiles, "skip_cmakefiles")?,
            force: self.force,
        })
    }
}

fn flag(value: &toml::Value, field: &'static str) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or(ValidationError::NotBoolean { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, block_type: &str, lang: &str) -> BlockRequest {
        BlockRequest {
            name: Some(name.to_string()),
            block_type: Some(block_type.to_string()),
            lang: Some(lang.to_string()),
            ..BlockRequest::default()
        }
    }

    #[test]
    fn test_valid_request() {
        let spec = request("lowpass", "sync", "cpp").validate().unwrap();
        assert_eq!(spec.name, "lowpass");
        assert_eq!(spec.block_type, BlockType::Sync);
        assert_eq!(spec.language, Language::Cpp);
        assert!(!spec.add_python_qa);
    }

    #[test]
    fn test_language_alias_is_accepted() {
        let spec = request("lowpass", "general", "c++").validate().unwrap();
        assert_eq!(spec.language, Language::Cpp);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        for name in ["low pass", "low-pass", "lowpass!", "ü", "a.b"] {
            let err = request(name, "sync", "cpp").validate().unwrap_err();
            assert_eq!(err, ValidationError::InvalidName(name.to_string()), "{}", name);
        }
    }

    #[test]
    fn test_missing_name() {
        let mut req = request("x", "sync", "cpp");
        req.name = None;
        assert_eq!(req.validate().unwrap_err(), ValidationError::MissingName);
        req.name = Some(String::new());
        assert_eq!(req.validate().unwrap_err(), ValidationError::MissingName);
    }

    #[test]
    fn test_unknown_block_type_and_language() {
        assert_eq!(
            request("x", "filter", "cpp").validate().unwrap_err(),
            ValidationError::InvalidBlockType("filter".into())
        );
        assert_eq!(
            request("x", "sync", "rust").validate().unwrap_err(),
            ValidationError::InvalidLanguage("rust".into())
        );
    }

    #[test]
    fn test_missing_type_and_language() {
        let mut req = request("x", "sync", "cpp");
        req.lang = None;
        assert_eq!(req.validate().unwrap_err(), ValidationError::MissingLanguage);
        req.block_type = None;
        assert_eq!(req.validate().unwrap_err(), ValidationError::MissingBlockType);
    }

    #[test]
    fn test_tagged_stream_python_is_unsupported() {
        let err = request("tsb", "tagged_stream", "python").validate().unwrap_err();
        assert!(matches!(err, ValidationError::Unsupported { .. }));
        assert!(request("tsb", "tagged_stream", "cpp").validate().is_ok());
    }

    #[test]
    fn test_non_boolean_flag_is_rejected() {
        let mut req = request("x", "sync", "cpp");
        req.add_cpp_qa = toml::Value::String("yes".into());
        assert_eq!(
            req.validate().unwrap_err(),
            ValidationError::NotBoolean { field: "add_cpp_qa" }
        );
    }

    #[test]
    fn test_request_from_toml() {
        let req: BlockRequest = toml::from_str(
            r#"
name = "lowpass"
block_type = "sync"
lang = "cpp"
add_cpp_qa = true
"#,
        )
        .unwrap();
        let spec = req.validate().unwrap();
        assert!(spec.add_cpp_qa);
        assert!(!spec.skip_cmakefiles);
    }

    #[test]
    fn test_request_from_toml_with_string_flag() {
        let req: BlockRequest =
            toml::from_str("name = \"a\"\nblock_type = \"sync\"\nlang = \"cpp\"\nskip_cmakefiles = 1\n")
                .unwrap();
        assert_eq!(
            req.validate().unwrap_err(),
            ValidationError::NotBoolean { field: "skip_cmakefiles" }
        );
    }
}
