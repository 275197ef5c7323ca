//! Block kinds, languages and build-system versions.
//!
//! These are the enumerated choices a block request is validated against.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of block to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Sink,
    Source,
    Sync,
    Decimator,
    Interpolator,
    General,
    TaggedStream,
    Hier,
    /// Plain code with no block class around it.
    Noblock,
}

impl BlockType {
    /// Every accepted block type, in the order shown to users.
    pub const ALL: [BlockType; 9] = [
        BlockType::Sink,
        BlockType::Source,
        BlockType::Sync,
        BlockType::Decimator,
        BlockType::Interpolator,
        BlockType::General,
        BlockType::TaggedStream,
        BlockType::Hier,
        BlockType::Noblock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Sink => "sink",
            BlockType::Source => "source",
            BlockType::Sync => "sync",
            BlockType::Decimator => "decimator",
            BlockType::Interpolator => "interpolator",
            BlockType::General => "general",
            BlockType::TaggedStream => "tagged_stream",
            BlockType::Hier => "hier",
            BlockType::Noblock => "noblock",
        }
    }

    /// Framework base class this block type derives from.
    ///
    /// `None` for [`BlockType::Noblock`], which has no class.
    pub fn base_class(&self) -> Option<&'static str> {
        match self {
            BlockType::Sink | BlockType::Source | BlockType::Sync => Some("sync_block"),
            BlockType::Decimator => Some("sync_decimator"),
            BlockType::Interpolator => Some("sync_interpolator"),
            BlockType::General => Some("block"),
            BlockType::TaggedStream => Some("tagged_stream_block"),
            BlockType::Hier => Some("hier_block2"),
            BlockType::Noblock => None,
        }
    }

    /// Whether the block is split into a public header and a private
    /// `_impl` header/body pair.
    pub fn has_impl(&self) -> bool {
        !matches!(self, BlockType::Noblock)
    }

    /// Whether the block consumes a stream.
    pub fn has_input(&self) -> bool {
        !matches!(self, BlockType::Source | BlockType::Noblock)
    }

    /// Whether the block produces a stream.
    pub fn has_output(&self) -> bool {
        !matches!(self, BlockType::Sink | BlockType::Noblock)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockType {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownChoice::new("block type", s))
    }
}

/// Language the block is implemented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "c++")]
    Cpp,
    Python,
}

impl Language {
    /// Accepted spellings, including aliases.
    pub const CANDIDATES: [&'static str; 3] = ["cpp", "python", "c++"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpp" | "c++" => Ok(Language::Cpp),
            "python" => Ok(Language::Python),
            _ => Err(UnknownChoice::new("language", s)),
        }
    }
}

/// Layout generation of the target module's build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildVersion {
    /// `<module>_<block>` file naming, no QA support.
    #[serde(rename = "36")]
    V36,
    /// CppUnit QA with suite registration, SWIG era.
    #[serde(rename = "37")]
    V37,
    /// Boost.UTF QA, pybind11 bindings.
    #[serde(rename = "38")]
    V38,
    /// Autotools layout; build files are never edited.
    #[serde(rename = "autofoo")]
    Autofoo,
}

impl BuildVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVersion::V36 => "36",
            BuildVersion::V37 => "37",
            BuildVersion::V38 => "38",
            BuildVersion::Autofoo => "autofoo",
        }
    }

    /// Whether files are named after the block alone (3.7 and later)
    /// rather than `<module>_<block>`.
    pub fn uses_short_names(&self) -> bool {
        matches!(self, BuildVersion::V37 | BuildVersion::V38)
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildVersion {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "36" => Ok(BuildVersion::V36),
            "37" => Ok(BuildVersion::V37),
            "38" | "39" | "310" => Ok(BuildVersion::V38),
            "autofoo" => Ok(BuildVersion::Autofoo),
            _ => Err(UnknownChoice::new("build version", s)),
        }
    }
}

/// Error returned when a string names none of an enumerated set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownChoice {
    fn new(kind: &'static str, value: &str) -> Self {
        UnknownChoice {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownChoice {}
