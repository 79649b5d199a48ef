//! Source languages, the line model, and tree-sitter parsing.
//!
//! Grammars come from `ast-grep-language`'s bundled tree-sitter parsers; the
//! structural passes drive `tree-sitter` directly so they can walk nodes and
//! report line spans.

pub mod errors;
pub mod parser;
pub mod source;

pub use errors::ParseError;
pub use parser::{ErrorNode, ParsedSource, SourceParser};
pub use source::SourceText;

use ast_grep_language::SupportLang;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A language the structural parser understands.
///
/// `Python` covers indentation-scoped languages and `Java` brace-scoped ones;
/// adding a language means adding a variant, its grammar, and one extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
}

impl Language {
    /// Detect the language from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    /// The ast-grep language whose bundled grammar we parse with.
    pub fn support_lang(self) -> SupportLang {
        match self {
            Language::Python => SupportLang::Python,
            Language::Java => SupportLang::Java,
        }
    }

    /// True if `path` ends with an extension of a supported language.
    pub fn is_source_path(path: &str) -> bool {
        Self::from_path(path).is_some()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
