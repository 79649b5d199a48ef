//! Structural index: per-file declarations and the repository tree built from them.
//!
//! Parsing never fails on bad syntax. A file that does not parse still yields a
//! [`FileIndex`] with its lines intact and `syntax_valid == false`, so callers
//! can fall back to raw-line access.

pub mod declaration;
pub mod errors;
mod extract;
pub mod repository;

pub use declaration::{Declaration, DeclarationKind, FileIndex};
pub use errors::IndexError;
pub use repository::{normalize_path, IndexEntry, RepositoryIndex};

use crate::lang::{Language, ParseError, SourceText};
use crate::pool::with_parser;
use tracing::warn;
use xxhash_rust::xxh3::xxh3_64;

/// Parse `text` as `language` into a [`FileIndex`].
pub fn parse_source(language: Language, path: impl Into<String>, text: &str) -> FileIndex {
    let path = path.into();
    let source = SourceText::new(text);
    let content_hash = xxh3_64(text.as_bytes());

    let result = with_parser(language, |parser| -> Result<FileIndex, ParseError> {
        let parsed = parser.parse_with_source(text)?;
        if parsed.has_errors() {
            let mut error_lines: Vec<usize> =
                parsed.error_nodes().iter().map(|e| e.line).collect();
            error_lines.sort_unstable();
            error_lines.dedup();
            return Ok(FileIndex::unparsed(
                path.clone(),
                language,
                &source,
                content_hash,
                error_lines,
            ));
        }
        Ok(extract::extract(&parsed).into_file_index(
            path.clone(),
            language,
            &source,
            content_hash,
        ))
    });

    match result {
        Ok(Ok(index)) => {
            if !index.syntax_valid {
                warn!(path = %index.path, lines = ?index.syntax_error_lines, "file does not parse, keeping raw lines only");
            }
            index
        }
        Ok(Err(err)) | Err(err) => {
            warn!(path = %path, error = %err, "parser unavailable, keeping raw lines only");
            FileIndex::unparsed(path, language, &source, content_hash, Vec::new())
        }
    }
}

/// Parse `text`, inferring the language from `path`.
pub fn parse_file(path: impl Into<String>, text: &str) -> Result<FileIndex, ParseError> {
    let path = path.into();
    let language =
        Language::from_path(&path).ok_or_else(|| ParseError::UnsupportedLanguage {
            path: path.clone(),
        })?;
    Ok(parse_source(language, path, text))
}
