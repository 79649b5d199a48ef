//! Patch validation.
//!
//! A patched file is checked the same way every time:
//!
//! 1. **Syntax**: re-parse the new content. Any ERROR or MISSING node makes the
//!    patch syntax-invalid. Files in languages we cannot parse pass this check.
//! 2. **Meaning**: with whitespace-only lines removed, the new content must
//!    differ from the original.
//!
//! A unified diff is produced regardless of the outcome.

use crate::edit::{apply, EditOperation};
use crate::lang::{Language, ParseError};
use crate::pool;
use serde::Serialize;
use similar::TextDiff;
use tracing::{debug, warn};

/// Location of an ERROR or MISSING node in the patched content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
    /// The offending source line.
    pub context: String,
}

/// An operation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOperation {
    /// Position in the operation list.
    pub index: usize,
    pub operation: EditOperation,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchResult {
    pub edited_file: Option<String>,
    pub original_content: String,
    pub new_content: String,
    pub unified_diff: String,
    pub syntax_valid: bool,
    pub is_meaningful: bool,
    pub syntax_errors: Vec<ErrorLocation>,
    pub failed_operations: Vec<FailedOperation>,
}

/// Validate `new` as the patched form of `original` at `path`.
pub fn validate(path: &str, original: &str, new: &str) -> PatchResult {
    let (syntax_valid, syntax_errors) = match syntax_errors(path, new) {
        Ok(errors) => (errors.is_empty(), errors),
        Err(err) => {
            warn!(path, error = %err, "could not parse patched content");
            (false, Vec::new())
        }
    };

    PatchResult {
        edited_file: Some(path.to_string()),
        original_content: original.to_string(),
        new_content: new.to_string(),
        unified_diff: unified_diff(path, original, new),
        syntax_valid,
        is_meaningful: is_meaningful(original, new),
        syntax_errors,
        failed_operations: Vec::new(),
    }
}

/// Apply `operations` to `original` and validate the result.
pub fn apply_and_validate(path: &str, original: &str, operations: &[EditOperation]) -> PatchResult {
    let outcome = apply(original, operations);
    debug!(
        path,
        applied = outcome.applied(),
        total = operations.len(),
        "edit operations applied"
    );
    let failed_operations = outcome
        .failures()
        .map(|(index, err)| FailedOperation {
            index,
            operation: operations[index].clone(),
            error: err.to_string(),
        })
        .collect();

    PatchResult {
        failed_operations,
        ..validate(path, original, &outcome.content)
    }
}

/// Syntax errors in `source`, parsed as the language of `path`.
///
/// Unknown languages have no syntax errors by definition.
pub fn syntax_errors(path: &str, source: &str) -> Result<Vec<ErrorLocation>, ParseError> {
    let Some(language) = Language::from_path(path) else {
        return Ok(Vec::new());
    };
    pool::with_parser(language, |parser| -> Result<Vec<ErrorLocation>, ParseError> {
        let parsed = parser.parse_with_source(source)?;
        Ok(parsed
            .error_nodes()
            .into_iter()
            .map(|node| ErrorLocation {
                line: node.line,
                column: node.column,
                context: source
                    .lines()
                    .nth(node.line - 1)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            })
            .collect())
    })?
}

/// False when the two texts only differ in whitespace-only lines.
pub fn is_meaningful(original: &str, new: &str) -> bool {
    fn content_lines(text: &str) -> Vec<&str> {
        text.lines().filter(|line| !line.trim().is_empty()).collect()
    }
    content_lines(original) != content_lines(new)
}

/// Unified diff with `a/` and `b/` headers; empty when nothing changed.
pub fn unified_diff(path: &str, original: &str, new: &str) -> String {
    if original == new {
        return String::new();
    }
    TextDiff::from_lines(original, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
