//! locpatch: structural indexing, location resolution and patch synthesis
//! for automated program repair.
//!
//! # Pipeline
//!
//! ```text
//! source tree ──► index ──► locate ──► render ──► (model) ──► edit ──► validate
//!                   └────► skeleton
//! ```
//!
//! - [`index`] parses every Python and Java file with tree-sitter into
//!   declarations with line spans. Files that do not parse keep their lines.
//! - [`locate`] turns model-written references (`class: Foo`,
//!   `function: Foo.bar`, `line: 42`, raw text) into merged line intervals.
//! - [`render`] prints those intervals under a size budget, deterministically.
//! - [`skeleton`] elides bodies for prompts that only need the file's shape.
//! - [`edit`] parses `edit_file(...)` calls or SEARCH/REPLACE blocks out of a
//!   model response and applies them to the original text.
//! - [`validate`] re-parses the result, rejects whitespace-only patches, and
//!   produces a unified diff.
//! - [`attempt`] runs that whole tail once per model sample.
//!
//! Every stage is a pure function of its inputs. Nothing here performs network
//! I/O or mutates shared state.
//!
//! # Example
//!
//! ```no_run
//! use locpatch::{build_index, render_context, resolve_locations, LocationSpec, RenderOptions};
//! use indexmap::IndexMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = build_index("path/to/checkout")?;
//! let specs = [LocationSpec::FunctionRef("Parser.parse".into())];
//! let intervals = resolve_locations(&repo, "src/parser.py", &specs, 5, true);
//!
//! let mut wanted = IndexMap::new();
//! wanted.insert("src/parser.py".to_string(), intervals);
//! let context = render_context(&repo.contents(), &wanted, &RenderOptions::default());
//! println!("{}", context.text);
//! # Ok(())
//! # }
//! ```

pub mod attempt;
pub mod config;
pub mod edit;
pub mod index;
pub mod lang;
pub mod locate;
pub mod pool;
pub mod render;
pub mod skeleton;
pub mod validate;

// Re-exports
pub use attempt::{AttemptRecord, AttemptStatus, RejectReason, RepairSession};
pub use config::{load_from_path, load_from_str, ConfigError, EngineConfig};
pub use edit::{
    ApplyError, ApplyOutcome, EditOperation, EditPlan, EditSyntax, FilePolicy, NearMiss,
};
pub use index::{
    Declaration, DeclarationKind, FileIndex, IndexEntry, IndexError, RepositoryIndex,
};
pub use lang::{Language, ParseError};
pub use locate::{LineInterval, LocationSpec, ResolveOptions};
pub use render::{RenderOptions, RenderedContext};
pub use validate::{apply_and_validate, ErrorLocation, FailedOperation, PatchResult};

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;

/// Index every file under `root`.
pub fn build_index(root: impl AsRef<Path>) -> Result<RepositoryIndex, IndexError> {
    RepositoryIndex::build(root)
}

/// Resolve `specs` against `file_path` of `repo`, widening each location by
/// `context_window` lines and optionally merging what overlaps.
pub fn resolve_locations(
    repo: &RepositoryIndex,
    file_path: &str,
    specs: &[LocationSpec],
    context_window: usize,
    merge: bool,
) -> Vec<LineInterval> {
    let options = ResolveOptions {
        context_window,
        merge,
        ..ResolveOptions::default()
    };
    locate::resolve_in_repository(repo, file_path, specs, &options)
}

/// Render `intervals` from `file_contents` into one text block. Files keep the
/// map's order, which is also their priority under a size budget.
pub fn render_context(
    file_contents: &HashMap<String, String>,
    intervals: &IndexMap<String, Vec<LineInterval>>,
    options: &RenderOptions,
) -> RenderedContext {
    render::render(file_contents, intervals, options)
}

/// Skeleton of `file_path`, globals included. `None` if the file is not indexed.
pub fn compress_skeleton(repo: &RepositoryIndex, file_path: &str) -> Option<String> {
    let file = repo.get(file_path)?;
    Some(skeleton::compress(file, &file.text(), true))
}

/// Edit operations of `model_text`, keeping only the first file mentioned.
pub fn parse_edits(model_text: &str, syntax: EditSyntax) -> IndexMap<String, Vec<EditOperation>> {
    edit::parse_edits(model_text, syntax, FilePolicy::FirstFileOnly).files
}
