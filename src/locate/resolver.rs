use crate::index::{FileIndex, RepositoryIndex};
use crate::locate::interval::{merge_intervals, LineInterval};
use crate::locate::spec::LocationSpec;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Lines of context added on each side of every resolved location.
    pub context_window: usize,
    /// Merge overlapping or touching intervals. When off, one interval is kept
    /// per resolved spec, duplicates included.
    pub merge: bool,
    /// Ignore `class:` references and keep only finer-grained locations.
    pub fine_grain_only: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            context_window: 10,
            merge: true,
            fine_grain_only: false,
        }
    }
}

/// Resolve `specs` against one file into line intervals, in file order.
///
/// Specs that match nothing are dropped. An empty result means the file has no
/// extractable evidence.
pub fn resolve(
    specs: &[LocationSpec],
    file: &FileIndex,
    options: &ResolveOptions,
) -> Vec<LineInterval> {
    let line_count = file.line_count();
    let mut intervals: Vec<LineInterval> = specs
        .iter()
        .filter_map(|spec| {
            let raw = resolve_one(spec, file, options);
            if raw.is_none() {
                debug!(path = %file.path, ?spec, "location did not resolve, dropped");
            }
            raw
        })
        .map(|raw| raw.expand(options.context_window, line_count))
        .collect();

    if options.merge {
        merge_intervals(intervals)
    } else {
        intervals.sort();
        intervals
    }
}

/// Resolve against a file of `repo`. Unknown or unindexed paths yield nothing.
pub fn resolve_in_repository(
    repo: &RepositoryIndex,
    path: &str,
    specs: &[LocationSpec],
    options: &ResolveOptions,
) -> Vec<LineInterval> {
    match repo.get(path) {
        Some(file) => {
            let intervals = resolve(specs, file, options);
            debug!(
                path,
                intervals = intervals.len(),
                lines = intervals.iter().map(LineInterval::line_count).sum::<usize>(),
                "resolved locations"
            );
            intervals
        }
        None => {
            debug!(path, "file not indexed, no locations resolved");
            Vec::new()
        }
    }
}

fn resolve_one(
    spec: &LocationSpec,
    file: &FileIndex,
    options: &ResolveOptions,
) -> Option<LineInterval> {
    let span = |d: &crate::index::Declaration| LineInterval::new(d.start_line, d.end_line);
    match spec {
        LocationSpec::LineNumber(n) => {
            (1..=file.line_count()).contains(n).then(|| LineInterval::single(*n))
        }
        LocationSpec::ClassRef(_) if options.fine_grain_only => None,
        LocationSpec::ClassRef(name) => file.find_class(name).map(span),
        LocationSpec::FunctionRef(name) => file.find_function(name).map(span),
        LocationSpec::GlobalRef(name) => file.find_global(name).map(span),
        LocationSpec::Raw(text) => resolve_raw(text, file),
    }
}

/// First literal occurrence of `text`, widened to the smallest declaration
/// that contains the whole match.
fn resolve_raw(text: &str, file: &FileIndex) -> Option<LineInterval> {
    let needle = text.trim();
    if needle.is_empty() {
        return None;
    }

    let matched = if needle.contains('\n') {
        let haystack = file.lines.join("\n");
        let offset = haystack.find(needle)?;
        let start = haystack[..offset].matches('\n').count() + 1;
        LineInterval::new(start, start + needle.matches('\n').count())
    } else {
        let idx = file.lines.iter().position(|line| line.contains(needle))?;
        LineInterval::single(idx + 1)
    };

    match file.enclosing(matched.start) {
        Some(decl) if decl.end_line >= matched.end => {
            Some(LineInterval::new(decl.start_line, decl.end_line))
        }
        _ => Some(matched),
    }
}
