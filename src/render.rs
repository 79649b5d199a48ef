//! Context rendering: line intervals from several files into one bounded text block.
//!
//! Output is a pure function of the inputs. Files appear in the interval map's
//! order, which is also their priority when a size budget forces files out.

use crate::index::parse_file;
use crate::lang::SourceText;
use crate::locate::LineInterval;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Marker emitted wherever rendered lines skip part of the file.
pub const GAP_MARKER: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    pub show_line_numbers: bool,
    /// Right-align line numbers to the widest number rendered in the file.
    pub pad_for_alignment: bool,
    /// Show the signature line of the scope enclosing each interval even when
    /// it lies outside the interval.
    pub show_enclosing_scope_header: bool,
    pub max_total_chars: Option<usize>,
    pub max_total_tokens: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_line_numbers: true,
            pad_for_alignment: true,
            show_enclosing_scope_header: false,
            max_total_chars: None,
            max_total_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RenderedContext {
    pub text: String,
    /// Files present in `text`, in order.
    pub files: Vec<String>,
    /// Files dropped to fit the budget, in the order they were dropped.
    pub dropped: Vec<String>,
    /// The first file alone still exceeds the budget; `text` is best effort.
    pub budget_exceeded: bool,
}

/// Rough token count: one token per 3.5 characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    (chars * 2).div_ceil(7)
}

pub fn render(
    file_contents: &HashMap<String, String>,
    intervals: &IndexMap<String, Vec<LineInterval>>,
    options: &RenderOptions,
) -> RenderedContext {
    let mut blocks: Vec<(String, String)> = intervals
        .iter()
        .filter_map(|(path, file_intervals)| {
            let Some(text) = file_contents.get(path) else {
                debug!(path, "no content for file, skipped");
                return None;
            };
            render_file(path, text, file_intervals, options).map(|block| (path.clone(), block))
        })
        .collect();

    let mut dropped = Vec::new();
    let mut text = join_blocks(&blocks);
    while over_budget(&text, options) && blocks.len() > 1 {
        if let Some((path, _)) = blocks.pop() {
            dropped.push(path);
        }
        text = join_blocks(&blocks);
    }
    let budget_exceeded = over_budget(&text, options);
    if budget_exceeded {
        warn!(
            chars = text.chars().count(),
            tokens = estimate_tokens(&text),
            "context exceeds budget even with a single file"
        );
    }
    if !dropped.is_empty() {
        debug!(?dropped, "files dropped to fit context budget");
    }

    RenderedContext {
        text,
        files: blocks.into_iter().map(|(path, _)| path).collect(),
        dropped,
        budget_exceeded,
    }
}

fn over_budget(text: &str, options: &RenderOptions) -> bool {
    let chars_over = options
        .max_total_chars
        .is_some_and(|max| text.chars().count() > max);
    let tokens_over = options
        .max_total_tokens
        .is_some_and(|max| estimate_tokens(text) > max);
    chars_over || tokens_over
}

fn join_blocks(blocks: &[(String, String)]) -> String {
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks
        .iter()
        .map(|(_, block)| block.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

/// One file's block without a trailing newline, or `None` if nothing renders.
fn render_file(
    path: &str,
    text: &str,
    intervals: &[LineInterval],
    options: &RenderOptions,
) -> Option<String> {
    let source = SourceText::new(text);
    let line_count = source.len();
    if line_count == 0 {
        return None;
    }

    let mut sorted: Vec<LineInterval> = intervals
        .iter()
        .filter(|i| i.start >= 1 && i.start <= line_count)
        .map(|i| LineInterval::new(i.start, i.end.min(line_count).max(i.start)))
        .collect();
    sorted.sort();
    if sorted.is_empty() {
        return None;
    }

    let index = if options.show_enclosing_scope_header {
        parse_file(path, text).ok().filter(|index| index.syntax_valid)
    } else {
        None
    };

    // Strictly increasing line numbers; overlapping intervals render once.
    let mut numbers: Vec<usize> = Vec::new();
    for interval in sorted {
        let last = numbers.last().copied().unwrap_or(0);
        let start = interval.start.max(last + 1);
        if start > interval.end {
            continue;
        }
        if let Some(scope) = index.as_ref().and_then(|i| i.enclosing_scope(start)) {
            if scope.signature_line > last && scope.signature_line < start {
                numbers.push(scope.signature_line);
            }
        }
        numbers.extend(start..=interval.end);
    }

    let width = numbers.last().map_or(1, |n| n.to_string().len());
    let mut out = vec![format!("### {path}")];
    let mut previous = 0;
    for n in numbers {
        if n != previous + 1 {
            out.push(GAP_MARKER.to_string());
        }
        let line = source.line(n).unwrap_or_default();
        out.push(format_line(n, line, width, options));
        previous = n;
    }
    if previous < line_count {
        out.push(GAP_MARKER.to_string());
    }
    Some(out.join("\n"))
}

fn format_line(n: usize, line: &str, width: usize, options: &RenderOptions) -> String {
    if !options.show_line_numbers {
        return line.to_string();
    }
    let number = if options.pad_for_alignment {
        format!("{n:>width$}")
    } else {
        n.to_string()
    };
    if line.is_empty() {
        number
    } else {
        format!("{number} {line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents() -> HashMap<String, String> {
        let mut files = HashMap::new();
        let a: String = (1..=12).map(|i| format!("a{i}\n")).collect();
        files.insert("a.txt".to_string(), a);
        files.insert("b.txt".to_string(), "b1\nb2\nb3\n".to_string());
        files.insert(
            "svc.py".to_string(),
            "class Svc:\n    def run(self):\n        x = 1\n        y = 2\n        return x + y\n"
                .to_string(),
        );
        files
    }

    fn intervals(entries: &[(&str, &[(usize, usize)])]) -> IndexMap<String, Vec<LineInterval>> {
        entries
            .iter()
            .map(|(path, ranges)| {
                (
                    path.to_string(),
                    ranges.iter().map(|&(s, e)| LineInterval::new(s, e)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn renders_markers_and_padded_numbers() {
        let rendered = render(
            &contents(),
            &intervals(&[("a.txt", &[(2, 3), (9, 10)])]),
            &RenderOptions::default(),
        );
        assert_eq!(
            rendered.text,
            "### a.txt\n...\n 2 a2\n 3 a3\n...\n 9 a9\n10 a10\n...\n"
        );
        assert_eq!(rendered.files, vec!["a.txt"]);
        assert!(!rendered.budget_exceeded);
    }

    #[test]
    fn whole_file_has_no_markers() {
        let options = RenderOptions {
            show_line_numbers: false,
            ..RenderOptions::default()
        };
        let rendered = render(&contents(), &intervals(&[("b.txt", &[(1, 3)])]), &options);
        assert_eq!(rendered.text, "### b.txt\nb1\nb2\nb3\n");
    }

    #[test]
    fn adjacent_intervals_render_without_marker() {
        let options = RenderOptions {
            pad_for_alignment: false,
            ..RenderOptions::default()
        };
        let rendered = render(
            &contents(),
            &intervals(&[("b.txt", &[(1, 1), (2, 3)])]),
            &options,
        );
        assert_eq!(rendered.text, "### b.txt\n1 b1\n2 b2\n3 b3\n");
    }

    #[test]
    fn sticky_header_shows_enclosing_signature_once() {
        let options = RenderOptions {
            show_enclosing_scope_header: true,
            ..RenderOptions::default()
        };
        let rendered = render(
            &contents(),
            &intervals(&[("svc.py", &[(4, 4), (5, 5)])]),
            &options,
        );
        assert_eq!(
            rendered.text,
            "### svc.py\n...\n2     def run(self):\n...\n4         y = 2\n5         return x + y\n"
        );
    }

    #[test]
    fn budget_drops_trailing_files() {
        let files = intervals(&[("b.txt", &[(1, 3)]), ("a.txt", &[(1, 12)])]);
        let full = render(&contents(), &files, &RenderOptions::default());
        assert_eq!(full.files, vec!["b.txt", "a.txt"]);

        let options = RenderOptions {
            max_total_chars: Some(40),
            ..RenderOptions::default()
        };
        let trimmed = render(&contents(), &files, &options);
        assert_eq!(trimmed.files, vec!["b.txt"]);
        assert_eq!(trimmed.dropped, vec!["a.txt"]);
        assert!(!trimmed.budget_exceeded);
        assert_eq!(render(&contents(), &files, &options), trimmed);
    }

    #[test]
    fn budget_exceeded_returns_first_file() {
        let options = RenderOptions {
            max_total_tokens: Some(2),
            ..RenderOptions::default()
        };
        let rendered = render(
            &contents(),
            &intervals(&[("a.txt", &[(1, 12)]), ("b.txt", &[(1, 3)])]),
            &options,
        );
        assert_eq!(rendered.files, vec!["a.txt"]);
        assert!(rendered.budget_exceeded);
    }

    #[test]
    fn skips_files_without_content_or_intervals() {
        let rendered = render(
            &contents(),
            &intervals(&[("missing.py", &[(1, 1)]), ("b.txt", &[]), ("a.txt", &[(30, 40)])]),
            &RenderOptions::default(),
        );
        assert!(rendered.text.is_empty());
        assert!(rendered.files.is_empty());
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcdefg"), 2);
        assert_eq!(estimate_tokens("abcdefgh"), 3);
    }
}
