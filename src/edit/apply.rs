use crate::edit::errors::{ApplyError, NearMiss};
use crate::edit::operation::EditOperation;
use crate::lang::source::{block_lines, SourceText};
use tracing::warn;

/// Content after applying a batch, plus one result per operation in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub content: String,
    pub results: Vec<Result<(), ApplyError>>,
}

impl ApplyOutcome {
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Failed operations as `(index, error)`.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ApplyError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.as_ref().err().map(|e| (idx, e)))
    }
}

/// Apply `operations` to `original`.
///
/// Every `ReplaceLines` is applied first, in one pass over the original line
/// numbering: each original line belongs to the last operation covering it,
/// and an operation's text is emitted at the first line it still owns.
/// `SearchReplace` operations then run in order on the result, each requiring
/// exactly one match. A failed operation is skipped and the others still apply.
pub fn apply(original: &str, operations: &[EditOperation]) -> ApplyOutcome {
    let mut results: Vec<Result<(), ApplyError>> = vec![Ok(()); operations.len()];

    let replacements: Vec<(usize, usize, usize, &str)> = operations
        .iter()
        .enumerate()
        .filter_map(|(idx, op)| match op {
            EditOperation::ReplaceLines {
                start,
                end,
                new_text,
                ..
            } => Some((idx, *start, *end, new_text.as_str())),
            EditOperation::SearchReplace { .. } => None,
        })
        .collect();

    let mut content = if replacements.is_empty() {
        original.to_string()
    } else {
        replace_line_ranges(original, &replacements, &mut results)
    };

    for (idx, op) in operations.iter().enumerate() {
        let EditOperation::SearchReplace {
            file,
            search_text,
            replace_text,
        } = op
        else {
            continue;
        };
        match search_and_replace(&content, search_text, replace_text) {
            Ok(next) => content = next,
            Err(err) => {
                warn!(file = %file, operation = idx, error = %err, "edit operation not applied");
                results[idx] = Err(err);
            }
        }
    }

    ApplyOutcome { content, results }
}

fn replace_line_ranges(
    original: &str,
    replacements: &[(usize, usize, usize, &str)],
    results: &mut [Result<(), ApplyError>],
) -> String {
    let source = SourceText::new(original);
    let line_count = source.len();

    // owner[i] = index into `replacements` of the last op covering line i + 1
    let mut owner: Vec<Option<usize>> = vec![None; line_count];
    let mut appends: Vec<usize> = Vec::new();
    for (slot, &(idx, start, end, _)) in replacements.iter().enumerate() {
        let valid = start >= 1 && start <= end && end <= line_count + 1;
        if !valid {
            warn!(start, end, line_count, "line range out of bounds");
            results[idx] = Err(ApplyError::InvalidRange {
                start,
                end,
                line_count,
            });
            continue;
        }
        if start == line_count + 1 {
            appends.push(slot);
            continue;
        }
        for line in start..=end.min(line_count) {
            owner[line - 1] = Some(slot);
        }
    }

    let mut emitted = vec![false; replacements.len()];
    let mut lines: Vec<String> = Vec::with_capacity(line_count);
    for (i, line) in source.lines().iter().enumerate() {
        match owner[i] {
            None => lines.push(line.clone()),
            Some(slot) if !emitted[slot] => {
                emitted[slot] = true;
                lines.extend(block_lines(replacements[slot].3));
            }
            Some(_) => {}
        }
    }
    for slot in appends {
        lines.extend(block_lines(replacements[slot].3));
    }

    let trailing_newline = source.trailing_newline() || (source.is_empty() && !lines.is_empty());
    SourceText::from_lines(lines, trailing_newline).to_text()
}

fn search_and_replace(content: &str, search: &str, replace: &str) -> Result<String, ApplyError> {
    if search.is_empty() {
        return Err(ApplyError::EmptyAnchor);
    }

    let hits = anchor_positions(content, search);
    match hits.as_slice() {
        [] => Err(ApplyError::AnchorNotFound {
            closest: closest_window(content, search),
        }),
        [pos] => {
            let mut next = String::with_capacity(content.len() + replace.len());
            next.push_str(&content[..*pos]);
            next.push_str(replace);
            next.push_str(&content[pos + search.len()..]);
            Ok(next)
        }
        _ => Err(ApplyError::AmbiguousAnchor { count: hits.len() }),
    }
}

/// Byte offsets of every occurrence of `search`, overlapping ones included.
fn anchor_positions(content: &str, search: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(found) = content[from..].find(search) {
        let pos = from + found;
        positions.push(pos);
        // resume one character in so overlapping occurrences count
        from = pos + content[pos..].chars().next().map_or(1, char::len_utf8);
    }
    positions
}

/// The window of `content` lines most similar to `search`.
fn closest_window(content: &str, search: &str) -> Option<NearMiss> {
    let lines: Vec<&str> = content.lines().collect();
    let width = search.lines().count().max(1);
    if lines.len() < width {
        return None;
    }
    (0..=lines.len() - width)
        .map(|start| {
            let window = lines[start..start + width].join("\n");
            NearMiss {
                line: start + 1,
                similarity: strsim::normalized_levenshtein(&window, search),
            }
        })
        .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
        .filter(|near| near.similarity > 0.0)
}
