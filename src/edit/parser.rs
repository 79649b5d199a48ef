//! Edit command parsing from free-form model output.
//!
//! Parsing never fails. Fragments that match neither grammar are counted in
//! [`EditPlan::skipped`] and dropped; a response with no usable fragment
//! yields an empty plan, which the repair session rejects.

use crate::edit::operation::{EditOperation, EditSyntax, FilePolicy};
use crate::index::normalize_path;
use crate::lang::Language;
use indexmap::IndexMap;
use tracing::debug;

const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
const DIVIDER_MARKER: &str = "=======";
const REPLACE_MARKER: &str = ">>>>>>> REPLACE";
const EDIT_FILE_CALL: &str = "edit_file(";

/// Operations parsed from one model response, grouped by file in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub files: IndexMap<String, Vec<EditOperation>>,
    /// Malformed fragments that were dropped.
    pub skipped: usize,
    /// Text of the blocks that produced operations.
    pub blocks: Vec<String>,
}

impl EditPlan {
    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }

    pub fn operation_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Post-processed model text: the usable blocks, in order.
    pub fn post_processed(&self) -> String {
        self.blocks.join("\n")
    }
}

/// Parse `model_text` for edits in `syntax` and keep files per `policy`.
pub fn parse_edits(model_text: &str, syntax: EditSyntax, policy: FilePolicy) -> EditPlan {
    let mut plan = EditPlan::default();

    let (blocks, unterminated) = fenced_blocks(model_text);
    plan.skipped += unterminated;

    for block in blocks {
        let before = plan.skipped;
        let operations = match syntax {
            EditSyntax::LineRange => parse_edit_file_calls(&block.body, &mut plan.skipped),
            EditSyntax::SearchReplace => {
                parse_search_replace(&block.body, block.header.as_deref(), &mut plan.skipped)
            }
        };
        if operations.is_empty() {
            if plan.skipped == before {
                plan.skipped += 1;
            }
            debug!(?syntax, "block has no edit commands, dropped");
            continue;
        }
        for op in operations {
            plan.files.entry(op.file().to_string()).or_default().push(op);
        }
        plan.blocks.push(block.body);
    }

    if policy == FilePolicy::FirstFileOnly && plan.files.len() > 1 {
        let dropped: Vec<String> = plan.files.drain(1..).map(|(path, _)| path).collect();
        debug!(?dropped, "keeping only the first edited file");
    }
    plan
}

#[derive(Debug)]
struct Block {
    body: String,
    /// A `### path` or bare path line directly above the fence.
    header: Option<String>,
}

/// Split text into fenced blocks. Without any fence the whole text is one
/// block. Returns the blocks and the number of unterminated fences.
fn fenced_blocks(text: &str) -> (Vec<Block>, usize) {
    let mut blocks = Vec::new();
    let mut unterminated = 0;
    let mut saw_fence = false;
    let mut last_outside: Option<&str> = None;
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        if !line.trim_start().starts_with("```") {
            if !line.trim().is_empty() {
                last_outside = Some(line);
            }
            continue;
        }
        saw_fence = true;
        let header = last_outside.take().and_then(header_path);

        let mut body = Vec::new();
        let mut closed = false;
        for inner in lines.by_ref() {
            if inner.trim() == "```" {
                closed = true;
                break;
            }
            body.push(inner);
        }
        if closed {
            blocks.push(Block {
                body: body.join("\n"),
                header,
            });
        } else {
            debug!("unterminated code fence, dropped");
            unterminated += 1;
        }
    }

    if !saw_fence {
        blocks.push(Block {
            body: text.to_string(),
            header: None,
        });
    }
    (blocks, unterminated)
}

/// The path named by a `### path` header or a bare single-token path line.
fn header_path(line: &str) -> Option<String> {
    let line = line.trim();
    let candidate = match line.strip_prefix("###") {
        Some(rest) => rest.trim(),
        None if is_bare_path(line) => line,
        None => return None,
    };
    let path = normalize_path(candidate);
    (!path.is_empty()).then_some(path)
}

/// A single token naming a source file, or a slash path whose last segment
/// has an extension. Prose such as `e.g.` or `self.x` does not qualify.
fn is_bare_path(line: &str) -> bool {
    if line.is_empty() || line.contains(char::is_whitespace) || is_marker(line) {
        return false;
    }
    let path = normalize_path(line);
    Language::is_source_path(&path)
        || (path.contains('/') && path.rsplit('/').next().is_some_and(|name| name.contains('.')))
}

fn is_marker(line: &str) -> bool {
    matches!(line.trim(), SEARCH_MARKER | DIVIDER_MARKER | REPLACE_MARKER)
}

// --- search/replace ---

fn parse_search_replace(
    body: &str,
    inherited: Option<&str>,
    skipped: &mut usize,
) -> Vec<EditOperation> {
    let lines: Vec<&str> = body.lines().collect();
    let mut operations = Vec::new();
    let mut current_file = inherited.map(str::to_string);
    let mut previous: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        if trimmed.starts_with("###") {
            if let Some(path) = header_path(trimmed) {
                current_file = Some(path);
            }
            previous = None;
            i += 1;
            continue;
        }
        if trimmed != SEARCH_MARKER {
            if !trimmed.is_empty() {
                previous = Some(trimmed);
            }
            i += 1;
            continue;
        }

        if let Some(path) = previous.take().filter(|p| is_bare_path(p)) {
            current_file = Some(normalize_path(path));
        }

        // a block's markers never reach past the next SEARCH line
        let limit = find_marker(&lines, i + 1, lines.len(), SEARCH_MARKER).unwrap_or(lines.len());
        let Some(divider) = find_marker(&lines, i + 1, limit, DIVIDER_MARKER) else {
            debug!("search block without divider, dropped");
            *skipped += 1;
            i = limit;
            continue;
        };
        let Some(end) = find_marker(&lines, divider + 1, limit, REPLACE_MARKER) else {
            debug!("search block without replace marker, dropped");
            *skipped += 1;
            i = limit;
            continue;
        };

        match &current_file {
            Some(file) => operations.push(EditOperation::SearchReplace {
                file: file.clone(),
                search_text: lines[i + 1..divider].join("\n"),
                replace_text: lines[divider + 1..end].join("\n"),
            }),
            None => {
                debug!("search block without a file header, dropped");
                *skipped += 1;
            }
        }
        i = end + 1;
    }
    operations
}

fn find_marker(lines: &[&str], from: usize, until: usize, marker: &str) -> Option<usize> {
    (from..until).find(|&idx| lines[idx].trim() == marker)
}

// --- edit_file(...) ---

fn parse_edit_file_calls(body: &str, skipped: &mut usize) -> Vec<EditOperation> {
    let mut operations = Vec::new();
    let mut pos = 0;

    while let Some(found) = body[pos..].find(EDIT_FILE_CALL) {
        let call_start = pos + found;
        let args_start = call_start + EDIT_FILE_CALL.len();
        let preceded_by_ident = body[..call_start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if preceded_by_ident {
            pos = args_start;
            continue;
        }

        let mut lexer = ArgLexer::new(body, args_start);
        match lexer.call_args().and_then(edit_file_operation) {
            Some(op) => {
                operations.push(op);
                pos = lexer.pos;
            }
            None => {
                debug!(offset = call_start, "malformed edit_file call, dropped");
                *skipped += 1;
                pos = args_start;
            }
        }
    }
    operations
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgValue {
    Str(String),
    Int(usize),
    Bare(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Arg {
    name: Option<String>,
    value: ArgValue,
}

fn edit_file_operation(args: Vec<Arg>) -> Option<EditOperation> {
    let mut slots: [Option<ArgValue>; 4] = Default::default();
    let mut positional = 0;
    for arg in args {
        let slot = match arg.name.as_deref() {
            None => {
                positional += 1;
                positional - 1
            }
            Some("filename" | "file" | "path" | "file_path") => 0,
            Some("start" | "start_line") => 1,
            Some("end" | "end_line") => 2,
            Some("content" | "new_content" | "text" | "new_text") => 3,
            Some(_) => return None,
        };
        *slots.get_mut(slot)? = Some(arg.value);
    }

    let [file, start, end, content] = slots;
    let file = match file? {
        ArgValue::Str(s) | ArgValue::Bare(s) => normalize_path(&s),
        ArgValue::Int(_) => return None,
    };
    let (Some(ArgValue::Int(start)), Some(ArgValue::Int(end))) = (start, end) else {
        return None;
    };
    let new_text = match content? {
        ArgValue::Str(s) => s,
        ArgValue::Int(_) | ArgValue::Bare(_) => return None,
    };
    if file.is_empty() {
        return None;
    }
    Some(EditOperation::ReplaceLines {
        file,
        start,
        end,
        new_text,
    })
}

/// Lexer for the argument list of a call, positioned just after `(`.
struct ArgLexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> ArgLexer<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Arguments up to and including the closing `)`.
    fn call_args(&mut self) -> Option<Vec<Arg>> {
        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.peek()? == ')' {
                self.bump();
                return Some(args);
            }
            args.push(self.arg()?);
            self.skip_ws();
            match self.bump()? {
                ',' => {}
                ')' => return Some(args),
                _ => return None,
            }
        }
    }

    fn arg(&mut self) -> Option<Arg> {
        let name = self.keyword();
        self.skip_ws();
        let value = if self.at_string() {
            ArgValue::Str(self.string()?)
        } else if self.peek()?.is_ascii_digit() {
            ArgValue::Int(self.integer()?)
        } else {
            ArgValue::Bare(self.bare()?)
        };
        Some(Arg { name, value })
    }

    /// `name=` prefix, if present.
    fn keyword(&mut self) -> Option<String> {
        let start = self.pos;
        let ident_len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        if ident_len == 0 {
            return None;
        }
        let ident = &self.rest()[..ident_len];
        self.pos += ident_len;
        self.skip_ws();
        if self.rest().starts_with('=') && !self.rest().starts_with("==") {
            self.bump();
            return Some(ident.to_string());
        }
        self.pos = start;
        None
    }

    fn at_string(&self) -> bool {
        let rest = self.rest();
        let after_prefix = rest.trim_start_matches(|c: char| {
            matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F')
        });
        rest.len() - after_prefix.len() <= 2 && after_prefix.starts_with(['"', '\''])
    }

    /// A Python string literal, escapes decoded unless raw.
    fn string(&mut self) -> Option<String> {
        let mut raw = false;
        while let Some(c) = self.peek().filter(|c| !matches!(c, '"' | '\'')) {
            raw |= matches!(c, 'r' | 'R');
            self.bump();
        }
        let quote = self.bump()?;
        let triple = self.rest().starts_with(&format!("{quote}{quote}"));
        if triple {
            self.pos += 2;
        }
        let closing = quote.to_string().repeat(if triple { 3 } else { 1 });

        let mut out = String::new();
        loop {
            if self.rest().starts_with(closing.as_str()) {
                self.pos += closing.len();
                return Some(out);
            }
            let c = self.bump()?;
            match c {
                '\n' if !triple => return None,
                '\\' => {
                    let escaped = self.bump()?;
                    if raw {
                        out.push('\\');
                        out.push(escaped);
                    } else {
                        self.escape(escaped, &mut out)?;
                    }
                }
                _ => out.push(c),
            }
        }
    }

    fn escape(&mut self, escaped: char, out: &mut String) -> Option<()> {
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '\n' => {}
            'x' => out.push(self.hex_char(2)?),
            'u' => out.push(self.hex_char(4)?),
            'U' => out.push(self.hex_char(8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Some(())
    }

    fn hex_char(&mut self, digits: usize) -> Option<char> {
        let hex = self.rest().get(..digits)?;
        let code = u32::from_str_radix(hex, 16).ok()?;
        self.pos += digits;
        char::from_u32(code)
    }

    fn integer(&mut self) -> Option<usize> {
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest().len());
        let value = self.rest()[..len].parse().ok()?;
        self.pos += len;
        let next = self.rest().trim_start().chars().next();
        matches!(next, Some(',' | ')')).then_some(value)
    }

    /// Unquoted text up to the next top-level `,` or `)`.
    fn bare(&mut self) -> Option<String> {
        let len = self.rest().find([',', ')', '\n'])?;
        let text = self.rest()[..len].trim().to_string();
        self.pos += len;
        (!text.is_empty()).then_some(text)
    }
}
