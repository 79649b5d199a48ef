//! Line model shared by every pass: 1-based lines over a text that may or may
//! not end with a newline.

/// A text split into lines, remembering whether it ended with `\n` so that
/// [`SourceText::to_text`] restores the exact input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceText {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl SourceText {
    pub fn new(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        let trailing_newline = text.ends_with('\n');
        let body = if trailing_newline {
            &text[..text.len() - 1]
        } else {
            text
        };
        Self {
            lines: body.split('\n').map(str::to_string).collect(),
            trailing_newline,
        }
    }

    pub fn from_lines(lines: Vec<String>, trailing_newline: bool) -> Self {
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `n` (1-based).
    pub fn line(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    pub fn to_text(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

/// Split replacement text into lines, ignoring a single trailing newline.
///
/// Empty text yields no lines.
pub fn block_lines(text: &str) -> Vec<String> {
    SourceText::new(text).into_lines()
}
