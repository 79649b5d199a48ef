use crate::lang::{Language, SourceText};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Class,
    Function,
    Method,
    GlobalVariable,
}

impl DeclarationKind {
    /// Classes, functions and methods open a scope; variables do not.
    pub fn is_scope(self) -> bool {
        !matches!(self, DeclarationKind::GlobalVariable)
    }
}

/// A named, line-bounded structural unit of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// Unqualified name as written in the source.
    pub name: String,
    /// `Class.member` for class members, the bare name otherwise.
    pub qualified_name: String,
    pub owner_class: Option<String>,
    /// First line of the declaration, including Java annotations and modifiers.
    pub start_line: usize,
    /// Line of the closing scope (inclusive).
    pub end_line: usize,
    /// Line holding the declared name; what a sticky header shows.
    pub signature_line: usize,
    pub body_present: bool,
}

impl Declaration {
    pub fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn span_len(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// Structural view of one source file.
///
/// Built once per repository snapshot. A file that fails to parse keeps its
/// lines but has no declarations and `syntax_valid == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIndex {
    pub path: String,
    pub language: Language,
    pub classes: Vec<Declaration>,
    pub top_level_functions: Vec<Declaration>,
    pub methods_by_class: BTreeMap<String, Vec<Declaration>>,
    pub globals: Vec<Declaration>,
    #[serde(skip)]
    pub lines: Vec<String>,
    #[serde(skip)]
    pub trailing_newline: bool,
    pub syntax_valid: bool,
    pub syntax_error_lines: Vec<usize>,
    pub content_hash: u64,
}

impl FileIndex {
    /// An index that exposes raw lines only.
    pub fn unparsed(
        path: impl Into<String>,
        language: Language,
        text: &SourceText,
        content_hash: u64,
        syntax_error_lines: Vec<usize>,
    ) -> Self {
        Self {
            path: path.into(),
            language,
            classes: Vec::new(),
            top_level_functions: Vec::new(),
            methods_by_class: BTreeMap::new(),
            globals: Vec::new(),
            lines: text.lines().to_vec(),
            trailing_newline: text.trailing_newline(),
            syntax_valid: false,
            syntax_error_lines,
            content_hash,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line `n` (1-based).
    pub fn line(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    /// The file's text, reassembled from its lines.
    pub fn text(&self) -> String {
        SourceText::from_lines(self.lines.clone(), self.trailing_newline).to_text()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Declaration> {
        self.methods_by_class.values().flatten()
    }

    /// Every declaration, ordered by start line then widest span first.
    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut all: Vec<&Declaration> = self
            .classes
            .iter()
            .chain(self.top_level_functions.iter())
            .chain(self.methods())
            .chain(self.globals.iter())
            .collect();
        all.sort_by(|a, b| {
            a.start_line
                .cmp(&b.start_line)
                .then(b.end_line.cmp(&a.end_line))
        });
        all
    }

    pub fn find_class(&self, name: &str) -> Option<&Declaration> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Find a function or method by qualified (`Class.method`) or bare name.
    ///
    /// A bare name prefers a top-level function and falls back to a method only
    /// when exactly one class defines a method of that name.
    pub fn find_function(&self, qualified_name: &str) -> Option<&Declaration> {
        if let Some((owners, method)) = qualified_name.rsplit_once('.') {
            let owners: Vec<&str> = owners.split('.').collect();
            let class = owners.last().copied().unwrap_or_default();
            return self
                .methods_by_class
                .get(class)?
                .iter()
                .filter(|m| m.name == method)
                .find(|m| owners.len() == 1 || self.nested_in(m, &owners));
        }

        if let Some(function) = self
            .top_level_functions
            .iter()
            .find(|f| f.name == qualified_name)
        {
            return Some(function);
        }

        let mut candidates = self.methods().filter(|m| m.name == qualified_name);
        let first = candidates.next()?;
        let ambiguous = candidates.any(|m| m.owner_class != first.owner_class);
        if ambiguous {
            None
        } else {
            Some(first)
        }
    }

    /// True if `decl` sits inside classes named `owners`, outermost first,
    /// each containing the next.
    fn nested_in(&self, decl: &Declaration, owners: &[&str]) -> bool {
        let mut inner = (decl.start_line, decl.end_line);
        for owner in owners.iter().rev() {
            let Some(class) = self
                .classes
                .iter()
                .filter(|c| c.name == *owner && c.start_line <= inner.0 && inner.1 <= c.end_line)
                .min_by_key(|c| c.span_len())
            else {
                return false;
            };
            inner = (class.start_line, class.end_line);
        }
        true
    }

    pub fn find_global(&self, name: &str) -> Option<&Declaration> {
        self.globals
            .iter()
            .find(|g| g.qualified_name == name)
            .or_else(|| self.globals.iter().find(|g| g.name == name))
    }

    /// Smallest declaration of any kind containing `line`.
    pub fn enclosing(&self, line: usize) -> Option<&Declaration> {
        smallest_containing(self.declarations().into_iter(), line)
    }

    /// Smallest class, function or method containing `line`.
    pub fn enclosing_scope(&self, line: usize) -> Option<&Declaration> {
        smallest_containing(
            self.declarations().into_iter().filter(|d| d.kind.is_scope()),
            line,
        )
    }
}

fn smallest_containing<'a>(
    declarations: impl Iterator<Item = &'a Declaration>,
    line: usize,
) -> Option<&'a Declaration> {
    declarations
        .filter(|d| d.contains(line))
        .min_by(|a, b| {
            a.span_len()
                .cmp(&b.span_len())
                .then(b.start_line.cmp(&a.start_line))
        })
}
