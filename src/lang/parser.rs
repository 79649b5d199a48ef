use crate::lang::errors::ParseError;
use crate::lang::Language;
use ast_grep_language::LanguageExt;
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser bound to one source language.
pub struct SourceParser {
    parser: Parser,
    language: Language,
}

impl SourceParser {
    pub fn new(language: Language) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let ts_lang = language.support_lang().get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| ParseError::LanguageSet {
                language: language.name(),
            })?;

        Ok(Self { parser, language })
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or(ParseError::ParseFailed {
                language: self.language.name(),
            })
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, ParseError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource {
            source,
            tree,
            language: self.language,
        })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
    pub language: Language,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    /// Text covered by `node`, or the empty string if the range is not UTF-8 aligned.
    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    /// 1-based line of the first byte.
    pub line: usize,
    /// 1-based column of the first byte.
    pub column: usize,
}

fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        let start = node.start_position();
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            line: start.row + 1,
            column: start.column + 1,
        });
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}
