//! Declaration extraction from tree-sitter trees.
//!
//! One walker per language. Both push into the same [`Collector`], in source
//! order, so an outer class always precedes the classes nested inside it.

use crate::index::declaration::{Declaration, DeclarationKind, FileIndex};
use crate::lang::{Language, ParsedSource, SourceText};
use std::collections::BTreeMap;
use tree_sitter::Node;

#[derive(Debug, Default)]
pub(crate) struct Collector {
    classes: Vec<Declaration>,
    functions: Vec<Declaration>,
    methods: BTreeMap<String, Vec<Declaration>>,
    globals: Vec<Declaration>,
}

impl Collector {
    pub(crate) fn into_file_index(
        self,
        path: String,
        language: Language,
        text: &SourceText,
        content_hash: u64,
    ) -> FileIndex {
        FileIndex {
            path,
            language,
            classes: self.classes,
            top_level_functions: self.functions,
            methods_by_class: self.methods,
            globals: self.globals,
            lines: text.lines().to_vec(),
            trailing_newline: text.trailing_newline(),
            syntax_valid: true,
            syntax_error_lines: Vec::new(),
            content_hash,
        }
    }

    fn push(&mut self, declaration: Declaration) {
        match declaration.kind {
            DeclarationKind::Class => self.classes.push(declaration),
            DeclarationKind::Function => self.functions.push(declaration),
            DeclarationKind::GlobalVariable => self.globals.push(declaration),
            DeclarationKind::Method => {
                let owner = declaration.owner_class.clone().unwrap_or_default();
                self.methods.entry(owner).or_default().push(declaration);
            }
        }
    }
}

pub(crate) fn extract(parsed: &ParsedSource<'_>) -> Collector {
    let mut out = Collector::default();
    match parsed.language {
        Language::Python => python_visit(parsed, parsed.root_node(), PyScope::Module, &mut out),
        Language::Java => java_visit(parsed, parsed.root_node(), None, &mut out),
    }
    out
}

/// Inclusive 1-based line span of a node. A node whose end sits at column 0
/// ends on the previous line.
fn line_span(node: Node<'_>) -> (usize, usize) {
    let start = node.start_position().row + 1;
    let end_pos = node.end_position();
    let mut end = end_pos.row + 1;
    if end_pos.column == 0 && end > start {
        end -= 1;
    }
    (start, end)
}

fn declaration(
    kind: DeclarationKind,
    name: &str,
    owner: Option<&str>,
    span_node: Node<'_>,
    name_node: Node<'_>,
    body_present: bool,
) -> Declaration {
    let (start_line, end_line) = line_span(span_node);
    let qualified_name = match owner {
        Some(owner) => format!("{owner}.{name}"),
        None => name.to_string(),
    };
    Declaration {
        kind,
        name: name.to_string(),
        qualified_name,
        owner_class: owner.map(str::to_string),
        start_line,
        end_line,
        signature_line: name_node.start_position().row + 1,
        body_present,
    }
}

fn name_of<'a, 't>(parsed: &ParsedSource<'a>, node: Node<'t>) -> Option<(Node<'t>, &'a str)> {
    let name_node = node.child_by_field_name("name")?;
    let name = parsed.node_text(name_node);
    (!name.is_empty()).then_some((name_node, name))
}

// --- Python ---

#[derive(Clone, Copy)]
enum PyScope<'s> {
    Module,
    Class(&'s str),
    Function,
}

fn python_visit(parsed: &ParsedSource<'_>, node: Node<'_>, scope: PyScope<'_>, out: &mut Collector) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "class_definition" => python_class(parsed, child, out),
            "function_definition" => python_function(parsed, child, scope, out),
            "decorated_definition" => {
                let Some(definition) = child.child_by_field_name("definition") else {
                    continue;
                };
                match definition.kind() {
                    "class_definition" => python_class(parsed, definition, out),
                    "function_definition" => python_function(parsed, definition, scope, out),
                    _ => {}
                }
            }
            "expression_statement" => python_assignment(parsed, child, scope, out),
            _ => python_visit(parsed, child, scope, out),
        }
    }
}

fn python_class(parsed: &ParsedSource<'_>, node: Node<'_>, out: &mut Collector) {
    let Some((name_node, name)) = name_of(parsed, node) else {
        return;
    };
    out.push(declaration(DeclarationKind::Class, name, None, node, name_node, true));
    if let Some(body) = node.child_by_field_name("body") {
        python_visit(parsed, body, PyScope::Class(name), out);
    }
}

fn python_function(
    parsed: &ParsedSource<'_>,
    node: Node<'_>,
    scope: PyScope<'_>,
    out: &mut Collector,
) {
    let Some((name_node, name)) = name_of(parsed, node) else {
        return;
    };
    match scope {
        PyScope::Module => out.push(declaration(
            DeclarationKind::Function,
            name,
            None,
            node,
            name_node,
            true,
        )),
        PyScope::Class(owner) => out.push(declaration(
            DeclarationKind::Method,
            name,
            Some(owner),
            node,
            name_node,
            true,
        )),
        // nested functions are not indexed, but classes inside them are
        PyScope::Function => {}
    }
    if let Some(body) = node.child_by_field_name("body") {
        python_visit(parsed, body, PyScope::Function, out);
    }
}

fn python_assignment(
    parsed: &ParsedSource<'_>,
    statement: Node<'_>,
    scope: PyScope<'_>,
    out: &mut Collector,
) {
    let owner = match scope {
        PyScope::Module => None,
        PyScope::Class(owner) => Some(owner),
        PyScope::Function => return,
    };
    let mut cursor = statement.walk();
    for expr in statement.named_children(&mut cursor) {
        // `a = b = 1` nests the second assignment on the right.
        let mut current = Some(expr);
        while let Some(assignment) = current.filter(|n| n.kind() == "assignment") {
            let right = assignment.child_by_field_name("right");
            if let Some(left) = assignment.child_by_field_name("left") {
                for target in assignment_targets(left) {
                    let name = parsed.node_text(target);
                    if name.is_empty() {
                        continue;
                    }
                    out.push(declaration(
                        DeclarationKind::GlobalVariable,
                        name,
                        owner,
                        statement,
                        target,
                        right.is_some(),
                    ));
                }
            }
            current = right;
        }
    }
}

fn assignment_targets(left: Node<'_>) -> Vec<Node<'_>> {
    match left.kind() {
        "identifier" => vec![left],
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = left.walk();
            let targets = left
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "identifier")
                .collect();
            targets
        }
        _ => Vec::new(),
    }
}

// --- Java ---

fn java_visit(parsed: &ParsedSource<'_>, node: Node<'_>, owner: Option<&str>, out: &mut Collector) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => java_type(parsed, child, out),
            "method_declaration"
            | "constructor_declaration"
            | "compact_constructor_declaration" => java_method(parsed, child, owner, out),
            "field_declaration" | "constant_declaration" => java_field(parsed, child, owner, out),
            // anonymous bodies of enum constants belong to no named class
            "enum_constant" => {}
            _ => java_visit(parsed, child, owner, out),
        }
    }
}

fn java_type(parsed: &ParsedSource<'_>, node: Node<'_>, out: &mut Collector) {
    let Some((name_node, name)) = name_of(parsed, node) else {
        return;
    };
    out.push(declaration(DeclarationKind::Class, name, None, node, name_node, true));
    if let Some(body) = node.child_by_field_name("body") {
        java_visit(parsed, body, Some(name), out);
    }
}

fn java_method(
    parsed: &ParsedSource<'_>,
    node: Node<'_>,
    owner: Option<&str>,
    out: &mut Collector,
) {
    let Some((name_node, name)) = name_of(parsed, node) else {
        return;
    };
    let body = node.child_by_field_name("body");
    if let Some(owner) = owner {
        out.push(declaration(
            DeclarationKind::Method,
            name,
            Some(owner),
            node,
            name_node,
            body.is_some(),
        ));
    }
    // local classes only; anonymous class members stay unowned
    if let Some(body) = body {
        java_visit(parsed, body, None, out);
    }
}

fn java_field(
    parsed: &ParsedSource<'_>,
    node: Node<'_>,
    owner: Option<&str>,
    out: &mut Collector,
) {
    let Some(owner) = owner else {
        return;
    };
    let mut cursor = node.walk();
    for declarator in node
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "variable_declarator")
    {
        let Some((name_node, name)) = name_of(parsed, declarator) else {
            continue;
        };
        out.push(declaration(
            DeclarationKind::GlobalVariable,
            name,
            Some(owner),
            node,
            name_node,
            declarator.child_by_field_name("value").is_some(),
        ));
    }
}
