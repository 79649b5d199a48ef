//! Skeleton compression: class, method and global names with bodies elided.

use crate::index::{Declaration, DeclarationKind, FileIndex};

const INDENT: &str = "    ";

/// Compress `file` to its skeleton.
///
/// Files that did not parse, or that have nothing to show, come back as
/// `text` unchanged.
pub fn compress(file: &FileIndex, text: &str, keep_globals: bool) -> String {
    if !file.syntax_valid {
        return text.to_string();
    }

    let mut top: Vec<&Declaration> = file
        .classes
        .iter()
        .chain(file.top_level_functions.iter())
        .chain(
            file.globals
                .iter()
                .filter(|g| keep_globals && g.owner_class.is_none()),
        )
        .collect();
    if top.is_empty() {
        return text.to_string();
    }
    top.sort_by_key(|d| d.start_line);

    let mut blocks: Vec<Vec<String>> = Vec::new();
    let mut loose: Vec<String> = Vec::new();
    for decl in top {
        match decl.kind {
            DeclarationKind::Class => {
                if !loose.is_empty() {
                    blocks.push(std::mem::take(&mut loose));
                }
                blocks.push(class_block(file, decl, keep_globals));
            }
            _ => loose.push(stub(decl)),
        }
    }
    if !loose.is_empty() {
        blocks.push(loose);
    }

    let mut out = blocks
        .into_iter()
        .map(|block| block.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

fn class_block(file: &FileIndex, class: &Declaration, keep_globals: bool) -> Vec<String> {
    let mut members: Vec<&Declaration> = file
        .methods_by_class
        .get(&class.name)
        .into_iter()
        .flatten()
        .chain(file.globals.iter().filter(|g| {
            keep_globals && g.owner_class.as_deref() == Some(class.name.as_str())
        }))
        .filter(|member| class.contains(member.start_line))
        .collect();
    members.sort_by_key(|d| d.start_line);

    let mut lines = Vec::with_capacity(members.len() + 2);
    lines.push(format!("class {} {{", class.name));
    lines.extend(members.into_iter().map(|m| format!("{INDENT}{}", stub(m))));
    lines.push("}".to_string());
    lines
}

fn stub(decl: &Declaration) -> String {
    match decl.kind {
        DeclarationKind::GlobalVariable => format!("{} = ...;", decl.name),
        _ => format!("{}() {{ ... }}", decl.name),
    }
}
