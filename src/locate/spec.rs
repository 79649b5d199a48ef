use crate::index::normalize_path;
use crate::lang::Language;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A model-written reference to a code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocationSpec {
    /// `line: 42`
    LineNumber(usize),
    /// `class: Foo`
    ClassRef(String),
    /// `function: Foo.bar`, `function: helper`, or `method: Foo.bar`
    FunctionRef(String),
    /// `variable: LIMIT`
    GlobalRef(String),
    /// Anything else: literal text to search for.
    Raw(String),
}

impl LocationSpec {
    /// Parse one line of model output. Blank lines and fences yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = strip_bullet(line.trim());
        if line.is_empty() || line.starts_with("```") {
            return None;
        }

        let Some((prefix, value)) = line.split_once(':') else {
            return Some(LocationSpec::Raw(line.to_string()));
        };
        let value = clean_value(value);
        let spec = match prefix.trim().to_ascii_lowercase().as_str() {
            "line" => match value.parse::<usize>() {
                Ok(n) => LocationSpec::LineNumber(n),
                Err(_) => return Some(LocationSpec::Raw(line.to_string())),
            },
            "class" => LocationSpec::ClassRef(value.to_string()),
            "function" | "method" => {
                let name = value.split('(').next().unwrap_or(value).trim();
                LocationSpec::FunctionRef(name.to_string())
            }
            "variable" => LocationSpec::GlobalRef(value.to_string()),
            _ => return Some(LocationSpec::Raw(line.to_string())),
        };
        if spec.name().is_some_and(str::is_empty) {
            return None;
        }
        Some(spec)
    }

    /// The referenced name for name-based variants.
    pub fn name(&self) -> Option<&str> {
        match self {
            LocationSpec::ClassRef(name)
            | LocationSpec::FunctionRef(name)
            | LocationSpec::GlobalRef(name) => Some(name),
            LocationSpec::LineNumber(_) | LocationSpec::Raw(_) => None,
        }
    }

    fn has_known_prefix(line: &str) -> bool {
        line.split_once(':').is_some_and(|(prefix, _)| {
            matches!(
                prefix.trim().to_ascii_lowercase().as_str(),
                "line" | "class" | "function" | "method" | "variable"
            )
        })
    }
}

/// Group location lines under the file paths that precede them.
///
/// A file path is a single token ending in a supported source extension.
/// Specs before the first path are dropped. Files keep first-mention order.
pub fn parse_location_block(text: &str) -> IndexMap<String, Vec<LocationSpec>> {
    let mut out: IndexMap<String, Vec<LocationSpec>> = IndexMap::new();
    let mut current: Option<String> = None;

    for raw_line in text.lines() {
        let line = strip_bullet(raw_line.trim());
        if is_file_line(line) {
            let path = normalize_path(line);
            out.entry(path.clone()).or_default();
            current = Some(path);
            continue;
        }
        let Some(spec) = LocationSpec::parse(line) else {
            continue;
        };
        match &current {
            Some(path) => out.entry(path.clone()).or_default().push(spec),
            None => debug!(?spec, "location before any file path, dropped"),
        }
    }
    out
}

fn is_file_line(line: &str) -> bool {
    !line.is_empty()
        && !line.contains(char::is_whitespace)
        && !LocationSpec::has_known_prefix(line)
        && Language::is_source_path(&normalize_path(line))
}

fn strip_bullet(line: &str) -> &str {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line)
        .trim()
}

fn clean_value(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '\''))
        .trim()
}
