use crate::index::declaration::FileIndex;
use crate::index::errors::IndexError;
use crate::index::parse_source;
use crate::lang::Language;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into when walking a working tree.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "target",
    "node_modules",
    "__pycache__",
    "build",
];

/// A leaf of the repository tree.
#[derive(Debug, Clone)]
pub enum IndexEntry {
    /// A file in a supported language, parsed.
    Source(Arc<FileIndex>),
    /// Any other file. Kept so the structure view lists it.
    Unindexed,
}

#[derive(Debug, Clone)]
enum Node {
    Dir(BTreeMap<String, Node>),
    File(IndexEntry),
}

/// Directory-shaped index of one repository snapshot.
///
/// The index is never mutated in place. [`RepositoryIndex::with_file`] returns a
/// new index in which only the replaced file is re-parsed; every other leaf is
/// shared with the original through its `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    root: BTreeMap<String, Node>,
}

impl RepositoryIndex {
    /// Walk `root` and index every file below it.
    pub fn build(root: impl AsRef<Path>) -> Result<Self, IndexError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(IndexError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut paths = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || keep_entry(e));
        for entry in walker {
            let entry = entry.map_err(|source| IndexError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            paths.push((relative, entry.into_path()));
        }

        let leaves = paths
            .par_iter()
            .map(|(relative, full)| {
                let entry = match Language::from_path(relative) {
                    Some(language) => {
                        let bytes = fs::read(full).map_err(|source| IndexError::Io {
                            path: full.clone(),
                            source,
                        })?;
                        let text = String::from_utf8_lossy(&bytes);
                        IndexEntry::Source(Arc::new(parse_source(language, relative.clone(), &text)))
                    }
                    None => IndexEntry::Unindexed,
                };
                Ok((relative.clone(), entry))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        let mut index = Self::default();
        for (relative, entry) in leaves {
            index.insert(&relative, entry)?;
        }
        info!(root = %root.display(), files = leaves_len(&index.root), "indexed repository");
        Ok(index)
    }

    /// Build from an in-memory snapshot of `(path, text)` pairs.
    pub fn from_sources<I, K, V>(sources: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sources: Vec<(String, String)> = sources
            .into_iter()
            .map(|(k, v)| (normalize_path(&k.into()), v.into()))
            .collect();

        let leaves: Vec<(String, IndexEntry)> = sources
            .par_iter()
            .map(|(path, text)| (path.clone(), leaf_for(path, text)))
            .collect();

        let mut index = Self::default();
        for (path, entry) in leaves {
            index.insert(&path, entry)?;
        }
        Ok(index)
    }

    /// A new index with `path` replaced by `text`.
    ///
    /// The file is re-parsed only when its content hash changed.
    pub fn with_file(&self, path: &str, text: &str) -> Result<Self, IndexError> {
        let path = normalize_path(path);
        if let Some(existing) = self.get(&path) {
            if existing.content_hash == xxhash_rust::xxh3::xxh3_64(text.as_bytes()) {
                debug!(path = %path, "content unchanged, keeping index entry");
                return Ok(self.clone());
            }
        }
        let mut next = self.clone();
        next.insert(&path, leaf_for(&path, text))?;
        debug!(path = %path, "re-indexed file");
        Ok(next)
    }

    pub fn get(&self, path: &str) -> Option<&FileIndex> {
        match self.lookup(path)? {
            Node::File(IndexEntry::Source(index)) => Some(index.as_ref()),
            _ => None,
        }
    }

    /// True if `path` names any file in the snapshot, indexed or not.
    pub fn contains(&self, path: &str) -> bool {
        matches!(self.lookup(path), Some(Node::File(_)))
    }

    /// Indexed files, depth-first in name order.
    pub fn files(&self) -> Vec<(String, &FileIndex)> {
        let mut out = Vec::new();
        collect_files(&self.root, "", &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text of every indexed file, keyed by path.
    pub fn contents(&self) -> HashMap<String, String> {
        self.files()
            .into_iter()
            .map(|(path, index)| (path, index.text()))
            .collect()
    }

    /// Indented directory listing, four spaces per level, directories suffixed `/`.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        render_level(&self.root, 0, &mut out);
        out
    }

    fn lookup(&self, path: &str) -> Option<&Node> {
        let normalized = normalize_path(path);
        let mut segments = normalized.split('/').filter(|s| !s.is_empty());
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            match node {
                Node::Dir(children) => node = children.get(segment)?,
                Node::File(_) => return None,
            }
        }
        Some(node)
    }

    fn insert(&mut self, path: &str, entry: IndexEntry) -> Result<(), IndexError> {
        let invalid = || IndexError::InvalidPath {
            path: path.to_string(),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return Err(invalid());
        };
        if segments.iter().any(|s| *s == "..") {
            return Err(invalid());
        }

        let mut level = &mut self.root;
        for dir in dirs {
            let node = level
                .entry((*dir).to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            level = match node {
                Node::Dir(children) => children,
                Node::File(_) => return Err(invalid()),
            };
        }
        if matches!(level.get(*file_name), Some(Node::Dir(_))) {
            return Err(invalid());
        }
        level.insert((*file_name).to_string(), Node::File(entry));
        Ok(())
    }
}

fn keep_entry(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !SKIPPED_DIRS.contains(&name.as_ref())
}

fn leaf_for(path: &str, text: &str) -> IndexEntry {
    match Language::from_path(path) {
        Some(language) => IndexEntry::Source(Arc::new(parse_source(language, path, text))),
        None => IndexEntry::Unindexed,
    }
}

/// Canonical repository-relative form of a path as written by a model or user:
/// surrounding quotes and backticks stripped, forward slashes, no `./` or
/// leading `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .replace('\\', "/");
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn collect_files<'a>(level: &'a BTreeMap<String, Node>, prefix: &str, out: &mut Vec<(String, &'a FileIndex)>) {
    for (name, node) in level {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        match node {
            Node::Dir(children) => collect_files(children, &path, out),
            Node::File(IndexEntry::Source(index)) => out.push((path, index.as_ref())),
            Node::File(IndexEntry::Unindexed) => {}
        }
    }
}

fn leaves_len(level: &BTreeMap<String, Node>) -> usize {
    level
        .values()
        .map(|node| match node {
            Node::Dir(children) => leaves_len(children),
            Node::File(_) => 1,
        })
        .sum()
}

fn render_level(level: &BTreeMap<String, Node>, depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    for (name, node) in level {
        match node {
            Node::Dir(children) => {
                let _ = writeln!(out, "{indent}{name}/");
                render_level(children, depth + 1, out);
            }
            Node::File(_) => {
                let _ = writeln!(out, "{indent}{name}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RepositoryIndex {
        RepositoryIndex::from_sources([
            ("pkg/core.py", "def run():\n    return 1\n"),
            ("pkg/util/helpers.py", "class Helper:\n    def go(self):\n        pass\n"),
            ("README.md", "# readme\n"),
            ("./src/App.java", "class App {}\n"),
        ])
        .unwrap()
    }

    #[test]
    fn lookups_by_normalized_path() {
        let repo = snapshot();
        assert!(repo.get("pkg/core.py").is_some());
        assert!(repo.get("./pkg/util/helpers.py").is_some());
        assert!(repo.get("src/App.java").is_some());
        assert!(repo.get("README.md").is_none());
        assert!(repo.contains("README.md"));
        assert!(repo.get("pkg").is_none());
        assert!(repo.get("missing.py").is_none());
    }

    #[test]
    fn files_are_listed_in_name_order() {
        let repo = snapshot();
        let paths: Vec<_> = repo.files().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["pkg/core.py", "pkg/util/helpers.py", "src/App.java"]);
        assert_eq!(repo.len(), 3);
        assert_eq!(
            repo.contents()["pkg/core.py"],
            "def run():\n    return 1\n"
        );
    }

    #[test]
    fn renders_directory_tree() {
        let repo = snapshot();
        assert_eq!(
            repo.render_tree(),
            "README.md\npkg/\n    core.py\n    util/\n        helpers.py\nsrc/\n    App.java\n"
        );
    }

    #[test]
    fn with_file_reparses_only_changed_file() {
        let repo = snapshot();
        let before = repo.get("pkg/util/helpers.py").unwrap();

        let next = repo
            .with_file("pkg/core.py", "def run():\n    return 2\n\ndef stop():\n    pass\n")
            .unwrap();
        assert_eq!(next.get("pkg/core.py").unwrap().top_level_functions.len(), 2);
        assert_eq!(repo.get("pkg/core.py").unwrap().top_level_functions.len(), 1);
        assert!(std::ptr::eq(before, next.get("pkg/util/helpers.py").unwrap()));

        let unchanged = next
            .with_file("pkg/util/helpers.py", "class Helper:\n    def go(self):\n        pass\n")
            .unwrap();
        assert!(std::ptr::eq(
            before,
            unchanged.get("pkg/util/helpers.py").unwrap()
        ));
    }

    #[test]
    fn normalizes_quoted_and_relative_paths() {
        assert_eq!(normalize_path("`./pkg/a.py`"), "pkg/a.py");
        assert_eq!(normalize_path("'pkg\\b.py'"), "pkg/b.py");
        assert_eq!(normalize_path("/pkg//c.py "), "pkg/c.py");
    }

    #[test]
    fn rejects_paths_that_clash_or_escape() {
        let repo = snapshot();
        assert!(matches!(
            repo.with_file("pkg", "x = 1\n"),
            Err(IndexError::InvalidPath { .. })
        ));
        assert!(matches!(
            repo.with_file("../outside.py", "x = 1\n"),
            Err(IndexError::InvalidPath { .. })
        ));
        assert!(matches!(
            repo.with_file("", "x = 1\n"),
            Err(IndexError::InvalidPath { .. })
        ));
    }
}
