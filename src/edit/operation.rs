use serde::{Deserialize, Serialize};

/// One proposed change to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    /// Replace original lines `start..=end` with `new_text`.
    ///
    /// Line numbers refer to the file before any operation of the same batch.
    /// `start == end == len + 1` appends.
    ReplaceLines {
        file: String,
        start: usize,
        end: usize,
        new_text: String,
    },
    /// Replace the unique occurrence of `search_text`.
    SearchReplace {
        file: String,
        search_text: String,
        replace_text: String,
    },
}

impl EditOperation {
    pub fn file(&self) -> &str {
        match self {
            EditOperation::ReplaceLines { file, .. } | EditOperation::SearchReplace { file, .. } => {
                file
            }
        }
    }
}

/// Surface syntax a model was asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditSyntax {
    /// `edit_file(filename, start, end, content)` calls.
    LineRange,
    /// `<<<<<<< SEARCH` / `=======` / `>>>>>>> REPLACE` blocks.
    #[default]
    SearchReplace,
}

/// Which files of a response are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePolicy {
    /// Only the first file mentioned, so each round edits exactly one file.
    #[default]
    FirstFileOnly,
    AllFiles,
}
