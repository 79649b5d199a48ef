use thiserror::Error;

/// The window of the file that came closest to an anchor that did not match.
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    /// First line of the window (1-based).
    pub line: usize,
    /// Normalised Levenshtein similarity in `0.0..=1.0`.
    pub similarity: f64,
}

/// Why a single edit operation was not applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error("invalid line range {start}..={end} for a file of {line_count} lines")]
    InvalidRange {
        start: usize,
        end: usize,
        line_count: usize,
    },

    #[error("search text not found{}", describe_near_miss(.closest))]
    AnchorNotFound { closest: Option<NearMiss> },

    #[error("search text matched {count} locations, expected exactly 1")]
    AmbiguousAnchor { count: usize },

    #[error("search text is empty")]
    EmptyAnchor,
}

fn describe_near_miss(closest: &Option<NearMiss>) -> String {
    match closest {
        Some(near) => format!(
            " (closest: line {}, {:.0}% similar)",
            near.line,
            near.similarity * 100.0
        ),
        None => String::new(),
    }
}
