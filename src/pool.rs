//! Thread-local parser pooling.
//!
//! Tree-sitter parsers are not `Sync`, so each thread keeps one parser per
//! language, created on first use and reused afterwards. Index builds and
//! patch validation call through here instead of allocating a parser per file.

use crate::lang::{Language, ParseError, SourceParser};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Language, SourceParser>> = RefCell::new(HashMap::new());
}

/// Execute `f` with this thread's parser for `language`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use locpatch::lang::Language;
/// use locpatch::pool::with_parser;
///
/// let broken = with_parser(Language::Python, |parser| {
///     parser.parse_with_source("def f(:\n").map(|parsed| parsed.has_errors())
/// })??;
/// assert!(broken);
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut SourceParser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(SourceParser::new(language)?)
            }
        };
        Ok(f(parser))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken(language: Language, source: &str) -> bool {
        with_parser(language, |parser| parser.parse_with_source(source).map(|p| p.has_errors()))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn reuses_parsers_per_language() {
        assert!(!broken(Language::Python, "x = 1\n"));
        assert!(!broken(Language::Java, "class A {}"));
        assert!(broken(Language::Java, "class A {"));
        assert!(!broken(Language::Python, "y = 2\n"));
    }
}
