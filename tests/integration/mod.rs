//! Integration tests across pipeline stages, driven through the public API.

mod localization;
mod repair;
mod skeleton;

use locpatch::RepositoryIndex;

/// A 50-line module: class `Foo` on lines 10-30 with method `bar` on 15-20.
pub(crate) fn foo_module() -> String {
    let mut lines = Vec::new();
    for n in 1..=9 {
        lines.push(format!("a{n} = {n}"));
    }
    lines.push("class Foo:".to_string());
    for n in 11..=14 {
        lines.push(format!("    x{n} = {n}"));
    }
    lines.push("    def bar(self):".to_string());
    for _ in 16..=19 {
        lines.push("        v = 1".to_string());
    }
    lines.push("        return v".to_string());
    for n in 21..=30 {
        lines.push(format!("    y{n} = {n}"));
    }
    for n in 31..=50 {
        lines.push(format!("w{n} = {n}"));
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub(crate) fn fixture_repo() -> RepositoryIndex {
    RepositoryIndex::from_sources([
        ("pkg/foo.py".to_string(), foo_module()),
        (
            "pkg/calc.py".to_string(),
            "def add(a, b):\n    return a - b\n\n\ndef sub(a, b):\n    return a - b\n".to_string(),
        ),
        (
            "src/Counter.java".to_string(),
            "public class Counter {\n    static int LIMIT = 5;\n    private int n;\n\n    void inc() {\n        n++;\n    }\n\n    int get() {\n        return n;\n    }\n}\n"
                .to_string(),
        ),
        ("docs/notes.md".to_string(), "# notes\n".to_string()),
    ])
    .expect("fixture paths are valid")
}
