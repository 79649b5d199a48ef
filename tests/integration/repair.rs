use super::fixture_repo;
use locpatch::{
    parse_edits, AttemptStatus, EditOperation, EditSyntax, FilePolicy, RejectReason,
    RepairSession,
};

const TWO_FILE_RESPONSE: &str = "I will fix both.\n\n```python\n### pkg/calc.py\n<<<<<<< SEARCH\ndef add(a, b):\n    return a - b\n=======\ndef add(a, b):\n    return a + b\n>>>>>>> REPLACE\n```\n\n```python\nedit_file(\"pkg/foo.py\", 1, 1, \"a1 = 100\")\n```\n";

fn session(syntax: EditSyntax) -> RepairSession {
    RepairSession::new(fixture_repo().contents(), syntax)
}

#[test]
fn only_the_first_file_and_its_grammar_survive() {
    let files = parse_edits(TWO_FILE_RESPONSE, EditSyntax::SearchReplace);
    assert_eq!(files.len(), 1);
    assert_eq!(
        files["pkg/calc.py"],
        vec![EditOperation::SearchReplace {
            file: "pkg/calc.py".into(),
            search_text: "def add(a, b):\n    return a - b".into(),
            replace_text: "def add(a, b):\n    return a + b".into(),
        }]
    );
}

#[test]
fn accepted_attempt_carries_a_diff_and_new_contents() {
    let record = session(EditSyntax::SearchReplace).run(TWO_FILE_RESPONSE);

    assert_eq!(record.status, AttemptStatus::Accepted);
    assert_eq!(record.edited_file.as_deref(), Some("pkg/calc.py"));
    assert!(record.model_patch.starts_with("--- a/pkg/calc.py\n+++ b/pkg/calc.py\n"));
    assert!(record.model_patch.contains("-    return a - b\n+    return a + b\n"));
    assert_eq!(record.model_patch, record.raw_model_patch);
    assert!(record.failed_operations.is_empty());

    let (path, content) = &record.new_contents[0];
    assert_eq!(path, "pkg/calc.py");
    assert_eq!(
        content,
        "def add(a, b):\n    return a + b\n\n\ndef sub(a, b):\n    return a - b\n"
    );
}

#[test]
fn line_range_edits_are_applied_and_validated() {
    let response = "```python\nedit_file(\"src/Counter.java\", 9, 11, '''    int get() {\n        return n * 2;\n    }''')\n```";
    let record = session(EditSyntax::LineRange).run(response);

    assert!(record.is_accepted(), "{:?}", record.reject_reason);
    assert!(record.new_contents[0].1.contains("return n * 2;"));
}

#[test]
fn ambiguous_anchor_leaves_the_file_unchanged() {
    let response = "### pkg/calc.py\n<<<<<<< SEARCH\n    return a - b\n=======\n    return a + b\n>>>>>>> REPLACE\n";
    let record = session(EditSyntax::SearchReplace).run(response);

    assert_eq!(record.reject_reason, Some(RejectReason::NotMeaningful));
    assert!(record.model_patch.is_empty());
    assert!(record.raw_model_patch.is_empty());
    assert_eq!(record.failed_operations.len(), 1);
    assert!(record.failed_operations[0].error.contains("matched 2 locations"));
}

#[test]
fn broken_syntax_is_rejected_but_diff_is_kept() {
    let response = "```java\n### src/Counter.java\n<<<<<<< SEARCH\n    int get() {\n=======\n    int get( {\n>>>>>>> REPLACE\n```";
    let record = session(EditSyntax::SearchReplace).run(response);

    assert_eq!(record.reject_reason, Some(RejectReason::SyntaxInvalid));
    assert!(record.model_patch.is_empty());
    assert!(record.raw_model_patch.contains("+    int get( {"));
}

#[test]
fn edits_outside_the_context_are_rejected() {
    let response = "### pkg/other.py\n<<<<<<< SEARCH\nx = 1\n=======\nx = 2\n>>>>>>> REPLACE\n";
    let record = session(EditSyntax::SearchReplace).run(response);
    assert_eq!(record.reject_reason, Some(RejectReason::FileNotInContext));
    assert_eq!(record.edited_file.as_deref(), Some("pkg/other.py"));
}

#[test]
fn samples_run_independently_and_in_order() {
    let samples = [
        "no edits here",
        TWO_FILE_RESPONSE,
        "```python\nedit_file(\"pkg/calc.py\", 3, 3, \"   \")\n```",
    ];
    let records = session(EditSyntax::SearchReplace).run_samples(&samples);
    let indices: Vec<_> = records.iter().map(|r| r.sample_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(records[0].reject_reason, Some(RejectReason::NoEditOperations));
    assert!(records[1].is_accepted());
    // wrong grammar for this session
    assert_eq!(records[2].reject_reason, Some(RejectReason::NoEditOperations));

    let line_range = session(EditSyntax::LineRange).run(samples[2]);
    assert_eq!(line_range.reject_reason, Some(RejectReason::NotMeaningful));
}

#[test]
fn all_files_policy_patches_every_file() {
    let response = "### pkg/calc.py\n<<<<<<< SEARCH\ndef add(a, b):\n    return a - b\n=======\ndef add(a, b):\n    return a + b\n>>>>>>> REPLACE\n### src/Counter.java\n<<<<<<< SEARCH\n    static int LIMIT = 5;\n=======\n    static int LIMIT = 10;\n>>>>>>> REPLACE\n";
    let record = session(EditSyntax::SearchReplace)
        .with_policy(FilePolicy::AllFiles)
        .run(response);

    assert!(record.is_accepted());
    let paths: Vec<_> = record.new_contents.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["pkg/calc.py", "src/Counter.java"]);
    assert!(record.raw_model_patch.contains("+++ b/src/Counter.java"));
}
