use locpatch::{compress_skeleton, RepositoryIndex};

#[test]
fn java_class_keeps_signatures_and_fields_only() {
    let source = "package demo;\n\npublic class Registry {\n    static final int MAX = 8;\n\n    public void register(String name) {\n        names.add(name);\n        count++;\n    }\n\n    public int size() {\n        return count;\n    }\n}\n";
    let repo = RepositoryIndex::from_sources([("Registry.java", source)]).unwrap();

    let skeleton = compress_skeleton(&repo, "Registry.java").unwrap();
    let stubs: Vec<_> = skeleton
        .lines()
        .filter(|line| line.starts_with("    "))
        .collect();
    assert_eq!(
        stubs,
        vec![
            "    MAX = ...;",
            "    register() { ... }",
            "    size() { ... }",
        ]
    );
    assert!(!skeleton.contains("names.add"));
    assert!(!skeleton.contains("return count"));
}

#[test]
fn broken_or_unknown_files_are_passed_through_or_absent() {
    let broken = "def f(:\n    pass\n";
    let repo = RepositoryIndex::from_sources([("bad.py", broken), ("README.md", "# hi\n")]).unwrap();

    assert_eq!(compress_skeleton(&repo, "bad.py").as_deref(), Some(broken));
    assert_eq!(compress_skeleton(&repo, "README.md"), None);
    assert_eq!(compress_skeleton(&repo, "missing.py"), None);
}
