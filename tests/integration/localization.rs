use super::{fixture_repo, foo_module};
use indexmap::IndexMap;
use locpatch::locate::parse_location_block;
use locpatch::{
    render_context, resolve_locations, LineInterval, LocationSpec, RenderOptions,
};

#[test]
fn class_and_method_refs_resolve_to_their_spans() {
    let repo = fixture_repo();
    let foo = repo.get("pkg/foo.py").unwrap();
    assert_eq!(foo.line_count(), 50);

    assert_eq!(
        resolve_locations(&repo, "pkg/foo.py", &[LocationSpec::ClassRef("Foo".into())], 0, true),
        vec![LineInterval::new(10, 30)]
    );
    assert_eq!(
        resolve_locations(
            &repo,
            "pkg/foo.py",
            &[LocationSpec::FunctionRef("Foo.bar".into())],
            0,
            true
        ),
        vec![LineInterval::new(15, 20)]
    );
}

#[test]
fn unknown_files_and_names_resolve_to_nothing() {
    let repo = fixture_repo();
    let specs = [LocationSpec::FunctionRef("Foo.bar".into())];
    assert!(resolve_locations(&repo, "pkg/missing.py", &specs, 3, true).is_empty());
    assert!(resolve_locations(&repo, "docs/notes.md", &specs, 3, true).is_empty());
    assert!(resolve_locations(
        &repo,
        "pkg/foo.py",
        &[LocationSpec::ClassRef("Bar".into())],
        3,
        true
    )
    .is_empty());
}

#[test]
fn merged_output_never_overlaps() {
    let repo = fixture_repo();
    let specs = [
        LocationSpec::FunctionRef("Foo.bar".into()),
        LocationSpec::LineNumber(22),
        LocationSpec::LineNumber(40),
        LocationSpec::Raw("w45 = 45".into()),
    ];
    let intervals = resolve_locations(&repo, "pkg/foo.py", &specs, 2, true);
    assert_eq!(
        intervals,
        vec![LineInterval::new(13, 24), LineInterval::new(38, 47)]
    );
    for pair in intervals.windows(2) {
        assert!(pair[0].end + 1 < pair[1].start);
    }
}

#[test]
fn location_block_to_rendered_context() {
    let repo = fixture_repo();
    let block = parse_location_block(
        "pkg/calc.py\nfunction: sub\n\nsrc/Counter.java\nfunction: Counter.get\nvariable: LIMIT\n",
    );

    let mut intervals = IndexMap::new();
    for (path, specs) in &block {
        intervals.insert(
            path.clone(),
            resolve_locations(&repo, path, specs, 0, true),
        );
    }
    assert_eq!(intervals["pkg/calc.py"], vec![LineInterval::new(5, 6)]);
    assert_eq!(
        intervals["src/Counter.java"],
        vec![LineInterval::new(2, 2), LineInterval::new(9, 11)]
    );

    let options = RenderOptions {
        show_enclosing_scope_header: true,
        ..RenderOptions::default()
    };
    let contents = repo.contents();
    let rendered = render_context(&contents, &intervals, &options);
    assert_eq!(
        rendered.text,
        "### pkg/calc.py\n...\n5 def sub(a, b):\n6     return a - b\n\n\
### src/Counter.java\n 1 public class Counter {\n 2     static int LIMIT = 5;\n...\n 9     int get() {\n10         return n;\n11     }\n...\n"
    );
    assert_eq!(render_context(&contents, &intervals, &options), rendered);
}

#[test]
fn reindexing_a_file_leaves_the_original_snapshot_alone() {
    let repo = fixture_repo();
    let patched = foo_module().replace("    def bar(self):", "    def renamed(self):");
    let next = repo.with_file("pkg/foo.py", &patched).unwrap();

    assert!(repo.get("pkg/foo.py").unwrap().find_function("Foo.bar").is_some());
    let file = next.get("pkg/foo.py").unwrap();
    assert!(file.find_function("Foo.bar").is_none());
    assert_eq!(file.find_function("Foo.renamed").unwrap().start_line, 15);
}
