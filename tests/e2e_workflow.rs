//! End-to-end workflow: checkout on disk -> index -> locate -> render ->
//! model response -> validated patch -> write back -> re-index.

use indexmap::IndexMap;
use locpatch::locate::parse_location_block;
use locpatch::{
    build_index, render_context, resolve_locations, EditSyntax, RenderOptions, RepairSession,
};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

const SHAPES: &str = r#"import math


class Circle:
    def __init__(self, radius):
        self.radius = radius

    def area(self):
        return math.pi * self.radius


class Square:
    def __init__(self, side):
        self.side = side

    def area(self):
        return self.side * self.side
"#;

const MAIN: &str = r#"from shapes import Circle


def report(r):
    return Circle(r).area()
"#;

fn setup_checkout() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("geo")).unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join("geo/shapes.py"), SHAPES).unwrap();
    fs::write(dir.path().join("geo/main.py"), MAIN).unwrap();
    fs::write(dir.path().join(".git/config"), "[core]\n").unwrap();
    fs::write(dir.path().join("README.md"), "# geo\n").unwrap();
    dir
}

#[test]
fn localize_repair_and_reindex() {
    let dir = setup_checkout();

    // 1. Index
    let repo = build_index(dir.path()).unwrap();
    let indexed: Vec<_> = repo.files().into_iter().map(|(p, _)| p).collect();
    assert_eq!(indexed, vec!["geo/main.py", "geo/shapes.py"]);
    assert!(repo.contains("README.md"));
    assert!(!repo.contains(".git/config"));

    // 2. Locate
    let block = parse_location_block("geo/shapes.py\nfunction: Circle.area\n");
    let specs = &block["geo/shapes.py"];
    let intervals = resolve_locations(&repo, "geo/shapes.py", specs, 1, true);
    assert_eq!(intervals.len(), 1);
    assert_eq!((intervals[0].start, intervals[0].end), (7, 10));

    // 3. Render
    let mut wanted = IndexMap::new();
    wanted.insert("geo/shapes.py".to_string(), intervals);
    let options = RenderOptions {
        show_enclosing_scope_header: true,
        ..RenderOptions::default()
    };
    let context = render_context(&repo.contents(), &wanted, &options);
    assert!(context.text.contains(" 4 class Circle:\n"));
    assert!(context.text.contains(" 9         return math.pi * self.radius\n"));
    assert!(!context.text.contains("class Square"));

    // 4. Repair
    let response = "The area formula is missing a square.\n\n```python\n### geo/shapes.py\n<<<<<<< SEARCH\n        return math.pi * self.radius\n=======\n        return math.pi * self.radius ** 2\n>>>>>>> REPLACE\n```\n";
    let contents: HashMap<String, String> = block
        .keys()
        .map(|path| (path.clone(), repo.get(path).unwrap().text()))
        .collect();
    let record = RepairSession::new(contents, EditSyntax::SearchReplace).run(response);
    assert!(record.is_accepted(), "{:?}", record.reject_reason);
    assert!(record
        .model_patch
        .contains("+        return math.pi * self.radius ** 2\n"));

    // 5. Write back and re-index
    let (path, content) = &record.new_contents[0];
    fs::write(dir.path().join(path), content).unwrap();
    let reindexed = repo.with_file(path, content).unwrap();
    let from_disk = build_index(dir.path()).unwrap();
    assert_eq!(
        reindexed.get(path).unwrap().content_hash,
        from_disk.get(path).unwrap().content_hash
    );
    assert_ne!(
        repo.get(path).unwrap().content_hash,
        reindexed.get(path).unwrap().content_hash
    );
}

#[test]
fn unparsable_file_still_supports_line_locations() {
    let dir = setup_checkout();
    fs::write(dir.path().join("geo/broken.py"), "def f(:\n    return 1\n").unwrap();

    let repo = build_index(dir.path()).unwrap();
    let broken = repo.get("geo/broken.py").unwrap();
    assert!(!broken.syntax_valid);
    assert!(broken.classes.is_empty() && broken.top_level_functions.is_empty());

    let block = parse_location_block("geo/broken.py\nline: 2\nfunction: f\n");
    let intervals = resolve_locations(&repo, "geo/broken.py", &block["geo/broken.py"], 0, true);
    assert_eq!(intervals.len(), 1);
    assert_eq!((intervals[0].start, intervals[0].end), (2, 2));
}
