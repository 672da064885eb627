use untangle_core::align::{flatten, ChangedLine, Label, LineAligner};
use untangle_core::api::{Diff, Group, GroundTruthRow, LineKey};
use untangle_core::clean::DiffCleaner;
use untangle_core::evaluation::CommitDiffs;

fn parse(text: &str) -> Diff {
    Diff::parse(text).expect("valid diff")
}

fn row(source: Option<u32>, target: Option<u32>, group: Group) -> GroundTruthRow {
    GroundTruthRow::new(LineKey::new("src/Foo.java", source, target), group)
}

#[test]
fn unrelated_addition_is_other_and_fix_is_fix() {
    let original = parse(
        "--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,2 +1,4 @@\n A\n+~\n+E\n B\n",
    );
    let fix = parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,2 +1,3 @@\n A\n+E\n B\n");
    let nonfix = parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,1 +1,2 @@\n A\n+~\n");

    let rows = LineAligner::new().classify(&original, &fix, &nonfix);
    assert_eq!(
        rows,
        vec![
            row(None, Some(2), Group::Other),
            row(None, Some(3), Group::Fix),
        ]
    );
}

#[test]
fn cancelling_pair_marks_next_fix_line_as_tangled() {
    let original = parse(
        "--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,2 +1,2 @@\n-a = 3;\n+b = 4;\n B\n",
    );
    let nonfix = parse(
        "--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,2 +1,2 @@\n-a = 3;\n+b = 3;\n B\n",
    );
    let fix = parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,1 +1,1 @@\n-b = 3;\n+b = 4;\n");

    let rows = LineAligner::new().classify(&original, &fix, &nonfix);
    assert_eq!(
        rows,
        vec![
            row(Some(1), None, Group::Other),
            row(None, Some(1), Group::Fix),
            row(None, Some(1), Group::Other),
        ]
    );
}

#[test]
fn line_in_both_fronts_is_tangled() {
    let original = parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,1 +1,2 @@\n A\n+shared();\n");
    let decomposition =
        parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,1 +1,2 @@\n A\n+shared();\n");

    let aligned = LineAligner::new().align(&original, &decomposition, &decomposition);
    assert_eq!(aligned.len(), 1);
    assert_eq!(aligned[0].label, Label::Both);
}

#[test]
fn lines_deeper_in_a_queue_are_found_by_scanning() {
    let original = parse(
        "--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,0 +1,3 @@\n+first();\n+log();\n+log();\n",
    );
    let fix = parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,0 +1,2 @@\n+log();\n+first();\n");
    let nonfix =
        parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,0 +1,2 @@\n+trace();\n+log();\n");

    let labels: Vec<Label> = LineAligner::new()
        .align(&original, &fix, &nonfix)
        .into_iter()
        .map(|line| line.label)
        .collect();
    // `first();` sits behind `log();` in the fix queue and the second
    // `log();` behind `trace();` in the non-fix queue.
    assert_eq!(labels, vec![Label::Fix, Label::Fix, Label::Other]);
}

#[test]
fn every_cleaned_changed_line_is_labeled() {
    let original = parse(concat!(
        "diff --git a/src/Foo.java b/src/Foo.java\n",
        "index 1111111..2222222 100644\n",
        "--- a/src/Foo.java\n",
        "+++ b/src/Foo.java\n",
        "@@ -1,5 +1,6 @@\n",
        " class Foo {\n",
        "-  int a = 3;\n",
        "+  int a = 4;\n",
        "+  // explain\n",
        "   void run() {\n",
        "-    old();\n",
        "+    renamed();\n",
        "   }\n",
    ));
    let fix = parse(concat!(
        "--- a/src/Foo.java\n",
        "+++ b/src/Foo.java\n",
        "@@ -1,2 +1,2 @@\n",
        " class Foo {\n",
        "-  int a = 3;\n",
        "+  int a = 4;\n",
    ));
    let nonfix = parse(concat!(
        "--- a/src/Foo.java\n",
        "+++ b/src/Foo.java\n",
        "@@ -3,2 +3,2 @@\n",
        "   void run() {\n",
        "-    old();\n",
        "+    renamed();\n",
    ));

    let diffs = CommitDiffs {
        original,
        fix,
        nonfix,
    }
    .cleaned(&DiffCleaner::default());
    let rows = diffs.ground_truth();

    assert_eq!(rows.len(), diffs.original.changed_line_count());
    assert_eq!(
        rows.iter().filter(|row| row.group == Group::Fix).count(),
        2
    );
    assert!(rows.contains(&row(Some(4), None, Group::Other)));
    assert!(rows.contains(&row(None, Some(5), Group::Other)));
}

#[test]
fn duplicated_lines_across_hunks_resolve_in_order() {
    let original = parse(concat!(
        "--- a/src/Foo.java\n",
        "+++ b/src/Foo.java\n",
        "@@ -1,4 +1,14 @@\n",
        " A\n",
        "+~~\n",
        "+~\n",
        "+E\n",
        "+//\n",
        "+~~\n",
        "+F\n",
        " B\n",
        " C\n",
        "+E\n",
        "+F\n",
        "+G\n",
        " D\n",
        "+H\n",
    ));
    let fix = parse(concat!(
        "--- a/src/Foo.java\n",
        "+++ b/src/Foo.java\n",
        "@@ -1,1 +1,4 @@\n",
        " A\n",
        "+~~\n",
        "+~\n",
        "+E\n",
        "@@ -10,0 +10,1 @@\n",
        "+E\n",
    ));
    let nonfix = parse(concat!(
        "--- a/src/Foo.java\n",
        "+++ b/src/Foo.java\n",
        "@@ -1,2 +1,5 @@\n",
        "+//\n",
        "+~~\n",
        "+F\n",
        " B\n",
        " C\n",
        "@@ -1,1 +7,4 @@\n",
        "+F\n",
        "+G\n",
        " D\n",
        "+H\n",
    ));

    let rows = LineAligner::new().classify(&original, &fix, &nonfix);
    let expected: Vec<GroundTruthRow> = [
        (2, Group::Fix),
        (3, Group::Fix),
        (4, Group::Fix),
        (5, Group::Other),
        (6, Group::Other),
        (7, Group::Other),
        (10, Group::Fix),
        (11, Group::Other),
        (12, Group::Other),
        (14, Group::Other),
    ]
    .into_iter()
    .map(|(target, group)| row(None, Some(target), group))
    .collect();
    assert_eq!(rows, expected);
}

#[test]
fn rendered_cleaned_diff_keeps_line_numbers() {
    let diffs = CommitDiffs {
        original: parse(
            "--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,3 +1,3 @@\n a();\n+// note\n-x();\n b();\n",
        ),
        fix: parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,2 +1,1 @@\n a();\n-x();\n"),
        nonfix: parse("--- a/src/Foo.java\n+++ b/src/Foo.java\n@@ -1,1 +1,2 @@\n a();\n+// note\n"),
    }
    .cleaned(&DiffCleaner::default());

    let rendered = diffs.original.to_string();
    assert!(rendered.contains("@@ -1,3 +1,3 @@\n a();\n+\n-x();\n b();\n"));

    let keys = |diff: &Diff| -> Vec<LineKey> { flatten(diff).iter().map(ChangedLine::key).collect() };
    let reparsed = parse(&rendered);
    assert_eq!(keys(&reparsed), keys(&diffs.original));
    assert_eq!(keys(&reparsed), vec![LineKey::new("src/Foo.java", Some(2), None)]);
    assert_eq!(
        keys(&DiffCleaner::default().clean(&reparsed)),
        keys(&diffs.original)
    );

    let expected = vec![row(Some(2), None, Group::Fix)];
    assert_eq!(diffs.ground_truth(), expected);
    let raw = CommitDiffs {
        original: reparsed,
        ..diffs
    };
    assert_eq!(raw.ground_truth(), expected);
}
