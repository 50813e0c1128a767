use block_editor_core::{
    Document, Editor, MarkKind, Marks, Node, PluginRegistry, Point, Selection, active_marks,
};
use serde_json::json;

fn leaves(editor: &Editor, block: usize) -> Vec<(String, Marks)> {
    editor.doc().children[block]
        .children()
        .iter()
        .map(|node| match node {
            Node::Text(t) => (t.text.clone(), t.marks),
            other => (other.type_name().to_string(), Marks::default()),
        })
        .collect()
}

fn bold() -> Marks {
    Marks::default().with(MarkKind::Bold, true)
}

#[test]
fn toggle_bold_only_affects_selection_range() {
    let doc = Document::new(vec![Node::paragraph("abcde")]);
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 1),
        focus: Point::new(vec![0, 0], 3),
    };
    let mut editor = Editor::new(doc, selection, PluginRegistry::blocks()).unwrap();

    editor
        .run_command("marks.toggle", Some(json!({ "mark": "bold" })))
        .unwrap();

    assert_eq!(
        leaves(&editor, 0),
        vec![
            ("a".to_string(), Marks::default()),
            ("bc".to_string(), bold()),
            ("de".to_string(), Marks::default()),
        ]
    );
    assert!(editor.is_active("marks.toggle", Some(json!({ "mark": "bold" }))));
    assert!(!editor.is_active("marks.toggle", Some(json!({ "mark": "italic" }))));

    editor
        .run_command("marks.toggle", Some(json!({ "mark": "bold" })))
        .unwrap();
    assert_eq!(leaves(&editor, 0), vec![("abcde".to_string(), Marks::default())]);
}

#[test]
fn toggle_across_blocks_marks_both_partial_ranges() {
    let doc = Document::new(vec![Node::paragraph("one"), Node::paragraph("two")]);
    let selection = Selection {
        anchor: Point::new(vec![1, 0], 1),
        focus: Point::new(vec![0, 0], 2),
    };
    let mut editor = Editor::new(doc, selection, PluginRegistry::blocks()).unwrap();

    editor
        .run_command("marks.toggle", Some(json!({ "mark": "italic" })))
        .unwrap();

    let italic = Marks::default().with(MarkKind::Italic, true);
    assert_eq!(
        leaves(&editor, 0),
        vec![("on".to_string(), Marks::default()), ("e".to_string(), italic)]
    );
    assert_eq!(
        leaves(&editor, 1),
        vec![("t".to_string(), italic), ("wo".to_string(), Marks::default())]
    );
    assert_eq!(editor.selection().anchor, Point::new(vec![1, 0], 1));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 2));
}

#[test]
fn caret_toggle_applies_to_the_next_typed_text() {
    let mut editor = Editor::with_block_plugins();
    editor.insert_text("ab").unwrap();

    editor
        .run_command("marks.toggle", Some(json!({ "mark": "bold" })))
        .unwrap();
    assert_eq!(leaves(&editor, 0), vec![("ab".to_string(), Marks::default())]);
    assert!(active_marks(&editor).bold);
    assert_eq!(
        editor.run_query_json("marks.active", None).unwrap()["bold"],
        json!(true)
    );

    editor.insert_text("cd").unwrap();
    assert_eq!(
        leaves(&editor, 0),
        vec![("ab".to_string(), Marks::default()), ("cd".to_string(), bold())]
    );
    assert_eq!(editor.selection().focus, Point::new(vec![0, 1], 2));
}

#[test]
fn moving_the_caret_clears_stored_marks() {
    let mut editor = Editor::with_block_plugins();
    editor.insert_text("ab").unwrap();
    editor
        .run_command("marks.toggle", Some(json!({ "mark": "underline" })))
        .unwrap();
    assert!(editor.stored_marks().is_some());

    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 1)));
    assert_eq!(editor.stored_marks(), None);
    assert!(!editor.is_active("marks.toggle", Some(json!({ "mark": "underline" }))));
}

#[test]
fn unknown_mark_is_an_error() {
    let mut editor = Editor::with_block_plugins();
    assert!(editor
        .run_command("marks.toggle", Some(json!({ "mark": "blink" })))
        .is_err());
    assert!(!editor.can("marks.toggle", None));
}
