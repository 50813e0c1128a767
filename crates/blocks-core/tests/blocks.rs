use block_editor_core::{
    BlockType, Document, Editor, Node, NodeKind, Point, Selection, active_block_type, serialize_document,
};
use serde_json::json;

fn kinds(editor: &Editor) -> Vec<&'static str> {
    editor.doc().children.iter().map(Node::type_name).collect()
}

fn typed(text: &str) -> Editor {
    let mut editor = Editor::with_block_plugins();
    editor.insert_text(text).unwrap();
    editor
}

#[test]
fn heading_toggle_sets_level_and_back() {
    let mut editor = typed("Title");

    editor
        .run_command("heading.toggle", Some(json!({ "level": 2 })))
        .unwrap();
    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(block.kind, NodeKind::Heading);
    assert_eq!(block.attr_u64("level"), Some(2));
    assert_eq!(active_block_type(&editor), Some(BlockType::Heading(2)));
    assert_eq!(
        editor.run_query_json("block.active_type", None).unwrap(),
        json!({ "type": "heading", "level": 2, "list": null })
    );
    assert!(editor.is_active("heading.toggle", Some(json!({ "level": 2 }))));
    assert!(!editor.is_active("heading.toggle", Some(json!({ "level": 1 }))));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 5));

    editor
        .run_command("heading.toggle", Some(json!({ "level": 2 })))
        .unwrap();
    assert_eq!(kinds(&editor), vec!["paragraph"]);
    assert_eq!(editor.doc().text_content(), "Title");
}

#[test]
fn heading_level_outside_range_is_rejected() {
    let mut editor = typed("x");
    assert!(!editor.can("heading.toggle", Some(json!({ "level": 4 }))));
    assert!(editor
        .run_command("heading.toggle", Some(json!({ "level": 0 })))
        .is_err());
    assert_eq!(kinds(&editor), vec!["paragraph"]);
}

#[test]
fn set_type_switches_between_paragraph_and_heading() {
    let mut editor = typed("Body");
    editor
        .run_command("block.set_type", Some(json!({ "type": "heading", "level": 3 })))
        .unwrap();
    assert_eq!(active_block_type(&editor), Some(BlockType::Heading(3)));
    assert!(editor.is_active("block.set_type", Some(json!({ "type": "heading", "level": 3 }))));

    editor
        .run_command("block.set_type", Some(json!({ "type": "paragraph" })))
        .unwrap();
    assert_eq!(active_block_type(&editor), Some(BlockType::Paragraph));
    assert!(editor
        .run_command("block.set_type", Some(json!({ "type": "quote" })))
        .is_err());
}

#[test]
fn heading_levels_are_clamped_by_normalization() {
    let editor = Editor::from_document(Document::new(vec![
        Node::heading(7, "deep"),
        Node::element(NodeKind::Heading, vec![Node::text("none")]),
    ]))
    .unwrap();

    let levels: Vec<_> = editor
        .doc()
        .children
        .iter()
        .map(|node| match node {
            Node::Element(el) => el.attr_u64("level"),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![Some(3), Some(1)]);
}

#[test]
fn list_toggles_wrap_switch_and_unwrap() {
    let mut editor = typed("item");

    editor.run_command("list.toggle_bullet", None).unwrap();
    assert_eq!(kinds(&editor), vec!["bulletList"]);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0, 0, 0], 4));
    assert!(editor.is_active("list.toggle_bullet", None));
    assert_eq!(
        editor.run_query_json("block.active_type", None).unwrap()["list"],
        json!("bulletList")
    );

    editor.run_command("list.toggle_ordered", None).unwrap();
    assert_eq!(kinds(&editor), vec!["orderedList"]);
    assert!(!editor.is_active("list.toggle_bullet", None));
    assert!(editor.is_active("list.toggle_ordered", None));

    editor.run_command("list.toggle_ordered", None).unwrap();
    assert_eq!(kinds(&editor), vec!["paragraph"]);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 4));
}

#[test]
fn unwrapping_a_middle_item_splits_the_list() {
    let doc = Document::new(vec![Node::ordered_list(vec![
        Node::list_item(vec![Node::paragraph("a")]),
        Node::list_item(vec![Node::paragraph("b")]),
        Node::list_item(vec![Node::paragraph("c")]),
    ])]);
    let mut editor = Editor::from_document(doc).unwrap();
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 1)));

    editor.run_command("list.toggle_ordered", None).unwrap();
    assert_eq!(kinds(&editor), vec!["orderedList", "paragraph", "orderedList"]);
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 1));
    assert_eq!(
        serialize_document(editor.doc()),
        "<ol><li><p>a</p></li></ol><p>b</p><ol><li><p>c</p></li></ol>"
    );
}

#[test]
fn align_set_stores_non_default_values_only() {
    let mut editor = typed("Centered");

    editor
        .run_command("align.set", Some(json!({ "value": "center" })))
        .unwrap();
    assert_eq!(editor.run_query::<Option<String>>("align.active", None).unwrap().as_deref(), Some("center"));
    assert!(editor.is_active("align.set", Some(json!({ "value": "center" }))));
    assert_eq!(
        serialize_document(editor.doc()),
        r#"<p style="text-align: center">Centered</p>"#
    );

    editor
        .run_command("align.set", Some(json!({ "value": "left" })))
        .unwrap();
    assert_eq!(serialize_document(editor.doc()), "<p>Centered</p>");
    assert!(editor.is_active("align.set", Some(json!({ "value": "left" }))));

    assert!(!editor.can("align.set", Some(json!({ "value": "middle" }))));
}

#[test]
fn align_applies_to_every_selected_block() {
    let doc = Document::new(vec![Node::paragraph("one"), Node::heading(1, "two")]);
    let mut editor = Editor::from_document(doc).unwrap();
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 1),
        focus: Point::new(vec![1, 0], 2),
    });

    editor
        .run_command("align.set", Some(json!({ "value": "right" })))
        .unwrap();
    assert_eq!(
        serialize_document(editor.doc()),
        r#"<p style="text-align: right">one</p><h1 style="text-align: right">two</h1>"#
    );
}

#[test]
fn image_insert_adds_block_and_trailing_paragraph() {
    let mut editor = typed("before");
    editor
        .run_command("image.insert", Some(json!({ "src": "https://example.com/cat.png" })))
        .unwrap();

    assert_eq!(kinds(&editor), vec!["paragraph", "image", "paragraph"]);
    assert_eq!(editor.selection().focus, Point::new(vec![2, 0], 0));
    assert_eq!(
        serialize_document(editor.doc()),
        r#"<p>before</p><img src="https://example.com/cat.png"><p></p>"#
    );

    assert!(!editor.can("image.insert", Some(json!({ "src": "  " }))));
    assert!(editor.run_command("image.insert", None).is_err());
}

#[test]
fn horizontal_rule_insert() {
    let mut editor = typed("above");
    editor.run_command("horizontal_rule.insert", None).unwrap();
    assert_eq!(kinds(&editor), vec!["paragraph", "horizontalRule", "paragraph"]);
    assert_eq!(serialize_document(editor.doc()), "<p>above</p><hr><p></p>");
}

#[test]
fn mention_insert_places_caret_after_the_atomic_node() {
    let mut editor = typed("hi ");
    editor
        .run_command(
            "mention.insert",
            Some(json!({ "label": "Lea Thompson", "id": "lea" })),
        )
        .unwrap();

    let children = editor.doc().children[0].children();
    assert_eq!(children.len(), 3);
    assert!(children[1].is_atomic());
    assert_eq!(editor.selection().focus, Point::new(vec![0, 2], 0));
    assert_eq!(
        serialize_document(editor.doc()),
        r#"<p>hi <span class="mention" data-type="mention" data-id="lea" data-label="Lea Thompson">@Lea Thompson</span></p>"#
    );

    editor.insert_text(" there").unwrap();
    assert_eq!(editor.doc().text_content(), "hi @Lea Thompson there");
}

#[test]
fn mention_insert_replaces_the_selected_text() {
    let doc = Document::new(vec![Node::paragraph("hello world")]);
    let mut editor = Editor::from_document(doc).unwrap();
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 6),
        focus: Point::new(vec![0, 0], 11),
    });

    editor
        .run_command("mention.insert", Some(json!({ "label": "world" })))
        .unwrap();
    assert_eq!(editor.doc().text_content(), "hello @world");
    assert!(editor.run_command("mention.insert", None).is_err());
}
