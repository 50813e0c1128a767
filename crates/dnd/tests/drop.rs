use block_editor_core::{
    Document, Editor, Node, PluginRegistry, Point, Region, Selection, ViewNode, ViewTree,
    serialize_document,
};
use block_editor_dnd::{
    DndController, DragPayload, DropLocation, DropOutcome, DropRejection, RowResolver, SNIPPET_KEY,
    Snippet, SnippetCatalog,
};

const ROW: f32 = 10.0;

fn rows() -> RowResolver {
    RowResolver::new(ROW)
}

/// Start of the given textblock row.
fn before_row(row: usize) -> DropLocation {
    DropLocation::new(-1.0, row as f32 * ROW + ROW / 2.0)
}

/// End of the given textblock row.
fn after_row(row: usize) -> DropLocation {
    DropLocation::new(5.0, row as f32 * ROW + ROW / 2.0)
}

fn editor(markup: &str) -> Editor {
    Editor::from_document(block_editor_core::parse_document(markup).unwrap()).unwrap()
}

fn start_snippet(dnd: &mut DndController, id: &str) {
    let catalog = SnippetCatalog::default();
    dnd.on_snippet_drag_start(catalog.get(id).unwrap());
}

#[test]
fn snippet_dropped_at_block_start_goes_before_it() {
    let mut editor = editor("<p>a</p><p>b</p>");
    let mut dnd = DndController::new();
    start_snippet(&mut dnd, "heading");

    let outcome = dnd.on_drop(&mut editor, before_row(0), &rows());
    assert_eq!(outcome, DropOutcome::Inserted { at: vec![0], count: 1 });
    assert_eq!(
        serialize_document(editor.doc()),
        "<h2>Heading</h2><p>a</p><p>b</p>"
    );
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 0], 7))
    );
}

#[test]
fn snippet_dropped_elsewhere_goes_after_the_block() {
    let mut editor = editor("<p>a</p><p>b</p>");
    let mut dnd = DndController::new();
    start_snippet(&mut dnd, "bulletList");

    let outcome = dnd.on_drop(&mut editor, after_row(0), &rows());
    assert_eq!(outcome, DropOutcome::Inserted { at: vec![1], count: 1 });
    assert_eq!(
        serialize_document(editor.doc()),
        "<p>a</p><ul><li><p>List item</p></li></ul><p>b</p>"
    );
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![1, 0, 0, 0], 9))
    );
}

#[test]
fn unresolvable_drop_changes_nothing() {
    let mut editor = editor("<p>a</p><p>b</p>");
    let before = serialize_document(editor.doc());
    let mut dnd = DndController::new();
    start_snippet(&mut dnd, "paragraph");

    let outcome = dnd.on_drop(&mut editor, DropLocation::new(0.0, 500.0), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Rejected(DropRejection::UnresolvableTarget)
    );
    assert_eq!(serialize_document(editor.doc()), before);
    assert!(dnd.payload().is_none());
}

#[test]
fn drop_and_drag_end_clear_the_payload() {
    let mut editor = editor("<p>a</p>");
    let mut dnd = DndController::new();

    start_snippet(&mut dnd, "paragraph");
    assert_eq!(
        dnd.payload(),
        Some(&DragPayload::Data {
            key: SNIPPET_KEY.to_string(),
            value: "<p>Paragraph</p>".to_string(),
        })
    );
    dnd.on_drag_end();
    assert!(dnd.payload().is_none());

    assert_eq!(
        dnd.on_drop(&mut editor, after_row(0), &rows()),
        DropOutcome::Rejected(DropRejection::NoPayload)
    );

    dnd.set_data("text/plain", "hello");
    let outcome = dnd.on_drop(&mut editor, after_row(0), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Rejected(DropRejection::UnknownKey("text/plain".to_string()))
    );
    assert!(dnd.payload().is_none());
    assert_eq!(serialize_document(editor.doc()), "<p>a</p>");
}

#[test]
fn snippet_of_unknown_kind_has_no_accepting_parent() {
    let doc = Document::new(vec![Node::paragraph("a")]);
    let mut editor = Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 0], 0)),
        PluginRegistry::core(),
    )
    .unwrap();
    let mut dnd = DndController::new();
    start_snippet(&mut dnd, "heading");

    let outcome = dnd.on_drop(&mut editor, after_row(0), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Rejected(DropRejection::NoAcceptingParent)
    );
    assert_eq!(serialize_document(editor.doc()), "<p>a</p>");
}

#[test]
fn malformed_snippet_is_rejected() {
    let mut editor = editor("<p>a</p>");
    let mut dnd = DndController::new();
    dnd.on_snippet_drag_start(&Snippet::new("broken", r#"<p class="x>oops</p>"#));

    let outcome = dnd.on_drop(&mut editor, after_row(0), &rows());
    assert!(matches!(
        outcome,
        DropOutcome::Rejected(DropRejection::MalformedPayload(_))
    ));
    assert_eq!(serialize_document(editor.doc()), "<p>a</p>");

    dnd.on_snippet_drag_start(&Snippet::new("blank", "   "));
    assert_eq!(
        dnd.on_drop(&mut editor, after_row(0), &rows()),
        DropOutcome::Rejected(DropRejection::EmptyPayload)
    );
}

fn handle_of(view: &ViewTree, node: &[usize]) -> Vec<usize> {
    view.drag_handles()
        .into_iter()
        .find(|(_, owner)| owner.as_slice() == node)
        .map(|(view_path, _)| view_path)
        .unwrap()
}

const DRAGGABLE: &str =
    r#"<p>a</p><p>b</p><div data-type="draggable-item"><p>first</p><p>second</p></div><p>c</p>"#;

#[test]
fn draggable_item_moves_by_its_handle() {
    let mut editor = editor(DRAGGABLE);
    let view = ViewTree::render(editor.doc());
    let handle = handle_of(&view, &[2]);
    assert_eq!(handle, vec![2, 0]);

    let mut dnd = DndController::new();
    assert_eq!(dnd.on_handle_drag_start(&view, &handle), Some(vec![2]));
    assert_eq!(dnd.payload(), Some(&DragPayload::Node { path: vec![2] }));

    let outcome = dnd.on_drop(&mut editor, before_row(0), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            from: vec![2],
            to: vec![0],
        }
    );
    assert_eq!(
        serialize_document(editor.doc()),
        r#"<div data-type="draggable-item"><p>first</p><p>second</p></div><p>a</p><p>b</p><p>c</p>"#
    );
}

#[test]
fn draggable_item_moves_to_the_end() {
    let mut editor = editor(DRAGGABLE);
    let view = ViewTree::render(editor.doc());
    let mut dnd = DndController::new();
    dnd.on_handle_drag_start(&view, &handle_of(&view, &[2]));

    // Rows: a, b, first, second, c.
    let outcome = dnd.on_drop(&mut editor, after_row(4), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            from: vec![2],
            to: vec![3],
        }
    );
    assert_eq!(
        serialize_document(editor.doc()),
        r#"<p>a</p><p>b</p><p>c</p><div data-type="draggable-item"><p>first</p><p>second</p></div>"#
    );
}

#[test]
fn content_region_is_not_a_drag_source() {
    let editor = editor(DRAGGABLE);
    let view = ViewTree::render(editor.doc());
    let ViewNode::Element(item) = &view.roots[2] else {
        panic!("draggable item should render as an element");
    };
    assert!(item.has_class("draggable-item"));

    let content = view.hit(&[2, 1, 0]).unwrap();
    assert_eq!(content.node, vec![2, 0]);
    assert_eq!(content.region, Some((Region::Content, vec![2])));

    let mut dnd = DndController::new();
    assert_eq!(dnd.on_handle_drag_start(&view, &[2, 1, 0]), None);
    assert_eq!(dnd.on_handle_drag_start(&view, &[0]), None);
    assert!(dnd.payload().is_none());
}

#[test]
fn dropping_a_node_into_itself_is_rejected() {
    let mut editor = editor(DRAGGABLE);
    let before = serialize_document(editor.doc());
    let view = ViewTree::render(editor.doc());
    let mut dnd = DndController::new();
    dnd.on_handle_drag_start(&view, &handle_of(&view, &[2]));

    let outcome = dnd.on_drop(&mut editor, after_row(2), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Rejected(DropRejection::IntoOwnSubtree)
    );
    assert_eq!(serialize_document(editor.doc()), before);
}

#[test]
fn catalog_reads_json_with_content_alias() {
    let catalog: SnippetCatalog = serde_json::from_value(serde_json::json!([
        { "id": "quote", "content": "<p>“quoted”</p>" },
        { "id": "rule", "fragment": "<hr>" },
    ]))
    .unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("quote").unwrap().fragment, "<p>“quoted”</p>");
    assert_eq!(catalog.get("rule").unwrap().fragment, "<hr>");
    assert!(catalog.get("heading").is_none());
    assert_eq!(SnippetCatalog::default().len(), 4);
}

const LIST: &str = "<p>a</p><ul><li><p>x</p></li></ul><p>b</p>";

#[test]
fn any_block_moves_from_the_global_handle() {
    // Rows: a, x, b.
    let mut editor = editor(LIST);
    let mut dnd = DndController::new();
    dnd.on_block_drag_start(&editor, vec![2]).unwrap();
    assert_eq!(dnd.payload(), Some(&DragPayload::Node { path: vec![2] }));

    let outcome = dnd.on_drop(&mut editor, before_row(0), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            from: vec![2],
            to: vec![0],
        }
    );
    assert_eq!(
        serialize_document(editor.doc()),
        "<p>b</p><p>a</p><ul><li><p>x</p></li></ul>"
    );
}

#[test]
fn list_moves_below_the_following_paragraph() {
    let mut editor = editor(LIST);
    let mut dnd = DndController::new();
    dnd.on_block_drag_start(&editor, vec![1]).unwrap();

    let outcome = dnd.on_drop(&mut editor, after_row(2), &rows());
    assert_eq!(
        outcome,
        DropOutcome::Moved {
            from: vec![1],
            to: vec![2],
        }
    );
    assert_eq!(
        serialize_document(editor.doc()),
        "<p>a</p><p>b</p><ul><li><p>x</p></li></ul>"
    );
}

#[test]
fn only_blocks_can_be_picked_up() {
    let editor = editor(LIST);
    let mut dnd = DndController::new();
    assert_eq!(
        dnd.on_block_drag_start(&editor, vec![1, 0]),
        Err(DropRejection::NotABlock(vec![1, 0]))
    );
    assert_eq!(
        dnd.on_block_drag_start(&editor, vec![0, 0]),
        Err(DropRejection::NotABlock(vec![0, 0]))
    );
    assert_eq!(
        dnd.on_block_drag_start(&editor, vec![9]),
        Err(DropRejection::MissingNode(vec![9]))
    );
    assert!(dnd.payload().is_none());

    // A paragraph nested in a list item is still a block.
    dnd.on_block_drag_start(&editor, vec![1, 0, 0]).unwrap();
    assert_eq!(dnd.payload(), Some(&DragPayload::Node { path: vec![1, 0, 0] }));
}
