use block_editor_core::{
    ApplyError, AttrPatch, Document, Editor, Node, NodeKind, Op, Point, SchemaViolation, Selection,
    Transaction, serialize_document, validate_document,
};
use proptest::prelude::*;

fn sample_doc() -> Document {
    Document::new(vec![
        Node::heading(1, "Title"),
        Node::paragraph("hello world"),
        Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph("one")]),
            Node::list_item(vec![Node::paragraph("two")]),
        ]),
        Node::draggable_item(vec![Node::paragraph("first"), Node::paragraph("second")]),
        Node::element(
            NodeKind::Paragraph,
            vec![Node::text("hi "), Node::mention("Ann", "a1"), Node::text("")],
        ),
    ])
}

fn sample_editor() -> Editor {
    Editor::from_document(sample_doc()).unwrap()
}

fn assert_rejected(editor: &mut Editor, tx: Transaction) -> ApplyError {
    let doc = editor.doc().clone();
    let selection = editor.selection().clone();
    let err = editor.apply(tx).unwrap_err();
    assert_eq!(editor.doc(), &doc);
    assert_eq!(editor.selection(), &selection);
    err
}

#[test]
fn disallowed_child_is_rejected() {
    let mut editor = sample_editor();
    let tx = Transaction::builder()
        .insert_node(vec![2, 0], Node::paragraph("not an item"))
        .build();
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(
        err,
        ApplyError::Schema(SchemaViolation::DisallowedChild { .. })
    ));
}

#[test]
fn removing_every_list_item_is_rejected_not_repaired() {
    let mut editor = sample_editor();
    let tx = Transaction::builder()
        .remove_node(vec![2, 1])
        .remove_node(vec![2, 0])
        .build();
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(
        err,
        ApplyError::Schema(SchemaViolation::EmptyContent { .. })
    ));
}

#[test]
fn nothing_can_be_placed_inside_a_mention() {
    let mut editor = sample_editor();
    let tx = Transaction::builder()
        .insert_node(vec![4, 1, 0], Node::text("x"))
        .build();
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(
        err,
        ApplyError::Schema(SchemaViolation::InsideAtomic { .. })
    ));
}

#[test]
fn invalid_attribute_values_are_rejected() {
    let mut editor = sample_editor();
    let tx = Transaction::builder()
        .set_attrs(vec![1], AttrPatch::set("textAlign", "diagonal"))
        .build();
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(
        err,
        ApplyError::Schema(SchemaViolation::InvalidAttr { .. })
    ));
}

#[test]
fn emptying_the_document_is_rejected() {
    let mut editor = Editor::with_block_plugins();
    let tx = Transaction::builder().remove_node(vec![0]).build();
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(err, ApplyError::Schema(SchemaViolation::EmptyDocument)));
}

#[test]
fn a_failing_op_discards_earlier_ops_of_the_same_transaction() {
    let mut editor = sample_editor();
    let tx = Transaction::builder()
        .insert_text(vec![1, 0], 0, "changed ")
        .remove_node(vec![99])
        .build();
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(err, ApplyError::InvalidPath(_)));
}

#[test]
fn preview_does_not_commit() {
    let editor = sample_editor();
    let tx = Transaction::builder()
        .insert_text(vec![1, 0], 5, ",")
        .build();
    let preview = editor.preview_transaction(&tx).unwrap();
    assert_eq!(preview.doc.children[1].text_content(), "hello, world");
    assert_eq!(editor.doc().children[1].text_content(), "hello world");
}

#[test]
fn moving_a_draggable_item_keeps_its_children_in_order() {
    let mut editor = sample_editor();
    editor.set_selection(Selection::collapsed(Point::new(vec![3, 1, 0], 2)));

    let tx = Transaction::builder()
        .move_node(vec![3], vec![0])
        .source("test:move")
        .build();
    editor.apply(tx).unwrap();

    let kinds: Vec<_> = editor.doc().children.iter().map(Node::type_name).collect();
    assert_eq!(
        kinds,
        vec!["draggableItem", "heading", "paragraph", "bulletList", "paragraph"]
    );
    let texts: Vec<_> = editor.doc().children[0]
        .children()
        .iter()
        .map(Node::text_content)
        .collect();
    assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 1, 0], 2));
    assert_eq!(
        serialize_document(editor.doc()).matches("draggable-item").count(),
        1
    );
}

#[test]
fn moving_into_an_atomic_node_is_rejected() {
    let mut editor = sample_editor();
    let tx = Transaction::builder()
        .move_node(vec![0], vec![3, 1, 0])
        .build();
    // After removing [0] the mention paragraph sits at [3]; its [1] is the mention.
    let err = assert_rejected(&mut editor, tx);
    assert!(matches!(
        err,
        ApplyError::Schema(SchemaViolation::InsideAtomic { .. })
    ));
}

fn path_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 0..5)
}

fn node_strategy() -> impl Strategy<Value = Node> {
    prop_oneof![
        Just(Node::paragraph("p")),
        Just(Node::text("t")),
        Just(Node::mention("Bob", "b1")),
        Just(Node::image("a.png")),
        Just(Node::horizontal_rule()),
        Just(Node::list_item(vec![Node::paragraph("li")])),
        Just(Node::element(NodeKind::BulletList, Vec::new())),
        Just(Node::element(NodeKind::TableRow, Vec::new())),
        Just(Node::draggable_item(vec![Node::paragraph("d")])),
        Just(Node::heading(2, "h")),
    ]
}

fn patch_strategy() -> impl Strategy<Value = AttrPatch> {
    prop_oneof![
        Just(AttrPatch::set("level", 9)),
        Just(AttrPatch::set("level", 2)),
        Just(AttrPatch::remove("label")),
        Just(AttrPatch::set("textAlign", "center")),
        Just(AttrPatch::set("backgroundColor", "not a color")),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (path_strategy(), 0usize..8, "[a-z@ ]{0,3}")
            .prop_map(|(path, offset, text)| Op::InsertText { path, offset, text }),
        (path_strategy(), 0usize..8, 0usize..8).prop_map(|(path, a, b)| Op::RemoveText {
            path,
            range: a.min(b)..a.max(b),
        }),
        (path_strategy(), node_strategy()).prop_map(|(path, node)| Op::InsertNode { path, node }),
        path_strategy().prop_map(|path| Op::RemoveNode { path }),
        (path_strategy(), path_strategy()).prop_map(|(path, to)| Op::MoveNode { path, to }),
        (path_strategy(), patch_strategy()).prop_map(|(path, patch)| Op::SetNodeAttrs { path, patch }),
    ]
}

proptest! {
    #[test]
    fn apply_yields_a_valid_document_or_changes_nothing(
        batches in prop::collection::vec(prop::collection::vec(op_strategy(), 1..4), 1..6)
    ) {
        let mut editor = sample_editor();
        for ops in batches {
            let doc = editor.doc().clone();
            let selection = editor.selection().clone();
            match editor.apply(Transaction::new(ops)) {
                Ok(()) => {
                    prop_assert!(validate_document(editor.doc(), editor.registry()).is_ok());
                }
                Err(_) => {
                    prop_assert_eq!(editor.doc(), &doc);
                    prop_assert_eq!(editor.selection(), &selection);
                }
            }
        }
    }
}
