use std::ops::Range;

use serde_json::{Value, json};

use crate::core::{Document, Editor, ElementNode, Node, NodeKind, Point, Selection, clamp_to_char_boundary};
use crate::marks::selected_block_ranges;
use crate::normalize::ClampHeadingLevels;
use crate::ops::{AttrPatch, Path, Transaction};
use crate::plugin::{
    BlockPlugin, CommandError, CommandSpec, NormalizePass, QueryError, QuerySpec, arg_str, arg_u64,
    child_path, focus_textblock_path, slot_after,
};
use crate::schema::{AttrRule, AttrSpec, ContentRule, NodeRole, NodeSpec, TEXT_ALIGNMENTS};

pub(crate) struct HeadingPlugin;

impl BlockPlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeKind::Heading, NodeRole::Block, ContentRule::Inline)
                .attr(AttrSpec::required("level", AttrRule::IntRange { min: 1, max: 3 }))
                .attr(AttrSpec::optional("textAlign", AttrRule::OneOf(TEXT_ALIGNMENTS))),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(ClampHeadingLevels)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("heading.toggle", "Toggle heading", |editor, args| {
                let level = level_arg(args)?;
                let target = if active_heading_level(editor) == Some(level) {
                    BlockType::Paragraph
                } else {
                    BlockType::Heading(level)
                };
                set_block_type(editor, target, "command:heading.toggle")
            })
            .description("Turn the active text block into a heading, or back into a paragraph.")
            .keywords(["heading", "title", "h1", "h2", "h3"])
            .args_example(json!({ "level": 2 }))
            .active(|editor, args| {
                level_arg(args).is_ok_and(|level| active_heading_level(editor) == Some(level))
            }),
            CommandSpec::new("block.set_type", "Set block type", |editor, args| {
                let target = block_type_arg(args)?;
                set_block_type(editor, target, "command:block.set_type")
            })
            .description("Set the active text block to a paragraph or a heading.")
            .keywords(["paragraph", "heading", "text"])
            .args_example(json!({ "type": "heading", "level": 1 }))
            .active(|editor, args| {
                block_type_arg(args).is_ok_and(|target| active_block_type(editor) == Some(target))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.active_type", |editor, _args| {
            let list = list_path_for_focus(editor)
                .and_then(|(list_path, _)| editor.doc().element(&list_path).map(|el| el.kind.name()));
            let value = match active_block_type(editor) {
                Some(BlockType::Heading(level)) => json!({ "type": "heading", "level": level, "list": list }),
                Some(BlockType::Paragraph) => json!({ "type": "paragraph", "list": list }),
                None => Value::Null,
            };
            Ok::<_, QueryError>(value)
        })]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading(u64),
}

fn level_arg(args: Option<&Value>) -> Result<u64, CommandError> {
    match arg_u64(args, "level") {
        Some(level @ 1..=3) => Ok(level),
        Some(level) => Err(CommandError::new(format!("Heading level out of range: {level}"))),
        None => Err(CommandError::new("Missing args.level")),
    }
}

fn block_type_arg(args: Option<&Value>) -> Result<BlockType, CommandError> {
    match arg_str(args, "type") {
        Some("paragraph") => Ok(BlockType::Paragraph),
        Some("heading") => level_arg(args).map(BlockType::Heading),
        Some(other) => Err(CommandError::new(format!("Unsupported block type: {other}"))),
        None => Err(CommandError::new("Missing args.type")),
    }
}

/// Type of the text block holding the caret.
pub fn active_block_type(editor: &Editor) -> Option<BlockType> {
    let path = focus_textblock_path(editor).ok()?;
    let el = editor.doc().element(&path)?;
    match el.kind {
        NodeKind::Heading => Some(BlockType::Heading(el.attr_u64("level").unwrap_or(1))),
        _ => Some(BlockType::Paragraph),
    }
}

fn active_heading_level(editor: &Editor) -> Option<u64> {
    match active_block_type(editor)? {
        BlockType::Heading(level) => Some(level),
        BlockType::Paragraph => None,
    }
}

fn set_block_type(
    editor: &Editor,
    target: BlockType,
    source: &'static str,
) -> Result<Transaction, CommandError> {
    let block_path = focus_textblock_path(editor)?;
    let Some(el) = editor.doc().element(&block_path) else {
        return Err(CommandError::new("No active block"));
    };

    let mut attrs = el.attrs.clone();
    let kind = match target {
        BlockType::Paragraph => {
            attrs.remove("level");
            NodeKind::Paragraph
        }
        BlockType::Heading(level) => {
            attrs.insert("level".to_string(), Value::from(level));
            NodeKind::Heading
        }
    };
    let next = Node::Element(ElementNode {
        kind,
        attrs,
        children: el.children.clone(),
    });

    Ok(Transaction::builder()
        .replace_node(block_path, next)
        .selection_after(editor.selection().clone())
        .source(source)
        .build())
}

pub(crate) struct ListPlugin;

impl BlockPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        let items = ContentRule::Only {
            kinds: &[NodeKind::ListItem],
            min: 1,
        };
        vec![
            NodeSpec::new(NodeKind::BulletList, NodeRole::Block, items.clone()),
            NodeSpec::new(NodeKind::OrderedList, NodeRole::Block, items),
            NodeSpec::new(NodeKind::ListItem, NodeRole::Structural, ContentRule::Blocks),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle_bullet", "Toggle bullet list", |editor, _args| {
                toggle_list(editor, NodeKind::BulletList)
            })
            .description("Wrap the active block in a bullet list, switch list kind, or unwrap.")
            .keywords(["list", "bullet", "unordered", "ul"])
            .active(|editor, _args| active_list_kind(editor) == Some(NodeKind::BulletList)),
            CommandSpec::new("list.toggle_ordered", "Toggle ordered list", |editor, _args| {
                toggle_list(editor, NodeKind::OrderedList)
            })
            .description("Wrap the active block in an ordered list, switch list kind, or unwrap.")
            .keywords(["list", "ordered", "numbered", "ol"])
            .active(|editor, _args| active_list_kind(editor) == Some(NodeKind::OrderedList)),
        ]
    }
}

/// `(list path, item index)` when the caret's textblock sits directly in a list item.
fn list_path_for_focus(editor: &Editor) -> Option<(Path, usize)> {
    let block_path = focus_textblock_path(editor).ok()?;
    let (_, item_path) = block_path.split_last()?;
    let item = editor.doc().element(item_path)?;
    if item.kind != NodeKind::ListItem {
        return None;
    }
    let (&item_ix, list_path) = item_path.split_last()?;
    Some((list_path.to_vec(), item_ix))
}

fn active_list_kind(editor: &Editor) -> Option<NodeKind> {
    let (list_path, _) = list_path_for_focus(editor)?;
    editor.doc().element(&list_path).map(|el| el.kind)
}

fn toggle_list(editor: &Editor, kind: NodeKind) -> Result<Transaction, CommandError> {
    let source = format!("command:list.toggle_{}", kind.name());
    let block_path = focus_textblock_path(editor)?;
    let focus = editor.selection().focus.clone();

    let Some((list_path, item_ix)) = list_path_for_focus(editor) else {
        // Plain textblock: wrap it in a new single-item list.
        let Some(block) = editor.doc().node(&block_path).cloned() else {
            return Err(CommandError::new("No active block"));
        };
        let list = Node::element(kind, vec![Node::list_item(vec![block])]);
        let mut caret = block_path.clone();
        caret.extend([0, 0]);
        caret.extend_from_slice(&focus.path[block_path.len()..]);
        return Ok(Transaction::builder()
            .replace_node(block_path, list)
            .selection_after(Selection::collapsed(Point::new(caret, focus.offset)))
            .source(source)
            .build());
    };

    let Some(list) = editor.doc().element(&list_path) else {
        return Err(CommandError::new("No active list"));
    };

    if list.kind != kind {
        let switched = Node::Element(ElementNode {
            kind,
            attrs: list.attrs.clone(),
            children: list.children.clone(),
        });
        return Ok(Transaction::builder()
            .replace_node(list_path, switched)
            .selection_after(editor.selection().clone())
            .source(source)
            .build());
    }

    // Same kind: lift the item's blocks out, splitting the list around them.
    let before = &list.children[..item_ix];
    let after = &list.children[item_ix + 1..];
    let lifted = list.children[item_ix].children().to_vec();

    let mut replacement = Vec::new();
    if !before.is_empty() {
        replacement.push(Node::element(kind, before.to_vec()));
    }
    let first_lifted = replacement.len();
    replacement.extend(lifted);
    if !after.is_empty() {
        replacement.push(Node::element(kind, after.to_vec()));
    }

    let (&list_ix, parent) = list_path
        .split_last()
        .ok_or_else(|| CommandError::new("List has no parent"))?;
    let mut tx = Transaction::builder().remove_node(list_path.clone());
    for (offset, node) in replacement.into_iter().enumerate() {
        tx = tx.insert_node(child_path(parent, list_ix + offset), node);
    }

    // focus.path = list_path ++ [item_ix, block_ix, ...rest]
    let depth = list_path.len();
    let mut caret = child_path(parent, list_ix + first_lifted + focus.path[depth + 1]);
    caret.extend_from_slice(&focus.path[depth + 2..]);

    Ok(tx
        .selection_after(Selection::collapsed(Point::new(caret, focus.offset)))
        .source(source)
        .build())
}

pub(crate) struct TextAlignPlugin;

impl BlockPlugin for TextAlignPlugin {
    fn id(&self) -> &'static str {
        "align"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("align.set", "Set text alignment", |editor, args| {
                let value = align_arg(args)?;
                set_text_align(editor, value)
            })
            .description("Set text alignment for the selected text blocks.")
            .keywords(["align", "alignment", "left", "center", "right", "justify"])
            .args_example(json!({ "value": "center" }))
            .active(|editor, args| align_arg(args).is_ok_and(|value| active_align(editor) == Some(value))),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("align.active", |editor, _args| {
            Ok::<_, QueryError>(active_align(editor).map(Value::from).unwrap_or(Value::Null))
        })]
    }
}

fn align_arg(args: Option<&Value>) -> Result<&'static str, CommandError> {
    let value = arg_str(args, "value").ok_or_else(|| CommandError::new("Missing args.value"))?;
    TEXT_ALIGNMENTS
        .iter()
        .copied()
        .find(|align| *align == value)
        .ok_or_else(|| CommandError::new(format!("Invalid align value: {value}")))
}

fn active_align(editor: &Editor) -> Option<&'static str> {
    let path = focus_textblock_path(editor).ok()?;
    let current = editor.doc().element(&path)?.attr_str("textAlign").unwrap_or("left");
    TEXT_ALIGNMENTS.iter().copied().find(|align| *align == current)
}

fn set_text_align(editor: &Editor, value: &'static str) -> Result<Transaction, CommandError> {
    let sel = editor.selection();
    let mut paths: Vec<Path> = if sel.is_collapsed() {
        vec![focus_textblock_path(editor)?]
    } else {
        selected_block_ranges(editor, sel)?
            .into_iter()
            .map(|(path, _, _)| path)
            .collect()
    };
    if paths.is_empty() {
        paths.push(focus_textblock_path(editor)?);
    }

    let mut tx = Transaction::builder().source("command:align.set");
    for path in paths {
        let Some(el) = editor.doc().element(&path) else {
            continue;
        };
        let current = el.attr_str("textAlign");
        // Left is the default and is stored as the absence of the attribute.
        if value == "left" {
            if current.is_some() {
                tx = tx.set_attrs(path, AttrPatch::remove("textAlign"));
            }
        } else if current != Some(value) {
            tx = tx.set_attrs(path, AttrPatch::set("textAlign", value));
        }
    }
    Ok(tx.selection_after(sel.clone()).build())
}

pub(crate) struct ImagePlugin;

impl BlockPlugin for ImagePlugin {
    fn id(&self) -> &'static str {
        "image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeKind::Image, NodeRole::Block, ContentRule::Empty)
                .attr(AttrSpec::required("src", AttrRule::NonEmptyString))
                .attr(AttrSpec::optional("alt", AttrRule::String))
                .attr(AttrSpec::optional("title", AttrRule::String)),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Insert image", |editor, args| {
                let src = arg_str(args, "src")
                    .map(str::trim)
                    .filter(|src| !src.is_empty())
                    .ok_or_else(|| CommandError::new("Missing args.src"))?;
                insert_block_with_trailing_paragraph(editor, Node::image(src), "command:image.insert")
            })
            .description("Insert an image block after the active block.")
            .keywords(["image", "picture", "img", "url"])
            .args_example(json!({ "src": "https://example.com/cat.png" })),
        ]
    }
}

pub(crate) struct HorizontalRulePlugin;

impl BlockPlugin for HorizontalRulePlugin {
    fn id(&self) -> &'static str {
        "horizontal_rule"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeKind::HorizontalRule, NodeRole::Block, ContentRule::Empty)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("horizontal_rule.insert", "Insert horizontal rule", |editor, _args| {
                insert_block_with_trailing_paragraph(
                    editor,
                    Node::horizontal_rule(),
                    "command:horizontal_rule.insert",
                )
            })
            .description("Insert a horizontal rule and a trailing paragraph.")
            .keywords(["divider", "separator", "hr", "horizontal rule"]),
        ]
    }
}

/// Inserts `node` after the focused textblock followed by an empty paragraph holding the caret.
fn insert_block_with_trailing_paragraph(
    editor: &Editor,
    node: Node,
    source: &'static str,
) -> Result<Transaction, CommandError> {
    let block_path = focus_textblock_path(editor)?;
    let (parent, insert_at) =
        slot_after(&block_path).ok_or_else(|| CommandError::new("No active block"))?;
    let paragraph_path = child_path(&parent, insert_at + 1);
    let caret = child_path(&paragraph_path, 0);

    Ok(Transaction::builder()
        .insert_node(child_path(&parent, insert_at), node)
        .insert_node(paragraph_path, Node::paragraph(""))
        .selection_after(Selection::collapsed(Point::new(caret, 0)))
        .source(source)
        .build())
}

pub(crate) struct DraggableItemPlugin;

impl BlockPlugin for DraggableItemPlugin {
    fn id(&self) -> &'static str {
        "draggable_item"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeKind::DraggableItem, NodeRole::Block, ContentRule::Blocks)]
    }
}

pub(crate) struct MentionPlugin;

impl BlockPlugin for MentionPlugin {
    fn id(&self) -> &'static str {
        "mention"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeKind::Mention, NodeRole::Inline, ContentRule::Empty)
                .attr(AttrSpec::required("label", AttrRule::NonEmptyString))
                .attr(AttrSpec::required("id", AttrRule::String)),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("mention.insert", "Insert mention", |editor, args| {
                let label = arg_str(args, "label")
                    .ok_or_else(|| CommandError::new("Missing args.label"))?;
                let id = arg_str(args, "id").unwrap_or(label);
                let (start, end) = editor.selection().ordered();
                if start.path != end.path {
                    return Err(CommandError::new("Selection spans more than one text leaf"));
                }
                replace_with_mention(
                    editor.doc(),
                    &start.path,
                    start.offset..end.offset,
                    label,
                    id,
                    "command:mention.insert",
                )
            })
            .description("Insert an atomic mention at the caret, replacing selected text.")
            .keywords(["mention", "user", "@"])
            .args_example(json!({ "label": "Lea Thompson", "id": "Lea Thompson" })),
        ]
    }
}

/// Replaces `range` of the text leaf at `text_path` with one mention node; the caret lands
/// in the text slot right after it.
pub fn replace_with_mention(
    doc: &Document,
    text_path: &[usize],
    range: Range<usize>,
    label: &str,
    id: &str,
    source: &str,
) -> Result<Transaction, CommandError> {
    let Some(text) = doc.text_node(text_path) else {
        return Err(CommandError::new("Selection is not in a text node"));
    };
    let (&child_ix, block_path) = text_path
        .split_last()
        .ok_or_else(|| CommandError::new("Selection is not in a text node"))?;
    if !doc.element(block_path).is_some_and(|el| el.kind.is_textblock()) {
        return Err(CommandError::new("Selection is not in a text block"));
    }

    let from = clamp_to_char_boundary(&text.text, range.start);
    let to = clamp_to_char_boundary(&text.text, range.end.max(from));
    let left = Node::styled_text(&text.text[..from], text.marks);
    let right = Node::styled_text(&text.text[to..], text.marks);
    let caret = child_path(block_path, child_ix + 2);

    Ok(Transaction::builder()
        .remove_node(text_path.to_vec())
        .insert_node(child_path(block_path, child_ix), left)
        .insert_node(child_path(block_path, child_ix + 1), Node::mention(label, id))
        .insert_node(caret.clone(), right)
        .selection_after(Selection::collapsed(Point::new(caret, 0)))
        .source(source)
        .build())
}
