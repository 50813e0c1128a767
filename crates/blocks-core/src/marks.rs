use serde_json::{Map, Value, json};

use crate::core::{Editor, MarkKind, Marks, Node, Point, Selection, TextNode, clamp_to_char_boundary};
use crate::ops::{Path, Transaction};
use crate::plugin::{BlockPlugin, CommandError, CommandSpec, QueryError, QuerySpec, arg_str};

pub(crate) struct MarksPlugin;

impl BlockPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.toggle", "Toggle mark", |editor, args| {
                let mark = mark_arg(args)?;
                toggle_mark(editor, mark)
            })
            .description("Toggle a mark on the selection, or on the next typed text at a caret.")
            .keywords(["bold", "italic", "underline", "strike", "highlight", "superscript"])
            .args_example(json!({ "mark": "bold" }))
            .active(|editor, args| {
                mark_arg(args).is_ok_and(|mark| mark_is_active(editor, mark))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("marks.active", |editor, _args| {
            let marks = active_marks(editor);
            let map: Map<String, Value> = MarkKind::ALL
                .into_iter()
                .map(|mark| (mark.name().to_string(), Value::Bool(marks.has(mark))))
                .collect();
            Ok::<_, QueryError>(Value::Object(map))
        })]
    }
}

fn mark_arg(args: Option<&Value>) -> Result<MarkKind, CommandError> {
    let name = arg_str(args, "mark").ok_or_else(|| CommandError::new("Missing args.mark"))?;
    MarkKind::from_name(name).ok_or_else(|| CommandError::new(format!("Unknown mark: {name}")))
}

/// Marks at the caret: stored marks win over the marks of the focused leaf.
pub fn active_marks(editor: &Editor) -> Marks {
    if let Some(marks) = editor.stored_marks() {
        return marks;
    }
    editor
        .doc()
        .text_node(&editor.selection().focus.path)
        .map(|t| t.marks)
        .unwrap_or_default()
}

pub fn mark_is_active(editor: &Editor, mark: MarkKind) -> bool {
    let sel = editor.selection();
    if sel.is_collapsed() {
        return active_marks(editor).has(mark);
    }
    all_selected_text_has_mark(editor, sel, mark)
}

fn toggle_mark(editor: &Editor, mark: MarkKind) -> Result<Transaction, CommandError> {
    let sel = editor.selection().clone();
    let source = "command:marks.toggle";

    if sel.is_collapsed() {
        if editor.doc().text_node(&sel.focus.path).is_none() {
            return Err(CommandError::new("Selection is not in a text node"));
        }
        let current = active_marks(editor);
        let next = current.with(mark, !current.has(mark));
        return Ok(Transaction::builder()
            .source(source)
            .selection_after(sel)
            .stored_marks(Some(next))
            .build());
    }

    let target = !all_selected_text_has_mark(editor, &sel, mark);
    let (ops, selection_after) = apply_mark_range(editor, &sel, &|marks: Marks| {
        marks.with(mark, target)
    })?;
    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source(source))
}

/// Width a node occupies in a textblock's flat inline offset space.
fn inline_width(node: &Node) -> usize {
    match node {
        Node::Text(t) => t.text.len(),
        Node::Void(_) => 1,
        Node::Element(_) => 0,
    }
}

pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let before: usize = children.iter().take(child_ix).map(inline_width).sum();
    let within = match children.get(child_ix) {
        Some(Node::Text(t)) => clamp_to_char_boundary(&t.text, offset),
        Some(node) => offset.min(inline_width(node)),
        None => 0,
    };
    before + within
}

pub(crate) fn point_for_global_offset(
    block_path: &[usize],
    children: &[Node],
    global_offset: usize,
) -> Point {
    let at = |ix: usize, offset: usize| {
        let mut path = block_path.to_vec();
        path.push(ix);
        Point::new(path, offset)
    };

    let mut remaining = global_offset;
    for (ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                if remaining <= t.text.len() {
                    return at(ix, clamp_to_char_boundary(&t.text, remaining));
                }
                remaining -= t.text.len();
            }
            Node::Void(_) => {
                if remaining == 0 {
                    if let Some(next) = children[ix + 1..].iter().position(|n| matches!(n, Node::Text(_))) {
                        return at(ix + 1 + next, 0);
                    }
                }
                remaining = remaining.saturating_sub(1);
            }
            Node::Element(_) => {}
        }
    }

    match children
        .iter()
        .enumerate()
        .rev()
        .find_map(|(ix, node)| match node {
            Node::Text(t) => Some((ix, t.text.len())),
            _ => None,
        }) {
        Some((ix, len)) => at(ix, len),
        None => at(0, 0),
    }
}

/// Textblocks touched by `sel`, each with the global inline range it covers.
pub(crate) fn selected_block_ranges(
    editor: &Editor,
    sel: &Selection,
) -> Result<Vec<(Path, usize, usize)>, CommandError> {
    let (start, end) = sel.ordered();
    let blocks = editor.doc().textblock_paths();
    let start_block = start.block_path();
    let end_block = end.block_path();
    let start_index = blocks
        .iter()
        .position(|b| b.as_slice() == start_block)
        .ok_or_else(|| CommandError::new("Selection start is not in a text block"))?;
    let end_index = blocks
        .iter()
        .position(|b| b.as_slice() == end_block)
        .ok_or_else(|| CommandError::new("Selection end is not in a text block"))?;

    let mut out = Vec::new();
    for (block_index, path) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let Some(el) = editor.doc().element(path) else {
            continue;
        };
        let children = el.children.as_slice();
        let total: usize = children.iter().map(inline_width).sum();
        let from = if block_index == start_index {
            point_global_offset(children, start.path.last().copied().unwrap_or(0), start.offset)
        } else {
            0
        };
        let to = if block_index == end_index {
            point_global_offset(children, end.path.last().copied().unwrap_or(0), end.offset)
        } else {
            total
        };
        if from < to {
            out.push((path.clone(), from, to));
        }
    }
    Ok(out)
}

fn all_selected_text_has_mark(editor: &Editor, sel: &Selection, mark: MarkKind) -> bool {
    let Ok(ranges) = selected_block_ranges(editor, sel) else {
        return false;
    };
    let mut saw_text = false;
    for (path, from, to) in ranges {
        let Some(el) = editor.doc().element(&path) else {
            continue;
        };
        let mut cursor = 0usize;
        for node in &el.children {
            let (node_start, node_end) = (cursor, cursor + inline_width(node));
            cursor = node_end;
            let Node::Text(t) = node else {
                continue;
            };
            if node_start == node_end || to <= node_start || from >= node_end {
                continue;
            }
            saw_text = true;
            if !t.marks.has(mark) {
                return false;
            }
        }
    }
    saw_text
}

fn apply_marks_in_block(
    children: &[Node],
    from: usize,
    to: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let node_start = cursor;
        cursor += inline_width(node);
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        if to <= node_start || from >= cursor {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, from.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(&t.text, to.saturating_sub(node_start));
        let pieces = [
            (&t.text[..sel_start], t.marks),
            (&t.text[sel_start..sel_end], apply(t.marks)),
            (&t.text[sel_end..], t.marks),
        ];
        for (text, marks) in pieces {
            if !text.is_empty() {
                out.push(Node::Text(TextNode {
                    text: text.to_string(),
                    marks,
                }));
            }
        }
    }
    out
}

fn apply_mark_range(
    editor: &Editor,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<(Vec<crate::ops::Op>, Selection), CommandError> {
    let mut tx = Transaction::builder();
    let mut anchor = sel.anchor.clone();
    let mut focus = sel.focus.clone();

    for (path, from, to) in selected_block_ranges(editor, sel)? {
        let Some(el) = editor.doc().element(&path) else {
            continue;
        };
        let children = el.children.as_slice();
        let rebuilt = apply_marks_in_block(children, from, to, apply);

        for ix in (0..children.len()).rev() {
            tx = tx.remove_node(crate::plugin::child_path(&path, ix));
        }
        for (ix, node) in rebuilt.iter().cloned().enumerate() {
            tx = tx.insert_node(crate::plugin::child_path(&path, ix), node);
        }

        for point in [&mut anchor, &mut focus] {
            if point.block_path() == path.as_slice() {
                let global = point_global_offset(
                    children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&path, &rebuilt, global);
            }
        }
    }

    Ok((tx.build().ops, Selection { anchor, focus }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_offsets_count_voids_as_one() {
        let children = vec![Node::text("ab"), Node::mention("Ann", "1"), Node::text("cd")];
        assert_eq!(point_global_offset(&children, 2, 1), 4);
        assert_eq!(point_for_global_offset(&[0], &children, 4), Point::new(vec![0, 2], 1));
        assert_eq!(point_for_global_offset(&[0], &children, 2), Point::new(vec![0, 0], 2));
        assert_eq!(point_for_global_offset(&[0], &children, 3), Point::new(vec![0, 2], 0));
    }

    #[test]
    fn range_split_keeps_outer_marks() {
        let children = vec![Node::text("hello")];
        let bold = |m: Marks| m.with(MarkKind::Bold, true);
        let out = apply_marks_in_block(&children, 1, 3, &bold);
        let texts: Vec<_> = out
            .iter()
            .map(|n| match n {
                Node::Text(t) => (t.text.as_str(), t.marks.bold),
                _ => ("", false),
            })
            .collect();
        assert_eq!(texts, vec![("h", false), ("el", true), ("lo", false)]);
    }
}
