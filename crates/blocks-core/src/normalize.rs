use crate::core::{Document, Node, NodeKind};
use crate::ops::Op;
use crate::plugin::{BlockPlugin, NormalizePass, PluginRegistry, child_path};

pub(crate) struct CoreNormalizePlugin;

impl BlockPlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(MergeAdjacentTextLeaves),
            Box::new(DropRedundantEmptyText),
            Box::new(EnsureTextSlots),
        ]
    }
}

/// Calls `f` with the path and children of every textblock in the document.
pub(crate) fn for_each_textblock(doc: &Document, mut f: impl FnMut(&[usize], &[Node])) {
    fn walk(children: &[Node], path: &mut Vec<usize>, f: &mut dyn FnMut(&[usize], &[Node])) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if el.kind.is_textblock() {
                f(path, &el.children);
            } else {
                walk(&el.children, path, f);
            }
            path.pop();
        }
    }
    walk(&doc.children, &mut Vec::new(), &mut f);
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_textblock(doc, |path, children| {
            let mut ix = children.len();
            while ix > 1 {
                ix -= 1;
                let Node::Text(right) = &children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }
                if start == ix {
                    continue;
                }

                let Some(Node::Text(first)) = children.get(start) else {
                    continue;
                };
                let appended: String = children[start + 1..=ix]
                    .iter()
                    .filter_map(|node| match node {
                        Node::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();

                if !appended.is_empty() {
                    ops.push(Op::InsertText {
                        path: child_path(path, start),
                        offset: first.text.len(),
                        text: appended,
                    });
                }
                for remove_ix in (start + 1..=ix).rev() {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, remove_ix),
                    });
                }
                ix = start;
            }
        });
        ops
    }
}

/// An empty text leaf next to another text leaf is never needed as a caret slot.
struct DropRedundantEmptyText;

impl NormalizePass for DropRedundantEmptyText {
    fn id(&self) -> &'static str {
        "core.drop_redundant_empty_text"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_textblock(doc, |path, children| {
            let is_text = |ix: Option<usize>| {
                ix.and_then(|ix| children.get(ix))
                    .is_some_and(|n| matches!(n, Node::Text(_)))
            };
            // Highest index first so earlier removals don't shift later paths.
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Text(t) = node else {
                    continue;
                };
                if t.text.is_empty() && (is_text(ix.checked_sub(1)) || is_text(Some(ix + 1))) {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, ix),
                    });
                    // Only one leaf per run per round; the next round re-evaluates.
                    break;
                }
            }
        });
        ops
    }
}

/// Textblocks always have a text leaf before, between and after inline voids.
struct EnsureTextSlots;

impl NormalizePass for EnsureTextSlots {
    fn id(&self) -> &'static str {
        "core.ensure_text_slots"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_textblock(doc, |path, children| {
            let mut missing = Vec::new();
            let mut prev_is_text = false;
            for (ix, node) in children.iter().enumerate() {
                let is_text = matches!(node, Node::Text(_));
                if !is_text && !prev_is_text {
                    missing.push(ix);
                }
                prev_is_text = is_text;
            }
            if !prev_is_text {
                missing.push(children.len());
            }
            for ix in missing.into_iter().rev() {
                ops.push(Op::InsertNode {
                    path: child_path(path, ix),
                    node: Node::text(""),
                });
            }
        });
        ops
    }
}

/// Clamps heading levels into 1..=3.
pub(crate) struct ClampHeadingLevels;

impl NormalizePass for ClampHeadingLevels {
    fn id(&self) -> &'static str {
        "heading.clamp_levels"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_textblock(doc, |path, _| {
            let Some(el) = doc.element(path) else {
                return;
            };
            if el.kind != NodeKind::Heading {
                return;
            }
            let current = el.attr_u64("level");
            let level = current.unwrap_or(1).clamp(1, 3);
            if current != Some(level) {
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: crate::ops::AttrPatch::set("level", level),
                });
            }
        });
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MarkKind, Marks};

    fn run_pass(pass: &dyn NormalizePass, doc: &Document) -> Vec<Op> {
        pass.run(doc, &PluginRegistry::core())
    }

    #[test]
    fn merges_equal_marks_only() {
        let bold = Marks::default().with(MarkKind::Bold, true);
        let doc = Document::new(vec![Node::element(
            NodeKind::Paragraph,
            vec![
                Node::text("a"),
                Node::text("b"),
                Node::styled_text("c", bold),
            ],
        )]);
        let ops = run_pass(&MergeAdjacentTextLeaves, &doc);
        assert_eq!(
            ops,
            vec![
                Op::InsertText {
                    path: vec![0, 0],
                    offset: 1,
                    text: "b".into(),
                },
                Op::RemoveNode { path: vec![0, 1] },
            ]
        );
    }

    #[test]
    fn slots_are_added_around_voids() {
        let doc = Document::new(vec![Node::element(
            NodeKind::Paragraph,
            vec![Node::mention("Ann", "1"), Node::mention("Bob", "2")],
        )]);
        let ops = run_pass(&EnsureTextSlots, &doc);
        let paths: Vec<_> = ops
            .iter()
            .map(|op| match op {
                Op::InsertNode { path, .. } => path.clone(),
                other => panic!("unexpected op {other:?}"),
            })
            .collect();
        assert_eq!(paths, vec![vec![0, 2], vec![0, 1], vec![0, 0]]);
    }

    #[test]
    fn empty_textblock_gets_a_slot() {
        let doc = Document::new(vec![Node::element(NodeKind::Paragraph, vec![])]);
        let ops = run_pass(&EnsureTextSlots, &doc);
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn lone_empty_leaf_is_kept() {
        let doc = Document::new(vec![Node::paragraph("")]);
        assert!(run_pass(&DropRedundantEmptyText, &doc).is_empty());
    }
}
