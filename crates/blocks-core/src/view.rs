//! Headless view tree.
//!
//! Every node kind has exactly one renderer. Hosts map [`ViewNode`]s onto their own widgets
//! and report pointer hits back as view paths, which [`ViewTree::hit`] resolves to the
//! document node and interactive region under the pointer.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::core::{Document, Editor, ElementNode, Marks, Node, NodeKind, VoidNode};
use crate::html::{escape_attr, escape_text};
use crate::ops::Path;

/// Interactive area of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Non-editable grip; the only place a drag may start.
    DragHandle,
    /// Editable area holding the node's children.
    Content,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Element(ViewElement),
    Text(ViewText),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewElement {
    pub tag: &'static str,
    pub classes: Vec<&'static str>,
    pub attrs: BTreeMap<&'static str, String>,
    /// Document path of the node this element renders, if it is a node's outer element.
    pub node: Option<Path>,
    pub region: Option<Region>,
    pub editable: bool,
    pub children: Vec<ViewNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewText {
    pub text: String,
    pub marks: Marks,
}

impl ViewElement {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            node: None,
            region: None,
            editable: true,
            children: Vec::new(),
        }
    }

    fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.insert(name, value.into());
        self
    }

    fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    fn non_editable(mut self) -> Self {
        self.editable = false;
        self.attrs.insert("contenteditable", "false".into());
        self
    }

    fn children(mut self, children: Vec<ViewNode>) -> Self {
        self.children = children;
        self
    }

    fn for_node(mut self, path: &[usize]) -> ViewNode {
        self.node = Some(path.to_vec());
        ViewNode::Element(self)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| *c == class)
    }
}

/// Result of hit-testing a view path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Innermost document node whose rendering contains the hit.
    pub node: Path,
    /// Innermost region containing the hit, with the node that owns it.
    pub region: Option<(Region, Path)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewTree {
    pub roots: Vec<ViewNode>,
}

impl ViewTree {
    pub fn render(doc: &Document) -> Self {
        let roots = doc
            .children
            .iter()
            .enumerate()
            .map(|(ix, node)| render_node(node, &[ix]))
            .collect();
        Self { roots }
    }

    /// Like [`ViewTree::render`], but a document holding only an empty paragraph shows
    /// `placeholder` on that paragraph.
    pub fn render_with_placeholder(doc: &Document, placeholder: Option<&str>) -> Self {
        let mut tree = Self::render(doc);
        let Some(hint) = placeholder else {
            return tree;
        };
        if let [Node::Element(el)] = doc.children.as_slice()
            && el.kind == NodeKind::Paragraph
            && el.children.iter().all(|child| matches!(child, Node::Text(t) if t.text.is_empty()))
            && let Some(ViewNode::Element(view)) = tree.roots.first_mut()
        {
            view.classes.push("is-editor-empty");
            view.attrs.insert("data-placeholder", hint.to_string());
        }
        tree
    }

    pub fn get(&self, view_path: &[usize]) -> Option<&ViewNode> {
        let (first, rest) = view_path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for ix in rest {
            let ViewNode::Element(el) = node else {
                return None;
            };
            node = el.children.get(*ix)?;
        }
        Some(node)
    }

    /// Resolves a view path (indices through `roots` and element children) to what lies
    /// under it. `None` when the path does not exist or hits no node.
    pub fn hit(&self, view_path: &[usize]) -> Option<Hit> {
        let (first, rest) = view_path.split_first()?;
        let mut current = self.roots.get(*first)?;
        let mut node = None;
        let mut region = None;
        let visit = |view: &ViewNode, node: &mut Option<Path>, region: &mut Option<(Region, Path)>| {
            if let ViewNode::Element(el) = view {
                if let Some(path) = &el.node {
                    *node = Some(path.clone());
                }
                if let (Some(r), Some(owner)) = (el.region, node.as_ref()) {
                    *region = Some((r, owner.clone()));
                }
            }
        };
        visit(current, &mut node, &mut region);
        for ix in rest {
            let ViewNode::Element(el) = current else {
                return None;
            };
            current = el.children.get(*ix)?;
            visit(current, &mut node, &mut region);
        }
        node.map(|node| Hit { node, region })
    }

    /// View paths of every drag handle, paired with the node each one drags.
    pub fn drag_handles(&self) -> Vec<(Path, Path)> {
        fn walk(nodes: &[ViewNode], view_path: &mut Path, owner: Option<&Path>, out: &mut Vec<(Path, Path)>) {
            for (ix, view) in nodes.iter().enumerate() {
                let ViewNode::Element(el) = view else {
                    continue;
                };
                view_path.push(ix);
                let owner = el.node.as_ref().or(owner);
                if el.region == Some(Region::DragHandle)
                    && let Some(owner) = owner
                {
                    out.push((view_path.clone(), owner.clone()));
                }
                walk(&el.children, view_path, owner, out);
                view_path.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut Vec::new(), None, &mut out);
        out
    }

    /// Debug markup of the view, including region and editability attributes.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.roots {
            write_view(&mut out, node);
        }
        out
    }
}

impl Editor {
    /// View of the current document, with the configured placeholder.
    pub fn view(&self) -> ViewTree {
        ViewTree::render_with_placeholder(self.doc(), self.config().placeholder.as_deref())
    }
}

pub fn render_node(node: &Node, path: &[usize]) -> ViewNode {
    match node {
        Node::Text(t) => ViewNode::Text(ViewText {
            text: t.text.clone(),
            marks: t.marks,
        }),
        Node::Element(el) => render_element(el, path),
        Node::Void(v) => render_void(v, path),
    }
}

fn render_children(children: &[Node], path: &[usize]) -> Vec<ViewNode> {
    children
        .iter()
        .enumerate()
        .map(|(ix, child)| {
            let mut child_path = path.to_vec();
            child_path.push(ix);
            render_node(child, &child_path)
        })
        .collect()
}

fn with_align(view: ViewElement, el: &ElementNode) -> ViewElement {
    match el.attr_str("textAlign") {
        Some(align) => view.attr("style", format!("text-align: {align}")),
        None => view,
    }
}

fn with_cell_attrs(mut view: ViewElement, el: &ElementNode) -> ViewElement {
    for name in ["colspan", "rowspan"] {
        if let Some(span) = el.attr_u64(name).filter(|span| *span > 1) {
            view = view.attr(name, span.to_string());
        }
    }
    if let Some(color) = el.attr_str("backgroundColor") {
        view = view.attr("style", format!("background-color: {color}"));
    }
    view
}

fn render_element(el: &ElementNode, path: &[usize]) -> ViewNode {
    let children = render_children(&el.children, path);
    let view = match el.kind {
        NodeKind::Paragraph => with_align(ViewElement::new("p"), el),
        NodeKind::Heading => {
            let tag = match el.attr_u64("level") {
                Some(2) => "h2",
                Some(3) => "h3",
                _ => "h1",
            };
            with_align(ViewElement::new(tag), el)
        }
        NodeKind::BulletList => ViewElement::new("ul"),
        NodeKind::OrderedList => ViewElement::new("ol"),
        NodeKind::ListItem => ViewElement::new("li"),
        NodeKind::Table => {
            let tbody = ViewElement::new("tbody").children(children);
            return ViewElement::new("table")
                .children(vec![ViewNode::Element(tbody)])
                .for_node(path);
        }
        NodeKind::TableRow => ViewElement::new("tr"),
        NodeKind::TableCell => with_cell_attrs(ViewElement::new("td"), el),
        NodeKind::TableHeader => with_cell_attrs(ViewElement::new("th"), el),
        NodeKind::DraggableItem => {
            let handle = ViewElement::new("div")
                .class("drag-handle")
                .non_editable()
                .attr("draggable", "true")
                .attr("data-drag-handle", "")
                .region(Region::DragHandle);
            let content = ViewElement::new("div")
                .class("content")
                .region(Region::Content)
                .children(children);
            return ViewElement::new("div")
                .class("draggable-item")
                .attr("data-type", "draggable-item")
                .children(vec![ViewNode::Element(handle), ViewNode::Element(content)])
                .for_node(path);
        }
        NodeKind::Image | NodeKind::HorizontalRule | NodeKind::Mention => {
            return render_void(
                &VoidNode {
                    kind: el.kind,
                    attrs: el.attrs.clone(),
                },
                path,
            );
        }
    };
    view.children(children).for_node(path)
}

fn render_void(v: &VoidNode, path: &[usize]) -> ViewNode {
    match v.kind {
        NodeKind::Image => {
            let mut view = ViewElement::new("img")
                .non_editable()
                .attr("src", v.attr_str("src").unwrap_or_default());
            if let Some(alt) = v.attr_str("alt") {
                view = view.attr("alt", alt);
            }
            view.for_node(path)
        }
        NodeKind::HorizontalRule => ViewElement::new("hr").non_editable().for_node(path),
        NodeKind::Mention => {
            let label = v.attr_str("label").unwrap_or_default();
            ViewElement::new("span")
                .class("mention")
                .non_editable()
                .attr("data-id", v.attr_str("id").unwrap_or(label))
                .attr("data-label", label)
                .children(vec![ViewNode::Text(ViewText {
                    text: v.inline_text(),
                    marks: Marks::default(),
                })])
                .for_node(path)
        }
        NodeKind::Paragraph
        | NodeKind::Heading
        | NodeKind::BulletList
        | NodeKind::OrderedList
        | NodeKind::ListItem
        | NodeKind::Table
        | NodeKind::TableRow
        | NodeKind::TableHeader
        | NodeKind::TableCell
        | NodeKind::DraggableItem => render_element(
            &ElementNode {
                kind: v.kind,
                attrs: v.attrs.clone(),
                children: Vec::new(),
            },
            path,
        ),
    }
}

fn write_view(out: &mut String, view: &ViewNode) {
    match view {
        ViewNode::Text(t) => out.push_str(&escape_text(&t.text)),
        ViewNode::Element(el) => {
            let _ = write!(out, "<{}", el.tag);
            if !el.classes.is_empty() {
                let _ = write!(out, " class=\"{}\"", el.classes.join(" "));
            }
            for (name, value) in &el.attrs {
                let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
            }
            out.push('>');
            if matches!(el.tag, "img" | "hr") {
                return;
            }
            for child in &el.children {
                write_view(out, child);
            }
            let _ = write!(out, "</{}>", el.tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draggable_doc() -> Document {
        Document::new(vec![
            Node::paragraph("intro"),
            Node::draggable_item(vec![Node::paragraph("one"), Node::paragraph("two")]),
        ])
    }

    #[test]
    fn draggable_item_renders_handle_then_content() {
        let tree = ViewTree::render(&draggable_doc());
        let Some(ViewNode::Element(item)) = tree.get(&[1]) else {
            panic!("expected draggable item element");
        };
        assert!(item.has_class("draggable-item"));
        assert_eq!(item.node.as_deref(), Some(&[1][..]));

        let Some(ViewNode::Element(handle)) = tree.get(&[1, 0]) else {
            panic!("expected handle");
        };
        assert!(handle.has_class("drag-handle"));
        assert!(!handle.editable);
        assert_eq!(handle.attrs.get("draggable").map(String::as_str), Some("true"));
        assert!(handle.attrs.contains_key("data-drag-handle"));

        let Some(ViewNode::Element(content)) = tree.get(&[1, 1]) else {
            panic!("expected content");
        };
        assert!(content.has_class("content"));
        assert!(content.editable);
        assert_eq!(content.children.len(), 2);
    }

    #[test]
    fn hit_reports_innermost_node_and_region() {
        let tree = ViewTree::render(&draggable_doc());

        let on_handle = tree.hit(&[1, 0]).unwrap();
        assert_eq!(on_handle.node, vec![1]);
        assert_eq!(on_handle.region, Some((Region::DragHandle, vec![1])));

        let in_content = tree.hit(&[1, 1, 0, 0]).unwrap();
        assert_eq!(in_content.node, vec![1, 0]);
        assert_eq!(in_content.region, Some((Region::Content, vec![1])));

        let outside = tree.hit(&[0]).unwrap();
        assert_eq!(outside.region, None);
        assert!(tree.hit(&[7]).is_none());
    }

    #[test]
    fn debug_markup_escapes_labels() {
        let doc = Document::new(vec![Node::element(
            NodeKind::Paragraph,
            vec![Node::text("a < b "), Node::mention(r#"Jo "JJ" Smith"#, "jo")],
        )]);
        assert_eq!(
            ViewTree::render(&doc).to_html(),
            r#"<p>a &lt; b <span class="mention" contenteditable="false" data-id="jo" data-label="Jo &quot;JJ&quot; Smith">@Jo "JJ" Smith</span></p>"#
        );
    }

    #[test]
    fn placeholder_marks_only_a_lone_empty_paragraph() {
        let hint = Some("Start writing your report...");
        let empty = Document::new(vec![Node::paragraph("")]);
        let Some(ViewNode::Element(p)) = ViewTree::render_with_placeholder(&empty, hint).roots.first().cloned()
        else {
            panic!("expected paragraph");
        };
        assert!(p.has_class("is-editor-empty"));
        assert_eq!(p.attrs.get("data-placeholder").map(String::as_str), hint);

        assert_eq!(ViewTree::render_with_placeholder(&empty, None), ViewTree::render(&empty));
        let typed = Document::new(vec![Node::paragraph("x")]);
        assert_eq!(ViewTree::render_with_placeholder(&typed, hint), ViewTree::render(&typed));
        let two = Document::new(vec![Node::paragraph(""), Node::paragraph("")]);
        assert_eq!(ViewTree::render_with_placeholder(&two, hint), ViewTree::render(&two));
    }

    #[test]
    fn drag_handles_are_listed_with_their_nodes() {
        let tree = ViewTree::render(&draggable_doc());
        assert_eq!(tree.drag_handles(), vec![(vec![1, 0], vec![1])]);
    }
}
