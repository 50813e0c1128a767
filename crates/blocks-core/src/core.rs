use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::EditorConfig;
use crate::ops::{AttrPatch, Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError, TransactionPreview};
use crate::schema::{self, SchemaViolation};

pub type Attrs = BTreeMap<String, Value>;

/// Closed set of element kinds the editor knows how to validate, render and serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    Image,
    Table,
    TableRow,
    TableHeader,
    TableCell,
    HorizontalRule,
    DraggableItem,
    Mention,
}

impl NodeKind {
    pub const ALL: [NodeKind; 13] = [
        NodeKind::Paragraph,
        NodeKind::Heading,
        NodeKind::BulletList,
        NodeKind::OrderedList,
        NodeKind::ListItem,
        NodeKind::Image,
        NodeKind::Table,
        NodeKind::TableRow,
        NodeKind::TableHeader,
        NodeKind::TableCell,
        NodeKind::HorizontalRule,
        NodeKind::DraggableItem,
        NodeKind::Mention,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::Image => "image",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableHeader => "tableHeader",
            NodeKind::TableCell => "tableCell",
            NodeKind::HorizontalRule => "horizontalRule",
            NodeKind::DraggableItem => "draggableItem",
            NodeKind::Mention => "mention",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Blocks whose content is inline text and mentions.
    pub fn is_textblock(self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Heading)
    }

    pub fn is_list(self) -> bool {
        matches!(self, NodeKind::BulletList | NodeKind::OrderedList)
    }

    pub fn is_table_cell(self) -> bool {
        matches!(self, NodeKind::TableCell | NodeKind::TableHeader)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn styled_text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: NodeKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind,
            attrs: Attrs::default(),
            children,
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(NodeKind::Paragraph, vec![Node::text(text)])
    }

    pub fn heading(level: u64, text: impl Into<String>) -> Self {
        Node::element(NodeKind::Heading, vec![Node::text(text)]).with_attr("level", level)
    }

    pub fn list_item(children: Vec<Node>) -> Self {
        Node::element(NodeKind::ListItem, children)
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::element(NodeKind::BulletList, items)
    }

    pub fn ordered_list(items: Vec<Node>) -> Self {
        Node::element(NodeKind::OrderedList, items)
    }

    pub fn draggable_item(children: Vec<Node>) -> Self {
        Node::element(NodeKind::DraggableItem, children)
    }

    pub fn image(src: impl Into<String>) -> Self {
        Node::void(NodeKind::Image).with_attr("src", src.into())
    }

    pub fn horizontal_rule() -> Self {
        Node::void(NodeKind::HorizontalRule)
    }

    pub fn mention(label: impl Into<String>, id: impl Into<String>) -> Self {
        Node::void(NodeKind::Mention)
            .with_attr("label", label.into())
            .with_attr("id", id.into())
    }

    pub fn void(kind: NodeKind) -> Self {
        Node::Void(VoidNode {
            kind,
            attrs: Attrs::default(),
        })
    }

    /// Sets an attribute on element and void nodes; text nodes are returned unchanged.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self {
            Node::Element(el) => {
                el.attrs.insert(name.into(), value.into());
            }
            Node::Void(v) => {
                v.attrs.insert(name.into(), value.into());
            }
            Node::Text(_) => {}
        }
        self
    }

    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            Node::Element(el) => Some(el.kind),
            Node::Void(v) => Some(v.kind),
            Node::Text(_) => None,
        }
    }

    /// Schema-facing name, `text` for text leaves.
    pub fn type_name(&self) -> &'static str {
        self.kind().map(NodeKind::name).unwrap_or("text")
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Void(v) => Some(&v.attrs),
            Node::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) | Node::Void(_) => &[],
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Node::Void(_))
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&t.text),
        Node::Void(v) => out.push_str(&v.inline_text()),
        Node::Element(el) => {
            for child in &el.children {
                collect_text(child, out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attrs.get(name).and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub attrs: Attrs,
}

impl VoidNode {
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    /// Text a void contributes to plain-text extraction.
    pub fn inline_text(&self) -> String {
        match self.kind {
            NodeKind::Mention => format!("@{}", self.attr_str("label").unwrap_or_default()),
            NodeKind::HorizontalRule | NodeKind::Image => String::new(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Highlight,
    Superscript,
}

impl MarkKind {
    pub const ALL: [MarkKind; 6] = [
        MarkKind::Bold,
        MarkKind::Italic,
        MarkKind::Underline,
        MarkKind::Strike,
        MarkKind::Highlight,
        MarkKind::Superscript,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Bold => "bold",
            MarkKind::Italic => "italic",
            MarkKind::Underline => "underline",
            MarkKind::Strike => "strike",
            MarkKind::Highlight => "highlight",
            MarkKind::Superscript => "superscript",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mark| mark.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strike: bool,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub superscript: bool,
}

impl Marks {
    pub fn has(&self, mark: MarkKind) -> bool {
        match mark {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Underline => self.underline,
            MarkKind::Strike => self.strike,
            MarkKind::Highlight => self.highlight,
            MarkKind::Superscript => self.superscript,
        }
    }

    pub fn set(&mut self, mark: MarkKind, on: bool) {
        let slot = match mark {
            MarkKind::Bold => &mut self.bold,
            MarkKind::Italic => &mut self.italic,
            MarkKind::Underline => &mut self.underline,
            MarkKind::Strike => &mut self.strike,
            MarkKind::Highlight => &mut self.highlight,
            MarkKind::Superscript => &mut self.superscript,
        };
        *slot = on;
    }

    pub fn with(mut self, mark: MarkKind, on: bool) -> Self {
        self.set(mark, on);
        self
    }
}

/// A caret address: path to a text leaf plus a byte offset inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Path of the element that owns the text leaf.
    pub fn block_path(&self) -> &[usize] {
        self.path.split_last().map(|(_, parent)| parent).unwrap_or(&[])
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path
            .cmp(&other.path)
            .then(self.offset.cmp(&other.offset))
    }
}

pub type Position = Point;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order.
    pub fn ordered(&self) -> (&Point, &Point) {
        if self.focus < self.anchor {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// A document holding a single empty paragraph.
    pub fn empty() -> Self {
        Self {
            children: vec![Node::paragraph("")],
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Void(_) | Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        match self.node(path)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text_node(&self, path: &[usize]) -> Option<&TextNode> {
        match self.node(path)? {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Children of the node at `parent_path`; the empty path addresses the root.
    pub fn children_at(&self, parent_path: &[usize]) -> Option<&[Node]> {
        if parent_path.is_empty() {
            return Some(&self.children);
        }
        match self.node(parent_path)? {
            Node::Element(el) => Some(&el.children),
            Node::Void(_) | Node::Text(_) => None,
        }
    }

    /// Nearest element of `kind` on the way from `path` up to the root, `path` included.
    pub fn ancestor_path(&self, path: &[usize], kind: NodeKind) -> Option<Path> {
        (1..=path.len()).rev().find_map(|len| {
            let candidate = &path[..len];
            match self.node(candidate) {
                Some(Node::Element(el)) if el.kind == kind => Some(candidate.to_vec()),
                _ => None,
            }
        })
    }

    pub fn first_text_point(&self) -> Option<Point> {
        first_text_point_in(&self.children, &mut Vec::new())
    }

    /// First caret slot inside the subtree at `path`.
    pub fn first_text_point_at(&self, path: &[usize]) -> Option<Point> {
        match self.node(path)? {
            Node::Text(_) => Some(Point::new(path.to_vec(), 0)),
            Node::Element(el) => first_text_point_in(&el.children, &mut path.to_vec()),
            Node::Void(_) => None,
        }
    }

    /// Last caret slot inside the subtree at `path`.
    pub fn last_text_point_at(&self, path: &[usize]) -> Option<Point> {
        fn walk(node: &Node, path: &mut Vec<usize>) -> Option<Point> {
            match node {
                Node::Text(t) => Some(Point::new(path.clone(), t.text.len())),
                Node::Void(_) => None,
                Node::Element(el) => {
                    for (ix, child) in el.children.iter().enumerate().rev() {
                        path.push(ix);
                        let found = walk(child, path);
                        path.pop();
                        if found.is_some() {
                            return found;
                        }
                    }
                    None
                }
            }
        }
        walk(self.node(path)?, &mut path.to_vec())
    }

    /// Paths of every paragraph/heading in document order.
    pub fn textblock_paths(&self) -> Vec<Path> {
        fn walk(children: &[Node], path: &mut Vec<usize>, out: &mut Vec<Path>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.is_textblock() {
                    out.push(path.clone());
                } else {
                    walk(&el.children, path, out);
                }
                path.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    /// Plain text of every textblock, one per line.
    pub fn text_content(&self) -> String {
        self.textblock_paths()
            .iter()
            .filter_map(|path| self.node(path))
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn first_text_point_in(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        let found = match node {
            Node::Text(_) => Some(Point::new(path.clone(), 0)),
            Node::Element(el) => first_text_point_in(&el.children, path),
            Node::Void(_) => None,
        };
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    stored_marks: Option<Marks>,
    registry: PluginRegistry,
    config: EditorConfig,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("stored_marks", &self.stored_marks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Builds an editor around `doc`. The document is normalized and must pass schema validation.
    pub fn new(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
    ) -> Result<Self, ApplyError> {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Result<Self, ApplyError> {
        let mut editor = Self {
            doc: Document::empty(),
            selection: Selection::collapsed(Point::new(vec![0, 0], 0)),
            stored_marks: None,
            registry,
            config: config.with_defaults(),
        };
        let TransactionPreview { doc, selection } = editor.settle(doc, selection)?;
        editor.doc = doc;
        editor.selection = selection;
        Ok(editor)
    }

    /// An editor with every block plugin and a single empty paragraph.
    pub fn with_block_plugins() -> Self {
        Self {
            doc: Document::empty(),
            selection: Selection::collapsed(Point::new(vec![0, 0], 0)),
            stored_marks: None,
            registry: PluginRegistry::blocks(),
            config: EditorConfig::default().with_defaults(),
        }
    }

    /// Block plugins, caret at the first text position of `doc`.
    pub fn from_document(doc: Document) -> Result<Self, ApplyError> {
        let point = doc
            .first_text_point()
            .unwrap_or_else(|| Point::new(vec![0, 0], 0));
        Self::new(doc, Selection::collapsed(point), PluginRegistry::blocks())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = self.registry.normalize_selection(&self.doc, &selection);
        self.stored_marks = None;
    }

    pub fn stored_marks(&self) -> Option<Marks> {
        self.stored_marks
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Applies `tx` atomically: either every op, normalization and validation succeed, or
    /// nothing changes.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        match self.preview_transaction(&tx) {
            Ok(TransactionPreview { doc, selection }) => {
                trace!(source = ?tx.meta.source, ops = tx.ops.len(), "transaction applied");
                self.doc = doc;
                self.selection = selection;
                self.stored_marks = tx.stored_marks;
                Ok(())
            }
            Err(err @ ApplyError::Schema(_)) => {
                warn!(source = ?tx.meta.source, error = %err, "transaction failed validation");
                Err(err)
            }
            Err(err) => {
                debug!(source = ?tx.meta.source, error = %err, "transaction rejected");
                Err(err)
            }
        }
    }

    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();

        for op in tx.ops.iter().cloned() {
            apply_op_to(&mut doc, &mut selection, op)?;
        }

        if let Some(sel) = &tx.selection_after {
            selection = sel.clone();
        }

        self.settle(doc, selection)
    }

    fn settle(
        &self,
        mut doc: Document,
        mut selection: Selection,
    ) -> Result<TransactionPreview, ApplyError> {
        self.normalize(&mut doc, &mut selection)?;
        schema::validate_document(&doc, &self.registry)?;
        let selection = self.registry.normalize_selection(&doc, &selection);
        Ok(TransactionPreview { doc, selection })
    }

    fn normalize(&self, doc: &mut Document, selection: &mut Selection) -> Result<(), ApplyError> {
        for round in 0..self.config.max_normalize_iterations {
            let mut changed = false;
            for pass in self.registry.normalize_passes() {
                let ops = pass.run(doc, &self.registry);
                if ops.is_empty() {
                    continue;
                }
                trace!(pass = pass.id(), ops = ops.len(), round, "normalize");
                changed = true;
                for op in ops {
                    apply_op_to(doc, selection, op)?;
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    /// Inserts `text` at the caret, replacing a selection that stays inside one text leaf.
    pub fn insert_text(&mut self, text: &str) -> Result<(), ApplyError> {
        let tx = self.insert_text_transaction(text)?;
        self.apply(tx)
    }

    fn insert_text_transaction(&self, text: &str) -> Result<Transaction, ApplyError> {
        let (start, end) = self.selection.ordered();
        if start.path != end.path {
            return Err(ApplyError::InvalidPath(
                "Selection spans more than one text leaf".into(),
            ));
        }
        let leaf = self
            .doc
            .text_node(&start.path)
            .ok_or_else(|| ApplyError::InvalidPath("Selection is not in a text node".into()))?;
        let from = clamp_to_char_boundary(&leaf.text, start.offset);
        let to = clamp_to_char_boundary(&leaf.text, end.offset);

        let mut tx = Transaction::builder().source("input:text");
        if from < to {
            tx = tx.remove_text(start.path.clone(), from..to);
        }

        match self.stored_marks.filter(|marks| *marks != leaf.marks) {
            Some(marks) => {
                let right = leaf.text[to..].to_string();
                let (child_ix, block_path) = start
                    .path
                    .split_last()
                    .ok_or_else(|| ApplyError::InvalidPath("Empty path".into()))?;
                let mut styled_path = block_path.to_vec();
                styled_path.push(child_ix + 1);
                let mut rest_path = block_path.to_vec();
                rest_path.push(child_ix + 2);
                if !right.is_empty() {
                    tx = tx.remove_text(start.path.clone(), from..from + right.len());
                }
                tx = tx
                    .insert_node(styled_path.clone(), Node::styled_text(text, marks))
                    .insert_node(rest_path, Node::styled_text(right, leaf.marks))
                    .selection_after(Selection::collapsed(Point::new(styled_path, text.len())))
                    .stored_marks(Some(marks));
            }
            None => {
                tx = tx
                    .insert_text(start.path.clone(), from, text)
                    .selection_after(Selection::collapsed(Point::new(
                        start.path.clone(),
                        from + text.len(),
                    )));
            }
        }
        Ok(tx.build())
    }

    /// Builds the transaction a command would apply, without applying it.
    pub fn command_transaction(
        &self,
        id: &str,
        args: Option<&Value>,
    ) -> Result<Transaction, CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let tx = self.command_transaction(id, args.as_ref())?;
        self.apply(tx)
            .map_err(|err| CommandError::new(format!("Failed to run {id}: {err}")))
    }

    /// Whether `id` currently builds a transaction that would apply cleanly.
    pub fn can(&self, id: &str, args: Option<Value>) -> bool {
        self.command_transaction(id, args.as_ref())
            .is_ok_and(|tx| self.preview_transaction(&tx).is_ok())
    }

    /// Whether the toggled state `id` represents is active at the current selection.
    pub fn is_active(&self, id: &str, args: Option<Value>) -> bool {
        self.registry
            .command(id)
            .and_then(|command| command.active)
            .is_some_and(|active| active(self, args.as_ref()))
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args.as_ref())
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

pub(crate) fn apply_op_to(
    doc: &mut Document,
    selection: &mut Selection,
    op: Op,
) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            for point in [&mut selection.anchor, &mut selection.focus] {
                if point.path == path && point.offset >= offset {
                    point.offset += text.len();
                }
            }
        }
        Op::RemoveText { path, range } => {
            let text_node = text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start < end {
                text_node.text.replace_range(start..end, "");
                for point in [&mut selection.anchor, &mut selection.focus] {
                    if point.path != path || point.offset <= start {
                        continue;
                    }
                    point.offset = if point.offset >= end {
                        point.offset - (end - start)
                    } else {
                        start
                    };
                }
            }
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            for point in [&mut selection.anchor, &mut selection.focus] {
                shift_point_for_insert(point, &path);
            }
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            for point in [&mut selection.anchor, &mut selection.focus] {
                if shift_point_for_remove(point, &path) {
                    relocate_point_from_removed(point, &path, &removed, doc);
                }
            }
        }
        Op::MoveNode { path, to } => {
            let node = remove_node(doc, &path)?;
            insert_node(doc, &to, node)?;
            for point in [&mut selection.anchor, &mut selection.focus] {
                if point.path.starts_with(&path) {
                    let suffix = point.path.split_off(path.len());
                    point.path = to.clone();
                    point.path.extend(suffix);
                } else {
                    shift_point_for_remove(point, &path);
                    shift_point_for_insert(point, &to);
                }
            }
        }
        Op::SetNodeAttrs { path, patch } => match node_mut(doc, &path)? {
            Node::Element(el) => patch_apply(&mut el.attrs, &patch),
            Node::Void(v) => patch_apply(&mut v.attrs, &patch),
            Node::Text(_) => return Err(ApplyError::InvalidPath("Text has no attrs".into())),
        },
        Op::SetTextMarks { path, marks } => {
            text_mut(doc, &path)?.marks = marks;
        }
    }
    Ok(())
}

pub(crate) fn clamp_to_char_boundary(s: &str, ix: usize) -> usize {
    let mut ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn shift_point_for_insert(point: &mut Point, path: &[usize]) {
    let Some((&index, parent)) = path.split_last() else {
        return;
    };
    let depth = parent.len();
    if point.path.len() > depth && point.path.starts_with(parent) && point.path[depth] >= index {
        point.path[depth] += 1;
    }
}

/// Shifts a point past a removed sibling. Returns true when the point was inside the removed
/// subtree and still needs relocating.
fn shift_point_for_remove(point: &mut Point, path: &[usize]) -> bool {
    let Some((&index, parent)) = path.split_last() else {
        return false;
    };
    let depth = parent.len();
    if point.path.len() <= depth || !point.path.starts_with(parent) {
        return false;
    }
    let ix = point.path[depth];
    if ix > index {
        point.path[depth] = ix - 1;
        return false;
    }
    ix == index
}

fn relocate_point_from_removed(
    point: &mut Point,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    let depth = path.len() - 1;
    let index = path[depth];
    let left_index = index.checked_sub(1);

    // A text leaf merged into its left sibling keeps its caret at the same character.
    if let (Node::Text(removed_text), Some(left_index)) = (removed, left_index) {
        let mut left_path = path.to_vec();
        left_path[depth] = left_index;
        if let Some(left) = doc_after_remove.text_node(&left_path)
            && left.marks == removed_text.marks
            && left.text.ends_with(&removed_text.text)
        {
            let prefix = left.text.len() - removed_text.text.len();
            point.offset = prefix + point.offset.min(removed_text.text.len());
            point.path = left_path;
            return;
        }
    }

    point.path.truncate(depth + 1);
    point.path[depth] = left_index.unwrap_or(0);
    point.offset = 0;
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| ApplyError::InvalidPath("Empty path".into()))?;
    let mut node = doc
        .children
        .get_mut(*first)
        .ok_or_else(|| ApplyError::InvalidPath(format!("Path out of bounds: {path:?}")))?;
    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => el
                .children
                .get_mut(ix)
                .ok_or_else(|| ApplyError::InvalidPath(format!("Path out of bounds: {path:?}")))?,
            Node::Void(v) => {
                return Err(SchemaViolation::InsideAtomic {
                    kind: v.kind.name(),
                    path: path[..=depth].to_vec(),
                }
                .into());
            }
            Node::Text(_) => {
                return Err(ApplyError::InvalidPath(format!(
                    "Text node at depth {depth} has no children"
                )));
            }
        };
    }
    Ok(node)
}

fn text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(ApplyError::InvalidPath(format!(
            "Expected text node at {path:?}"
        ))),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, ApplyError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(v) => Err(SchemaViolation::InsideAtomic {
            kind: v.kind.name(),
            path: parent_path.to_vec(),
        }
        .into()),
        Node::Text(_) => Err(ApplyError::InvalidPath(format!(
            "Text node at {parent_path:?} cannot hold children"
        ))),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), ApplyError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| ApplyError::InvalidPath("Empty insert path".into()))?;
    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(ApplyError::InvalidPath(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, ApplyError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| ApplyError::InvalidPath("Empty remove path".into()))?;
    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(ApplyError::InvalidPath(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) {
    for (k, v) in &patch.set {
        attrs.insert(k.clone(), v.clone());
    }
    for key in &patch.remove {
        attrs.remove(key);
    }
}
