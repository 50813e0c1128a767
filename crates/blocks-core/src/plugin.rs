use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::blocks::{
    DraggableItemPlugin, HeadingPlugin, HorizontalRulePlugin, ImagePlugin, ListPlugin,
    MentionPlugin, TextAlignPlugin,
};
use crate::core::{Document, Editor, Node, NodeKind, Point, Selection};
use crate::marks::MarksPlugin;
use crate::normalize::CoreNormalizePlugin;
use crate::ops::{Op, Path, Transaction};
use crate::schema::{AttrRule, AttrSpec, ContentRule, NodeRole, NodeSpec, TEXT_ALIGNMENTS};
use crate::table::TablePlugin;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CommandHandler =
    Arc<dyn Fn(&Editor, Option<&Value>) -> Result<Transaction, CommandError> + Send + Sync>;

pub type ActiveHandler = Arc<dyn Fn(&Editor, Option<&Value>) -> bool + Send + Sync>;

pub type QueryHandler =
    Arc<dyn Fn(&Editor, Option<&Value>) -> Result<Value, QueryError> + Send + Sync>;

/// A named command. The handler only builds a transaction; the editor decides whether to apply it.
#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub handler: CommandHandler,
    pub active: Option<ActiveHandler>,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&Editor, Option<&Value>) -> Result<Transaction, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
            active: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }

    pub fn active(
        mut self,
        active: impl Fn(&Editor, Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.active = Some(Arc::new(active));
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<&Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Selection,
}

pub trait BlockPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<NodeKind, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn BlockPlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Paragraphs and normalization only.
    pub fn core() -> Self {
        let plugins: Vec<Box<dyn BlockPlugin>> =
            vec![Box::new(CoreParagraphPlugin), Box::new(CoreNormalizePlugin)];
        Self::new(plugins).expect("core registry must be valid")
    }

    /// Every node kind and command of the block editor.
    pub fn blocks() -> Self {
        let plugins: Vec<Box<dyn BlockPlugin>> = vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(MarksPlugin),
            Box::new(HeadingPlugin),
            Box::new(ListPlugin),
            Box::new(TextAlignPlugin),
            Box::new(ImagePlugin),
            Box::new(HorizontalRulePlugin),
            Box::new(TablePlugin),
            Box::new(DraggableItemPlugin),
            Box::new(MentionPlugin),
        ];
        Self::new(plugins).expect("block registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn BlockPlugin>) -> Result<(), String> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(format!("Duplicate node spec kind: {}", spec.kind));
            }
            self.node_specs.insert(spec.kind, spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<NodeKind, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: NodeKind) -> Option<&NodeSpec> {
        self.node_specs.get(&kind)
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Snaps both ends of `selection` onto existing text leaves.
    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = doc
            .first_text_point()
            .unwrap_or_else(|| Point::new(vec![0], 0));

        let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
            normalize_point_to_existing_text(doc, &selection.focus)
                .unwrap_or_else(|| fallback.clone())
        });
        let focus = normalize_point_to_existing_text(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Path = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point::new(
                    resolved_path,
                    crate::core::clamp_to_char_boundary(&t.text, point.offset),
                ));
            }
            Node::Element(el) => children = &el.children,
            Node::Void(_) => break,
        }
    }

    match doc.node(&resolved_path)? {
        Node::Text(t) => Some(Point::new(
            resolved_path,
            crate::core::clamp_to_char_boundary(&t.text, point.offset),
        )),
        Node::Element(_) => doc.first_text_point_at(&resolved_path),
        // The caret never rests on a void; use the nearest text sibling.
        Node::Void(_) => {
            let (&ix, parent) = resolved_path.split_last()?;
            let siblings = doc.children_at(parent)?;
            let text_sibling = |j: usize| matches!(siblings.get(j), Some(Node::Text(_)));
            if ix + 1 < siblings.len() && text_sibling(ix + 1) {
                let mut path = parent.to_vec();
                path.push(ix + 1);
                return Some(Point::new(path, 0));
            }
            if ix > 0 && text_sibling(ix - 1) {
                let mut path = parent.to_vec();
                path.push(ix - 1);
                return doc.last_text_point_at(&path);
            }
            None
        }
    }
}

/// Parent path and index of the slot directly after the block at `block_path`.
pub(crate) fn slot_after(block_path: &[usize]) -> Option<(Path, usize)> {
    let (&ix, parent) = block_path.split_last()?;
    Some((parent.to_vec(), ix + 1))
}

pub(crate) fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

/// Path of the textblock holding the caret.
pub(crate) fn focus_textblock_path(editor: &Editor) -> Result<Path, CommandError> {
    let focus = &editor.selection().focus;
    let block_path = focus.block_path();
    match editor.doc().element(block_path) {
        Some(el) if el.kind.is_textblock() => Ok(block_path.to_vec()),
        _ => Err(CommandError::new("Selection is not in a text block")),
    }
}

pub(crate) fn arg_str<'a>(args: Option<&'a Value>, name: &str) -> Option<&'a str> {
    args.and_then(|v| v.get(name)).and_then(Value::as_str)
}

pub(crate) fn arg_u64(args: Option<&Value>, name: &str) -> Option<u64> {
    args.and_then(|v| v.get(name)).and_then(Value::as_u64)
}

pub(crate) fn arg_bool(args: Option<&Value>, name: &str) -> Option<bool> {
    args.and_then(|v| v.get(name)).and_then(Value::as_bool)
}

pub(crate) struct CoreParagraphPlugin;

impl BlockPlugin for CoreParagraphPlugin {
    fn id(&self) -> &'static str {
        "core.paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeKind::Paragraph, NodeRole::Block, ContentRule::Inline)
                .attr(AttrSpec::optional("textAlign", AttrRule::OneOf(TEXT_ALIGNMENTS))),
        ]
    }
}
