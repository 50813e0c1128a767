use serde_json::Value;

use crate::core::{Attrs, Document, Node, NodeKind};
use crate::ops::Path;
use crate::plugin::PluginRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// May appear at the document root and inside block containers.
    Block,
    /// May appear inside textblocks next to text leaves.
    Inline,
    /// Only valid under a specific parent (list items, table rows and cells).
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRule {
    /// Void node, no children at all.
    Empty,
    /// Text leaves and inline nodes, zero or more.
    Inline,
    /// Block-role nodes, one or more.
    Blocks,
    /// Only the listed kinds, at least `min` of them.
    Only {
        kinds: &'static [NodeKind],
        min: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrRule {
    NonEmptyString,
    String,
    IntRange { min: u64, max: u64 },
    OneOf(&'static [&'static str]),
    /// Any CSS color value that cannot break out of a `style` declaration.
    Color,
}

impl AttrRule {
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            AttrRule::NonEmptyString => match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                Some(_) => Err("must not be empty".into()),
                None => Err("must be a string".into()),
            },
            AttrRule::String => value
                .as_str()
                .map(|_| ())
                .ok_or_else(|| "must be a string".into()),
            AttrRule::IntRange { min, max } => match value.as_u64() {
                Some(n) if (*min..=*max).contains(&n) => Ok(()),
                _ => Err(format!("must be an integer in {min}..={max}")),
            },
            AttrRule::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                _ => Err(format!("must be one of {}", allowed.join(", "))),
            },
            AttrRule::Color => match value.as_str() {
                Some(s) if is_color(s) => Ok(()),
                _ => Err("must be a color".into()),
            },
        }
    }
}

fn is_color(s: &str) -> bool {
    !s.trim().is_empty() && !s.contains([';', '"', '<', '>'])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub required: bool,
    pub rule: AttrRule,
}

impl AttrSpec {
    pub fn required(name: &'static str, rule: AttrRule) -> Self {
        Self {
            name,
            required: true,
            rule,
        }
    }

    pub fn optional(name: &'static str, rule: AttrRule) -> Self {
        Self {
            name,
            required: false,
            rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub role: NodeRole,
    pub content: ContentRule,
    pub attrs: Vec<AttrSpec>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, role: NodeRole, content: ContentRule) -> Self {
        Self {
            kind,
            role,
            content,
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.content == ContentRule::Empty
    }
}

pub const TEXT_ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("document must contain at least one block")]
    EmptyDocument,
    #[error("{child} is not allowed inside {parent} at {path:?}")]
    DisallowedChild {
        parent: &'static str,
        child: &'static str,
        path: Path,
    },
    #[error("{kind} at {path:?} needs at least {min} child node(s)")]
    EmptyContent {
        kind: &'static str,
        path: Path,
        min: usize,
    },
    #[error("{kind} at {path:?} is atomic and cannot hold content")]
    InsideAtomic { kind: &'static str, path: Path },
    #[error("{kind}.{name} at {path:?} {reason}")]
    InvalidAttr {
        kind: &'static str,
        name: String,
        reason: String,
        path: Path,
    },
    #[error("{kind} at {path:?} has no registered node spec")]
    UnknownKind { kind: &'static str, path: Path },
}

/// Whether `child` may sit directly under a parent with `rule`.
pub fn child_allowed(rule: &ContentRule, child: &Node, registry: &PluginRegistry) -> bool {
    match rule {
        ContentRule::Empty => false,
        ContentRule::Inline => match child.kind() {
            None => true,
            Some(kind) => registry
                .node_spec(kind)
                .is_some_and(|spec| spec.role == NodeRole::Inline),
        },
        ContentRule::Blocks => child.kind().is_some_and(|kind| {
            registry
                .node_spec(kind)
                .is_some_and(|spec| spec.role == NodeRole::Block)
        }),
        ContentRule::Only { kinds, .. } => child.kind().is_some_and(|kind| kinds.contains(&kind)),
    }
}

fn min_children(rule: &ContentRule) -> usize {
    match rule {
        ContentRule::Empty | ContentRule::Inline => 0,
        ContentRule::Blocks => 1,
        ContentRule::Only { min, .. } => *min,
    }
}

/// Content rule of the node at `parent_path`; the empty path is the document root.
pub fn content_rule_at(
    doc: &Document,
    parent_path: &[usize],
    registry: &PluginRegistry,
) -> Option<ContentRule> {
    if parent_path.is_empty() {
        return Some(ContentRule::Blocks);
    }
    let kind = doc.node(parent_path)?.kind()?;
    registry.node_spec(kind).map(|spec| spec.content.clone())
}

/// Whether every node of `nodes` may be inserted under the node at `parent_path`.
pub fn accepts_all(
    doc: &Document,
    parent_path: &[usize],
    nodes: &[Node],
    registry: &PluginRegistry,
) -> bool {
    content_rule_at(doc, parent_path, registry)
        .is_some_and(|rule| nodes.iter().all(|node| child_allowed(&rule, node, registry)))
}

pub fn validate_document(doc: &Document, registry: &PluginRegistry) -> Result<(), SchemaViolation> {
    if doc.children.is_empty() {
        return Err(SchemaViolation::EmptyDocument);
    }
    let mut path = Vec::new();
    validate_children(
        "doc",
        &ContentRule::Blocks,
        &doc.children,
        &mut path,
        registry,
    )
}

fn validate_children(
    parent: &'static str,
    rule: &ContentRule,
    children: &[Node],
    path: &mut Vec<usize>,
    registry: &PluginRegistry,
) -> Result<(), SchemaViolation> {
    if children.len() < min_children(rule) {
        return Err(SchemaViolation::EmptyContent {
            kind: parent,
            path: path.clone(),
            min: min_children(rule),
        });
    }

    for (ix, child) in children.iter().enumerate() {
        path.push(ix);
        if *rule == ContentRule::Empty {
            return Err(SchemaViolation::InsideAtomic {
                kind: parent,
                path: path[..path.len() - 1].to_vec(),
            });
        }
        if !child_allowed(rule, child, registry) {
            return Err(SchemaViolation::DisallowedChild {
                parent,
                child: child.type_name(),
                path: path.clone(),
            });
        }
        validate_node(child, path, registry)?;
        path.pop();
    }
    Ok(())
}

fn validate_node(
    node: &Node,
    path: &mut Vec<usize>,
    registry: &PluginRegistry,
) -> Result<(), SchemaViolation> {
    let Some(kind) = node.kind() else {
        return Ok(());
    };
    let spec = registry
        .node_spec(kind)
        .ok_or_else(|| SchemaViolation::UnknownKind {
            kind: kind.name(),
            path: path.clone(),
        })?;

    if let Some(attrs) = node.attrs() {
        validate_attrs(spec, attrs, path)?;
    }

    match node {
        Node::Element(el) => validate_children(kind.name(), &spec.content, &el.children, path, registry),
        Node::Void(_) if !spec.is_atomic() => Err(SchemaViolation::EmptyContent {
            kind: kind.name(),
            path: path.clone(),
            min: min_children(&spec.content).max(1),
        }),
        Node::Void(_) | Node::Text(_) => Ok(()),
    }
}

fn validate_attrs(spec: &NodeSpec, attrs: &Attrs, path: &[usize]) -> Result<(), SchemaViolation> {
    for attr in &spec.attrs {
        let invalid = |reason: String| SchemaViolation::InvalidAttr {
            kind: spec.kind.name(),
            name: attr.name.to_string(),
            reason,
            path: path.to_vec(),
        };
        match attrs.get(attr.name) {
            None | Some(Value::Null) if attr.required => {
                return Err(invalid("is required".into()));
            }
            None | Some(Value::Null) => {}
            Some(value) => attr.rule.check(value).map_err(invalid)?,
        }
    }
    Ok(())
}
