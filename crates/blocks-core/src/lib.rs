mod blocks;
mod config;
mod core;
mod html;
mod marks;
mod normalize;
mod ops;
mod plugin;
mod schema;
mod serde_value;
mod table;
mod view;

pub use crate::blocks::{BlockType, active_block_type, replace_with_mention};
pub use crate::config::EditorConfig;
pub use crate::core::*;
pub use crate::html::{ParseError, parse_document, parse_fragment, serialize_document, serialize_nodes};
pub use crate::marks::{active_marks, mark_is_active};
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::{
    AttrRule, AttrSpec, ContentRule, NodeRole, NodeSpec, SchemaViolation, TEXT_ALIGNMENTS, accepts_all,
    child_allowed, content_rule_at, validate_document,
};
pub use crate::serde_value::*;
pub use crate::view::{Hit, Region, ViewElement, ViewNode, ViewText, ViewTree, render_node};
