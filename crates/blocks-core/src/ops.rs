use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Marks, Node, Selection};

pub type Path = Vec<usize>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut set = Attrs::default();
        set.insert(name.into(), value.into());
        Self {
            set,
            remove: Vec::new(),
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            set: Attrs::default(),
            remove: vec![name.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    /// Moves the subtree at `path`; `to` is addressed after the removal.
    MoveNode {
        #[serde(default)]
        path: Path,
        to: Path,
    },
    SetNodeAttrs {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
    SetTextMarks {
        #[serde(default)]
        path: Path,
        marks: Marks,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    /// Marks applied to the next typed text when the caret is collapsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_marks: Option<Marks>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            stored_marks: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn builder() -> TransactionBuilder {
        TransactionBuilder::default()
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.selection_after.is_none() && self.stored_marks.is_none()
    }
}

/// Accumulates ops into a [`Transaction`] value without touching any editor.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    tx: Transaction,
}

impl TransactionBuilder {
    pub fn op(mut self, op: Op) -> Self {
        self.tx.ops.push(op);
        self
    }

    pub fn ops(mut self, ops: impl IntoIterator<Item = Op>) -> Self {
        self.tx.ops.extend(ops);
        self
    }

    pub fn insert_text(self, path: Path, offset: usize, text: impl Into<String>) -> Self {
        self.op(Op::InsertText {
            path,
            offset,
            text: text.into(),
        })
    }

    pub fn remove_text(self, path: Path, range: Range<usize>) -> Self {
        self.op(Op::RemoveText { path, range })
    }

    pub fn insert_node(self, path: Path, node: Node) -> Self {
        self.op(Op::InsertNode { path, node })
    }

    pub fn remove_node(self, path: Path) -> Self {
        self.op(Op::RemoveNode { path })
    }

    pub fn move_node(self, path: Path, to: Path) -> Self {
        self.op(Op::MoveNode { path, to })
    }

    pub fn set_attrs(self, path: Path, patch: AttrPatch) -> Self {
        self.op(Op::SetNodeAttrs { path, patch })
    }

    pub fn set_marks(self, path: Path, marks: Marks) -> Self {
        self.op(Op::SetTextMarks { path, marks })
    }

    /// Replaces the node at `path` with `node` in place.
    pub fn replace_node(self, path: Path, node: Node) -> Self {
        self.remove_node(path.clone()).insert_node(path, node)
    }

    pub fn selection_after(mut self, selection: Selection) -> Self {
        self.tx.selection_after = Some(selection);
        self
    }

    pub fn stored_marks(mut self, marks: Option<Marks>) -> Self {
        self.tx.stored_marks = marks;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.tx.meta.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tx.ops.is_empty()
    }

    pub fn build(self) -> Transaction {
        self.tx
    }
}
