use block_editor_core::{
    Editor, Node, NodeRole, Path, Region, Selection, Transaction, ViewTree, parse_fragment,
};
use tracing::debug;

use crate::common::{Slot, retarget, slot_after_removal, slot_for_point};
use crate::resolver::{DropLocation, PositionResolver};
use crate::snippet::Snippet;

/// Drag data key under which snippet markup travels.
pub const SNIPPET_KEY: &str = "snippet";

/// What is currently being dragged. The controller holds at most one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    /// Keyed textual data, as set by a palette or an external source.
    Data { key: String, value: String },
    /// A document node picked up by a drag handle.
    Node { path: Path },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropRejection {
    #[error("nothing is being dragged")]
    NoPayload,
    #[error("drag data under key {0:?} is not a snippet")]
    UnknownKey(String),
    #[error("drop location does not resolve to a text position")]
    UnresolvableTarget,
    #[error("malformed snippet markup: {0}")]
    MalformedPayload(String),
    #[error("snippet markup holds no blocks")]
    EmptyPayload,
    #[error("no ancestor of the drop position accepts the dropped nodes")]
    NoAcceptingParent,
    #[error("a node cannot be dropped inside itself")]
    IntoOwnSubtree,
    #[error("dragged node no longer exists at {0:?}")]
    MissingNode(Path),
    #[error("node at {0:?} is not a block")]
    NotABlock(Path),
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Snippet nodes inserted starting at `at`.
    Inserted { at: Path, count: usize },
    /// The dragged node now lives at `to`.
    Moved { from: Path, to: Path },
    Rejected(DropRejection),
}

impl DropOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, DropOutcome::Rejected(_))
    }
}

/// Owns the single drag payload slot and turns drops into document transactions.
#[derive(Debug, Default)]
pub struct DndController {
    payload: Option<DragPayload>,
}

impl DndController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        self.payload.as_ref()
    }

    pub fn on_snippet_drag_start(&mut self, snippet: &Snippet) {
        debug!(snippet = %snippet.id, "snippet drag start");
        self.set_data(SNIPPET_KEY, snippet.fragment.clone());
    }

    /// Keyed data from a drag the host started itself; replaces any current payload.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.payload = Some(DragPayload::Data {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Pointer-down at `view_path` of `view`. Only a drag handle starts a drag; returns the
    /// path of the node picked up.
    pub fn on_handle_drag_start(&mut self, view: &ViewTree, view_path: &[usize]) -> Option<Path> {
        let hit = view.hit(view_path)?;
        match hit.region {
            Some((Region::DragHandle, owner)) => {
                debug!(path = ?owner, "block drag start");
                self.payload = Some(DragPayload::Node {
                    path: owner.clone(),
                });
                Some(owner)
            }
            _ => None,
        }
    }

    /// Drag started from the editor-wide handle the host shows beside the hovered block.
    /// Any block-role node can be picked up; the current payload is kept on refusal.
    pub fn on_block_drag_start(&mut self, editor: &Editor, path: Path) -> Result<(), DropRejection> {
        let node = editor
            .doc()
            .node(&path)
            .ok_or_else(|| DropRejection::MissingNode(path.clone()))?;
        let role = node
            .kind()
            .and_then(|kind| editor.registry().node_spec(kind))
            .map(|spec| spec.role);
        if role != Some(NodeRole::Block) {
            return Err(DropRejection::NotABlock(path));
        }
        debug!(?path, "block drag start");
        self.payload = Some(DragPayload::Node { path });
        Ok(())
    }

    pub fn on_drag_end(&mut self) {
        self.payload = None;
    }

    /// Drops the current payload at `location`. The payload slot is emptied whatever the outcome.
    pub fn on_drop(
        &mut self,
        editor: &mut Editor,
        location: DropLocation,
        resolver: &dyn PositionResolver,
    ) -> DropOutcome {
        let outcome = match self.payload.take() {
            None => Err(DropRejection::NoPayload),
            Some(DragPayload::Data { key, value }) if key == SNIPPET_KEY => {
                drop_snippet(editor, &value, location, resolver)
            }
            Some(DragPayload::Data { key, .. }) => Err(DropRejection::UnknownKey(key)),
            Some(DragPayload::Node { path }) => move_node(editor, path, location, resolver),
        };
        match outcome {
            Ok(outcome) => outcome,
            Err(reason) => {
                debug!(?location, %reason, "drop rejected");
                DropOutcome::Rejected(reason)
            }
        }
    }
}

fn resolve_slot(
    editor: &Editor,
    location: DropLocation,
    resolver: &dyn PositionResolver,
) -> Result<Slot, DropRejection> {
    resolver
        .resolve(editor.doc(), location)
        .and_then(|point| slot_for_point(editor.doc(), &point))
        .ok_or(DropRejection::UnresolvableTarget)
}

fn drop_snippet(
    editor: &mut Editor,
    markup: &str,
    location: DropLocation,
    resolver: &dyn PositionResolver,
) -> Result<DropOutcome, DropRejection> {
    let nodes =
        parse_fragment(markup).map_err(|err| DropRejection::MalformedPayload(err.to_string()))?;
    if nodes.is_empty() {
        return Err(DropRejection::EmptyPayload);
    }
    let slot = resolve_slot(editor, location, resolver)?;
    let slot = retarget(editor.doc(), slot, &nodes, editor.registry())
        .ok_or(DropRejection::NoAcceptingParent)?;

    let count = nodes.len();
    let mut tx = Transaction::builder().source("dnd:snippet");
    for (offset, node) in nodes.into_iter().enumerate() {
        let mut path = slot.parent.clone();
        path.push(slot.index + offset);
        tx = tx.insert_node(path, node);
    }
    let tx = tx.build();

    // Caret goes to the end of the last inserted block.
    let mut last = slot.parent.clone();
    last.push(slot.index + count - 1);
    let preview = editor
        .preview_transaction(&tx)
        .map_err(|err| DropRejection::Rejected(err.to_string()))?;
    let tx = match preview.doc.last_text_point_at(&last) {
        Some(point) => tx.selection_after(Selection::collapsed(point)),
        None => tx,
    };
    apply(editor, tx)?;

    debug!(at = ?slot.path(), count, "snippet dropped");
    Ok(DropOutcome::Inserted {
        at: slot.path(),
        count,
    })
}

fn move_node(
    editor: &mut Editor,
    from: Path,
    location: DropLocation,
    resolver: &dyn PositionResolver,
) -> Result<DropOutcome, DropRejection> {
    let node: Node = editor
        .doc()
        .node(&from)
        .cloned()
        .ok_or_else(|| DropRejection::MissingNode(from.clone()))?;
    let slot = resolve_slot(editor, location, resolver)?;
    if slot.parent.starts_with(&from) {
        return Err(DropRejection::IntoOwnSubtree);
    }
    let slot = retarget(editor.doc(), slot, std::slice::from_ref(&node), editor.registry())
        .ok_or(DropRejection::NoAcceptingParent)?;
    let to = slot_after_removal(&from, &slot)
        .ok_or(DropRejection::IntoOwnSubtree)?
        .path();

    let tx = Transaction::builder()
        .move_node(from.clone(), to.clone())
        .source("dnd:move")
        .build();
    apply(editor, tx)?;

    debug!(?from, ?to, "block moved");
    Ok(DropOutcome::Moved { from, to })
}

fn apply(editor: &mut Editor, tx: Transaction) -> Result<(), DropRejection> {
    editor
        .apply(tx)
        .map_err(|err| DropRejection::Rejected(err.to_string()))
}

