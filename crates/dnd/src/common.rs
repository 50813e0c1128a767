use block_editor_core::{Document, Node, Path, PluginRegistry, Point, accepts_all};

/// Insertion slot: parent path plus child index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub parent: Path,
    pub index: usize,
}

impl Slot {
    pub fn path(&self) -> Path {
        let mut path = self.parent.clone();
        path.push(self.index);
        path
    }

    /// The slot directly after the node at `path`.
    fn after(path: &[usize]) -> Option<Self> {
        let (&ix, parent) = path.split_last()?;
        Some(Self {
            parent: parent.to_vec(),
            index: ix + 1,
        })
    }
}

/// Slot next to the textblock holding `point`: before it when the point is at the block's very
/// start, after it otherwise. `None` when the point does not address text in a textblock.
pub(crate) fn slot_for_point(doc: &Document, point: &Point) -> Option<Slot> {
    let block_path = point.block_path();
    let block = doc.element(block_path).filter(|el| el.kind.is_textblock())?;
    let leaf_ix = *point.path.last()?;
    let Some(Node::Text(_)) = block.children.get(leaf_ix) else {
        return None;
    };
    let at_start = point.offset == 0
        && block.children[..leaf_ix]
            .iter()
            .all(|node| matches!(node, Node::Text(t) if t.text.is_empty()));

    let (&block_ix, parent) = block_path.split_last()?;
    Some(Slot {
        parent: parent.to_vec(),
        index: if at_start { block_ix } else { block_ix + 1 },
    })
}

/// Walks up from `slot` until a parent accepts every node of `nodes`.
pub(crate) fn retarget(
    doc: &Document,
    mut slot: Slot,
    nodes: &[Node],
    registry: &PluginRegistry,
) -> Option<Slot> {
    loop {
        if accepts_all(doc, &slot.parent, nodes, registry) {
            return Some(slot);
        }
        slot = Slot::after(&slot.parent)?;
    }
}

/// Index a node at `from_ix` ends up at when dropped into the gap before `gap_index` of the
/// same parent, once it has been taken out.
pub(crate) fn index_after_removal(from_ix: usize, gap_index: usize) -> usize {
    if gap_index > from_ix {
        gap_index - 1
    } else {
        gap_index
    }
}

/// Re-addresses `slot` (given before the node at `from` is removed) in the coordinates that
/// remain after removal. `None` when the slot lies inside the moved subtree.
pub(crate) fn slot_after_removal(from: &[usize], slot: &Slot) -> Option<Slot> {
    if slot.parent.starts_with(from) {
        return None;
    }
    let (&from_ix, from_parent) = from.split_last()?;
    let depth = from_parent.len();

    let mut parent = slot.parent.clone();
    let mut index = slot.index;
    if parent.as_slice() == from_parent {
        index = index_after_removal(from_ix, index);
    } else if parent.len() > depth && parent.starts_with(from_parent) && parent[depth] > from_ix {
        parent[depth] -= 1;
    }
    Some(Slot { parent, index })
}
