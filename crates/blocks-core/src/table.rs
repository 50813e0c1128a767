use serde_json::{Value, json};

use crate::core::{Attrs, Editor, ElementNode, Node, NodeKind, Point, Selection};
use crate::ops::{AttrPatch, Path, Transaction};
use crate::plugin::{
    BlockPlugin, CommandError, CommandSpec, QueryError, QuerySpec, arg_bool, arg_str, arg_u64,
    child_path, focus_textblock_path, slot_after,
};
use crate::schema::{AttrRule, AttrSpec, ContentRule, NodeRole, NodeSpec};

const CELL_KINDS: &[NodeKind] = &[NodeKind::TableCell, NodeKind::TableHeader];
const MAX_TABLE_SIZE: u64 = 64;
const SPAN_RULE: AttrRule = AttrRule::IntRange {
    min: 1,
    max: MAX_TABLE_SIZE,
};

pub(crate) struct TablePlugin;

impl BlockPlugin for TablePlugin {
    fn id(&self) -> &'static str {
        "table"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        let cell = |kind| {
            NodeSpec::new(kind, NodeRole::Structural, ContentRule::Blocks)
                .attr(AttrSpec::optional("colspan", SPAN_RULE))
                .attr(AttrSpec::optional("rowspan", SPAN_RULE))
                .attr(AttrSpec::optional("backgroundColor", AttrRule::Color))
        };
        vec![
            NodeSpec::new(
                NodeKind::Table,
                NodeRole::Block,
                ContentRule::Only {
                    kinds: &[NodeKind::TableRow],
                    min: 1,
                },
            ),
            NodeSpec::new(
                NodeKind::TableRow,
                NodeRole::Structural,
                ContentRule::Only {
                    kinds: CELL_KINDS,
                    min: 0,
                },
            ),
            cell(NodeKind::TableCell),
            cell(NodeKind::TableHeader),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let in_table = |editor: &Editor, _args: Option<&Value>| table_path_for_focus(editor).is_some();
        vec![
            CommandSpec::new("table.insert", "Insert table", |editor, args| {
                let config = editor.config();
                let rows = arg_u64(args, "rows")
                    .unwrap_or(config.default_table_rows as u64)
                    .clamp(1, MAX_TABLE_SIZE) as usize;
                let cols = arg_u64(args, "cols")
                    .unwrap_or(config.default_table_cols as u64)
                    .clamp(1, MAX_TABLE_SIZE) as usize;
                let with_header_row = arg_bool(args, "withHeaderRow").unwrap_or(true);
                insert_table(editor, rows, cols, with_header_row)
            })
            .description("Insert a table after the active block.")
            .keywords(["table", "grid"])
            .args_example(json!({ "rows": 3, "cols": 3, "withHeaderRow": true })),
            grid_command("table.add_row_before", "Add row before", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.insert_row(row);
                Ok((row + 1, col))
            })
            .active(in_table),
            grid_command("table.add_row_after", "Add row after", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.insert_row(grid.cells[cell].bottom());
                Ok((row, col))
            })
            .active(in_table),
            grid_command("table.delete_row", "Delete row", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.delete_rows(row, grid.cells[cell].bottom())?;
                Ok((row.min(grid.height - 1), col))
            })
            .active(in_table),
            grid_command("table.add_column_before", "Add column before", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.insert_col(col);
                Ok((row, col + 1))
            })
            .active(in_table),
            grid_command("table.add_column_after", "Add column after", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.insert_col(grid.cells[cell].right());
                Ok((row, col))
            })
            .active(in_table),
            grid_command("table.delete_column", "Delete column", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.delete_cols(col, grid.cells[cell].right())?;
                Ok((row, col.min(grid.width - 1)))
            })
            .active(in_table),
            CommandSpec::new("table.delete_table", "Delete table", |editor, _args| {
                delete_table(editor)
            })
            .description("Replace the current table with an empty paragraph.")
            .keywords(["table", "delete", "remove"])
            .active(in_table),
            CommandSpec::new("table.merge_cells", "Merge cells", |editor, _args| {
                merge_cells(editor)
            })
            .description("Merge every cell between the selection anchor and focus.")
            .keywords(["table", "merge", "cells"])
            .active(in_table),
            grid_command("table.split_cell", "Split cell", |grid, cell| {
                let GridCell { row, col, .. } = grid.cells[cell];
                grid.split(cell)?;
                Ok((row, col))
            })
            .active(in_table),
            CommandSpec::new("table.set_cell_attribute", "Set cell attribute", |editor, args| {
                let name = arg_str(args, "name").ok_or_else(|| CommandError::new("Missing args.name"))?;
                let value = args
                    .and_then(|v| v.get("value"))
                    .cloned()
                    .unwrap_or(Value::Null);
                set_cell_attribute(editor, name, value)
            })
            .description("Set an attribute on the selected cells; a null value removes it.")
            .keywords(["table", "cell", "background", "color"])
            .args_example(json!({ "name": "backgroundColor", "value": "#FAF594" }))
            .active(in_table),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("table.is_active", |editor, _args| {
            Ok::<_, QueryError>(Value::Bool(table_path_for_focus(editor).is_some()))
        })]
    }
}

/// Grid edit on the focused cell; returns the `(row, col)` slot that receives the caret.
type GridEdit = dyn Fn(&mut TableGrid, usize) -> Result<(usize, usize), CommandError>;

fn grid_command(
    id: &'static str,
    label: &'static str,
    edit: impl Fn(&mut TableGrid, usize) -> Result<(usize, usize), CommandError> + Send + Sync + 'static,
) -> CommandSpec {
    CommandSpec::new(id, label, move |editor, _args| {
        edit_table(editor, id, &edit)
    })
    .keywords(["table", "row", "column", "cell"])
}

fn cell_node(kind: NodeKind) -> Node {
    Node::element(kind, vec![Node::paragraph("")])
}

fn table_node(rows: usize, cols: usize, with_header_row: bool) -> Node {
    let row = |r: usize| {
        let kind = if with_header_row && r == 0 {
            NodeKind::TableHeader
        } else {
            NodeKind::TableCell
        };
        Node::element(NodeKind::TableRow, (0..cols).map(|_| cell_node(kind)).collect())
    };
    Node::element(NodeKind::Table, (0..rows).map(row).collect())
}

fn insert_table(
    editor: &Editor,
    rows: usize,
    cols: usize,
    with_header_row: bool,
) -> Result<Transaction, CommandError> {
    let block_path = focus_textblock_path(editor)?;
    let (parent, insert_at) =
        slot_after(&block_path).ok_or_else(|| CommandError::new("No active block"))?;
    let table_path = child_path(&parent, insert_at);
    let mut caret = table_path.clone();
    caret.extend([0, 0, 0, 0]);

    Ok(Transaction::builder()
        .insert_node(table_path, table_node(rows, cols, with_header_row))
        .insert_node(child_path(&parent, insert_at + 1), Node::paragraph(""))
        .selection_after(Selection::collapsed(Point::new(caret, 0)))
        .source("command:table.insert")
        .build())
}

fn table_path_for_focus(editor: &Editor) -> Option<Path> {
    editor
        .doc()
        .ancestor_path(&editor.selection().focus.path, NodeKind::Table)
}

/// Path of the innermost table cell (data or header) containing `path`.
fn cell_path_for(editor: &Editor, path: &[usize]) -> Option<Path> {
    (1..=path.len()).rev().find_map(|len| {
        let candidate = &path[..len];
        match editor.doc().node(candidate) {
            Some(Node::Element(el)) if el.kind.is_table_cell() => Some(candidate.to_vec()),
            _ => None,
        }
    })
}

/// A cell placed on the table grid: top-left slot plus span.
#[derive(Debug, Clone, PartialEq)]
struct GridCell {
    row: usize,
    col: usize,
    rowspan: usize,
    colspan: usize,
    node: ElementNode,
}

impl GridCell {
    fn bottom(&self) -> usize {
        self.row + self.rowspan
    }

    fn right(&self) -> usize {
        self.col + self.colspan
    }

    fn covers(&self, row: usize, col: usize) -> bool {
        (self.row..self.bottom()).contains(&row) && (self.col..self.right()).contains(&col)
    }
}

/// Table laid out on a rectangular grid, spans resolved.
#[derive(Debug, Clone, PartialEq)]
struct TableGrid {
    width: usize,
    height: usize,
    cells: Vec<GridCell>,
}

/// Span of a cell, clamped to the table size limit so layout stays bounded.
fn span_attr(el: &ElementNode, name: &str) -> usize {
    el.attr_u64(name).unwrap_or(1).clamp(1, MAX_TABLE_SIZE) as usize
}

impl TableGrid {
    /// Lays out `table`; also returns the grid index of every `(row, cell)` position.
    fn from_table(table: &ElementNode) -> (Self, Vec<Vec<usize>>) {
        let mut occupied: Vec<Vec<bool>> = Vec::new();
        let mut cells = Vec::new();
        let mut positions = Vec::new();
        let height = table.children.len();

        for (r, row) in table.children.iter().enumerate() {
            let mut row_positions = Vec::new();
            let mut col = 0usize;
            for cell in row.children() {
                let Node::Element(el) = cell else {
                    continue;
                };
                while occupied.get(r).and_then(|row| row.get(col)).copied().unwrap_or(false) {
                    col += 1;
                }
                let rowspan = span_attr(el, "rowspan").min(height - r);
                let colspan = span_attr(el, "colspan");
                for rr in r..r + rowspan {
                    if occupied.len() <= rr {
                        occupied.resize(rr + 1, Vec::new());
                    }
                    let slots = &mut occupied[rr];
                    if slots.len() < col + colspan {
                        slots.resize(col + colspan, false);
                    }
                    slots[col..col + colspan].fill(true);
                }
                row_positions.push(cells.len());
                cells.push(GridCell {
                    row: r,
                    col,
                    rowspan,
                    colspan,
                    node: el.clone(),
                });
                col += colspan;
            }
            positions.push(row_positions);
        }

        let width = occupied.iter().map(Vec::len).max().unwrap_or(0);
        (
            Self {
                width,
                height,
                cells,
            },
            positions,
        )
    }

    fn cell_at(&self, row: usize, col: usize) -> Option<usize> {
        self.cells.iter().position(|cell| cell.covers(row, col))
    }

    /// Header column: every placed cell touching `col` is a header. Empty slots are ignored.
    fn is_header_col(&self, col: usize) -> bool {
        self.all_headers((0..self.height).filter_map(|row| self.cell_at(row, col)))
    }

    fn is_header_row(&self, row: usize) -> bool {
        self.all_headers((0..self.width).filter_map(|col| self.cell_at(row, col)))
    }

    fn all_headers(&self, mut cells: impl Iterator<Item = usize>) -> bool {
        let is_header = |ix: usize| self.cells[ix].node.kind == NodeKind::TableHeader;
        cells.next().is_some_and(is_header) && cells.all(is_header)
    }

    fn empty_cell(row: usize, col: usize, kind: NodeKind) -> GridCell {
        GridCell {
            row,
            col,
            rowspan: 1,
            colspan: 1,
            node: ElementNode {
                kind,
                attrs: Attrs::default(),
                children: vec![Node::paragraph("")],
            },
        }
    }

    fn insert_row(&mut self, at: usize) {
        for cell in &mut self.cells {
            if cell.row >= at {
                cell.row += 1;
            } else if cell.bottom() > at {
                cell.rowspan += 1;
            }
        }
        self.height += 1;
        for col in 0..self.width {
            if self.cell_at(at, col).is_none() {
                let kind = if self.is_header_col(col) {
                    NodeKind::TableHeader
                } else {
                    NodeKind::TableCell
                };
                self.cells.push(Self::empty_cell(at, col, kind));
            }
        }
    }

    fn insert_col(&mut self, at: usize) {
        for cell in &mut self.cells {
            if cell.col >= at {
                cell.col += 1;
            } else if cell.right() > at {
                cell.colspan += 1;
            }
        }
        self.width += 1;
        for row in 0..self.height {
            if self.cell_at(row, at).is_none() {
                let kind = if self.is_header_row(row) {
                    NodeKind::TableHeader
                } else {
                    NodeKind::TableCell
                };
                self.cells.push(Self::empty_cell(row, at, kind));
            }
        }
    }

    fn delete_rows(&mut self, top: usize, bottom: usize) -> Result<(), CommandError> {
        if top == 0 && bottom >= self.height {
            return Err(CommandError::new("Cannot delete every row of a table"));
        }
        let removed = bottom - top;
        self.cells.retain_mut(|cell| {
            let overlap = cell.bottom().min(bottom).saturating_sub(cell.row.max(top));
            cell.rowspan -= overlap;
            if cell.rowspan == 0 {
                return false;
            }
            if cell.row >= bottom {
                cell.row -= removed;
            } else if cell.row >= top {
                cell.row = top;
            }
            true
        });
        self.height -= removed;
        Ok(())
    }

    fn delete_cols(&mut self, left: usize, right: usize) -> Result<(), CommandError> {
        if left == 0 && right >= self.width {
            return Err(CommandError::new("Cannot delete every column of a table"));
        }
        let removed = right - left;
        self.cells.retain_mut(|cell| {
            let overlap = cell.right().min(right).saturating_sub(cell.col.max(left));
            cell.colspan -= overlap;
            if cell.colspan == 0 {
                return false;
            }
            if cell.col >= right {
                cell.col -= removed;
            } else if cell.col >= left {
                cell.col = left;
            }
            true
        });
        self.width -= removed;
        Ok(())
    }

    fn split(&mut self, ix: usize) -> Result<(), CommandError> {
        let cell = self.cells[ix].clone();
        if cell.rowspan == 1 && cell.colspan == 1 {
            return Err(CommandError::new("Cell is not merged"));
        }
        for row in cell.row..cell.bottom() {
            for col in cell.col..cell.right() {
                if (row, col) != (cell.row, cell.col) {
                    self.cells.push(Self::empty_cell(row, col, cell.node.kind));
                }
            }
        }
        let origin = &mut self.cells[ix];
        origin.rowspan = 1;
        origin.colspan = 1;
        Ok(())
    }

    /// Smallest rectangle holding cells `a` and `b` with no cell sticking out of it.
    fn rect_around(&self, a: usize, b: usize) -> (usize, usize, usize, usize) {
        let (a, b) = (&self.cells[a], &self.cells[b]);
        let mut top = a.row.min(b.row);
        let mut left = a.col.min(b.col);
        let mut bottom = a.bottom().max(b.bottom());
        let mut right = a.right().max(b.right());
        loop {
            let mut grown = false;
            for cell in &self.cells {
                let intersects = cell.row < bottom
                    && cell.bottom() > top
                    && cell.col < right
                    && cell.right() > left;
                if !intersects {
                    continue;
                }
                if cell.row < top || cell.col < left || cell.bottom() > bottom || cell.right() > right {
                    top = top.min(cell.row);
                    left = left.min(cell.col);
                    bottom = bottom.max(cell.bottom());
                    right = right.max(cell.right());
                    grown = true;
                }
            }
            if !grown {
                return (top, left, bottom, right);
            }
        }
    }

    /// Merges every cell inside the rectangle into its top-left cell. Returns that cell.
    fn merge(&mut self, (top, left, bottom, right): (usize, usize, usize, usize)) -> Result<usize, CommandError> {
        let inside: Vec<usize> = (0..self.cells.len())
            .filter(|&ix| {
                let cell = &self.cells[ix];
                cell.row >= top && cell.bottom() <= bottom && cell.col >= left && cell.right() <= right
            })
            .collect();
        if inside.len() < 2 {
            return Err(CommandError::new("Select at least two cells to merge"));
        }
        let origin = self
            .cell_at(top, left)
            .ok_or_else(|| CommandError::new("Merged area has no top-left cell"))?;

        let mut ordered = inside.clone();
        ordered.sort_by_key(|&ix| (self.cells[ix].row, self.cells[ix].col));
        let mut content = Vec::new();
        for &ix in &ordered {
            let children = &self.cells[ix].node.children;
            let blank = matches!(children.as_slice(), [only] if only.text_content().is_empty() && only.kind() == Some(NodeKind::Paragraph));
            if !blank {
                content.extend(children.iter().cloned());
            }
        }
        if content.is_empty() {
            content.push(Node::paragraph(""));
        }

        let merged = &mut self.cells[origin];
        merged.rowspan = bottom - top;
        merged.colspan = right - left;
        merged.node.children = content;

        let mut kept = 0usize;
        let mut origin_after = 0usize;
        let mut ix = 0usize;
        self.cells.retain(|_| {
            let keep = ix == origin || !inside.contains(&ix);
            if ix == origin {
                origin_after = kept;
            }
            if keep {
                kept += 1;
            }
            ix += 1;
            keep
        });
        Ok(origin_after)
    }

    /// Rebuilds the table node; returns it with the `(row, cell)` position of every grid cell.
    fn to_table(&self, attrs: &Attrs) -> (Node, Vec<(usize, usize)>) {
        let mut order: Vec<usize> = (0..self.cells.len()).collect();
        order.sort_by_key(|&ix| (self.cells[ix].row, self.cells[ix].col));

        let mut rows: Vec<Vec<Node>> = vec![Vec::new(); self.height];
        let mut positions = vec![(0, 0); self.cells.len()];
        for ix in order {
            let cell = &self.cells[ix];
            let mut node = cell.node.clone();
            for (name, span) in [("colspan", cell.colspan), ("rowspan", cell.rowspan)] {
                if span > 1 {
                    node.attrs.insert(name.to_string(), Value::from(span));
                } else {
                    node.attrs.remove(name);
                }
            }
            positions[ix] = (cell.row, rows[cell.row].len());
            rows[cell.row].push(Node::Element(node));
        }

        let table = Node::Element(ElementNode {
            kind: NodeKind::Table,
            attrs: attrs.clone(),
            children: rows
                .into_iter()
                .map(|cells| Node::element(NodeKind::TableRow, cells))
                .collect(),
        });
        (table, positions)
    }
}

/// Resolves the focused cell, applies `edit` to the grid and replaces the table.
fn edit_table(editor: &Editor, id: &str, edit: &GridEdit) -> Result<Transaction, CommandError> {
    let focus = &editor.selection().focus;
    let table_path =
        table_path_for_focus(editor).ok_or_else(|| CommandError::new("Not in a table"))?;
    let cell_path = cell_path_for(editor, &focus.path)
        .filter(|path| path.len() == table_path.len() + 2)
        .ok_or_else(|| CommandError::new("Not in a table cell"))?;
    let table = editor
        .doc()
        .element(&table_path)
        .ok_or_else(|| CommandError::new("Invalid table"))?;

    let (mut grid, positions) = TableGrid::from_table(table);
    let depth = table_path.len();
    let focused = positions[cell_path[depth]][cell_path[depth + 1]];
    let (row, col) = edit(&mut grid, focused)?;
    let caret_cell = grid.cell_at(row, col);
    replace_table(&table_path, &grid, &table.attrs, caret_cell, id)
}

fn replace_table(
    table_path: &[usize],
    grid: &TableGrid,
    attrs: &Attrs,
    caret_cell: Option<usize>,
    id: &str,
) -> Result<Transaction, CommandError> {
    let (table, positions) = grid.to_table(attrs);
    let mut target = table_path.to_vec();
    if let Some(ix) = caret_cell {
        let (row, cell) = positions[ix];
        target.extend([row, cell]);
    }
    let point = first_point_in(&table, table_path, &target)
        .ok_or_else(|| CommandError::new("Rebuilt table has no caret position"))?;

    Ok(Transaction::builder()
        .replace_node(table_path.to_vec(), table)
        .selection_after(Selection::collapsed(point))
        .source(format!("command:{id}"))
        .build())
}

/// First text point under `target`, resolved inside the not-yet-inserted `table` at `table_path`.
fn first_point_in(table: &Node, table_path: &[usize], target: &[usize]) -> Option<Point> {
    let mut node = table;
    for &ix in &target[table_path.len()..] {
        node = node.children().get(ix)?;
    }
    let mut path = target.to_vec();
    loop {
        match node {
            Node::Text(_) => return Some(Point::new(path, 0)),
            Node::Element(el) => {
                let ix = el.children.iter().position(|child| !child.is_atomic())?;
                path.push(ix);
                node = &el.children[ix];
            }
            Node::Void(_) => return None,
        }
    }
}

fn delete_table(editor: &Editor) -> Result<Transaction, CommandError> {
    let table_path = table_path_for_focus(editor).ok_or_else(|| CommandError::new("Not in a table"))?;
    let caret = child_path(&table_path, 0);

    Ok(Transaction::builder()
        .replace_node(table_path, Node::paragraph(""))
        .selection_after(Selection::collapsed(Point::new(caret, 0)))
        .source("command:table.delete_table")
        .build())
}

fn merge_cells(editor: &Editor) -> Result<Transaction, CommandError> {
    let sel = editor.selection();
    let table_path = table_path_for_focus(editor).ok_or_else(|| CommandError::new("Not in a table"))?;
    let anchor_cell = cell_path_for(editor, &sel.anchor.path);
    let focus_cell = cell_path_for(editor, &sel.focus.path);
    let (Some(anchor_cell), Some(focus_cell)) = (anchor_cell, focus_cell) else {
        return Err(CommandError::new("Selection is not inside table cells"));
    };
    let depth = table_path.len();
    if anchor_cell.len() != depth + 2 || !anchor_cell.starts_with(&table_path) {
        return Err(CommandError::new("Selection spans more than one table"));
    }

    let table = editor
        .doc()
        .element(&table_path)
        .ok_or_else(|| CommandError::new("Invalid table"))?;
    let (mut grid, positions) = TableGrid::from_table(table);
    let a = positions[anchor_cell[depth]][anchor_cell[depth + 1]];
    let b = positions[focus_cell[depth]][focus_cell[depth + 1]];
    let rect = grid.rect_around(a, b);
    let merged = grid.merge(rect)?;
    replace_table(&table_path, &grid, &table.attrs, Some(merged), "table.merge_cells")
}

fn set_cell_attribute(editor: &Editor, name: &str, value: Value) -> Result<Transaction, CommandError> {
    let sel = editor.selection();
    let table_path = table_path_for_focus(editor).ok_or_else(|| CommandError::new("Not in a table"))?;
    let focus_cell = cell_path_for(editor, &sel.focus.path).ok_or_else(|| CommandError::new("Not in a table cell"))?;
    let anchor_cell = cell_path_for(editor, &sel.anchor.path)
        .filter(|path| path.len() == focus_cell.len() && path.starts_with(&table_path))
        .unwrap_or_else(|| focus_cell.clone());

    let table = editor
        .doc()
        .element(&table_path)
        .ok_or_else(|| CommandError::new("Invalid table"))?;
    let (grid, positions) = TableGrid::from_table(table);
    let depth = table_path.len();
    let a = positions[anchor_cell[depth]][anchor_cell[depth + 1]];
    let b = positions[focus_cell[depth]][focus_cell[depth + 1]];
    let (top, left, bottom, right) = grid.rect_around(a, b);

    let patch = if value.is_null() {
        AttrPatch::remove(name)
    } else {
        AttrPatch::set(name, value)
    };
    let mut tx = Transaction::builder().source("command:table.set_cell_attribute");
    for (r, row) in positions.iter().enumerate() {
        for (c, &ix) in row.iter().enumerate() {
            let cell = &grid.cells[ix];
            if cell.row >= top && cell.bottom() <= bottom && cell.col >= left && cell.right() <= right {
                let mut path = table_path.clone();
                path.extend([r, c]);
                tx = tx.set_attrs(path, patch.clone());
            }
        }
    }
    Ok(tx.selection_after(sel.clone()).build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> TableGrid {
        let Node::Element(table) = table_node(rows, cols, false) else {
            unreachable!()
        };
        TableGrid::from_table(&table).0
    }

    fn spans(grid: &TableGrid) -> Vec<(usize, usize, usize, usize)> {
        let mut out: Vec<_> = grid
            .cells
            .iter()
            .map(|c| (c.row, c.col, c.rowspan, c.colspan))
            .collect();
        out.sort();
        out
    }

    #[test]
    fn layout_skips_slots_covered_by_rowspan() {
        let tall = Node::element(NodeKind::TableCell, vec![Node::paragraph("a")]).with_attr("rowspan", 2);
        let table = Node::element(
            NodeKind::Table,
            vec![
                Node::element(NodeKind::TableRow, vec![tall, cell_node(NodeKind::TableCell)]),
                Node::element(NodeKind::TableRow, vec![cell_node(NodeKind::TableCell)]),
            ],
        );
        let Node::Element(table) = table else { unreachable!() };
        let (grid, positions) = TableGrid::from_table(&table);
        assert_eq!(grid.width, 2);
        assert_eq!(spans(&grid), vec![(0, 0, 2, 1), (0, 1, 1, 1), (1, 1, 1, 1)]);
        assert_eq!(positions, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn layout_clamps_oversized_spans() {
        let wide = Node::element(NodeKind::TableCell, vec![Node::paragraph("a")]).with_attr("colspan", u64::MAX);
        let table = Node::element(NodeKind::Table, vec![Node::element(NodeKind::TableRow, vec![wide])]);
        let Node::Element(table) = table else { unreachable!() };
        let (grid, _) = TableGrid::from_table(&table);
        assert_eq!(grid.width, MAX_TABLE_SIZE as usize);
        assert_eq!(spans(&grid), vec![(0, 0, 1, MAX_TABLE_SIZE as usize)]);
    }

    #[test]
    fn inserting_a_row_through_a_span_grows_it() {
        let mut g = grid(2, 2);
        let merged = g.merge((0, 0, 2, 1)).unwrap();
        assert_eq!(g.cells[merged].rowspan, 2);
        g.insert_row(1);
        assert_eq!(g.height, 3);
        assert_eq!(
            spans(&g),
            vec![(0, 0, 3, 1), (0, 1, 1, 1), (1, 1, 1, 1), (2, 1, 1, 1)]
        );
    }

    #[test]
    fn deleting_the_origin_row_moves_a_tall_cell_down() {
        let mut g = grid(3, 2);
        g.merge((0, 0, 2, 1)).unwrap();
        g.delete_rows(0, 1).unwrap();
        assert_eq!(g.height, 2);
        assert_eq!(spans(&g), vec![(0, 0, 1, 1), (0, 1, 1, 1), (1, 0, 1, 1), (1, 1, 1, 1)]);
    }

    #[test]
    fn split_restores_unit_cells() {
        let mut g = grid(2, 2);
        let merged = g.merge((0, 0, 2, 2)).unwrap();
        assert_eq!(g.cells.len(), 1);
        g.split(merged).unwrap();
        assert_eq!(spans(&g), spans(&grid(2, 2)));
        assert!(g.split(0).is_err());
    }

    #[test]
    fn rect_grows_to_cover_partial_spans() {
        let mut g = grid(2, 3);
        g.merge((0, 1, 1, 3)).unwrap();
        let a = g.cell_at(1, 0).unwrap();
        let b = g.cell_at(1, 1).unwrap();
        assert_eq!(g.rect_around(a, b), (1, 0, 2, 2));
        let top = g.cell_at(0, 0).unwrap();
        let wide = g.cell_at(0, 2).unwrap();
        assert_eq!(g.rect_around(top, wide), (0, 0, 1, 3));
    }

    #[test]
    fn every_row_or_column_cannot_be_deleted() {
        let mut g = grid(1, 2);
        assert!(g.delete_rows(0, 1).is_err());
        assert!(g.delete_cols(0, 2).is_err());
        assert!(g.delete_cols(0, 1).is_ok());
        assert_eq!(g.width, 1);
    }
}
