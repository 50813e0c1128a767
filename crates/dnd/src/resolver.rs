use block_editor_core::{Document, Point};

/// Screen position of a drop, in the host's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DropLocation {
    pub x: f32,
    pub y: f32,
}

impl DropLocation {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Hit-testing collaborator supplied by the host: maps a screen location to a document point.
pub trait PositionResolver {
    fn resolve(&self, doc: &Document, location: DropLocation) -> Option<Point>;
}

impl<F> PositionResolver for F
where
    F: Fn(&Document, DropLocation) -> Option<Point>,
{
    fn resolve(&self, doc: &Document, location: DropLocation) -> Option<Point> {
        self(doc, location)
    }
}

/// Lays every textblock out as one row of fixed height, top to bottom.
///
/// A location left of `x = 0` resolves to the start of its row, anything else to the end.
/// Locations above the first or below the last row are unresolvable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowResolver {
    pub row_height: f32,
}

impl RowResolver {
    pub fn new(row_height: f32) -> Self {
        Self { row_height }
    }
}

impl PositionResolver for RowResolver {
    fn resolve(&self, doc: &Document, location: DropLocation) -> Option<Point> {
        if location.y < 0.0 || self.row_height <= 0.0 {
            return None;
        }
        let row = (location.y / self.row_height) as usize;
        let block = doc.textblock_paths().into_iter().nth(row)?;
        if location.x < 0.0 {
            doc.first_text_point_at(&block)
        } else {
            doc.last_text_point_at(&block)
        }
    }
}
