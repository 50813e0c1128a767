mod common;
mod controller;
mod resolver;
mod snippet;

pub use common::Slot;
pub use controller::{DndController, DragPayload, DropOutcome, DropRejection, SNIPPET_KEY};
pub use resolver::{DropLocation, PositionResolver, RowResolver};
pub use snippet::{Snippet, SnippetCatalog};
