use serde::{Deserialize, Serialize};

/// A palette entry: an id and the markup fragment it drops into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    #[serde(alias = "content")]
    pub fragment: String,
}

impl Snippet {
    pub fn new(id: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fragment: fragment.into(),
        }
    }
}

/// Ordered snippet palette. Deserializes from a plain JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetCatalog {
    snippets: Vec<Snippet>,
}

impl Default for SnippetCatalog {
    fn default() -> Self {
        Self::new([
            Snippet::new("heading", "<h2>Heading</h2>"),
            Snippet::new("paragraph", "<p>Paragraph</p>"),
            Snippet::new("bulletList", "<ul><li>List item</li></ul>"),
            Snippet::new("orderedList", "<ol><li>Ordered item</li></ol>"),
        ])
    }
}

impl SnippetCatalog {
    pub fn new(snippets: impl IntoIterator<Item = Snippet>) -> Self {
        Self {
            snippets: snippets.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Snippet> {
        self.snippets.iter().find(|snippet| snippet.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.iter()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}
