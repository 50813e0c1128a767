use std::path::Path;

use anyhow::Context as _;
use block_editor_core::EditorConfig;
use block_editor_dnd::SnippetCatalog;
use block_editor_mention::MentionConfig;
use serde::{Deserialize, Serialize};

/// Everything the story session can be tuned with. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub editor: EditorConfig,
    pub mention: MentionConfig,
    pub snippets: SnippetCatalog,
}

impl StoryConfig {
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let config: StoryConfig = serde_json::from_value(serde_json::json!({
            "mention": { "max_candidates": 2 },
            "snippets": [{ "id": "rule", "content": "<hr>" }],
        }))
        .unwrap();
        assert_eq!(config.editor, EditorConfig::default());
        assert_eq!(config.mention.trigger, '@');
        assert_eq!(config.mention.max_candidates, 2);
        assert_eq!(config.snippets.len(), 1);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = StoryConfig::load_from("/nonexistent/story.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/story.json"));
    }
}
