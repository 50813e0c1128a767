use anyhow::{Context as _, bail};
use block_editor_core::{
    Document, Editor, PluginRegistry, Point, Selection, ViewTree, serialize_document,
};
use block_editor_dnd::{DndController, DropLocation, DropOutcome, RowResolver};
use block_editor_mention::{MentionEngine, MentionKey, Rect, StaticCandidates};
use tracing::{info, warn};

use crate::config::StoryConfig;

pub const SAMPLE: &str = concat!(
    "<h1>Block editor</h1>",
    "<p>Drag the item below by its handle.</p>",
    r#"<div data-type="draggable-item"><p>first</p><p>second</p></div>"#,
    "<p>Say hello to</p>",
);

const ROW_HEIGHT: f32 = 20.0;

/// Markup after one step of the scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub markup: String,
}

/// Replays a fixed editing session over `doc`: a snippet drop, a mention, a block move and a
/// table insert. Rejected gestures are logged and skipped.
pub struct Session {
    editor: Editor,
    dnd: DndController,
    mentions: MentionEngine,
    config: StoryConfig,
    steps: Vec<Step>,
}

impl Session {
    pub fn new(config: StoryConfig, doc: Document) -> anyhow::Result<Self> {
        let caret = doc
            .first_text_point()
            .unwrap_or_else(|| Point::new(vec![0, 0], 0));
        let editor = Editor::with_config(
            doc,
            Selection::collapsed(caret),
            PluginRegistry::blocks(),
            config.editor.clone(),
        )
        .context("document does not fit the block schema")?;
        let mentions = MentionEngine::new(config.mention.clone(), StaticCandidates::default());
        Ok(Self {
            editor,
            dnd: DndController::new(),
            mentions,
            config,
            steps: Vec::new(),
        })
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Runs the script once and returns the steps it recorded.
    pub fn run(&mut self) -> anyhow::Result<Vec<Step>> {
        self.record("load");
        self.drop_first_snippet();
        self.mention_at_end("jo")?;
        self.move_first_draggable_to_end();
        self.editor
            .run_command("table.insert", None)
            .context("inserting table")?;
        self.record("table");
        Ok(std::mem::take(&mut self.steps))
    }

    /// Snapshot of the current document as a view tree.
    pub fn view(&self) -> ViewTree {
        self.editor.view()
    }

    fn rows(&self) -> RowResolver {
        RowResolver::new(ROW_HEIGHT)
    }

    fn record(&mut self, label: &'static str) {
        let markup = serialize_document(self.editor.doc());
        info!(step = label, "{markup}");
        self.steps.push(Step { label, markup });
    }

    fn drop_first_snippet(&mut self) {
        let Some(snippet) = self.config.snippets.iter().next().cloned() else {
            return;
        };
        self.dnd.on_snippet_drag_start(&snippet);
        let rows = self.rows();
        let outcome = self
            .dnd
            .on_drop(&mut self.editor, DropLocation::new(-1.0, ROW_HEIGHT / 2.0), &rows);
        if let DropOutcome::Rejected(reason) = outcome {
            warn!(snippet = %snippet.id, %reason, "snippet drop rejected");
            return;
        }
        self.record("snippet");
    }

    fn mention_at_end(&mut self, query: &str) -> anyhow::Result<()> {
        let doc = self.editor.doc();
        let Some(end) = doc
            .textblock_paths()
            .last()
            .and_then(|path| doc.last_text_point_at(path))
        else {
            bail!("document has no text to type into");
        };
        self.editor.set_selection(Selection::collapsed(end));

        let mut typed = String::from(" ");
        typed.push(self.mentions.config().trigger);
        typed.push_str(query);
        for (ix, ch) in typed.chars().enumerate() {
            self.editor
                .insert_text(ch.encode_utf8(&mut [0; 4]))
                .context("typing mention query")?;
            let caret = Rect::new(ix as f32 * 8.0, 0.0, 1.0, ROW_HEIGHT);
            self.mentions.handle_change(&self.editor, Some(caret));
        }
        if !self
            .mentions
            .handle_key(&mut self.editor, MentionKey::Enter)
            .context("committing mention")?
        {
            warn!(query, "no mention candidates");
        }
        self.record("mention");
        Ok(())
    }

    fn move_first_draggable_to_end(&mut self) {
        let view = self.view();
        let Some((handle, _)) = view.drag_handles().into_iter().next() else {
            return;
        };
        if self.dnd.on_handle_drag_start(&view, &handle).is_none() {
            return;
        }
        let last_row = self.editor.doc().textblock_paths().len().saturating_sub(1);
        let location = DropLocation::new(0.0, last_row as f32 * ROW_HEIGHT + ROW_HEIGHT / 2.0);
        let rows = self.rows();
        match self.dnd.on_drop(&mut self.editor, location, &rows) {
            DropOutcome::Rejected(reason) => warn!(%reason, "block move rejected"),
            _ => self.record("move"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_editor_core::parse_document;

    fn run_sample(config: StoryConfig) -> Vec<Step> {
        let doc = parse_document(SAMPLE).unwrap();
        Session::new(config, doc).unwrap().run().unwrap()
    }

    #[test]
    fn sample_session_runs_every_step() {
        let steps = run_sample(StoryConfig::default());
        let labels: Vec<_> = steps.iter().map(|step| step.label).collect();
        assert_eq!(labels, ["load", "snippet", "mention", "move", "table"]);

        assert!(steps[1].markup.starts_with("<h2>Heading</h2><h1>Block editor</h1>"));
        assert!(steps[2].markup.contains(
            r#"<p>Say hello to <span class="mention" data-type="mention" data-id="Joan Collins" data-label="Joan Collins">@Joan Collins</span></p>"#
        ));
        assert!(steps[3].markup.ends_with(
            r#"<div data-type="draggable-item"><p>first</p><p>second</p></div>"#
        ));
        assert!(steps[4].markup.contains("<table><tbody>"));
    }

    #[test]
    fn empty_catalog_skips_the_drop() {
        let config = StoryConfig {
            snippets: block_editor_dnd::SnippetCatalog::new([]),
            ..StoryConfig::default()
        };
        let labels: Vec<_> = run_sample(config).iter().map(|step| step.label).collect();
        assert_eq!(labels, ["load", "mention", "move", "table"]);
    }

    #[test]
    fn empty_document_shows_the_configured_placeholder() {
        let mut config = StoryConfig::default();
        config.editor.placeholder = Some("Start writing your report...".into());
        let session = Session::new(config, Document::empty()).unwrap();
        assert!(session
            .view()
            .to_html()
            .starts_with(r#"<p class="is-editor-empty" data-placeholder="Start writing your report...">"#));
    }

    #[test]
    fn documents_outside_the_schema_are_refused() {
        let doc = Document::new(vec![block_editor_core::Node::list_item(vec![
            block_editor_core::Node::paragraph("stray"),
        ])]);
        assert!(Session::new(StoryConfig::default(), doc).is_err());
    }
}
