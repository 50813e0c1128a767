use block_editor_core::{ApplyError, CommandError, Editor, Path, replace_with_mention};
use tracing::debug;

use crate::config::MentionConfig;
use crate::source::{CandidateSource, Lookup, MentionCandidate, StaticCandidates};

/// Screen rectangle of the caret, in the host's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// A session is active and waits for candidates.
    Querying,
    /// Candidates are on screen.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

/// Identifies one fetch of one session. Only the newest token of the active session resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchToken {
    pub session: SessionId,
    pub request: u64,
}

/// Emitted when the source defers: the host fetches `query` and calls `resolve_fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: FetchToken,
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub anchor: Rect,
    pub candidates: Vec<MentionCandidate>,
    pub highlighted: usize,
}

impl Popup {
    pub fn highlighted_candidate(&self) -> Option<&MentionCandidate> {
        self.candidates.get(self.highlighted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKey {
    Up,
    Down,
    Enter,
    Tab,
    Escape,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MentionError {
    #[error("no mention query is active")]
    NoSession,
    #[error("candidate {index} out of range ({len} shown)")]
    CandidateOutOfRange { index: usize, len: usize },
    #[error("the text under the query changed")]
    SpanChanged,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Trigger-to-caret span inside one text leaf. Offsets are byte offsets into the leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text_path: Path,
    trigger: usize,
    caret: usize,
    query: String,
}

#[derive(Debug)]
struct Session {
    id: SessionId,
    span: Span,
    pending: Option<FetchToken>,
    requests: u64,
}

/// Tracks a live `@query` at the caret, keeps the suggestion popup and commits mentions.
///
/// The host calls [`MentionEngine::handle_change`] after every document or selection change
/// and routes keys through [`MentionEngine::handle_key`] while a session is active.
pub struct MentionEngine {
    config: MentionConfig,
    source: Box<dyn CandidateSource>,
    phase: Phase,
    session: Option<Session>,
    popup: Option<Popup>,
    next_session: u64,
}

impl Default for MentionEngine {
    fn default() -> Self {
        Self::new(MentionConfig::default(), StaticCandidates::default())
    }
}

impl MentionEngine {
    pub fn new(config: MentionConfig, source: impl CandidateSource + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
            phase: Phase::Idle,
            session: None,
            popup: None,
            next_session: 0,
        }
    }

    pub fn config(&self) -> &MentionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn query(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|session| session.span.query.as_str())
    }

    /// Re-reads the caret after a change. Starts, updates or cancels the session; returns a
    /// fetch request when the source defers.
    pub fn handle_change(
        &mut self,
        editor: &Editor,
        caret_rect: Option<Rect>,
    ) -> Option<FetchRequest> {
        let anchor = caret_rect.unwrap_or(Rect::ZERO);
        let span = query_span(editor, self.config.trigger);

        let continues = match (&self.session, &span) {
            (Some(session), Some(span)) => {
                session.span.text_path == span.text_path && session.span.trigger == span.trigger
            }
            _ => false,
        };
        if !continues && self.session.is_some() {
            self.cancel("caret left the query");
        }

        let span = span?;
        if self.session.is_none() {
            // A new session only opens right after the trigger is typed.
            if !span.query.is_empty() {
                return None;
            }
            let id = SessionId(self.next_session);
            self.next_session += 1;
            debug!(session = id.0, path = ?span.text_path, "mention query started");
            self.session = Some(Session {
                id,
                span: span.clone(),
                pending: None,
                requests: 0,
            });
            self.phase = Phase::Querying;
            self.popup = None;
            return self.refresh(anchor, true);
        }

        let session = self.session.as_mut()?;
        let query_changed = session.span.query != span.query;
        session.span = span;
        self.refresh(anchor, query_changed)
    }

    fn refresh(&mut self, anchor: Rect, query_changed: bool) -> Option<FetchRequest> {
        let session = self.session.as_mut()?;
        let limit = self.config.max_candidates;
        if !query_changed {
            if let Some(popup) = self.popup.as_mut() {
                popup.anchor = anchor;
            }
            return None;
        }

        match self.source.lookup(&session.span.query, limit) {
            Lookup::Ready(mut candidates) => {
                candidates.truncate(limit);
                session.pending = None;
                self.phase = Phase::Open;
                self.popup = Some(Popup {
                    anchor,
                    candidates,
                    highlighted: 0,
                });
                None
            }
            Lookup::Deferred => {
                let token = FetchToken {
                    session: session.id,
                    request: session.requests,
                };
                session.requests += 1;
                session.pending = Some(token);
                // The previous list stays on screen until the fetch lands.
                let popup = self.popup.get_or_insert_with(|| Popup {
                    anchor,
                    candidates: Vec::new(),
                    highlighted: 0,
                });
                popup.anchor = anchor;
                if self.phase == Phase::Idle {
                    self.phase = Phase::Querying;
                }
                Some(FetchRequest {
                    token,
                    query: session.span.query.clone(),
                    limit,
                })
            }
        }
    }

    /// Hands back the results of a deferred lookup. Returns false when the token is stale.
    pub fn resolve_fetch(&mut self, token: FetchToken, results: Vec<MentionCandidate>) -> bool {
        let current = self
            .session
            .as_ref()
            .and_then(|session| session.pending)
            .is_some_and(|pending| pending == token);
        if !current {
            debug!(
                session = token.session.0,
                request = token.request,
                "stale mention fetch dropped"
            );
            return false;
        }
        if let Some(session) = self.session.as_mut() {
            session.pending = None;
        }
        let mut candidates = results;
        candidates.truncate(self.config.max_candidates);
        let popup = self.popup.get_or_insert_with(|| Popup {
            anchor: Rect::ZERO,
            candidates: Vec::new(),
            highlighted: 0,
        });
        popup.candidates = candidates;
        popup.highlighted = 0;
        self.phase = Phase::Open;
        true
    }

    /// Routes a key while a session is active. Returns whether the key was consumed.
    pub fn handle_key(
        &mut self,
        editor: &mut Editor,
        key: MentionKey,
    ) -> Result<bool, MentionError> {
        if self.session.is_none() {
            return Ok(false);
        }
        let len = self.popup.as_ref().map_or(0, |popup| popup.candidates.len());
        match key {
            MentionKey::Escape => {
                self.cancel("escape");
                Ok(true)
            }
            MentionKey::Up | MentionKey::Down => {
                if let Some(popup) = self.popup.as_mut()
                    && len > 0
                {
                    popup.highlighted = match key {
                        MentionKey::Up => (popup.highlighted + len - 1) % len,
                        _ => (popup.highlighted + 1) % len,
                    };
                }
                Ok(true)
            }
            MentionKey::Enter | MentionKey::Tab => {
                let Some(index) = self
                    .popup
                    .as_ref()
                    .filter(|popup| !popup.candidates.is_empty())
                    .map(|popup| popup.highlighted)
                else {
                    return Ok(false);
                };
                self.select(editor, index)?;
                Ok(true)
            }
        }
    }

    /// Commits candidate `index`: the trigger-to-caret span becomes one mention node.
    pub fn select(&mut self, editor: &mut Editor, index: usize) -> Result<(), MentionError> {
        let (id, span) = self
            .session
            .as_ref()
            .map(|session| (session.id, session.span.clone()))
            .ok_or(MentionError::NoSession)?;
        let candidates = self
            .popup
            .as_ref()
            .map(|popup| popup.candidates.as_slice())
            .unwrap_or_default();
        let candidate = candidates
            .get(index)
            .cloned()
            .ok_or(MentionError::CandidateOutOfRange {
                index,
                len: candidates.len(),
            })?;

        if query_span(editor, self.config.trigger).as_ref() != Some(&span) {
            self.cancel("query text changed before commit");
            return Err(MentionError::SpanChanged);
        }
        let tx = replace_with_mention(
            editor.doc(),
            &span.text_path,
            span.trigger..span.caret,
            &candidate.label,
            &candidate.id,
            "mention:commit",
        )?;
        editor.apply(tx)?;

        debug!(session = id.0, id = %candidate.id, "mention committed");
        self.reset();
        Ok(())
    }

    /// Focus left the editor.
    pub fn blur(&mut self) {
        if self.session.is_some() {
            self.cancel("blur");
        }
    }

    /// The caret moved on screen without a document change (scroll, resize).
    pub fn reposition(&mut self, caret_rect: Option<Rect>) {
        if let Some(popup) = self.popup.as_mut() {
            popup.anchor = caret_rect.unwrap_or(Rect::ZERO);
        }
    }

    fn cancel(&mut self, reason: &str) {
        if let Some(session) = &self.session {
            debug!(session = session.id.0, reason, "mention query cancelled");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.session = None;
        self.popup = None;
        self.phase = Phase::Idle;
    }
}

/// The span from a trigger to a collapsed caret in a textblock's text leaf. The trigger must
/// start the leaf or follow whitespace, and the query between them holds no whitespace.
fn query_span(editor: &Editor, trigger: char) -> Option<Span> {
    let selection = editor.selection();
    if !selection.is_collapsed() {
        return None;
    }
    let caret = &selection.focus;
    let doc = editor.doc();
    let leaf = doc.text_node(&caret.path)?;
    doc.element(caret.block_path())
        .filter(|block| block.kind.is_textblock())?;
    let before = leaf.text.get(..caret.offset)?;

    let trigger_ix = before.rfind(|ch: char| ch == trigger || ch.is_whitespace())?;
    if !before[trigger_ix..].starts_with(trigger) {
        return None;
    }
    let preceded_ok = before[..trigger_ix]
        .chars()
        .next_back()
        .is_none_or(char::is_whitespace);
    if !preceded_ok {
        return None;
    }
    Some(Span {
        text_path: caret.path.clone(),
        trigger: trigger_ix,
        caret: caret.offset,
        query: before[trigger_ix + trigger.len_utf8()..].to_string(),
    })
}
