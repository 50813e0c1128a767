mod config;
mod engine;
mod source;

pub use config::MentionConfig;
pub use engine::{
    FetchRequest, FetchToken, MentionEngine, MentionError, MentionKey, Phase, Popup, Rect,
    SessionId,
};
pub use source::{
    CandidateSource, Lookup, MentionCandidate, RemoteCandidates, StaticCandidates,
    filter_by_prefix,
};
