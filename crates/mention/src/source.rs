use serde::{Deserialize, Serialize};

/// One entry of the suggestion popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionCandidate {
    pub label: String,
    pub id: String,
}

impl MentionCandidate {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }

    /// A candidate whose id is its label.
    pub fn named(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: label.clone(),
            label,
        }
    }
}

/// Answer of a [`CandidateSource`] to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Ready(Vec<MentionCandidate>),
    /// The host fetches the results and hands them back through `MentionEngine::resolve_fetch`.
    Deferred,
}

pub trait CandidateSource {
    fn lookup(&self, query: &str, limit: usize) -> Lookup;
}

/// Case-insensitive prefix match over `candidates`, in their order, at most `limit` of them.
pub fn filter_by_prefix<'a>(
    candidates: impl IntoIterator<Item = &'a MentionCandidate>,
    query: &str,
    limit: usize,
) -> Vec<MentionCandidate> {
    let query = query.to_lowercase();
    candidates
        .into_iter()
        .filter(|candidate| candidate.label.to_lowercase().starts_with(&query))
        .take(limit)
        .cloned()
        .collect()
}

/// A fixed in-memory list, answered synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCandidates {
    candidates: Vec<MentionCandidate>,
}

const DEFAULT_NAMES: &[&str] = &[
    "Lea Thompson",
    "Cyndi Lauper",
    "Tom Cruise",
    "Madonna",
    "Jerry Hall",
    "Joan Collins",
    "Winona Ryder",
    "Christina Applegate",
    "Alyssa Milano",
    "Molly Ringwald",
    "Ally Sheedy",
    "Debbie Harry",
    "Olivia Newton-John",
    "Elton John",
    "Michael J. Fox",
    "Axl Rose",
    "Emilio Estevez",
    "Ralph Macchio",
    "Rob Lowe",
    "Jennifer Grey",
    "Mickey Rourke",
    "John Cusack",
    "Matthew Broderick",
    "Justine Bateman",
    "Lisa Bonet",
];

impl Default for StaticCandidates {
    fn default() -> Self {
        Self::new(DEFAULT_NAMES.iter().copied().map(MentionCandidate::named))
    }
}

impl StaticCandidates {
    pub fn new(candidates: impl IntoIterator<Item = MentionCandidate>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
        }
    }

    pub fn candidates(&self) -> &[MentionCandidate] {
        &self.candidates
    }
}

impl CandidateSource for StaticCandidates {
    fn lookup(&self, query: &str, limit: usize) -> Lookup {
        Lookup::Ready(filter_by_prefix(&self.candidates, query, limit))
    }
}

/// A source whose every lookup is fetched by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCandidates;

impl CandidateSource for RemoteCandidates {
    fn lookup(&self, _query: &str, _limit: usize) -> Lookup {
        Lookup::Deferred
    }
}

impl<F> CandidateSource for F
where
    F: Fn(&str, usize) -> Lookup,
{
    fn lookup(&self, query: &str, limit: usize) -> Lookup {
        self(query, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(lookup: Lookup) -> Vec<String> {
        match lookup {
            Lookup::Ready(candidates) => candidates.into_iter().map(|c| c.label).collect(),
            Lookup::Deferred => panic!("static lookups are synchronous"),
        }
    }

    #[test]
    fn prefix_filter_is_case_insensitive_and_ordered() {
        let source = StaticCandidates::default();
        assert_eq!(labels(source.lookup("jo", 5)), ["Joan Collins", "John Cusack"]);
        assert_eq!(labels(source.lookup("JO", 5)), ["Joan Collins", "John Cusack"]);
        assert_eq!(
            labels(source.lookup("m", 5)),
            [
                "Madonna",
                "Molly Ringwald",
                "Michael J. Fox",
                "Mickey Rourke",
                "Matthew Broderick"
            ]
        );
        assert_eq!(labels(source.lookup("", 5)).len(), 5);
        assert!(labels(source.lookup("zz", 5)).is_empty());
    }

    #[test]
    fn limit_caps_results() {
        let source = StaticCandidates::default();
        assert_eq!(labels(source.lookup("", 2)), ["Lea Thompson", "Cyndi Lauper"]);
        assert!(labels(source.lookup("", 0)).is_empty());
    }
}
