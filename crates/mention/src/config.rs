use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionConfig {
    /// Character that opens a query.
    pub trigger: char,
    /// Upper bound on candidates shown in the popup.
    pub max_candidates: usize,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            trigger: '@',
            max_candidates: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: MentionConfig = serde_json::from_str(r##"{ "trigger": "#" }"##).unwrap();
        assert_eq!(config.trigger, '#');
        assert_eq!(config.max_candidates, 5);
    }
}
