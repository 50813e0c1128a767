use serde::{Deserialize, Serialize};

/// Engine limits and command defaults.
///
/// Every field falls back to its default when missing from serialized config, and a zero
/// is treated as "unset" by [`EditorConfig::with_defaults`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Upper bound on normalization rounds per transaction.
    pub max_normalize_iterations: usize,
    /// Rows created by `table.insert` without args.
    pub default_table_rows: usize,
    /// Columns created by `table.insert` without args.
    pub default_table_cols: usize,
    /// Hint shown by the view while the document is a single empty paragraph.
    pub placeholder: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: 64,
            default_table_rows: 3,
            default_table_cols: 3,
            placeholder: None,
        }
    }
}

impl EditorConfig {
    pub fn with_defaults(self) -> Self {
        let defaults = Self::default();
        let or_default = |value: usize, default: usize| if value == 0 { default } else { value };
        Self {
            max_normalize_iterations: or_default(
                self.max_normalize_iterations,
                defaults.max_normalize_iterations,
            ),
            default_table_rows: or_default(self.default_table_rows, defaults.default_table_rows),
            default_table_cols: or_default(self.default_table_cols, defaults.default_table_cols),
            placeholder: self.placeholder.filter(|hint| !hint.trim().is_empty()),
        }
    }
}
