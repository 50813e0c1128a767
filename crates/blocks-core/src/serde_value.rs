use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::html::{self, ParseError};

/// Schema tag written into every saved value.
pub const VALUE_SCHEMA: &str = "block-editor";
/// Newest value layout this build reads and the one it writes.
pub const VALUE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("value has unknown schema {0:?}")]
    UnknownSchema(String),
    #[error("value version {0} is newer than this build reads")]
    UnsupportedVersion(u32),
}

/// Versioned JSON envelope for persisting a document tree. Missing `schema`/`version` fields
/// read as the current ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    #[serde(default = "current_schema")]
    pub schema: String,
    #[serde(default = "current_version")]
    pub version: u32,
    pub document: Document,
}

fn current_schema() -> String {
    VALUE_SCHEMA.into()
}

fn current_version() -> u32 {
    VALUE_VERSION
}

impl DocumentValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: current_schema(),
            version: VALUE_VERSION,
            document,
        }
    }

    pub fn from_markup(markup: &str) -> Result<Self, ParseError> {
        Ok(Self::from_document(html::parse_document(markup)?))
    }

    pub fn to_markup(&self) -> String {
        html::serialize_document(&self.document)
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a saved value, refusing foreign schemas and layouts from newer builds.
    pub fn from_json_str(json: &str) -> Result<Self, ValueError> {
        let value: Self = serde_json::from_str(json)?;
        if value.schema != VALUE_SCHEMA {
            return Err(ValueError::UnknownSchema(value.schema));
        }
        if value.version > VALUE_VERSION {
            return Err(ValueError::UnsupportedVersion(value.version));
        }
        Ok(value)
    }
}
