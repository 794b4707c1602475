//! Per-file hints side channel.
//!
//! The hints file is accepted and validated as JSON, then carried on the
//! [`Context`](crate::Context) untouched. Translation does not read it.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum HintsError {
    #[error("failed to read hints file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hints file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hints {
    value: serde_json::Value,
}

impl Hints {
    pub fn from_json_str(text: &str) -> Result<Self, HintsError> {
        Ok(Self {
            value: serde_json::from_str(text)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, HintsError> {
        let text = std::fs::read_to_string(path).map_err(|source| HintsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Number of top-level entries (array items or object keys).
    pub fn len(&self) -> usize {
        match &self.value {
            serde_json::Value::Array(items) => items.len(),
            serde_json::Value::Object(map) => map.len(),
            serde_json::Value::Null => 0,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }
}
