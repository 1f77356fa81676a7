use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed input from {source_id}: {reason}")]
    MalformedInput { source_id: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn malformed(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::MalformedInput {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Per-record failures are skipped by the builder; anything else aborts it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IngestError::MalformedInput { .. })
    }
}

/// One cleaned unit of crawled or parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source_id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
    /// Explicit cross-references ("see also" links) declared by the source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub see_also: Vec<String>,
    pub text: String,
}

impl DocumentRecord {
    pub fn new(
        source_id: impl Into<String>,
        category: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            category: category.into(),
            title: None,
            breadcrumb: None,
            see_also: Vec::new(),
            text: text.into(),
        }
    }

    /// Build a record from raw bytes handed over by a crawler or PDF processor.
    ///
    /// Non-text content is rejected as `MalformedInput`.
    pub fn from_bytes(
        source_id: impl Into<String>,
        category: impl Into<String>,
        raw_content: Vec<u8>,
    ) -> Result<Self, IngestError> {
        let source_id = source_id.into();
        let text = match String::from_utf8(raw_content) {
            Ok(text) => text,
            Err(e) => {
                return Err(IngestError::malformed(
                    source_id,
                    format!("content is not valid UTF-8: {e}"),
                ))
            }
        };

        Ok(Self::new(source_id, category, text))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_breadcrumb(mut self, breadcrumb: impl Into<String>) -> Self {
        self.breadcrumb = Some(breadcrumb.into());
        self
    }

    pub fn with_see_also(mut self, reference: impl Into<String>) -> Self {
        self.see_also.push(reference.into());
        self
    }

    pub(crate) fn check(&self) -> Result<(), IngestError> {
        if self.source_id.trim().is_empty() {
            return Err(IngestError::malformed("<unnamed>", "empty source id"));
        }
        Ok(())
    }
}
