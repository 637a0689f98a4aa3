//! # contract: capability interfaces and shared data for the sync pipeline
//!
//! This module defines the narrow traits the orchestrator talks to
//! ([`RecordSource`], [`ContentTransformer`], [`ArtifactStore`]) together with
//! the plain data types that flow between them.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so integration tests can drive the
//!   pipeline with `MockRecordSource`, `MockContentTransformer` and
//!   `MockArtifactStore` instead of a live workspace or a real disk.
//!
//! ## Errors
//! - Trait methods return a boxed error ([`BoxError`]); the orchestrator decides
//!   which [`SyncError`] variant a failure becomes based on the stage it hit.

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Boxed error returned by capability implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Date format stamped into documents and the manifest (`10/19/2026`).
pub const DATE_FORMAT: &str = "%-m/%-d/%Y";

/// One item returned by the content source. Read-only to this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    /// Named properties, each a typed object such as `{"type": "title", "title": [...]}`.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Scalar fields pulled from a record before it is transformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFields {
    pub title: String,
    pub slug: String,
}

/// Manifest entry for one successfully processed record.
///
/// Serialised as `{"title": .., "slug": .., "date": ..}`; `slug` is the output key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub slug: String,
    pub date: String,
}

impl PageMetadata {
    pub fn new(fields: PageFields, generated_on: NaiveDate) -> Self {
        Self {
            title: fields.title,
            slug: fields.slug,
            date: generated_on.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Pipeline stage at which a record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Extract,
    Transform,
    WriteArtifact,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::WriteArtifact => "write_artifact",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Query, authentication or network failure reaching the content source. Fatal.
    #[error("content source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("record {record_id} is missing required field `{field}`")]
    MissingField { record_id: String, field: String },
    #[error("content transform failed for record {record_id}: {reason}")]
    TransformFailure { record_id: String, reason: String },
    #[error("failed to write artifact `{name}`: {reason}")]
    ArtifactWriteFailure { name: String, reason: String },
}

impl SyncError {
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::SourceUnavailable(_) => Stage::Fetch,
            SyncError::MissingField { .. } => Stage::Extract,
            SyncError::TransformFailure { .. } => Stage::Transform,
            SyncError::ArtifactWriteFailure { .. } => Stage::WriteArtifact,
        }
    }

    /// Only a source failure aborts a run; everything else skips one record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::SourceUnavailable(_))
    }
}

/// Queries the content store for records matching the publication filter.
///
/// Implementations push the filter down to the source and return records in
/// the order the source produced them.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_published(&self) -> Result<Vec<Record>, BoxError>;
}

/// Converts a record's rich-content body into markdown.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentTransformer: Send + Sync {
    async fn to_markdown(&self, record: &Record) -> Result<String, BoxError>;
}

/// Durable storage for rendered documents and the manifest.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create or overwrite the document named after `slug`, returning where it landed.
    async fn write_document(&self, slug: &str, document: &str) -> Result<String, BoxError>;

    /// Replace the manifest with `entries` in one operation, returning where it landed.
    async fn write_manifest(&self, entries: &[PageMetadata]) -> Result<String, BoxError>;
}
