//! High-level pipeline: fetch → (extract → transform → render → write) per record → manifest.
//!
//! # Responsibilities
//! - Fetches the published record set once; a failure here aborts the run
//!   before anything is written ([`SyncError::SourceUnavailable`]).
//! - Processes records strictly in fetch order, one at a time. Any failure
//!   inside a record is logged and that record is skipped; the loop never
//!   unwinds past a single record.
//! - Accumulates a [`PageMetadata`] entry only after the record's document was
//!   written, then replaces the manifest once at the end.
//! - A manifest write failure is logged and reported, but the run still
//!   completes: documents already written stay in place.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Output: [`SyncReport`]

use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::contract::{
    ArtifactStore, ContentTransformer, PageMetadata, Record, RecordSource, Stage, SyncError,
    DATE_FORMAT,
};
use crate::extract::extract_fields;
use crate::render::render_document;

/// A record dropped from this run and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub record_id: String,
    pub stage: Stage,
    pub reason: String,
}

/// One written document.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub slug: String,
    pub path: String,
    /// Hex SHA-256 of the document as written.
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub generated_on: String,
    /// Manifest entries, in fetch order.
    pub processed: Vec<PageMetadata>,
    pub artifacts: Vec<ArtifactReport>,
    pub skipped: Vec<SkippedRecord>,
    /// `None` when the manifest write failed.
    pub manifest_path: Option<String>,
}

impl SyncReport {
    pub fn manifest_written(&self) -> bool {
        self.manifest_path.is_some()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} skipped, manifest {}",
            self.processed.len(),
            self.skipped.len(),
            self.manifest_path.as_deref().unwrap_or("NOT written")
        )
    }
}

/// The generation date used when the caller does not pin one.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn synchronise<S, T, A>(
    config: &SyncConfig,
    source: &S,
    transformer: &T,
    store: &A,
    generated_on: NaiveDate,
) -> Result<SyncReport, SyncError>
where
    S: RecordSource + ?Sized,
    T: ContentTransformer + ?Sized,
    A: ArtifactStore + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("sync_run", %run_id);
    run(config, source, transformer, store, generated_on, run_id)
        .instrument(span)
        .await
}

async fn run<S, T, A>(
    config: &SyncConfig,
    source: &S,
    transformer: &T,
    store: &A,
    generated_on: NaiveDate,
    run_id: Uuid,
) -> Result<SyncReport, SyncError>
where
    S: RecordSource + ?Sized,
    T: ContentTransformer + ?Sized,
    A: ArtifactStore + ?Sized,
{
    info!("[SYNC] Starting sync");

    let records = source.fetch_published().await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Querying content source failed");
        SyncError::SourceUnavailable(e.to_string())
    })?;
    info!(count = records.len(), "[SYNC] Fetched published records");

    let mut processed: Vec<PageMetadata> = Vec::new();
    let mut artifacts: Vec<ArtifactReport> = Vec::new();
    let mut skipped: Vec<SkippedRecord> = Vec::new();
    let mut seen_slugs: HashSet<String> = HashSet::new();

    for record in &records {
        info!(record_id = %record.id, "[SYNC] Processing record");
        match process_record(config, transformer, store, record, generated_on).await {
            Ok((entry, artifact)) => {
                if !seen_slugs.insert(entry.slug.clone()) {
                    warn!(
                        record_id = %record.id,
                        slug = %entry.slug,
                        "[SYNC] Duplicate output key; earlier document was overwritten"
                    );
                }
                info!(record_id = %record.id, title = %entry.title, path = %artifact.path, "[SYNC] Processed record");
                processed.push(entry);
                artifacts.push(artifact);
            }
            Err(e) => {
                error!(
                    record_id = %record.id,
                    stage = %e.stage(),
                    error = %e,
                    "[SYNC][ERROR] Skipping record"
                );
                skipped.push(SkippedRecord {
                    record_id: record.id.clone(),
                    stage: e.stage(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let manifest_path = match store.write_manifest(&processed).await {
        Ok(path) => {
            info!(path = %path, entries = processed.len(), "[SYNC] Wrote manifest");
            Some(path)
        }
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Manifest write failed; documents already written are kept");
            None
        }
    };

    let report = SyncReport {
        run_id: run_id.to_string(),
        generated_on: generated_on.format(DATE_FORMAT).to_string(),
        processed,
        artifacts,
        skipped,
        manifest_path,
    };
    info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        manifest_written = report.manifest_written(),
        "[SYNC] Sync completed"
    );
    Ok(report)
}

async fn process_record<T, A>(
    config: &SyncConfig,
    transformer: &T,
    store: &A,
    record: &Record,
    generated_on: NaiveDate,
) -> Result<(PageMetadata, ArtifactReport), SyncError>
where
    T: ContentTransformer + ?Sized,
    A: ArtifactStore + ?Sized,
{
    let fields = extract_fields(record, &config.fields)?;
    info!(title = %fields.title, slug = %fields.slug, "[SYNC] Extracted fields");

    let markdown = transformer
        .to_markdown(record)
        .await
        .map_err(|e| SyncError::TransformFailure {
            record_id: record.id.clone(),
            reason: e.to_string(),
        })?;

    let document = render_document(&fields.title, &markdown, generated_on, &config.render);

    let path = store
        .write_document(&fields.slug, &document)
        .await
        .map_err(|e| SyncError::ArtifactWriteFailure {
            name: fields.slug.clone(),
            reason: e.to_string(),
        })?;

    let content_hash = format!("{:x}", Sha256::digest(document.as_bytes()));
    let artifact = ArtifactReport {
        slug: fields.slug.clone(),
        path,
        content_hash,
    };
    Ok((PageMetadata::new(fields, generated_on), artifact))
}
