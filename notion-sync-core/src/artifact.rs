//! Filesystem artifact store: one document per output key plus the manifest.
//!
//! Writes go through a temp file in the output directory followed by a rename,
//! so a reader never sees a half-written document or manifest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::contract::{ArtifactStore, BoxError, PageMetadata};

static SAFE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("safe segment pattern compiles")
});

/// How an output key may be used as a file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKeyPolicy {
    /// Used as-is; a key containing `/` or `..` lands wherever it points.
    #[default]
    Verbatim,
    /// Only a single segment of `[A-Za-z0-9._-]` not starting with `.`.
    SafeSegment,
}

impl OutputKeyPolicy {
    pub fn check(&self, slug: &str) -> Result<(), BoxError> {
        match self {
            OutputKeyPolicy::Verbatim => Ok(()),
            OutputKeyPolicy::SafeSegment => {
                if SAFE_SEGMENT.is_match(slug) {
                    Ok(())
                } else {
                    Err(format!("output key {slug:?} is not a safe path segment").into())
                }
            }
        }
    }
}

pub struct FsArtifactStore {
    output_dir: PathBuf,
    extension: String,
    manifest_name: String,
    policy: OutputKeyPolicy,
}

impl FsArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let defaults = SyncConfig::default();
        Self {
            output_dir: output_dir.into(),
            extension: defaults.document_extension,
            manifest_name: defaults.manifest_name,
            policy: OutputKeyPolicy::default(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            extension: config.document_extension.clone(),
            manifest_name: config.manifest_name.clone(),
            policy: config.output_keys,
        }
    }

    pub fn with_policy(mut self, policy: OutputKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn document_path(&self, slug: &str) -> PathBuf {
        self.output_dir.join(format!("{slug}.{}", self.extension))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_name)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write_document(&self, slug: &str, document: &str) -> Result<String, BoxError> {
        self.policy.check(slug)?;
        ensure_output_dir(&self.output_dir)?;
        let target = self.document_path(slug);
        debug!(slug, path = %target.display(), "Writing document");
        write_atomic(&target, document).map_err(|e| {
            error!(slug, path = %target.display(), error = %e, "Failed to write document");
            e
        })?;
        Ok(target.display().to_string())
    }

    async fn write_manifest(&self, entries: &[PageMetadata]) -> Result<String, BoxError> {
        ensure_output_dir(&self.output_dir)?;
        let target = self.manifest_path();
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&target, &json).map_err(|e| {
            error!(path = %target.display(), error = %e, "Failed to write manifest");
            e
        })?;
        info!(path = %target.display(), entries = entries.len(), "Wrote manifest");
        Ok(target.display().to_string())
    }
}

/// Create the output directory if missing; error if the path is not a directory.
pub fn ensure_output_dir(dir: &Path) -> Result<(), BoxError> {
    if dir.exists() {
        if !fs::metadata(dir)?.is_dir() {
            return Err(format!("{} is not a directory", dir.display()).into());
        }
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    debug!(path = %dir.display(), "Created output directory");
    Ok(())
}

/// Write `content` to `target` via a sibling temp file and a rename, replacing
/// any existing file. The parent directory must already exist.
pub fn write_atomic(target: &Path, content: &str) -> Result<(), BoxError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
