use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::artifact::OutputKeyPolicy;
use crate::extract::FieldNames;
use crate::filter::PublicationFilter;
use crate::render::RenderOptions;

/// Non-secret settings for one sync run. Every field has a default so a
/// partial (or absent) config file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub output_dir: PathBuf,
    pub manifest_name: String,
    pub document_extension: String,
    pub filter: PublicationFilter,
    pub fields: FieldNames,
    pub render: RenderOptions,
    pub output_keys: OutputKeyPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            manifest_name: "posts.json".to_string(),
            document_extension: "html".to_string(),
            filter: PublicationFilter::default(),
            fields: FieldNames::default(),
            render: RenderOptions::default(),
            output_keys: OutputKeyPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            output_dir = %self.output_dir.display(),
            manifest = %self.manifest_name,
            filter_property = %self.filter.property,
            filter_value = %self.filter.value,
            escape_title = self.render.escape_title,
            output_keys = ?self.output_keys,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
