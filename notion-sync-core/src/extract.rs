//! Field extraction: pulls the title and output key out of a record's
//! property bag with strict presence validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::contract::{PageFields, Record, SyncError};

/// Property names holding the title and the output key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub title: String,
    pub output_key: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            title: "Name".to_string(),
            output_key: "Slug".to_string(),
        }
    }
}

/// Reads `{title, slug}` from the record. Fails with [`SyncError::MissingField`]
/// when either property is absent, has zero text runs, or its first run is empty.
pub fn extract_fields(record: &Record, names: &FieldNames) -> Result<PageFields, SyncError> {
    let title = first_text_run(record, &names.title)?;
    let slug = first_text_run(record, &names.output_key)?;
    debug!(record_id = %record.id, title = %title, slug = %slug, "Extracted page fields");
    Ok(PageFields { title, slug })
}

fn first_text_run(record: &Record, property: &str) -> Result<String, SyncError> {
    let missing = || SyncError::MissingField {
        record_id: record.id.clone(),
        field: property.to_string(),
    };

    let value = record.properties.get(property).ok_or_else(missing)?;
    let runs = text_runs(value).ok_or_else(missing)?;
    let text = runs
        .first()
        .and_then(run_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(missing)?;
    Ok(text.to_string())
}

/// The text-run array of a property: the array under its declared `type`,
/// falling back to the `title` / `rich_text` keys when no type is declared.
fn text_runs(property: &Value) -> Option<&Vec<Value>> {
    if let Some(kind) = property.get("type").and_then(Value::as_str) {
        return property.get(kind).and_then(Value::as_array);
    }
    property
        .get("title")
        .or_else(|| property.get("rich_text"))
        .and_then(Value::as_array)
}

fn run_text(run: &Value) -> Option<&str> {
    run.get("plain_text")
        .or_else(|| run.get("text").and_then(|t| t.get("content")))
        .and_then(Value::as_str)
}
