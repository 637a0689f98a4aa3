//! HTTP client for the Notion REST API.
//!
//! [`NotionClient`] is both the [`RecordSource`] (a filtered, paginated
//! database query) and the [`ContentTransformer`] (block children fetched
//! recursively, then converted by [`crate::markdown`]).

use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::contract::{BoxError, ContentTransformer, Record, RecordSource};
use crate::filter::PublicationFilter;
use crate::markdown::{blocks_to_markdown, Block};

/// Nested blocks deeper than this are not fetched.
pub const MAX_BLOCK_DEPTH: usize = 8;

/// Block types whose children are separate pages or databases, never inlined.
const OPAQUE_CONTAINERS: [&str; 2] = ["child_page", "child_database"];

/// Connection settings that are not secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionApiConfig {
    pub base_url: String,
    pub version: String,
    pub timeout_secs: u64,
    pub page_size: u32,
}

impl Default for NotionApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.notion.com".to_string(),
            version: "2022-06-28".to_string(),
            timeout_secs: 30,
            page_size: 100,
        }
    }
}

/// Everything needed to reach one database.
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub api_key: String,
    pub database_id: String,
    pub api: NotionApiConfig,
}

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

pub struct NotionClient {
    http: Client,
    settings: NotionSettings,
    filter: PublicationFilter,
}

impl NotionClient {
    pub fn new(settings: NotionSettings, filter: PublicationFilter) -> Result<Self, BoxError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.api.timeout_secs))
            .build()?;
        info!(
            base_url = %settings.api.base_url,
            database_id = %settings.database_id,
            api_key_set = !settings.api_key.is_empty(),
            "Initialised NotionClient"
        );
        Ok(Self {
            http,
            settings,
            filter,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.api.base_url.trim_end_matches('/'))
    }

    fn authorise(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.settings.api_key)
            .header("Notion-Version", &self.settings.api.version)
    }

    /// All children of `block_id`, following pagination.
    pub async fn list_block_children(&self, block_id: &str) -> Result<Vec<Block>, BoxError> {
        let url = self.url(&format!("/v1/blocks/{block_id}/children"));
        let page_size = self.settings.api.page_size.to_string();
        let mut cursor: Option<String> = None;
        let mut blocks = Vec::new();

        loop {
            let mut query = vec![("page_size", page_size.clone())];
            if let Some(c) = &cursor {
                query.push(("start_cursor", c.clone()));
            }
            let req = self.authorise(self.http.get(&url).query(&query));
            let page: Paginated<Block> = decode(req.send().await?, &url).await?;
            blocks.extend(page.results);
            match next_page(cursor.as_deref(), page.has_more, page.next_cursor, &url)? {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(block_id, count = blocks.len(), "Fetched block children");
        Ok(blocks)
    }

    /// Children of `block_id` with their own children filled in, down to [`MAX_BLOCK_DEPTH`].
    pub fn fetch_block_tree(
        &self,
        block_id: String,
        depth: usize,
    ) -> BoxFuture<'_, Result<Vec<Block>, BoxError>> {
        async move {
            let mut blocks = self.list_block_children(&block_id).await?;
            if depth + 1 < MAX_BLOCK_DEPTH {
                let expandable = blocks
                    .iter_mut()
                    .filter(|b| b.has_children && !OPAQUE_CONTAINERS.contains(&b.kind.as_str()));
                for block in expandable {
                    block.children = self.fetch_block_tree(block.id.clone(), depth + 1).await?;
                }
            }
            Ok(blocks)
        }
        .boxed()
    }
}

async fn decode<T: DeserializeOwned>(resp: Response, url: &str) -> Result<T, BoxError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(status = %status, url, "Notion API returned error. Response body: {body}");
        return Err(format!("Notion API error ({status}) for {url}: {body}").into());
    }
    Ok(resp.json::<T>().await?)
}

/// Cursor for the following page, `None` once the listing is exhausted.
/// A server handing back the cursor it was just given would never finish.
fn next_page(
    current: Option<&str>,
    has_more: bool,
    next: Option<String>,
    url: &str,
) -> Result<Option<String>, BoxError> {
    match next {
        Some(next) if has_more => {
            if current == Some(next.as_str()) {
                error!(url, cursor = %next, "Notion API repeated a pagination cursor");
                return Err(format!("Notion API repeated pagination cursor {next:?} for {url}").into());
            }
            Ok(Some(next))
        }
        _ => Ok(None),
    }
}

#[async_trait]
impl RecordSource for NotionClient {
    async fn fetch_published(&self) -> Result<Vec<Record>, BoxError> {
        let url = self.url(&format!(
            "/v1/databases/{}/query",
            self.settings.database_id
        ));
        info!(url = %url, filter = %self.filter.to_query(), "Querying database");

        let mut cursor: Option<String> = None;
        let mut records = Vec::new();
        loop {
            let mut body = json!({
                "filter": self.filter.to_query(),
                "page_size": self.settings.api.page_size,
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = Value::String(c.clone());
            }
            let req = self.authorise(self.http.post(&url).json(&body));
            let page: Paginated<Record> = decode(req.send().await?, &url).await?;
            records.extend(page.results);
            match next_page(cursor.as_deref(), page.has_more, page.next_cursor, &url)? {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        info!(count = records.len(), "Found published pages");
        Ok(records)
    }
}

#[async_trait]
impl ContentTransformer for NotionClient {
    async fn to_markdown(&self, record: &Record) -> Result<String, BoxError> {
        let blocks = self.fetch_block_tree(record.id.clone(), 0).await?;
        let markdown = blocks_to_markdown(&blocks);
        debug!(record_id = %record.id, blocks = blocks.len(), bytes = markdown.len(), "Generated markdown");
        Ok(markdown)
    }
}
