//! Conversion of a Notion block tree into markdown.
//!
//! The conversion is pure: [`crate::notion::NotionClient`] fetches the tree,
//! this module only turns already-fetched blocks into text. Layout containers
//! (columns, synced blocks) are flattened into their content. Unknown block
//! types contribute nothing.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One content block. The type-specific payload lives under the key named by `kind`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    #[serde(skip)]
    pub children: Vec<Block>,
}

impl Block {
    fn body(&self) -> Option<&Value> {
        self.payload.get(&self.kind)
    }

    fn rich_text(&self) -> String {
        self.body()
            .and_then(|b| b.get("rich_text"))
            .and_then(Value::as_array)
            .map(|runs| rich_text_to_markdown(runs))
            .unwrap_or_default()
    }

    fn is_list_item(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "bulleted_list_item" | "numbered_list_item" | "to_do"
        )
    }
}

/// Render a block sequence, numbering consecutive numbered items and keeping
/// list runs tight.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut number = 0usize;
    let mut previous_was_list = false;

    for block in blocks {
        if block.kind == "numbered_list_item" {
            number += 1;
        } else {
            number = 0;
        }
        let Some(text) = block_to_markdown(block, number) else {
            continue;
        };
        let is_list = block.is_list_item();
        if !out.is_empty() {
            out.push_str(if is_list && previous_was_list { "\n" } else { "\n\n" });
        }
        out.push_str(&text);
        previous_was_list = is_list;
    }
    out
}

fn block_to_markdown(block: &Block, number: usize) -> Option<String> {
    let children = blocks_to_markdown(&block.children);
    let text = match block.kind.as_str() {
        "paragraph" => {
            let text = block.rich_text();
            if text.is_empty() && children.is_empty() {
                return None;
            }
            join_blocks(&text, &children)
        }
        // Toggleable headings carry their body as children.
        "heading_1" => join_blocks(&format!("# {}", block.rich_text()), &children),
        "heading_2" => join_blocks(&format!("## {}", block.rich_text()), &children),
        "heading_3" => join_blocks(&format!("### {}", block.rich_text()), &children),
        "bulleted_list_item" => list_item("- ", &block.rich_text(), &children),
        "numbered_list_item" => list_item(&format!("{number}. "), &block.rich_text(), &children),
        "to_do" => {
            let checked = block
                .body()
                .and_then(|b| b.get("checked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let marker = if checked { "- [x] " } else { "- [ ] " };
            list_item(marker, &block.rich_text(), &children)
        }
        "quote" => quote(&join_blocks(&block.rich_text(), &children)),
        "callout" => {
            let icon = block
                .body()
                .and_then(|b| b.get("icon"))
                .and_then(|i| i.get("emoji"))
                .and_then(Value::as_str);
            let line = match icon {
                Some(emoji) => format!("{emoji} {}", block.rich_text()),
                None => block.rich_text(),
            };
            quote(&join_blocks(&line, &children))
        }
        "toggle" => join_blocks(&block.rich_text(), &children),
        "code" => {
            let body = block.body();
            let source = body
                .and_then(|b| b.get("rich_text"))
                .and_then(Value::as_array)
                .map(|runs| plain_text(runs))
                .unwrap_or_default();
            let language = body
                .and_then(|b| b.get("language"))
                .and_then(Value::as_str)
                .filter(|l| *l != "plain text")
                .unwrap_or("");
            format!("```{language}\n{source}\n```")
        }
        "divider" => "---".to_string(),
        "equation" => {
            let expression = block
                .body()
                .and_then(|b| b.get("expression"))
                .and_then(Value::as_str)?;
            format!("$$\n{expression}\n$$")
        }
        "image" => {
            let body = block.body()?;
            let url = hosted_url(body)?;
            let alt = caption(body);
            format!("![{alt}]({url})")
        }
        "bookmark" | "embed" | "link_preview" => {
            let body = block.body()?;
            let url = body.get("url").and_then(Value::as_str)?;
            let label = caption(body);
            let label = if label.is_empty() { url.to_string() } else { label };
            format!("[{label}]({url})")
        }
        "table" => table(block)?,
        "column_list" | "column" | "synced_block" => {
            if children.is_empty() {
                return None;
            }
            children
        }
        _ => return None,
    };
    Some(text)
}

fn join_blocks(head: &str, children: &str) -> String {
    match (head.is_empty(), children.is_empty()) {
        (_, true) => head.to_string(),
        (true, false) => children.to_string(),
        (false, false) => format!("{head}\n\n{children}"),
    }
}

fn list_item(marker: &str, text: &str, children: &str) -> String {
    if children.is_empty() {
        return format!("{marker}{text}");
    }
    format!("{marker}{text}\n{}", indent(children, "    "))
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn quote(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `external.url` or `file.url`, whichever the payload declares.
fn hosted_url(body: &Value) -> Option<&str> {
    let kind = body.get("type").and_then(Value::as_str).unwrap_or("external");
    body.get(kind)
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)
}

fn caption(body: &Value) -> String {
    body.get("caption")
        .and_then(Value::as_array)
        .map(|runs| plain_text(runs))
        .unwrap_or_default()
}

fn table(block: &Block) -> Option<String> {
    let rows: Vec<Vec<String>> = block
        .children
        .iter()
        .filter(|row| row.kind == "table_row")
        .filter_map(|row| row.body()?.get("cells")?.as_array().cloned())
        .map(|cells| {
            cells
                .iter()
                .map(|cell| {
                    cell.as_array()
                        .map(|runs| rich_text_to_markdown(runs))
                        .unwrap_or_default()
                        .replace('|', "\\|")
                })
                .collect()
        })
        .collect();

    let (header, body) = rows.split_first()?;
    let width = header.len();
    let mut lines = vec![
        format!("| {} |", header.join(" | ")),
        format!("| {} |", vec!["---"; width].join(" | ")),
    ];
    for row in body {
        lines.push(format!("| {} |", row.join(" | ")));
    }
    Some(lines.join("\n"))
}

fn plain_text(runs: &[Value]) -> String {
    runs.iter()
        .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
        .collect()
}

/// Render a rich-text run array with its annotations as inline markdown.
pub fn rich_text_to_markdown(runs: &[Value]) -> String {
    runs.iter().map(annotate).collect()
}

fn annotate(run: &Value) -> String {
    if run.get("type").and_then(Value::as_str) == Some("equation") {
        if let Some(expression) = run
            .get("equation")
            .and_then(|e| e.get("expression"))
            .and_then(Value::as_str)
        {
            return format!("${expression}$");
        }
    }

    let text = run
        .get("plain_text")
        .or_else(|| run.get("text").and_then(|t| t.get("content")))
        .and_then(Value::as_str)
        .unwrap_or("");
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    // Markers must hug the text, so surrounding whitespace is kept outside them.
    let lead_len = text.len() - text.trim_start().len();
    let lead = &text[..lead_len];
    let trail = &text[lead_len + core.len()..];

    let flag = |name: &str| {
        run.get("annotations")
            .and_then(|a| a.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    let mut styled = core.to_string();
    if flag("code") {
        styled = format!("`{styled}`");
    }
    if flag("bold") {
        styled = format!("**{styled}**");
    }
    if flag("italic") {
        styled = format!("_{styled}_");
    }
    if flag("strikethrough") {
        styled = format!("~~{styled}~~");
    }
    let href = run.get("href").and_then(Value::as_str).or_else(|| {
        run.get("text")
            .and_then(|t| t.get("link"))
            .and_then(|l| l.get("url"))
            .and_then(Value::as_str)
    });
    if let Some(href) = href {
        styled = format!("[{styled}]({href})");
    }
    format!("{lead}{styled}{trail}")
}
