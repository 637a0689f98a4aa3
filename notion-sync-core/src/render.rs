//! Document rendering: `(title, markdown, date) -> self-contained HTML`.
//!
//! Rendering is a pure function. Markdown is parsed with `pulldown-cmark`, which
//! accepts any input, so malformed markdown degrades into literal text instead
//! of failing.
//!
//! The embedded script resolves the colour mode in this order: a choice stored
//! in `localStorage` under [`THEME_STORAGE_KEY`], then the system
//! `prefers-color-scheme`, then the light default. While nothing is stored it
//! follows live changes to the system preference.

use chrono::NaiveDate;
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};

use crate::contract::DATE_FORMAT;

pub const THEME_STORAGE_KEY: &str = "theme";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// HTML-escape the title. Off by default: the title is embedded verbatim.
    pub escape_title: bool,
}

const STYLE: &str = r#"
       :root {
           --bg-color: #fff;
           --text-color: #333;
           --accent-color: #666;
       }

       @media (prefers-color-scheme: dark) {
           :root {
               --bg-color: #1a1a1a;
               --text-color: #e5e5e5;
               --accent-color: #a0a0a0;
           }
       }

       [data-theme="dark"] {
           --bg-color: #1a1a1a;
           --text-color: #e5e5e5;
           --accent-color: #a0a0a0;
       }

       [data-theme="light"] {
           --bg-color: #fff;
           --text-color: #333;
           --accent-color: #666;
       }

       * { transition: background-color 0.3s ease, color 0.3s ease; }

       body {
           font-family: -apple-system, system-ui, sans-serif;
           line-height: 1.6;
           max-width: 650px;
           margin: 40px auto;
           padding: 0 10px;
           color: var(--text-color);
           background: var(--bg-color);
       }

       a { color: var(--text-color); }

       img {
           max-width: 100%;
           height: auto;
           display: block;
           margin: 20px auto;
           border-radius: 8px;
       }

       .theme-toggle {
           position: fixed;
           top: 20px;
           right: 20px;
           background: var(--bg-color);
           border: 1px solid var(--accent-color);
           color: var(--text-color);
           padding: 8px 12px;
           border-radius: 6px;
           cursor: pointer;
           font-size: 14px;
       }

       .theme-toggle:hover { opacity: 0.8; }

       pre {
           background: var(--accent-color);
           color: var(--bg-color);
           padding: 16px;
           border-radius: 6px;
           overflow-x: auto;
       }

       code {
           background: var(--accent-color);
           color: var(--bg-color);
           padding: 2px 6px;
           border-radius: 3px;
           font-size: 0.9em;
       }

       blockquote {
           border-left: 3px solid var(--accent-color);
           margin: 0;
           padding-left: 20px;
           font-style: italic;
           color: var(--accent-color);
       }
"#;

/// Toggle handler plus the initial mode resolution, keyed on [`THEME_STORAGE_KEY`].
fn theme_script() -> String {
    let key = THEME_STORAGE_KEY;
    format!(
        r#"
       function toggleTheme() {{
           const current = document.documentElement.getAttribute('data-theme');
           const next = current === 'dark' ? 'light' : 'dark';
           document.documentElement.setAttribute('data-theme', next);
           localStorage.setItem('{key}', next);
       }}

       const saved = localStorage.getItem('{key}');
       if (saved) {{
           document.documentElement.setAttribute('data-theme', saved);
       }} else if (window.matchMedia('(prefers-color-scheme: dark)').matches) {{
           document.documentElement.setAttribute('data-theme', 'dark');
       }}

       window.matchMedia('(prefers-color-scheme: dark)').addEventListener('change', e => {{
           if (!localStorage.getItem('{key}')) {{
               document.documentElement.setAttribute('data-theme', e.matches ? 'dark' : 'light');
           }}
       }});
"#
    )
}

/// Markdown to an HTML fragment, with the GitHub-flavoured extensions enabled.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);
    body
}

pub fn render_document(
    title: &str,
    markdown: &str,
    generated_on: NaiveDate,
    options: &RenderOptions,
) -> String {
    let title = if options.escape_title {
        escape_html(title)
    } else {
        title.to_string()
    };
    let body = markdown_to_html(markdown);
    let date = generated_on.format(DATE_FORMAT);
    let script = theme_script();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
   <meta charset="UTF-8">
   <meta name="viewport" content="width=device-width, initial-scale=1.0">
   <title>{title}</title>
   <style>{STYLE}   </style>
</head>
<body>
   <button class="theme-toggle" onclick="toggleTheme()">◑</button>
   <a href="./">← Back</a>
   <h1>{title}</h1>
   {body}
   <div style="margin-top: 40px; color: var(--accent-color);">
       Last updated: {date}
   </div>

   <script>{script}   </script>
</body>
</html>"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut escaped, raw);
    escaped
}
