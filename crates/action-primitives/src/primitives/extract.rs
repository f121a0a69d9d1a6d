//! Extract primitive - dump the body as text, markdown or html

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, ExtractFormat},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::info;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h[1-6][^>]*>(.*?)</h[1-6]>").unwrap());
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p[^>]*>(.*?)</p>").unwrap());
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(?:strong|b)>(.*?)</(?:strong|b)>").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<(?:em|i)>(.*?)</(?:em|i)>").unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Lossy HTML to markdown conversion for the common inline and block tags.
pub fn html_to_markdown(html: &str) -> String {
    let out = HEADING.replace_all(html, "# $1\n");
    let out = PARAGRAPH.replace_all(&out, "$1\n");
    let out = LINK.replace_all(&out, "[$2]($1)");
    let out = STRONG.replace_all(&out, "**$1**");
    let out = EMPHASIS.replace_all(&out, "*$1*");
    let out = LIST_ITEM.replace_all(&out, "- $1\n");
    let out = TAG.replace_all(&out, "");
    BLANK_RUN.replace_all(&out, "\n\n").trim().to_string()
}

pub async fn execute_extract(
    ctx: &ExecCtx,
    format: ExtractFormat,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    let body = ctx
        .doc
        .body()
        .ok_or_else(|| ActionError::Execution("document has no body".to_string()))?;
    let content = match format {
        ExtractFormat::Text => ctx.doc.inner_text(body),
        ExtractFormat::Markdown => html_to_markdown(&ctx.doc.inner_html(body)),
        ExtractFormat::Html => ctx.doc.inner_html(body),
    };

    info!(
        action_id = %ctx.action_id,
        format = ?format,
        length = content.len(),
        "extract completed"
    );
    Ok(ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64)
        .with_content(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_conversion() {
        let html = r#"<h1>Title</h1><p>Read <a href="/docs">the docs</a> and <strong>stay</strong> <em>calm</em></p><ul><li>one</li><li>two</li></ul>"#;
        assert_eq!(
            html_to_markdown(html),
            "# Title\nRead [the docs](/docs) and **stay** *calm*\n- one\n- two"
        );
    }
}
