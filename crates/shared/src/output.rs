use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::models::SummaryResult;

pub struct DigestWriter {
    output_dir: PathBuf,
}

impl DigestWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the digest as JSON, CSV, text and HTML. Returns the paths written,
    /// JSON first. An empty digest writes nothing.
    pub fn write_all(&self, digest: &SummaryResult) -> Result<Vec<PathBuf>> {
        if digest.is_empty() {
            warn!("digest is empty, nothing to save");
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.output_dir)?;

        let stem = format!(
            "ai_news_{}",
            digest
                .generated_at
                .with_timezone(&Local)
                .format("%Y%m%d_%H%M%S")
        );

        let paths = vec![
            self.write(&stem, "json", &render_json(digest)?)?,
            self.write(&stem, "csv", &render_csv(digest))?,
            self.write(&stem, "txt", &render_text(digest))?,
            self.write(&stem, "html", &render_html(digest))?,
        ];

        info!(dir = %self.output_dir.display(), files = paths.len(), "saved digest");
        Ok(paths)
    }

    fn write(&self, stem: &str, extension: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.{}", stem, extension));
        fs::write(&path, content)?;
        Ok(path)
    }
}

pub fn render_json(digest: &SummaryResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(digest)?)
}

pub fn render_csv(digest: &SummaryResult) -> String {
    let mut csv = String::from("title,url,source,score,published_at,summary_ja\n");

    for entry in &digest.entries {
        let item = &entry.item.item;
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            escape_csv(&item.title),
            escape_csv(&item.url),
            escape_csv(item.source.label()),
            item.score,
            item.published_at.to_rfc3339(),
            escape_csv(entry.summary.text().unwrap_or(""))
        ));
    }

    csv
}

pub fn render_text(digest: &SummaryResult) -> String {
    let mut text = format!(
        "AI関連ニュース要約 - {}\n",
        digest
            .generated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    text.push_str(&"=".repeat(80));
    text.push_str("\n\n");

    for (index, entry) in digest.entries.iter().enumerate() {
        let item = &entry.item.item;
        text.push_str(&format!("[{}] {}\n", index + 1, item.title));
        text.push_str(&format!(
            "ソース: {} (スコア: {})\n",
            item.source.label(),
            item.score
        ));
        text.push_str(&format!("URL: {}\n", item.url));
        text.push_str("\n要約:\n");
        text.push_str(entry.summary.text().unwrap_or("要約なし"));
        text.push('\n');
        text.push_str(&format!("\n{}\n\n", "-".repeat(40)));
    }

    text
}

pub fn render_html(digest: &SummaryResult) -> String {
    let generated = digest.generated_at.with_timezone(&Local);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str(
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!(
        "  <title>AI関連ニュース要約 - {}</title>\n",
        generated.format("%Y-%m-%d")
    ));
    html.push_str("  <style>\n");
    html.push_str("    body { font-family: 'Helvetica Neue', Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; line-height: 1.6; }\n");
    html.push_str("    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }\n");
    html.push_str("    .news-item { border: 1px solid #ddd; border-radius: 8px; padding: 15px; margin-bottom: 20px; }\n");
    html.push_str("    .news-title { font-size: 1.3em; margin-top: 0; color: #0066cc; }\n");
    html.push_str("    .news-meta { color: #7f8c8d; font-size: 0.9em; }\n");
    html.push_str("    .news-url { word-break: break-all; }\n");
    html.push_str("    .source-label { display: inline-block; padding: 3px 8px; border-radius: 4px; font-size: 0.8em; color: white; }\n");
    html.push_str("    .source-hackernews { background-color: #ff6600; }\n");
    html.push_str("    .source-producthunt { background-color: #da552f; }\n");
    html.push_str("    .source-twitter { background-color: #1da1f2; }\n");
    html.push_str("    .error { color: #e74c3c; font-style: italic; }\n");
    html.push_str("  </style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<h1>AI関連ニュース要約</h1>\n");
    html.push_str(&format!(
        "<p>生成日時: {}</p>\n",
        generated.format("%Y-%m-%d %H:%M:%S")
    ));

    for entry in &digest.entries {
        let item = &entry.item.item;
        html.push_str("<div class=\"news-item\">\n");
        html.push_str(&format!(
            "  <h2 class=\"news-title\">{}</h2>\n",
            escape_html(&item.title)
        ));
        html.push_str("  <div class=\"news-meta\">\n");
        html.push_str(&format!(
            "    <span class=\"source-label source-{}\">{}</span>\n",
            item.source.slug(),
            escape_html(item.source.label())
        ));
        html.push_str(&format!(
            "    <span class=\"news-date\">{}</span>\n",
            item.published_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        ));
        html.push_str(&format!(
            "    <span class=\"news-score\">スコア: {}</span>\n",
            item.score
        ));
        html.push_str("  </div>\n");

        match entry.summary.text() {
            Some(summary) => html.push_str(&format!(
                "  <p class=\"news-summary\">{}</p>\n",
                escape_html(summary)
            )),
            None => html.push_str("  <p class=\"error\">要約なし</p>\n"),
        }

        html.push_str(&format!(
            "  <div class=\"news-url\"><a href=\"{}\" target=\"_blank\">元記事を読む</a></div>\n",
            escape_html(&item.url)
        ));
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn escape_csv(text: &str) -> String {
    // If the text contains comma, quote, or a line break, wrap in quotes and escape quotes
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
