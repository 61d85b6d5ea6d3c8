//! Builds the combined document a bundle job sends to the model.
//!
//! Each readable item becomes one section:
//!
//! ```text
//! === SOURCE 1: Title ===
//! Type: web
//! URL: https://example.com/a
//!
//! <extracted text, as stored>
//!
//! ════════════ (80 wide)
//! ```
//!
//! Missing items and items without readable text are skipped with a
//! warning; the section number counts included items only.

use std::fmt::Write;

use tracing::warn;

use crate::db::content_repo::{ContentItem, ContentSource};
use crate::db::DatabaseError;
use crate::sanitize;
use crate::storage::ResultStore;

pub const SEPARATOR_CHAR: char = '═';
pub const SEPARATOR_WIDTH: usize = 80;

/// Length of the preview stored on a bundle attempt.
pub const PREVIEW_CHARS: usize = 500;

/// The combined document plus which ids made it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedContent {
    pub text: String,
    pub included: Vec<String>,
    pub skipped: Vec<String>,
}

impl CombinedContent {
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    pub fn preview(&self) -> String {
        sanitize::truncate_chars(&self.text, PREVIEW_CHARS).to_string()
    }
}

fn separator() -> String {
    std::iter::repeat(SEPARATOR_CHAR)
        .take(SEPARATOR_WIDTH)
        .collect()
}

fn write_section(out: &mut String, number: usize, item: &ContentItem, text: &str) {
    let _ = writeln!(out, "=== SOURCE {}: {} ===", number, item.title());
    let _ = writeln!(out, "Type: {}", item.source_type);
    if let Some(url) = &item.source_url {
        let _ = writeln!(out, "URL: {}", url);
    }
    out.push('\n');
    out.push_str(text);
    out.push_str("\n\n");
    out.push_str(&separator());
    out.push_str("\n\n");
}

/// Reads every item's extracted text in order and concatenates the readable
/// ones. Only content-store failures are returned as errors; unreadable
/// items are skipped.
pub async fn build(
    content: &dyn ContentSource,
    store: &dyn ResultStore,
    content_ids: &[String],
) -> Result<CombinedContent, DatabaseError> {
    let mut combined = CombinedContent::default();

    for content_id in content_ids {
        let Some(item) = content.get_content_by_id(content_id).await? else {
            warn!("Skipping content {}: not found", content_id);
            combined.skipped.push(content_id.clone());
            continue;
        };

        let Some(path) = item.extracted_text_path.as_deref() else {
            warn!("Skipping content {}: no extracted text", content_id);
            combined.skipped.push(content_id.clone());
            continue;
        };

        let text = match store.read_extracted_text(path).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(
                    "Skipping content {}: extracted text {} is missing or empty",
                    content_id,
                    sanitize::redact_path(path)
                );
                combined.skipped.push(content_id.clone());
                continue;
            }
            Err(e) => {
                warn!("Skipping content {}: {}", content_id, e);
                combined.skipped.push(content_id.clone());
                continue;
            }
        };

        write_section(&mut combined.text, combined.included.len() + 1, &item, &text);
        combined.included.push(content_id.clone());
    }

    Ok(combined)
}
