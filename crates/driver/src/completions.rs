// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Static keyword completions, computed once per driver instance.

use std::sync::{Arc, OnceLock};

use lsp_types::{MarkupContent, MarkupKind};
use serde_json::Value;

use crate::error::DriverResult;
use crate::explorer::MetadataSource;
use crate::model::{CompletionEntry, CompletionMap};

/// Keywords sorted ahead of everything else
const PRIORITY_KEYWORDS: [&str; 4] = ["SELECT", "CREATE", "UPDATE", "DELETE"];

/// Compute-once holder for a driver's static completions
///
/// Never evicted; it lives exactly as long as the driver instance.
#[derive(Debug, Default)]
pub struct CompletionCache {
    cell: OnceLock<Arc<CompletionMap>>,
}

impl CompletionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached completions, if already loaded
    pub fn get(&self) -> Option<Arc<CompletionMap>> {
        self.cell.get().cloned()
    }

    /// Store freshly loaded completions
    ///
    /// If another load won the race, its value is kept and returned.
    pub fn fill(&self, completions: CompletionMap) -> Arc<CompletionMap> {
        self.cell.get_or_init(|| Arc::new(completions)).clone()
    }
}

/// Build one completion entry from a keyword and its category
pub fn completion_entry(label: &str, category: &str) -> CompletionEntry {
    let sort_prefix = if PRIORITY_KEYWORDS.contains(&label) {
        "2:"
    } else {
        ""
    };
    CompletionEntry {
        label: label.to_string(),
        detail: label.to_string(),
        filter_text: label.to_string(),
        sort_text: format!("{}{}", sort_prefix, label),
        documentation: MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("```yaml\nWORD: {}\nTYPE: {}\n```", label, category),
        },
    }
}

/// Query the backend's keyword catalog and build the completion map
pub async fn load_static_completions<S>(source: &mut S) -> DriverResult<CompletionMap>
where
    S: MetadataSource + ?Sized,
{
    let sql = source.queries().fetch_keywords();
    let rows = source.query_results(&sql).await?;

    let mut completions = CompletionMap::new();
    for row in rows {
        let Some(label) = row.get("label").and_then(Value::as_str) else {
            continue;
        };
        let category = row.get("desc").and_then(Value::as_str).unwrap_or("");
        completions.insert(label.to_string(), completion_entry(label, category));
    }
    tracing::debug!(count = completions.len(), "Static completions loaded");
    Ok(completions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_keywords_sort_first() {
        assert_eq!(completion_entry("SELECT", "RESERVED").sort_text, "2:SELECT");
        assert_eq!(completion_entry("DELETE", "UNRESERVED").sort_text, "2:DELETE");
        assert_eq!(completion_entry("ABORT", "UNRESERVED").sort_text, "ABORT");
    }

    #[test]
    fn test_entry_documentation_is_markdown() {
        let entry = completion_entry("ALTER", "UNRESERVED");
        assert_eq!(entry.detail, "ALTER");
        assert_eq!(entry.filter_text, "ALTER");
        assert_eq!(entry.documentation.kind, MarkupKind::Markdown);
        assert_eq!(
            entry.documentation.value,
            "```yaml\nWORD: ALTER\nTYPE: UNRESERVED\n```"
        );
    }

    #[test]
    fn test_cache_keeps_first_fill() {
        let cache = CompletionCache::new();
        assert!(cache.get().is_none());

        let mut first = CompletionMap::new();
        first.insert("SELECT".to_string(), completion_entry("SELECT", "RESERVED"));
        cache.fill(first);

        let kept = cache.fill(CompletionMap::new());
        assert_eq!(kept.len(), 1);
        assert_eq!(cache.get().unwrap().len(), 1);
    }
}
