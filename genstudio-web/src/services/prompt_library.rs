//! Built-in prompt templates, grouped by category

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const PROMPT_LIBRARY_JSON: &str = include_str!("../../static/prompt_library.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub title: String,
    pub prompt_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCategory {
    pub category: String,
    pub prompts: Vec<PromptTemplate>,
}

static LIBRARY: Lazy<Vec<PromptCategory>> = Lazy::new(|| {
    serde_json::from_str(PROMPT_LIBRARY_JSON).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Embedded prompt library is malformed");
        Vec::new()
    })
});

/// All categories in display order
pub fn prompt_library() -> &'static [PromptCategory] {
    &LIBRARY
}

pub fn find_category(name: &str) -> Option<&'static PromptCategory> {
    LIBRARY.iter().find(|c| c.category.eq_ignore_ascii_case(name))
}
