//! Rule-based query classifier.
//!
//! Picks the backend route for a raw query. Quick patterns are tried in
//! order and the first match wins; otherwise keyword groups are checked in
//! fixed priority (creation, analysis, insight) and anything left is
//! natural language.

use std::sync::LazyLock;

use ontime_core::types::QueryCategory;
use regex::Regex;

// =============================================================================
// Compiled patterns (compiled once, reused across calls)
// =============================================================================

static QUICK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bhow\s+many\b.*\b(?:today|yesterday|this\s+week|this\s+month)\b",
        r"(?i)^\s*(?:show|list|count)\b.*\b(?:today|pending|this\s+week|this\s+month)\b",
        r"(?i)\b(?:what\s+is|what'?s)\s+(?:the\s+)?(?:total|count|number)\s+of\b",
        r"(?i)\b(?:total|pending)\b.*\b(?:today|this\s+week|this\s+month)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid quick-query regex"))
    .collect()
});

static CREATION_KEYWORDS: &[&str] = &[
    "create", "add", "new", "make", "generate", "insert", "register",
];

static ANALYSIS_KEYWORDS: &[&str] = &[
    "analyze", "analyse", "analysis", "document", "extract", "upload", "scan",
];

static INSIGHT_KEYWORDS: &[&str] = &[
    "insight", "insights", "trend", "trends", "forecast", "report", "summary", "summarize",
    "compare",
];

// =============================================================================
// QueryClassifier
// =============================================================================

/// Deterministic text → [`QueryCategory`] mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw query.
    pub fn classify(&self, raw_query: &str) -> QueryCategory {
        if QUICK_PATTERNS.iter().any(|re| re.is_match(raw_query)) {
            return QueryCategory::Quick;
        }

        let words: Vec<String> = raw_query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let contains_any = |keywords: &[&str]| words.iter().any(|w| keywords.contains(&w.as_str()));

        if contains_any(CREATION_KEYWORDS) {
            QueryCategory::RecordCreation
        } else if contains_any(ANALYSIS_KEYWORDS) {
            QueryCategory::DocumentAnalysis
        } else if contains_any(INSIGHT_KEYWORDS) {
            QueryCategory::InsightGeneration
        } else {
            QueryCategory::NaturalLanguage
        }
    }
}

/// Classify a query with the default rules.
pub fn determine_query_type(raw_query: &str) -> QueryCategory {
    QueryClassifier.classify(raw_query)
}
