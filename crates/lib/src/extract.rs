//! # SQL Extraction
//!
//! Carves a single SQL statement out of raw model output. The default strategy is
//! tuned to SQLCoder-style completions and must apply its steps in a fixed order:
//!
//! 1. cut at the first statement terminator (`;`),
//! 2. cut at the first code-fence marker (```` ``` ````),
//! 3. trim and re-append the terminator,
//! 4. keep only the text after the last label separator (`:`), if any,
//! 5. trim.
//!
//! No SQL validation happens here; malformed output reaches the executor as is.

use dyn_clone::DynClone;
use regex::Regex;
use serde::Deserialize;
use std::fmt::Debug;
use std::sync::LazyLock;

/// A strategy that turns raw model output into a single SQL statement.
pub trait ExtractionStrategy: Send + Sync + Debug + DynClone {
    fn extract(&self, raw: &str) -> String;
}

dyn_clone::clone_trait_object!(ExtractionStrategy);

/// Extracts with the default delimiters.
pub fn extract(raw: &str) -> String {
    DelimiterExtractor::default().extract(raw)
}

/// The ordered five-step cut/trim procedure, with configurable delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DelimiterExtractor {
    pub terminator: String,
    pub fence: String,
    pub label: String,
}

impl Default for DelimiterExtractor {
    fn default() -> Self {
        Self {
            terminator: ";".to_string(),
            fence: "```".to_string(),
            label: ":".to_string(),
        }
    }
}

/// Returns the part of `text` before the first `delimiter`, or all of it.
fn before<'a>(text: &'a str, delimiter: &str) -> &'a str {
    if delimiter.is_empty() {
        return text;
    }
    text.split(delimiter).next().unwrap_or(text)
}

impl ExtractionStrategy for DelimiterExtractor {
    fn extract(&self, raw: &str) -> String {
        let statement = before(raw, &self.terminator);
        let statement = before(statement, &self.fence);
        let terminated = format!("{}{}", statement.trim(), self.terminator);

        let unlabelled = if self.label.is_empty() {
            terminated.as_str()
        } else {
            terminated
                .rsplit(self.label.as_str())
                .next()
                .unwrap_or(&terminated)
        };
        unlabelled.trim().to_string()
    }
}

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:sqlite|sql|query)?[ \t]*\n?([\s\S]*?)```").expect("valid fence regex")
});

/// Prefers the body of the first fenced code block, then applies the delimiter
/// procedure to it. Output without a complete fence goes straight to the
/// delimiter procedure.
#[derive(Debug, Clone, Default)]
pub struct CodeFenceExtractor {
    pub delimiters: DelimiterExtractor,
}

impl ExtractionStrategy for CodeFenceExtractor {
    fn extract(&self, raw: &str) -> String {
        let body = FENCED_BLOCK
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(raw);
        self.delimiters.extract(body)
    }
}
