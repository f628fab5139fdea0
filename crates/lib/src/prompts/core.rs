//! # Prompt Rendering
//!
//! Templates use named placeholders in braces. Exactly three are recognised:
//! `{user_question}`, `{examples}` and `{table_metadata_string}`. All three must
//! appear at least once. `{{` and `}}` render as literal braces; any other brace
//! text is copied through unchanged.

use crate::errors::{GatewayError, TemplateError};
use std::path::Path;
use tracing::debug;

pub const USER_QUESTION_SLOT: &str = "user_question";
pub const EXAMPLES_SLOT: &str = "examples";
pub const TABLE_METADATA_SLOT: &str = "table_metadata_string";

/// Slots every template must contain, in reporting order.
pub const REQUIRED_SLOTS: [&str; 3] = [USER_QUESTION_SLOT, EXAMPLES_SLOT, TABLE_METADATA_SLOT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    UserQuestion,
    Examples,
    TableMetadata,
}

impl Slot {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            USER_QUESTION_SLOT => Some(Slot::UserQuestion),
            EXAMPLES_SLOT => Some(Slot::Examples),
            TABLE_METADATA_SLOT => Some(Slot::TableMetadata),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::UserQuestion => 0,
            Slot::Examples => 1,
            Slot::TableMetadata => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Slot),
}

/// A parsed prompt template, validated to contain every required slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parses `template`, failing if any required slot is absent.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut seen = [false; 3];
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            text.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                text.push('{');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with("}}") {
                text.push('}');
                rest = &tail[2..];
                continue;
            }

            let slot = tail
                .strip_prefix('{')
                .and_then(|inner| inner.find('}').map(|end| &inner[..end]))
                .and_then(|name| Slot::from_name(name).map(|slot| (slot, name.len())));

            match slot {
                Some((slot, name_len)) => {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Slot(slot));
                    seen[slot.index()] = true;
                    rest = &tail[name_len + 2..];
                }
                None => {
                    // A lone brace or an unknown placeholder is plain text.
                    text.push_str(&tail[..1]);
                    rest = &tail[1..];
                }
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        let missing: Vec<&'static str> = REQUIRED_SLOTS
            .iter()
            .zip(seen)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingSlots(missing));
        }

        Ok(Self { segments })
    }

    /// Substitutes the three slots.
    pub fn render(&self, question: &str, examples: &str, table_metadata: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(Slot::UserQuestion) => out.push_str(question),
                Segment::Slot(Slot::Examples) => out.push_str(examples),
                Segment::Slot(Slot::TableMetadata) => out.push_str(table_metadata),
            }
        }
        out
    }
}

/// Renders `template` with the question, the few-shot examples and the table metadata.
pub fn build(
    template: &str,
    question: &str,
    examples: &str,
    table_metadata: &str,
) -> Result<String, TemplateError> {
    Ok(PromptTemplate::parse(template)?.render(question, examples, table_metadata))
}

/// Reads the template and metadata files and renders the prompt.
pub async fn load_prompt(
    prompt_file: &str,
    metadata_file: &str,
    question: &str,
    examples: &str,
) -> Result<String, GatewayError> {
    let template = read_input(prompt_file).await?;
    let table_metadata = read_input(metadata_file).await?;
    let prompt = build(&template, question, examples, &table_metadata)?;
    debug!(prompt = %prompt, "Rendered prompt");
    Ok(prompt)
}

async fn read_input(path: &str) -> Result<String, GatewayError> {
    tokio::fs::read_to_string(Path::new(path))
        .await
        .map_err(|source| GatewayError::PromptInput {
            path: path.to_string(),
            source,
        })
}
