//! # Prompt Templates
//!
//! This module renders the text sent to the model. `core` holds the template
//! renderer; `templates` holds the defaults shipped with the crate.

pub mod core;
pub mod templates;

pub use self::core::{
    build, load_prompt, PromptTemplate, EXAMPLES_SLOT, REQUIRED_SLOTS, TABLE_METADATA_SLOT,
    USER_QUESTION_SLOT,
};
pub use self::templates::{DEFAULT_PROMPT_TEMPLATE, DEFAULT_TABLE_METADATA};
