//! # Shared Constants
//!
//! Defaults shared by the library, the server and the CLI.

/// The default path of the local SQLite database queried in `dataframe` mode.
pub const DEFAULT_DB_FILE: &str = "db/chatsql.db";

/// The default append-only file holding submitted few-shot example blocks.
pub const DEFAULT_EXAMPLE_LOG_FILE: &str = "fewshots_examples.txt";

/// The default prompt template file.
pub const DEFAULT_PROMPT_FILE: &str = "prompt.md";

/// The default table metadata file (DDL statements describing the schema).
pub const DEFAULT_METADATA_FILE: &str = "metadata.sql";

/// The default model checkpoint directory.
pub const DEFAULT_MODEL_PATH: &str = "models/sqlcoder";

/// The default configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Maximum number of result rows returned for display.
pub const DISPLAY_ROW_LIMIT: usize = 5;

/// Beam width used for deterministic generation.
pub const DEFAULT_NUM_BEAMS: usize = 5;

/// Default generation budget for interactive clients.
pub const DEFAULT_MAX_NEW_TOKENS: usize = 1024;

/// Generation budget of the inference server when a request sets none.
pub const DEFAULT_SERVER_MAX_NEW_TOKENS: usize = 3000;

/// Bounds and step of the client's generation-length slider.
pub const MIN_MAX_NEW_TOKENS: usize = 128;
pub const MAX_MAX_NEW_TOKENS: usize = 4096;
pub const MAX_NEW_TOKENS_STEP: usize = 128;

/// The port the inference server listens on by default.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Greetings that open a new chat session.
pub const GREETINGS: [&str; 3] = [
    "Hello there! This is Catbot. How can I assist you today?",
    "Hi! Is there anything I can help you with?",
    "This is Catbot. Do you need any help?",
];
