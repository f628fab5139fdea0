//! # Default Templates
//!
//! The default prompt follows the layout SQLCoder-style models were trained on.
//! It is written to `prompt.md` by `chatsql init` and can be edited freely as long
//! as the three slots remain.

/// The default prompt template.
///
/// Placeholders: `{user_question}`, `{examples}`, `{table_metadata_string}`
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"### Task
Generate a SQL query to answer [QUESTION]{user_question}[/QUESTION]

### Instructions
- If you cannot answer the question with the available database schema, return 'I do not know'
- Write a single SQLite statement and end it with a semicolon

### Examples
{examples}

### Database Schema
The query will run on a database with the following schema:
{table_metadata_string}

### Answer
Given the database schema, here is the SQL query that answers [QUESTION]{user_question}[/QUESTION]
[SQL]
"#;

/// Placeholder table metadata written next to the default template.
pub const DEFAULT_TABLE_METADATA: &str = r#"CREATE TABLE users (
  id INTEGER PRIMARY KEY, -- Unique ID for each user
  name TEXT, -- Display name of the user
  email TEXT -- Contact address of the user
);
"#;
