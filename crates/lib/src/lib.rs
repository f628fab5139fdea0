//! # Natural Language to SQL
//!
//! This crate turns a natural-language question into a single SQL statement with a
//! text-to-SQL model, and optionally runs that statement against a local SQLite file.
//!
//! One interaction flows through these stages:
//!
//! 1. the example log supplies the few-shot examples,
//! 2. an `InferenceGateway` (in-process or remote) produces raw model text,
//! 3. an `ExtractionStrategy` carves one statement out of it,
//! 4. in dataframe mode the query executor runs it,
//! 5. the question and the SQL are appended to the session transcript.

pub mod config;
pub mod constants;
pub mod errors;
pub mod example_log;
pub mod extract;
pub mod prompts;
pub mod providers;
pub mod types;

pub use config::{get_config, AppConfig, InferenceMode};
pub use errors::{ChatError, ConfigError, GatewayError, QueryExecutionError, TemplateError};
pub use example_log::{ExampleEntry, ExampleLog};
pub use extract::{extract, ExtractionStrategy};
pub use providers::ai::{GenerationRequest, InferenceGateway};
pub use types::{
    Answer, AnswerMode, AskOptions, ChatClient, ChatClientBuilder, Message, QueryResult, Role,
    Transcript,
};

use tracing::{debug, error, info};

impl ChatClient {
    /// Answers `question` with the client's default answer mode and token budget.
    pub async fn ask(
        &self,
        transcript: &mut Transcript,
        question: &str,
        examples: &str,
    ) -> Result<Answer, ChatError> {
        let options = AskOptions {
            question: question.to_string(),
            examples: examples.to_string(),
            ..Default::default()
        };
        self.ask_with_options(transcript, options).await
    }

    /// Runs one interaction.
    ///
    /// On success the question and the extracted SQL are appended to `transcript`.
    /// On failure the transcript is left as it was.
    pub async fn ask_with_options(
        &self,
        transcript: &mut Transcript,
        options: AskOptions,
    ) -> Result<Answer, ChatError> {
        info!("[ask] received question: {:?}", options.question);
        let request = GenerationRequest {
            question: options.question.clone(),
            examples: options.examples,
            prompt_file: self.prompt_file.clone(),
            metadata_file: self.metadata_file.clone(),
            max_new_tokens: options.max_new_tokens.or(self.max_new_tokens),
        };
        let sql = self.generate_sql(&request).await?;

        let answer = match options.answer_mode.unwrap_or(self.answer_mode) {
            AnswerMode::Code => Answer::Code { sql },
            AnswerMode::Dataframe => {
                let result = providers::db::run(&sql, &self.db_path)
                    .await
                    .inspect_err(|e| error!("[ask] Query execution error: {e}"))?;
                Answer::Table { sql, result }
            }
        };

        transcript.push(Role::User, options.question);
        transcript.push(Role::Assistant, answer.sql());
        Ok(answer)
    }

    /// Sends `request` through the gateway and extracts the statement from the output.
    pub async fn generate_sql(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        let raw = self
            .gateway
            .generate(request)
            .await
            .inspect_err(|e| error!("[generate_sql] Inference error: {e}"))?;
        debug!(raw = %raw, "Raw model output");

        let sql = self.extractor.extract(&raw);
        info!("[generate_sql] extracted query: {sql}");
        Ok(sql)
    }
}
