//! # TUI Application State
//!
//! This module defines the core state and logic for the interactive chat session.

use chatsql::constants::{MAX_MAX_NEW_TOKENS, MAX_NEW_TOKENS_STEP, MIN_MAX_NEW_TOKENS};
use chatsql::{
    Answer, AnswerMode, AskOptions, ChatClient, ExampleLog, QueryResult, Role, Transcript,
};
use tracing::{error, info};

/// Which text box receives key presses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Question,
    Examples,
}

/// The core state for the TUI application.
pub struct App {
    /// `true` if the application is running, `false` to exit.
    pub running: bool,
    pub transcript: Transcript,
    /// Words of the opening greeting revealed so far.
    pub greeting_words_shown: usize,
    pub question: String,
    /// The few-shot editor. Empty means "reuse the last logged examples".
    pub examples: String,
    pub focus: Focus,
    pub max_new_tokens: usize,
    pub answer_mode: AnswerMode,
    pub last_result: Option<QueryResult>,
    /// A message to display in the status bar.
    pub status: String,
    pub busy: bool,
    client: ChatClient,
    log: ExampleLog,
}

impl App {
    pub fn new(client: ChatClient, log: ExampleLog, max_new_tokens: usize) -> Self {
        let answer_mode = client.answer_mode;
        Self {
            running: true,
            transcript: Transcript::with_greeting(),
            greeting_words_shown: 0,
            question: String::new(),
            examples: String::new(),
            focus: Focus::Question,
            max_new_tokens: clamp_tokens(max_new_tokens),
            answer_mode,
            last_result: None,
            status: "<Enter> ask · <Tab> switch box · <Ctrl+S> save examples · <PgUp/PgDn> tokens · <F2> mode · <Esc> quit".to_string(),
            busy: false,
            client,
            log,
        }
    }

    /// Sets the `running` flag to false to exit the main loop.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Reveals one more word of the greeting. Returns `true` while animating.
    pub fn tick(&mut self) -> bool {
        let total = self
            .transcript
            .messages()
            .first()
            .map(|m| m.content.split_whitespace().count())
            .unwrap_or(0);
        if self.greeting_words_shown < total {
            self.greeting_words_shown += 1;
            true
        } else {
            false
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Question => Focus::Examples,
            Focus::Examples => Focus::Question,
        };
    }

    pub fn toggle_answer_mode(&mut self) {
        self.answer_mode = match self.answer_mode {
            AnswerMode::Code => AnswerMode::Dataframe,
            AnswerMode::Dataframe => AnswerMode::Code,
        };
        self.status = format!("Answer mode: {:?}", self.answer_mode);
    }

    pub fn increase_tokens(&mut self) {
        self.max_new_tokens = clamp_tokens(self.max_new_tokens + MAX_NEW_TOKENS_STEP);
    }

    pub fn decrease_tokens(&mut self) {
        self.max_new_tokens =
            clamp_tokens(self.max_new_tokens.saturating_sub(MAX_NEW_TOKENS_STEP));
    }

    pub fn push_char(&mut self, c: char) {
        self.focused_buffer().push(c);
    }

    pub fn pop_char(&mut self) {
        self.focused_buffer().pop();
    }

    fn focused_buffer(&mut self) -> &mut String {
        match self.focus {
            Focus::Question => &mut self.question,
            Focus::Examples => &mut self.examples,
        }
    }

    /// Logs the editor contents if they differ from the last logged entry.
    pub fn submit_examples(&mut self) {
        let last = self.log.read_last();
        self.status = match self.log.append_if_changed(&self.examples, &last) {
            Ok(true) => "Few-shot examples saved.".to_string(),
            Ok(false) => "Few-shot examples unchanged.".to_string(),
            Err(e) => {
                error!("Failed to write example log: {e}");
                format!("Could not save examples: {e}")
            }
        };
    }

    /// Sends the current question through the client and records the outcome.
    pub async fn submit_question(&mut self) {
        let question = self.question.trim().to_string();
        if question.is_empty() {
            return;
        }

        let examples = match self.log.resolve(&self.examples) {
            Ok(examples) => examples,
            Err(e) => {
                error!("Failed to write example log: {e}");
                self.examples.trim().to_string()
            }
        };

        info!("Asking: {question}");
        let options = AskOptions {
            question,
            examples,
            max_new_tokens: Some(self.max_new_tokens),
            answer_mode: Some(self.answer_mode),
        };
        match self
            .client
            .ask_with_options(&mut self.transcript, options)
            .await
        {
            Ok(answer) => {
                self.question.clear();
                self.last_result = match answer {
                    Answer::Table { result, .. } => Some(result),
                    Answer::Code { .. } => None,
                };
                self.status = "Done.".to_string();
            }
            Err(e) => {
                error!("Interaction failed: {e}");
                self.status = format!("Error: {e}");
            }
        }
    }

    /// Messages as displayed, with the greeting cut to its revealed words.
    pub fn visible_messages(&self) -> Vec<(Role, String)> {
        self.transcript
            .messages()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let content = if i == 0 && m.role == Role::Assistant {
                    m.content
                        .split_whitespace()
                        .take(self.greeting_words_shown)
                        .collect::<Vec<_>>()
                        .join(" ")
                } else {
                    m.content.clone()
                };
                (m.role, content)
            })
            .collect()
    }
}

fn clamp_tokens(value: usize) -> usize {
    let stepped = (value / MAX_NEW_TOKENS_STEP) * MAX_NEW_TOKENS_STEP;
    stepped.clamp(MIN_MAX_NEW_TOKENS, MAX_MAX_NEW_TOKENS)
}
