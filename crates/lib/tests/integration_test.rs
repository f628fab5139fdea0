//! # Integration Tests
//!
//! Full interactions through `ChatClient` with a canned in-process generator and
//! a seeded SQLite file. No model weights are needed.

mod common;

use chatsql::errors::GatewayError;
use chatsql::providers::ai::generation::TextGenerator;
use chatsql::providers::ai::local::LocalGateway;
use chatsql::{
    Answer, AnswerMode, AskOptions, ChatClientBuilder, ChatError, ExampleLog, GenerationRequest,
    InferenceGateway, Role, Transcript,
};
use common::{setup_tracing, CannedGenerator, Workspace};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn client_for(ws: &Workspace, generator: CannedGenerator, mode: AnswerMode) -> chatsql::ChatClient {
    ChatClientBuilder::new()
        .gateway(Box::new(LocalGateway::new(Arc::new(generator), 1024)))
        .prompt_file(ws.prompt_file())
        .metadata_file(ws.metadata_file())
        .db_path(ws.db_path())
        .answer_mode(mode)
        .build()
        .unwrap()
}

/// A generated COUNT over three users yields a single cell holding 3.
#[tokio::test]
async fn test_end_to_end_dataframe_answer() {
    setup_tracing();
    let ws = Workspace::with_users().await;
    let generator = CannedGenerator::new("SELECT COUNT(*) FROM users;");
    let client = client_for(&ws, generator.clone(), AnswerMode::Dataframe);
    let mut transcript = Transcript::new();

    let answer = client
        .ask(&mut transcript, "How many users are there?", "")
        .await
        .unwrap();

    match &answer {
        Answer::Table { sql, result } => {
            assert_eq!(sql, "SELECT COUNT(*) FROM users;");
            assert_eq!(result.columns.len(), 1);
            assert_eq!(result.rows, vec![vec![json!(3)]]);
        }
        other => panic!("expected a table, got {other:?}"),
    }

    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "How many users are there?");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "SELECT COUNT(*) FROM users;");

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].0.contains("How many users are there?"));
    assert!(prompts[0].0.contains("CREATE TABLE users"));
}

/// In code mode the raw output is cleaned up and nothing is executed.
#[tokio::test]
async fn test_code_mode_returns_extracted_sql() {
    let ws = Workspace::new();
    let generator = CannedGenerator::new(" SQL: SELECT name FROM users\n```\ntrailing chatter");
    let client = client_for(&ws, generator, AnswerMode::Code);
    let mut transcript = Transcript::with_greeting();

    let answer = client.ask(&mut transcript, "names?", "").await.unwrap();
    assert_eq!(
        answer,
        Answer::Code {
            sql: "SELECT name FROM users;".into()
        }
    );
    assert_eq!(transcript.len(), 3);
}

/// Per-call options override the answer mode and the token budget.
#[tokio::test]
async fn test_ask_options_override_defaults() {
    let ws = Workspace::with_users().await;
    let generator = CannedGenerator::new("SELECT name FROM users ORDER BY id;");
    let client = client_for(&ws, generator.clone(), AnswerMode::Code);
    let mut transcript = Transcript::new();

    let answer = client
        .ask_with_options(
            &mut transcript,
            AskOptions {
                question: "who?".into(),
                examples: "Q: x\nSQL: SELECT 1;".into(),
                max_new_tokens: Some(256),
                answer_mode: Some(AnswerMode::Dataframe),
            },
        )
        .await
        .unwrap();

    let Answer::Table { result, .. } = answer else {
        panic!("expected a table");
    };
    assert_eq!(result.rows[0], vec![json!("Alice")]);

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts[0].1, 256);
    assert!(prompts[0].0.contains("Q: x\nSQL: SELECT 1;"));
}

/// A failed execution leaves the transcript untouched.
#[tokio::test]
async fn test_failed_query_keeps_transcript() {
    let ws = Workspace::with_users().await;
    let client = client_for(
        &ws,
        CannedGenerator::new("SELECT * FROM orders;"),
        AnswerMode::Dataframe,
    );
    let mut transcript = Transcript::new();

    let err = client.ask(&mut transcript, "orders?", "").await.unwrap_err();
    assert!(matches!(err, ChatError::QueryExecution(_)));
    assert!(transcript.is_empty());
}

/// A broken template surfaces as a template error, not an inference failure.
#[tokio::test]
async fn test_template_without_slots_is_reported() {
    let ws = Workspace::new();
    std::fs::write(ws.prompt_file(), "Answer {user_question}").unwrap();
    let client = client_for(&ws, CannedGenerator::new("SELECT 1;"), AnswerMode::Code);
    let mut transcript = Transcript::new();

    let err = client.ask(&mut transcript, "q", "").await.unwrap_err();
    assert!(matches!(err, ChatError::Template(_)));
    assert!(err.to_string().contains("examples"));
    assert!(transcript.is_empty());
}

/// Submitted examples are logged once and reused when nothing new is entered.
#[tokio::test]
async fn test_examples_flow_through_the_log() {
    let ws = Workspace::new();
    let log = ExampleLog::new(ws.file("fewshots_examples.txt"));
    let generator = CannedGenerator::new("SELECT 1;");
    let client = client_for(&ws, generator.clone(), AnswerMode::Code);
    let mut transcript = Transcript::new();

    let examples = log.resolve("Q: one\nSQL: SELECT 1;").unwrap();
    client.ask(&mut transcript, "first", &examples).await.unwrap();
    let examples = log.resolve("").unwrap();
    client.ask(&mut transcript, "second", &examples).await.unwrap();

    assert_eq!(log.entries().len(), 1);
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[1].0.contains("Q: one\nSQL: SELECT 1;"));
}

/// Sleeps for each generation and records the most generations seen running at once.
#[derive(Debug, Default)]
struct SlowGenerator {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl TextGenerator for SlowGenerator {
    fn generate(&self, _prompt: &str, _max_new_tokens: usize) -> Result<String, GatewayError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(150));
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok("SELECT 1;".to_string())
    }
}

/// Overlapping requests on clones of one local gateway run one after the other.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_local_generations_are_serialized() {
    let ws = Workspace::new();
    let generator = Arc::new(SlowGenerator::default());
    let gateway = LocalGateway::new(generator.clone(), 64);
    let request = GenerationRequest {
        question: "q".into(),
        examples: String::new(),
        prompt_file: ws.prompt_file(),
        metadata_file: ws.metadata_file(),
        max_new_tokens: None,
    };

    let (first, second) = (gateway.clone(), gateway.clone());
    let (req_a, req_b) = (request.clone(), request.clone());
    let a = tokio::spawn(async move { first.generate(&req_a).await });
    let b = tokio::spawn(async move { second.generate(&req_b).await });
    let (a, b) = tokio::join!(a, b);

    assert_eq!(a.unwrap().unwrap(), "SELECT 1;");
    assert_eq!(b.unwrap().unwrap(), "SELECT 1;");
    assert_eq!(generator.peak.load(Ordering::SeqCst), 1);
    assert_eq!(generator.running.load(Ordering::SeqCst), 0);
}
