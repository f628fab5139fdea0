use assert_cmd::Command;
use chatsql_test_utils::TestSetup;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn chatsql(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chatsql").unwrap();
    cmd.current_dir(dir).env_remove("CHATSQL_CONFIG");
    cmd
}

#[test]
fn test_init_writes_default_files_once() {
    let dir = tempfile::tempdir().unwrap();

    chatsql(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created prompt.md"));

    let template = std::fs::read_to_string(dir.path().join("prompt.md")).unwrap();
    assert!(template.contains("{user_question}"));
    assert!(dir.path().join("metadata.sql").exists());
    assert!(dir.path().join("fewshots_examples.txt").exists());

    std::fs::write(dir.path().join("prompt.md"), "custom").unwrap();
    chatsql(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept existing prompt.md"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("prompt.md")).unwrap(),
        "custom"
    );
}

#[test]
fn test_examples_add_last_and_history() {
    let dir = tempfile::tempdir().unwrap();

    chatsql(dir.path())
        .args(["examples", "last"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No examples logged yet."));

    chatsql(dir.path())
        .args(["examples", "add", "Q: how many users? A: SELECT COUNT(*) FROM users;"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Examples logged"));

    // Same text again is not logged twice.
    chatsql(dir.path())
        .args(["examples", "add", "Q: how many users? A: SELECT COUNT(*) FROM users;"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));

    chatsql(dir.path())
        .args(["examples", "last"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SELECT COUNT(*) FROM users;"));

    let log = std::fs::read_to_string(dir.path().join("fewshots_examples.txt")).unwrap();
    assert_eq!(log.lines().count(), 1);

    chatsql(dir.path())
        .args(["examples", "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("how many users?"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    chatsql(dir.path())
        .args(["--config", "nope.json", "examples", "last"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_remote_code_mode_prints_extracted_sql() {
    let setup = TestSetup::new().await.unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "SQL: SELECT name FROM users;\n```\ntrailing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = setup
        .write_config(json!({
            "inference": "remote",
            "api_address": format!("{}/generate", server.uri()),
            "answer_mode": "code",
        }))
        .unwrap();

    chatsql(setup.path())
        .arg("--config")
        .arg(&config)
        .args(["ask", "List the user names"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SELECT name FROM users;"))
        .stdout(predicate::str::contains("trailing").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_remote_dataframe_mode_prints_rows() {
    let setup = TestSetup::new().await.unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "SELECT COUNT(*) AS total FROM users;"
        })))
        .mount(&server)
        .await;

    let config = setup
        .write_config(json!({
            "inference": "remote",
            "api_address": format!("{}/generate", server.uri()),
        }))
        .unwrap();

    chatsql(setup.path())
        .arg("--config")
        .arg(&config)
        .args(["ask", "How many users?", "--mode", "dataframe"])
        .arg("--examples")
        .arg("Q: first user A: SELECT * FROM users LIMIT 1;")
        .assert()
        .success()
        .stdout(predicate::str::contains("total"))
        .stdout(predicate::str::contains("3"))
        .stdout(predicate::str::contains("(1 rows)"));

    // Submitted examples land in the log.
    let log = std::fs::read_to_string(setup.example_log_path()).unwrap();
    assert!(log.contains("first user"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["question"], "How many users?");
    assert_eq!(body["examples"], "Q: first user A: SELECT * FROM users LIMIT 1;");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_remote_server_error_fails() {
    let setup = TestSetup::new().await.unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
        .mount(&server)
        .await;

    let config = setup
        .write_config(json!({
            "inference": "remote",
            "api_address": format!("{}/generate", server.uri()),
        }))
        .unwrap();

    chatsql(setup.path())
        .arg("--config")
        .arg(&config)
        .args(["ask", "How many users?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP error 500"))
        .stderr(predicate::str::contains("model exploded"));
}
