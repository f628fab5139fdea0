//! # Query Executor
//!
//! Runs one generated statement against a local SQLite-compatible file through
//! `turso`. Each call opens its own connection, which is dropped on return.

use crate::{errors::QueryExecutionError, types::QueryResult};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};
use turso::Value as TursoValue;

/// Executes `sql` against the database at `db_path` and keeps the first rows for display.
pub async fn run(sql: &str, db_path: &str) -> Result<QueryResult, QueryExecutionError> {
    let connection_err = |message: String| QueryExecutionError::Connection {
        path: db_path.to_string(),
        message,
    };

    if db_path != ":memory:" && !Path::new(db_path).exists() {
        return Err(connection_err("database file does not exist".to_string()));
    }

    let db = turso::Builder::new_local(db_path)
        .build()
        .await
        .map_err(|e| connection_err(e.to_string()))?;
    let conn = db.connect().map_err(|e| connection_err(e.to_string()))?;

    debug!(query = %sql, "--> Executing SQLite query");
    let mut stmt = conn.prepare(sql).await.map_err(statement_err)?;

    let columns: Vec<String> = stmt
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut rows = stmt.query(()).await.map_err(statement_err)?;
    let mut values: Vec<Vec<Value>> = Vec::new();
    while let Some(row) = rows.next().await.map_err(statement_err)? {
        let mut record = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value = row.get_value(i).map_err(statement_err)?;
            record.push(turso_value_to_json(value));
        }
        values.push(record);
    }

    info!(
        "Query returned {} row(s) across {} column(s).",
        values.len(),
        columns.len()
    );
    Ok(QueryResult::truncated(columns, values))
}

/// Executes several `;`-separated statements, creating the database file if needed.
pub async fn execute_batch(db_path: &str, sql: &str) -> Result<(), QueryExecutionError> {
    let connection_err = |message: String| QueryExecutionError::Connection {
        path: db_path.to_string(),
        message,
    };
    let db = turso::Builder::new_local(db_path)
        .build()
        .await
        .map_err(|e| connection_err(e.to_string()))?;
    let conn = db.connect().map_err(|e| connection_err(e.to_string()))?;

    for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
        conn.execute(statement, ()).await.map_err(statement_err)?;
    }
    Ok(())
}

fn statement_err(e: impl std::fmt::Display) -> QueryExecutionError {
    QueryExecutionError::Statement(e.to_string())
}

fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(_) => Value::String("<blob>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_conversion() {
        assert_eq!(turso_value_to_json(TursoValue::Null), Value::Null);
        assert_eq!(turso_value_to_json(TursoValue::Integer(3)), json!(3));
        assert_eq!(turso_value_to_json(TursoValue::Real(1.5)), json!(1.5));
        assert_eq!(
            turso_value_to_json(TursoValue::Text("x".into())),
            json!("x")
        );
        assert_eq!(
            turso_value_to_json(TursoValue::Blob(vec![1, 2])),
            json!("<blob>")
        );
    }

    #[tokio::test]
    async fn test_missing_database_is_a_connection_error() {
        let err = run("SELECT 1;", "/nonexistent/dir/none.db").await.unwrap_err();
        assert!(matches!(err, QueryExecutionError::Connection { .. }));
    }
}
