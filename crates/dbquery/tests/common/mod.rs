//! In-memory executor that records every statement it is handed.

#![allow(dead_code)]

use dbquery::{Executor, QueryError, QueryResult};
use std::sync::Mutex;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

#[derive(Default)]
pub struct Recorder {
    log: Mutex<Vec<(String, usize)>>,
    /// Fail any statement containing this text.
    fail_on: Option<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(text: &str) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            fail_on: Some(text.to_string()),
        }
    }

    /// Statements seen so far, in arrival order.
    pub fn statements(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    /// Parameter count passed with the statement containing `text`.
    pub fn params_for(&self, text: &str) -> Option<usize> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .find(|(sql, _)| sql.contains(text))
            .map(|(_, n)| *n)
    }

    fn record(&self, sql: &str, params: usize) -> QueryResult<()> {
        self.log.lock().unwrap().push((sql.to_string(), params));
        match &self.fail_on {
            Some(text) if sql.contains(text.as_str()) => {
                Err(QueryError::Other(format!("refused: {sql}")))
            }
            _ => Ok(()),
        }
    }
}

impl Executor for Recorder {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<Vec<Row>> {
        self.record(sql, params.len())?;
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<u64> {
        self.record(sql, params.len())?;
        Ok(1)
    }
}
