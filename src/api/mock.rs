//! In-process transport for unit tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{ApiError, Transport};

type Responder = Box<dyn Fn(&str, &[(String, String)]) -> (Duration, Result<Value, ApiError>) + Send + Sync>;

/// Transport answering from a closure after an optional simulated latency
pub struct ScriptedTransport {
    responder: Responder,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[(String, String)]) -> (Duration, Result<Value, ApiError>) + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request immediately with the same body
    pub fn fixed(body: Value) -> Self {
        Self::new(move |_, _| (Duration::ZERO, Ok(body.clone())))
    }

    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Look up a query parameter in a recorded request
pub fn query_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A paged list envelope echoing `tag` in every row
pub fn paged_body(tag: &str, page: u32, total_pages: u32) -> Value {
    json!({
        "statusCode": 200,
        "success": true,
        "message": "ok",
        "data": {
            "results": [{ "tag": tag, "page": page }],
            "page": page,
            "limit": 10,
            "totalPages": total_pages,
            "totalResults": total_pages * 10
        }
    })
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), query.to_vec()));
        let (delay, outcome) = (self.responder)(path, query);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), vec![("body".to_string(), body.to_string())]));
        (self.responder)(path, &[]).1
    }

    fn base_url(&self) -> &str {
        "http://scripted.test"
    }
}
