//! Back-office API access
//!
//! Everything that talks to the remote API goes through the [`Transport`]
//! trait. [`HttpClient`] is the real implementation; list and export
//! components only see the trait.

pub mod client;
pub mod envelope;
pub mod errors;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{Credentials, HttpClient};
pub use envelope::{Envelope, ListData};
pub use errors::ApiError;

use async_trait::async_trait;
use serde_json::Value;

/// Minimal request surface the list and export components depend on
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` with query pairs, returning the parsed JSON body
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError>;

    /// POST a JSON body to `path`, returning the parsed JSON body
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError>;

    /// Base URL requests are resolved against
    fn base_url(&self) -> &str;
}
