//! ledgerdesk: client for a financial back-office API
//!
//! The two reusable pieces are [`list_query::ListQuery`] (paginated,
//! filtered, debounced list fetching) and [`export::Exporter`] (server-built
//! files saved locally). Everything else is configuration and plumbing.

pub mod api;
pub mod cli;
pub mod config;
pub mod export;
pub mod list_query;
pub mod models;
pub mod notifications;
pub mod output;
pub mod resources;
pub mod session;
pub mod validation;
