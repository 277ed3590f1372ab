//! Observable state of a list controller

use serde::Serialize;

use crate::models::{PageMeta, QueryFilters};

/// What a view renders for one list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: QueryFilters,
    pub pagination: PageMeta,
}

impl<T> ListState<T> {
    pub fn new(filters: QueryFilters) -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            pagination: PageMeta::empty(filters.limit()),
            filters,
            error: None,
        }
    }

    /// Nothing loaded and nothing in flight
    pub fn is_idle_empty(&self) -> bool {
        !self.loading && self.items.is_empty() && self.error.is_none()
    }
}
