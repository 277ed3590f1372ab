//! Shared list and filter types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const PAGE_KEY: &str = "page";
pub const LIMIT_KEY: &str = "limit";
pub const SEARCH_KEY: &str = "search";

/// Scalar filter value sent as a query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Parse a raw command-line value, preferring the narrowest type
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => return FilterValue::Bool(true),
            "false" => return FilterValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return FilterValue::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return FilterValue::Float(f);
            }
        }
        FilterValue::Text(raw.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn as_page_number(&self) -> Option<u32> {
        match self {
            FilterValue::Int(n) => u32::try_from(*n).ok(),
            FilterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Int(n) => write!(f, "{}", n),
            FilterValue::Float(x) => write!(f, "{}", x),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Current filter state of one list: paging plus named filters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFilters {
    page: u32,
    limit: u32,
    values: BTreeMap<String, FilterValue>,
}

impl QueryFilters {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            values: BTreeMap::new(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    /// Named filters, excluding `page` and `limit`
    pub fn values(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow-merge a patch. Returns true if anything changed.
    ///
    /// A patch that touches a non-paging key without naming a page sends the
    /// list back to page 1.
    pub fn merge(&mut self, patch: FilterPatch) -> bool {
        let before = self.clone();
        let resets_page = patch.limit.is_some() || !patch.values.is_empty();

        for (key, value) in patch.values {
            match value {
                Some(value) => {
                    self.values.insert(key, value);
                }
                None => {
                    self.values.remove(&key);
                }
            }
        }

        if let Some(limit) = patch.limit {
            self.limit = limit.max(1);
        }

        match patch.page {
            Some(page) => self.page = page.max(1),
            None if resets_page => self.page = 1,
            None => {}
        }

        *self != before
    }

    /// Query pairs in wire order: page, limit, then filters by name
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (PAGE_KEY.to_string(), self.page.to_string()),
            (LIMIT_KEY.to_string(), self.limit.to_string()),
        ];
        pairs.extend(self.filter_query());
        pairs
    }

    /// Query pairs for the named filters only (exports are not paged)
    pub fn filter_query(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

/// Partial update for [`QueryFilters`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    page: Option<u32>,
    limit: Option<u32>,
    values: BTreeMap<String, Option<FilterValue>>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set a filter. `page` and `limit` are routed to the paging fields.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            PAGE_KEY => self.page = value.as_page_number().or(self.page),
            LIMIT_KEY => self.limit = value.as_page_number().or(self.limit),
            _ => {
                self.values.insert(key, Some(value));
            }
        }
        self
    }

    /// Remove a filter
    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.values.insert(key.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.limit.is_none() && self.values.is_empty()
    }
}

/// Pagination metadata. Flags are derived, never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    current_page: u32,
    total_pages: u32,
    total_results: u64,
    limit: u32,
    has_next: bool,
    has_prev: bool,
}

impl PageMeta {
    pub fn new(current_page: u32, total_pages: u32, total_results: u64, limit: u32) -> Self {
        let current_page = current_page.max(1);
        Self {
            current_page,
            total_pages,
            total_results,
            limit: limit.max(1),
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }

    /// Meta for a list with no results yet
    pub fn empty(limit: u32) -> Self {
        Self::new(1, 0, 0, limit)
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_prev(&self) -> bool {
        self.has_prev
    }
}

/// One page of items plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PagedResult<T> {
    /// Build a page, widening `limit` if the server sent more items than asked for
    pub fn new(items: Vec<T>, current_page: u32, total_pages: u32, total_results: u64, limit: u32) -> Self {
        let limit = limit.max(u32::try_from(items.len()).unwrap_or(u32::MAX));
        Self {
            meta: PageMeta::new(current_page, total_pages, total_results, limit),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters_on_page_three() -> QueryFilters {
        let mut filters = QueryFilters::new(10);
        filters.merge(FilterPatch::new().set("status", "pending"));
        filters.merge(FilterPatch::new().page(3));
        filters
    }

    #[test]
    fn test_page_meta_flags_follow_position() {
        for total_pages in 0..5 {
            for current_page in 0..6 {
                let meta = PageMeta::new(current_page, total_pages, 40, 10);
                assert_eq!(meta.has_next(), meta.current_page() < meta.total_pages());
                assert_eq!(meta.has_prev(), meta.current_page() > 1);
                assert!(meta.current_page() >= 1);
            }
        }
    }

    #[test]
    fn test_paged_result_widens_limit() {
        let page = PagedResult::new(vec![1, 2, 3], 1, 1, 3, 2);
        assert_eq!(page.meta.limit(), 3);
        assert!(page.items.len() as u32 <= page.meta.limit());
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut filters = filters_on_page_three();
        let before = filters.clone();
        assert!(!filters.merge(FilterPatch::new()));
        assert_eq!(filters, before);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut filters = filters_on_page_three();
        assert_eq!(filters.page(), 3);

        assert!(filters.merge(FilterPatch::new().set(SEARCH_KEY, "x")));
        assert_eq!(filters.page(), 1);
        assert_eq!(filters.get(SEARCH_KEY), Some(&FilterValue::from("x")));
        assert_eq!(filters.get("status"), Some(&FilterValue::from("pending")));
    }

    #[test]
    fn test_page_change_keeps_other_keys() {
        let mut filters = filters_on_page_three();
        filters.merge(FilterPatch::new().page(5));
        assert_eq!(filters.page(), 5);
        assert_eq!(filters.limit(), 10);
        assert_eq!(filters.get("status"), Some(&FilterValue::from("pending")));
    }

    #[test]
    fn test_clear_removes_key() {
        let mut filters = filters_on_page_three();
        filters.merge(FilterPatch::new().clear("status"));
        assert!(filters.get("status").is_none());
        assert_eq!(filters.page(), 1);
    }

    #[test]
    fn test_reserved_keys_route_to_paging() {
        let mut filters = QueryFilters::new(10);
        filters.merge(FilterPatch::new().set("page", "4").set("limit", FilterValue::Int(25)));
        assert_eq!(filters.page(), 4);
        assert_eq!(filters.limit(), 25);
        assert_eq!(filters.values().count(), 0);
    }

    #[test]
    fn test_to_query_order() {
        let mut filters = QueryFilters::new(20);
        filters.merge(FilterPatch::new().set("type", "credit").set("from", "2024-01-01"));
        let query = filters.to_query();
        let keys: Vec<&str> = query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["page", "limit", "from", "type"]);
        assert_eq!(query[1].1, "20");
    }

    #[test]
    fn test_filter_value_parse() {
        assert_eq!(FilterValue::parse("true"), FilterValue::Bool(true));
        assert_eq!(FilterValue::parse("42"), FilterValue::Int(42));
        assert_eq!(FilterValue::parse("2.5"), FilterValue::Float(2.5));
        assert_eq!(FilterValue::parse("2024-01-01"), FilterValue::from("2024-01-01"));
        assert_eq!(FilterValue::parse("nan"), FilterValue::from("nan"));
    }
}
