//! Wire types for the uniform response envelope

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::ApiError;
use crate::models::{PagedResult, QueryFilters};

/// `{ statusCode, success, message, data }` wrapper around every response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub status_code: Option<u16>,
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Turn the `success` flag into a `Result`
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Application {
                status_code: self.status_code.unwrap_or(200),
                message: self.message,
            });
        }
        self.data.ok_or_else(|| ApiError::Application {
            status_code: self.status_code.unwrap_or(200),
            message: if self.message.is_empty() {
                "Response contained no data".to_string()
            } else {
                self.message
            },
        })
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode a raw body and unwrap it in one step
    pub fn decode(raw: serde_json::Value) -> Result<T, ApiError> {
        let envelope: Envelope<T> = serde_json::from_value(raw)?;
        envelope.into_result()
    }
}

impl Envelope<serde_json::Value> {
    /// Check a mutation response, where `data` may be absent, and return its message
    pub fn acknowledge(raw: serde_json::Value) -> Result<String, ApiError> {
        let envelope: Envelope<serde_json::Value> = serde_json::from_value(raw)?;
        if !envelope.success {
            return Err(ApiError::Application {
                status_code: envelope.status_code.unwrap_or(200),
                message: envelope.message,
            });
        }
        Ok(envelope.message)
    }
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub status_code: Option<u16>,
    pub message: String,
}

/// `data` of a list endpoint: either a bare array or a paged object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListData<T> {
    Paged(PagedPayload<T>),
    Flat(Vec<T>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedPayload<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

impl<T> ListData<T> {
    /// Normalize into a page, filling gaps from the request that produced it
    pub fn into_paged(self, requested: &QueryFilters) -> PagedResult<T> {
        match self {
            ListData::Paged(payload) => {
                let limit = payload.limit.unwrap_or(requested.limit()).max(1);
                let total_results = payload
                    .total_results
                    .unwrap_or(payload.results.len() as u64);
                let total_pages = payload
                    .total_pages
                    .unwrap_or_else(|| {
                        u32::try_from(total_results.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
                    });
                let page = payload.page.unwrap_or(requested.page());
                PagedResult::new(payload.results, page, total_pages, total_results, limit)
            }
            ListData::Flat(items) => {
                let total_results = items.len() as u64;
                let total_pages = u32::from(!items.is_empty());
                PagedResult::new(items, 1, total_pages, total_results, requested.limit())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_decode_paged_list() {
        let raw = json!({
            "statusCode": 200,
            "success": true,
            "message": "ok",
            "data": {
                "results": [{"id": 1}, {"id": 2}],
                "page": 2,
                "limit": 2,
                "totalPages": 3,
                "totalResults": 6
            }
        });
        let data: ListData<Value> = Envelope::decode(raw).unwrap();
        let page = data.into_paged(&QueryFilters::new(2));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.meta.current_page(), 2);
        assert!(page.meta.has_next());
        assert!(page.meta.has_prev());
    }

    #[test]
    fn test_decode_flat_list() {
        let raw = json!({"success": true, "data": [{"id": 1}, {"id": 2}, {"id": 3}]});
        let data: ListData<Value> = Envelope::decode(raw).unwrap();
        let page = data.into_paged(&QueryFilters::new(10));
        assert_eq!(page.meta.total_results(), 3);
        assert_eq!(page.meta.total_pages(), 1);
        assert!(!page.meta.has_next());
        assert!(!page.meta.has_prev());
    }

    #[test]
    fn test_missing_totals_are_derived() {
        let raw = json!({"success": true, "data": {"results": [1, 2, 3]}});
        let data: ListData<u32> = Envelope::decode(raw).unwrap();
        let page = data.into_paged(&QueryFilters::new(2));
        // three results against a limit of two
        assert_eq!(page.meta.limit(), 3);
        assert_eq!(page.meta.total_results(), 3);
        assert_eq!(page.meta.total_pages(), 2);
    }

    #[test]
    fn test_derived_page_count_saturates() {
        let raw = json!({
            "success": true,
            "data": {"results": [1], "limit": 1, "totalResults": 10_000_000_000u64}
        });
        let data: ListData<u32> = Envelope::decode(raw).unwrap();
        let page = data.into_paged(&QueryFilters::new(1));
        assert_eq!(page.meta.total_pages(), u32::MAX);
        assert!(page.meta.has_next());
    }

    #[test]
    fn test_unsuccessful_envelope() {
        let raw = json!({"statusCode": 404, "success": false, "message": "No payouts found"});
        let err = Envelope::<Vec<Value>>::decode(raw).unwrap_err();
        match err {
            ApiError::Application { status_code, message } => {
                assert_eq!(status_code, 404);
                assert_eq!(message, "No payouts found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_success_without_data() {
        let raw = json!({"success": true, "message": ""});
        assert!(Envelope::<Vec<Value>>::decode(raw).is_err());
    }

    #[test]
    fn test_acknowledge_mutation() {
        let raw = json!({"success": true, "message": "Payout deleted", "data": null});
        assert_eq!(Envelope::acknowledge(raw).unwrap(), "Payout deleted");

        let raw = json!({"success": false, "message": "Payout already settled"});
        assert!(Envelope::acknowledge(raw).is_err());
    }
}
