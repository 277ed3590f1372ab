//! One page request against a collection endpoint

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{ApiError, Envelope, ListData, Transport};
use crate::models::{PagedResult, QueryFilters};

/// `GET <endpoint>?page=..&limit=..&<filters>` normalized into a page
pub async fn fetch_page<T: DeserializeOwned>(
    transport: &dyn Transport,
    endpoint: &str,
    filters: &QueryFilters,
) -> Result<PagedResult<T>, ApiError> {
    let raw = transport.get(endpoint, &filters.to_query()).await?;
    let data: ListData<T> = Envelope::decode(raw)?;
    let page = data.into_paged(filters);
    debug!(
        "Fetched {} item(s) from {} (page {}/{})",
        page.items.len(),
        endpoint,
        page.meta.current_page(),
        page.meta.total_pages()
    );
    Ok(page)
}
