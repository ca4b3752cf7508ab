//! Authenticated provider API client
//!
//! One client per access token; stateless beyond the token. Every call
//! carries the client-wide timeout so a hung provider endpoint cannot stall
//! a sync stage indefinitely.

use serde_json::Value;

use super::types::{Page, ProviderError, RetrieveOrderResponse, format_errors};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const PAGE_LIMIT: u32 = 100;
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ProviderClient {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    async fn get_json(&self, path_and_query: &str) -> Result<Value, BoxError> {
        let resp = self
            .http
            .get(format!("{}{path_and_query}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, BoxError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }

    /// Normalize a list/search response into a [`Page`]: records live under
    /// an endpoint-specific key, cursor and errors are uniform. A present
    /// but non-deserializable `errors` field is itself an error — it must
    /// never read as a clean empty page.
    fn page_from(value: Value, records_key: &str) -> Result<Page, BoxError> {
        let records = value
            .get(records_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let cursor = value
            .get("cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let errors: Vec<ProviderError> = match value.get("errors").filter(|e| !e.is_null()) {
            Some(e) => serde_json::from_value(e.clone())
                .map_err(|err| format!("Malformed provider errors field ({err}): {e}"))?,
            None => Vec::new(),
        };
        Ok(Page {
            records,
            cursor,
            errors,
        })
    }

    pub async fn list_locations(&self, cursor: Option<&str>) -> Result<Page, BoxError> {
        let mut path = "/v2/locations".to_string();
        if let Some(c) = cursor {
            path = format!("{path}?cursor={c}");
        }
        Self::page_from(self.get_json(&path).await?, "locations")
    }

    pub async fn list_catalog(&self, cursor: Option<&str>) -> Result<Page, BoxError> {
        let mut path = "/v2/catalog/list?types=ITEM,CATEGORY,ITEM_VARIATION".to_string();
        if let Some(c) = cursor {
            path = format!("{path}&cursor={c}");
        }
        Self::page_from(self.get_json(&path).await?, "objects")
    }

    pub async fn search_customers(&self, cursor: Option<&str>) -> Result<Page, BoxError> {
        let mut body = serde_json::json!({ "limit": PAGE_LIMIT });
        if let Some(c) = cursor {
            body["cursor"] = Value::String(c.to_string());
        }
        Self::page_from(
            self.post_json("/v2/customers/search", &body).await?,
            "customers",
        )
    }

    /// Historical orders for one location: terminal states only, bounded by
    /// the lookback start. In-progress orders arrive via webhooks instead.
    pub async fn search_orders(
        &self,
        location_id: &str,
        closed_at_start_ms: i64,
        cursor: Option<&str>,
    ) -> Result<Page, BoxError> {
        let start_at = rfc3339(closed_at_start_ms);
        let mut body = serde_json::json!({
            "location_ids": [location_id],
            "limit": PAGE_LIMIT,
            "query": {
                "filter": {
                    "state_filter": { "states": ["COMPLETED", "CANCELED"] },
                    "date_time_filter": { "closed_at": { "start_at": start_at } }
                },
                "sort": { "sort_field": "CLOSED_AT", "sort_order": "DESC" }
            }
        });
        if let Some(c) = cursor {
            body["cursor"] = Value::String(c.to_string());
        }
        Self::page_from(
            self.post_json("/v2/orders/search", &body).await?,
            "orders",
        )
    }

    pub async fn list_bookings(
        &self,
        location_id: &str,
        start_at_min_ms: i64,
        cursor: Option<&str>,
    ) -> Result<Page, BoxError> {
        let mut path = format!(
            "/v2/bookings?location_id={location_id}&limit={PAGE_LIMIT}&start_at_min={}",
            rfc3339(start_at_min_ms)
        );
        if let Some(c) = cursor {
            path = format!("{path}&cursor={c}");
        }
        Self::page_from(self.get_json(&path).await?, "bookings")
    }

    /// Order webhooks carry only an id; fetch the full object for upsert
    pub async fn retrieve_order(&self, order_id: &str) -> Result<Value, BoxError> {
        let resp: RetrieveOrderResponse =
            serde_json::from_value(self.get_json(&format!("/v2/orders/{order_id}")).await?)?;
        if !resp.errors.is_empty() {
            return Err(format!("Retrieve order failed: {}", format_errors(&resp.errors)).into());
        }
        resp.order
            .ok_or_else(|| format!("Retrieve order {order_id} returned no order").into())
    }
}

fn rfc3339(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_from_extracts_records_cursor_errors() {
        let page = ProviderClient::page_from(
            serde_json::json!({
                "locations": [{ "id": "L1" }, { "id": "L2" }],
                "cursor": "next",
            }),
            "locations",
        )
        .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.cursor.as_deref(), Some("next"));
        assert!(page.errors.is_empty());
    }

    #[test]
    fn page_from_treats_empty_cursor_as_final_page() {
        let page = ProviderClient::page_from(
            serde_json::json!({ "objects": [], "cursor": "" }),
            "objects",
        )
        .unwrap();
        assert!(page.cursor.is_none());
        assert!(page.records.is_empty());
    }

    #[test]
    fn page_from_collects_error_list() {
        let page = ProviderClient::page_from(
            serde_json::json!({
                "errors": [{ "category": "RATE_LIMIT_ERROR", "code": "RATE_LIMITED" }]
            }),
            "orders",
        )
        .unwrap();
        assert_eq!(page.errors.len(), 1);
        assert_eq!(page.errors[0].code, "RATE_LIMITED");
    }

    #[test]
    fn page_from_rejects_malformed_error_list() {
        let result = ProviderClient::page_from(
            serde_json::json!({ "orders": [], "errors": "INTERNAL" }),
            "orders",
        );
        assert!(result.is_err());
    }

    #[test]
    fn page_from_treats_null_errors_as_absent() {
        let page = ProviderClient::page_from(
            serde_json::json!({ "orders": [], "errors": null }),
            "orders",
        )
        .unwrap();
        assert!(page.errors.is_empty());
    }
}
