//! Typed views over provider API payloads
//!
//! Every list/search response keeps its records as raw `serde_json::Value`
//! so the untouched payload can be stored in the `raw_data` column; the sync
//! modules parse each record into the typed struct for column extraction.

use serde::Deserialize;
use serde_json::Value;

/// OAuth token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    /// RFC 3339 expiry
    pub expires_at: Option<String>,
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

/// Error entry in a provider response `errors` array
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderError {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ProviderError {
    /// "Feature not enabled for this merchant" class — the appointments sync
    /// treats these as a zero-result success instead of a failure.
    pub fn is_feature_unavailable(&self) -> bool {
        self.category == "INVALID_REQUEST_ERROR" || self.code == "SERVICE_UNAVAILABLE"
    }
}

pub fn format_errors(errors: &[ProviderError]) -> String {
    errors
        .iter()
        .map(|e| {
            format!(
                "{}/{}: {}",
                e.category,
                e.code,
                e.detail.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Paginated page of raw records, normalized by the client from the
/// endpoint-specific response shape.
#[derive(Debug, Default)]
pub struct Page {
    pub records: Vec<Value>,
    pub cursor: Option<String>,
    pub errors: Vec<ProviderError>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveOrderResponse {
    pub order: Option<Value>,
    #[serde(default)]
    pub errors: Vec<ProviderError>,
}

// ---- Typed entity views ----

#[derive(Debug, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub timezone: Option<String>,
    pub address: Option<Address>,
    pub business_hours: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Address {
    pub address_line_1: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Money {
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

impl Money {
    /// Minor-currency units; missing amounts are zero, never null, so that
    /// aggregate queries stay total-safe.
    pub fn amount_or_zero(&self) -> i64 {
        self.amount.unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogObject {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub is_deleted: bool,
    pub version: Option<i64>,
    pub item_data: Option<ItemData>,
    pub category_data: Option<CategoryData>,
    pub item_variation_data: Option<ItemVariationData>,
}

#[derive(Debug, Deserialize)]
pub struct ItemData {
    pub name: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryData {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemVariationData {
    pub name: Option<String>,
    /// Parent item id
    pub item_id: Option<String>,
    pub price_money: Option<Money>,
}

impl CatalogObject {
    /// Display name by type discriminator
    pub fn display_name(&self) -> Option<&str> {
        match self.object_type.as_str() {
            "ITEM" => self.item_data.as_ref().and_then(|d| d.name.as_deref()),
            "CATEGORY" => self.category_data.as_ref().and_then(|d| d.name.as_deref()),
            "ITEM_VARIATION" => self
                .item_variation_data
                .as_ref()
                .and_then(|d| d.name.as_deref()),
            _ => None,
        }
    }

    /// Parent reference: items point at their category, variations at their
    /// parent item.
    pub fn parent_ref(&self) -> Option<&str> {
        match self.object_type.as_str() {
            "ITEM" => self
                .item_data
                .as_ref()
                .and_then(|d| d.category_id.as_deref()),
            "ITEM_VARIATION" => self
                .item_variation_data
                .as_ref()
                .and_then(|d| d.item_id.as_deref()),
            _ => None,
        }
    }

    pub fn price(&self) -> Money {
        self.item_variation_data
            .as_ref()
            .and_then(|d| d.price_money.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct Customer {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Order {
    pub id: String,
    pub location_id: Option<String>,
    pub customer_id: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub total_money: Money,
    #[serde(default)]
    pub total_tax_money: Money,
    #[serde(default)]
    pub total_discount_money: Money,
    #[serde(default)]
    pub total_tip_money: Money,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub closed_at: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct LineItem {
    pub uid: Option<String>,
    pub name: Option<String>,
    /// Decimal quantity as a string (e.g. "1", "2.5")
    pub quantity: Option<String>,
    pub catalog_object_id: Option<String>,
    pub variation_name: Option<String>,
    #[serde(default)]
    pub base_price_money: Money,
    #[serde(default)]
    pub total_money: Money,
}

impl LineItem {
    pub fn quantity_f64(&self) -> f64 {
        self.quantity
            .as_deref()
            .and_then(|q| q.parse().ok())
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: Option<String>,
    pub location_id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub amount_money: Money,
    #[serde(default)]
    pub tip_money: Money,
    #[serde(default)]
    pub total_money: Money,
    pub source_type: Option<String>,
    pub card_details: Option<CardDetails>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardDetails {
    pub card: Option<Card>,
}

#[derive(Debug, Deserialize)]
pub struct Card {
    pub card_brand: Option<String>,
    pub last_4: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Booking {
    pub id: String,
    pub location_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub start_at: Option<String>,
    #[serde(default)]
    pub appointment_segments: Vec<AppointmentSegment>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentSegment {
    pub team_member_id: Option<String>,
    pub service_variation_id: Option<String>,
    pub duration_minutes: Option<i64>,
}

impl Booking {
    /// No-show flag is derived from status, not carried by the provider
    pub fn is_no_show(&self) -> bool {
        self.status.as_deref() == Some("NO_SHOW")
    }
}

#[derive(Debug, Deserialize)]
pub struct InventoryCount {
    pub catalog_object_id: String,
    pub location_id: String,
    pub state: Option<String>,
    pub quantity: Option<String>,
    pub calculated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email_address: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
    pub assigned_locations: Option<Value>,
}

/// RFC 3339 timestamp → epoch millis
pub fn ts_millis(ts: Option<&str>) -> Option<i64> {
    ts.and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_money_defaults_to_zero() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "ord_1",
            "state": "COMPLETED",
        }))
        .unwrap();
        assert_eq!(order.total_money.amount_or_zero(), 0);
        assert_eq!(order.total_tax_money.amount_or_zero(), 0);
        assert!(order.line_items.is_empty());
    }

    #[test]
    fn line_item_quantity_parses_decimal_string() {
        let li: LineItem = serde_json::from_value(serde_json::json!({
            "uid": "li_1",
            "quantity": "2.5",
        }))
        .unwrap();
        assert_eq!(li.quantity_f64(), 2.5);

        let li: LineItem = serde_json::from_value(serde_json::json!({"uid": "li_2"})).unwrap();
        assert_eq!(li.quantity_f64(), 1.0);
    }

    #[test]
    fn catalog_object_name_and_parent_follow_type() {
        let variation: CatalogObject = serde_json::from_value(serde_json::json!({
            "id": "var_1",
            "type": "ITEM_VARIATION",
            "item_variation_data": {
                "name": "Large",
                "item_id": "item_1",
                "price_money": { "amount": 1250, "currency": "EUR" }
            }
        }))
        .unwrap();
        assert_eq!(variation.display_name(), Some("Large"));
        assert_eq!(variation.parent_ref(), Some("item_1"));
        assert_eq!(variation.price().amount_or_zero(), 1250);

        let item: CatalogObject = serde_json::from_value(serde_json::json!({
            "id": "item_1",
            "type": "ITEM",
            "item_data": { "name": "Coffee", "category_id": "cat_1" }
        }))
        .unwrap();
        assert_eq!(item.display_name(), Some("Coffee"));
        assert_eq!(item.parent_ref(), Some("cat_1"));
        assert!(item.price().amount.is_none());
    }

    #[test]
    fn booking_no_show_derived_from_status() {
        let booking: Booking = serde_json::from_value(serde_json::json!({
            "id": "bk_1",
            "status": "NO_SHOW",
        }))
        .unwrap();
        assert!(booking.is_no_show());

        let booking: Booking = serde_json::from_value(serde_json::json!({
            "id": "bk_2",
            "status": "ACCEPTED",
        }))
        .unwrap();
        assert!(!booking.is_no_show());
    }

    #[test]
    fn ts_millis_parses_rfc3339() {
        assert_eq!(ts_millis(Some("1970-01-01T00:00:01Z")), Some(1000));
        assert_eq!(ts_millis(Some("not a timestamp")), None);
        assert_eq!(ts_millis(None), None);
    }

    #[test]
    fn feature_unavailable_classification() {
        let err = ProviderError {
            category: "INVALID_REQUEST_ERROR".into(),
            code: "NOT_FOUND".into(),
            detail: None,
        };
        assert!(err.is_feature_unavailable());

        let err = ProviderError {
            category: "API_ERROR".into(),
            code: "SERVICE_UNAVAILABLE".into(),
            detail: None,
        };
        assert!(err.is_feature_unavailable());

        let err = ProviderError {
            category: "RATE_LIMIT_ERROR".into(),
            code: "RATE_LIMITED".into(),
            detail: None,
        };
        assert!(!err.is_feature_unavailable());
    }
}
