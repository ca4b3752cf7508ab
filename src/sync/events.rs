//! Webhook event processing
//!
//! Runs after the HTTP layer has already acknowledged the delivery, so
//! every failure here is logged and recorded on the connection row — never
//! returned to the provider. All upsert paths are idempotent on the
//! provider-assigned natural key, so at-least-once delivery is safe.

use serde_json::Value;

use crate::db;
use crate::provider::ProviderClient;
use crate::state::AppState;
use crate::sync;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Event routing by provider event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Carries only an order id; the full object is re-fetched
    Order,
    Payment,
    Customer,
    CustomerDeleted,
    Booking,
    InventoryCount,
    TeamMember,
    /// Triggers a full catalog re-sync
    CatalogVersion,
    Unknown,
}

pub fn classify(event_type: &str) -> EventKind {
    match event_type {
        "order.created" | "order.updated" => EventKind::Order,
        "payment.created" | "payment.updated" => EventKind::Payment,
        "customer.created" | "customer.updated" => EventKind::Customer,
        "customer.deleted" => EventKind::CustomerDeleted,
        "booking.created" | "booking.updated" => EventKind::Booking,
        "inventory.count.updated" => EventKind::InventoryCount,
        "team_member.created" | "team_member.updated" => EventKind::TeamMember,
        "catalog.version.updated" => EventKind::CatalogVersion,
        _ => EventKind::Unknown,
    }
}

/// Process one verified webhook event. Resolves the merchant, builds a
/// client from the stored token, and dispatches to the matching
/// single-record upsert path.
pub async fn process_event(state: AppState, event: Value) {
    let event_type = event["type"].as_str().unwrap_or("").to_string();

    let Some(provider_merchant_id) = event["merchant_id"].as_str() else {
        tracing::warn!(event_type = %event_type, "Webhook event missing merchant_id, dropped");
        return;
    };

    let creds = match db::connections::get_by_provider_merchant_id(
        &state.pool,
        &state.master_key,
        provider_merchant_id,
    )
    .await
    {
        Ok(Some(c)) => c,
        Ok(None) => {
            // Expected for disconnected/unknown merchants, not an error
            tracing::warn!(
                provider_merchant_id = %provider_merchant_id,
                event_type = %event_type,
                "Webhook for unknown merchant, dropped"
            );
            return;
        }
        Err(e) => {
            tracing::error!(
                provider_merchant_id = %provider_merchant_id,
                error = %e,
                "Failed to resolve merchant for webhook"
            );
            return;
        }
    };

    // Refresh ahead of the expiry margin so the dispatch call does not run
    // on a token about to lapse.
    let creds = if creds.is_expired(db::now_millis()) {
        match crate::oauth::refresh_credentials(&state, &creds.merchant_id).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!(
                    merchant_id = %creds.merchant_id,
                    error = %e,
                    "Token refresh failed, attempting with stored token"
                );
                creds
            }
        }
    } else {
        creds
    };

    let merchant_id = creds.merchant_id.clone();
    if let Err(e) = dispatch(&state, &creds.access_token, &merchant_id, &event_type, &event).await {
        tracing::error!(
            merchant_id = %merchant_id,
            event_type = %event_type,
            error = %e,
            "Webhook processing failed"
        );
        let message = format!("webhook {event_type}: {e}");
        if let Err(e) =
            db::connections::record_webhook_error(&state.pool, &merchant_id, &message).await
        {
            tracing::error!(merchant_id = %merchant_id, %e, "Failed to record webhook error");
        }
    }
}

async fn dispatch(
    state: &AppState,
    access_token: &str,
    merchant_id: &str,
    event_type: &str,
    event: &Value,
) -> Result<(), BoxError> {
    let pool = &state.pool;
    let now = db::now_millis();
    let data = &event["data"];

    match classify(event_type) {
        EventKind::Order => {
            // Order events carry an id, not the full object
            let order_id = data["id"]
                .as_str()
                .ok_or("Order event missing data.id")?;
            let client = ProviderClient::new(&state.config.provider_base_url, access_token)?;
            let order = client.retrieve_order(order_id).await?;
            db::orders::upsert_one(pool, merchant_id, &order, now).await?;
        }
        EventKind::Payment => {
            let payment = inline_object(data, "payment")?;
            db::payments::upsert_one(pool, merchant_id, payment, now).await?;
        }
        EventKind::Customer => {
            let customer = inline_object(data, "customer")?;
            db::customers::upsert_one(pool, merchant_id, customer, now).await?;
        }
        EventKind::CustomerDeleted => {
            let customer_id = inline_object(data, "customer")?["id"]
                .as_str()
                .or_else(|| data["id"].as_str())
                .ok_or("customer.deleted event missing customer id")?
                .to_string();
            db::customers::soft_delete(pool, merchant_id, &customer_id, now).await?;
        }
        EventKind::Booking => {
            let booking = inline_object(data, "booking")?;
            db::appointments::upsert_one(pool, merchant_id, booking, now).await?;
        }
        EventKind::InventoryCount => {
            let counts = &data["object"]["inventory_counts"];
            if let Some(counts) = counts.as_array() {
                for count in counts {
                    db::inventory::upsert_one(pool, merchant_id, count, now).await?;
                }
            } else {
                let count = inline_object(data, "inventory_count")?;
                db::inventory::upsert_one(pool, merchant_id, count, now).await?;
            }
        }
        EventKind::TeamMember => {
            let member = inline_object(data, "team_member")?;
            db::team_members::upsert_one(pool, merchant_id, member, now).await?;
        }
        EventKind::CatalogVersion => {
            let client = ProviderClient::new(&state.config.provider_base_url, access_token)?;
            sync::catalog::sync_all(pool, &client, merchant_id).await?;
        }
        EventKind::Unknown => {
            // Forward-compatible with new provider event types
            tracing::debug!(event_type = %event_type, "Unhandled webhook event type, dropped");
        }
    }

    Ok(())
}

fn inline_object<'a>(data: &'a Value, key: &str) -> Result<&'a Value, BoxError> {
    let obj = &data["object"][key];
    if obj.is_null() {
        return Err(format!("Webhook event missing data.object.{key}").into());
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_event_types_route() {
        assert_eq!(classify("order.created"), EventKind::Order);
        assert_eq!(classify("order.updated"), EventKind::Order);
        assert_eq!(classify("payment.updated"), EventKind::Payment);
        assert_eq!(classify("customer.deleted"), EventKind::CustomerDeleted);
        assert_eq!(classify("booking.updated"), EventKind::Booking);
        assert_eq!(classify("inventory.count.updated"), EventKind::InventoryCount);
        assert_eq!(classify("team_member.created"), EventKind::TeamMember);
        assert_eq!(classify("catalog.version.updated"), EventKind::CatalogVersion);
    }

    #[test]
    fn unknown_event_types_are_dropped_not_errors() {
        assert_eq!(classify("labor.shift.created"), EventKind::Unknown);
        assert_eq!(classify(""), EventKind::Unknown);
    }

    #[test]
    fn inline_object_extraction() {
        let data = serde_json::json!({
            "object": { "payment": { "id": "pay_1" } }
        });
        assert_eq!(inline_object(&data, "payment").unwrap()["id"], "pay_1");
        assert!(inline_object(&data, "booking").is_err());
    }
}
