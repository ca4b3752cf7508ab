//! Database access layer
//!
//! One module per mirrored table. Bulk sync paths upsert a full page inside
//! one transaction; webhook paths reuse the same upserts for single records.

pub mod appointments;
pub mod catalog;
pub mod connections;
pub mod customers;
pub mod inventory;
pub mod locations;
pub mod orders;
pub mod payments;
pub mod team_members;

/// Epoch milliseconds now
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
