//! pearl-sync — commerce provider integration service
//!
//! Links the analytics product to a merchant's commerce platform account:
//! OAuth connection with encrypted token storage, an ordered initial
//! historical sync, and webhook-driven incremental updates, persisting a
//! normalized mirror into PostgreSQL.

pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod oauth;
pub mod provider;
pub mod state;
pub mod sync;
