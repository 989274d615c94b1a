//! Sync layer: pulls session records from the remote API gateway.

pub mod http;

pub use http::{DateListing, GatewayClient, SessionListing, SyncError};
