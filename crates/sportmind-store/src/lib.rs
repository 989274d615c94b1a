//! Storage layer: session records uploaded by the VR client, one JSON file per session.

mod error;
mod sessions;

pub use error::StoreError;
pub use sessions::{KEY_FIELD, SessionStore};
