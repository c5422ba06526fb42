//! # Ingestion
//!
//! Inbound status path: tablets push reports, the hub applies them in
//! recency order and fans out `StatusUpdated` events.
//!
//! The webhook router in [`webhook`] is the HTTP face of
//! [`StatusIngest::receive_status`]; both reject unknown devices instead of
//! auto-registering them.

mod ingest;
pub mod webhook;

pub use ingest::{IngestOutcome, StatusIngest};
pub use webhook::webhook_router;
