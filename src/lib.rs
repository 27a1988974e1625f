// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod config;
pub mod document;
pub mod engine;
pub mod history;
pub mod rolling;
pub mod signal;

// Source adapters and the cycle around them
pub mod ingest;
pub mod pipeline;
pub mod scheduler;
pub mod store;

pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::document::PublishedDocument;
pub use crate::pipeline::Pipeline;
pub use crate::signal::Signal;
