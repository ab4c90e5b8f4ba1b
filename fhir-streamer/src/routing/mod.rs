//! Routing layer.
//!
//! Derives the per-message correlation envelope that every ingestion stamps before the audit
//! tee and the main-path publish.

pub(crate) mod correlation;
