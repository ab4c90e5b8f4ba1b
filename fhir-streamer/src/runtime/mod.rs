//! Runtime integration layer.
//!
//! Isolates the audit worker's thread and Tokio runtime so a slow or hung audit sink never
//! competes with the main-path publish for executor time.

pub(crate) mod worker_runtime;
