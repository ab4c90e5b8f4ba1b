//! Data-plane layer.
//!
//! Per-message flow: ingress endpoints build the correlation envelope, tee it to the audit
//! sink queue without waiting, then publish the body on the main path. The audit worker
//! drains the queue on its own runtime thread.

pub(crate) mod audit_sink;
pub(crate) mod audit_worker;
pub(crate) mod ingress_endpoint;
