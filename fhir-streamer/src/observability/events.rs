//! Canonical structured event names used across `fhir-streamer`.

// Ingress and router events.
pub const INGRESS_RECEIVE: &str = "ingress_receive";
pub const INGRESS_BODY_TAP: &str = "ingress_body_tap";
pub const INGRESS_UNKNOWN_ROUTE_KIND: &str = "ingress_unknown_route_kind";
pub const INGRESS_CONTEXT_BUILT: &str = "ingress_context_built";
pub const INGRESS_CONTEXT_FAILED: &str = "ingress_context_failed";
pub const INGRESS_AUDIT_DISPATCHED: &str = "ingress_audit_dispatched";
pub const INGRESS_AUDIT_REJECTED: &str = "ingress_audit_rejected";
pub const INGRESS_PUBLISH_OK: &str = "ingress_publish_ok";
pub const INGRESS_PUBLISH_FAILED: &str = "ingress_publish_failed";
pub const INGRESS_DONE: &str = "ingress_done";

// Audit sink events.
pub const AUDIT_SEND_ATTEMPT: &str = "audit_send_attempt";
pub const AUDIT_SEND_OK: &str = "audit_send_ok";
pub const AUDIT_SEND_FAILED: &str = "audit_send_failed";
pub const AUDIT_RECV_CLOSED: &str = "audit_recv_closed";
pub const AUDIT_WORKER_CREATE: &str = "audit_worker_create";
pub const AUDIT_WORKER_STOP: &str = "audit_worker_stop";

// Control-plane lifecycle events.
pub const DESCRIPTOR_TABLE_LOADED: &str = "descriptor_table_loaded";
pub const DESCRIPTOR_TABLE_REJECTED: &str = "descriptor_table_rejected";
pub const ENDPOINT_BIND: &str = "endpoint_bind";
pub const ROUTER_START: &str = "router_start";
pub const ROUTER_SHUTDOWN: &str = "router_shutdown";

// Runtime events.
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
