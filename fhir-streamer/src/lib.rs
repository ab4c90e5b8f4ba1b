/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # fhir-streamer
//!
//! `fhir-streamer` ingests healthcare interoperability messages, one logical endpoint per
//! clinical or financial resource type, and for each message:
//!
//! 1. stamps a [`CorrelationEnvelope`] (capture date/time, route, exchange and message ids,
//!    a by-value body snapshot),
//! 2. tees that envelope to the single audit topic without waiting for it, and
//! 3. publishes the original body to the resource's destination topic.
//!
//! Every endpoint is an instance of one parameterized pipeline driven by a
//! [`DescriptorTable`]. Only a failed main-path publish is reported to the caller; audit
//! failures are logged and counted.
//!
//! ```
//! use async_trait::async_trait;
//! use fhir_streamer::{
//!     BrokerClient, BrokerError, DescriptorTable, InboundMessage, IngestionRouter,
//!     PublishRecord, RouterConfig,
//! };
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct InMemoryBroker {
//!     topics: Mutex<Vec<String>>,
//! }
//!
//! #[async_trait]
//! impl BrokerClient for InMemoryBroker {
//!     async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
//!         self.topics.lock().unwrap().push(record.topic);
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let broker = Arc::new(InMemoryBroker::default());
//! let router = IngestionRouter::new(
//!     "quick-start",
//!     Arc::new(DescriptorTable::builtin().unwrap()),
//!     broker.clone(),
//!     RouterConfig::default(),
//! )
//! .unwrap();
//!
//! router
//!     .ingest("patient", InboundMessage::new(r#"{"resourceType":"Patient","id":"42"}"#))
//!     .await
//!     .unwrap();
//! router.shutdown().await;
//!
//! let mut topics = broker.topics.lock().unwrap().clone();
//! topics.sort();
//! assert_eq!(topics, vec!["FHIRSvr_Patient", "opsMgmt_PlatformTransactions"]);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`IngestionRouter`] and [`IngressEndpoint`]
//! - Control plane: built-in catalog and descriptor table validation
//! - Routing: correlation envelope construction
//! - Data plane: ingress endpoints, the audit sink queue and its worker
//! - Runtime: the dedicated audit worker thread and runtime
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber. Binaries and tests
//! are responsible for one-time `tracing_subscriber` initialization at process boundaries.

mod broker;
pub use broker::{BrokerClient, BrokerError, PublishRecord};

mod control_plane;
pub use control_plane::descriptor_table::{DescriptorTable, DescriptorTableError, UnknownRouteKind};

mod data_plane;
pub use data_plane::audit_sink::{
    AuditDispatchFailure, AuditSinkConfig, AuditSinkError, AuditSinkPublisher, AuditStatsSnapshot,
    DEFAULT_AUDIT_DRAIN_TIMEOUT, DEFAULT_AUDIT_PUBLISH_TIMEOUT, DEFAULT_AUDIT_QUEUE_SIZE,
    DEFAULT_AUDIT_TOPIC,
};
pub use data_plane::ingress_endpoint::IngressEndpoint;

mod descriptor;
pub use descriptor::{
    ResourceProfile, ResourceRouteDescriptor, CLINICAL_APPLICATION, FHIR_INDUSTRY_STANDARD,
    FINANCIAL_APPLICATION,
};

mod message;
pub use message::InboundMessage;

#[doc(hidden)]
pub mod observability;

mod router;
pub use router::{
    IngestError, IngestionReceipt, IngestionRouter, IngestionState, PublishFailure, RouterConfig,
    DEFAULT_PUBLISH_TIMEOUT,
};

mod routing;
pub use routing::correlation::{
    headers, Clock, ContextError, CorrelationContextBuilder, CorrelationEnvelope, RuntimeIds,
    SystemClock,
};

mod runtime;
