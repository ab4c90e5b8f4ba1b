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

use crate::broker::{BrokerClient, BrokerError};
use crate::control_plane::descriptor_table::{DescriptorTable, UnknownRouteKind};
use crate::data_plane::audit_sink::{
    AuditSinkConfig, AuditSinkError, AuditSinkPublisher, AuditStatsSnapshot,
    DEFAULT_AUDIT_DRAIN_TIMEOUT, DEFAULT_AUDIT_PUBLISH_TIMEOUT, DEFAULT_AUDIT_QUEUE_SIZE,
    DEFAULT_AUDIT_TOPIC,
};
use crate::data_plane::ingress_endpoint::{IngestPipeline, IngressEndpoint};
use crate::message::InboundMessage;
use crate::observability::events;
use crate::routing::correlation::{Clock, ContextError, CorrelationContextBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(5000);
const COMPONENT: &str = "router";

/// Per-message processing states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionState {
    Received,
    ContextBuilt,
    AuditDispatched,
    Published,
    Done,
    ContextFailed,
    PublishFailed,
}

/// Main-path publish failure: the primary deliverable was not handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishFailure {
    #[error("publish to `{topic}` failed: {source}")]
    Broker { topic: String, source: BrokerError },
    #[error("publish to `{topic}` timed out after {timeout:?}")]
    Timeout { topic: String, timeout: Duration },
}

/// Failures surfaced to the ingress adapter. Audit failures never appear here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    UnknownRouteKind(#[from] UnknownRouteKind),
    #[error(transparent)]
    IncompleteContext(#[from] ContextError),
    #[error(transparent)]
    PublishFailure(#[from] PublishFailure),
}

impl IngestError {
    /// Terminal state the message ended in, if it got past endpoint resolution.
    pub fn state(&self) -> Option<IngestionState> {
        match self {
            IngestError::UnknownRouteKind(_) => None,
            IngestError::IncompleteContext(_) => Some(IngestionState::ContextFailed),
            IngestError::PublishFailure(_) => Some(IngestionState::PublishFailed),
        }
    }
}

/// Outcome of a successful ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReceipt {
    pub route_id: String,
    pub destination_topic: String,
    pub exchange_id: String,
    pub state: IngestionState,
    /// Whether the audit tee was accepted into the audit queue.
    pub audit_dispatched: bool,
}

/// Static router settings.
#[derive(Clone)]
pub struct RouterConfig {
    pub audit_topic: String,
    pub audit_queue_size: usize,
    pub publish_timeout: Duration,
    pub audit_publish_timeout: Duration,
    /// Overall budget for publishing queued audit envelopes on shutdown.
    pub audit_drain_timeout: Duration,
    /// Stamps envelope capture times; the local wall clock when `None`.
    pub clock: Option<Arc<dyn Clock>>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            audit_topic: DEFAULT_AUDIT_TOPIC.to_string(),
            audit_queue_size: DEFAULT_AUDIT_QUEUE_SIZE,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            audit_publish_timeout: DEFAULT_AUDIT_PUBLISH_TIMEOUT,
            audit_drain_timeout: DEFAULT_AUDIT_DRAIN_TIMEOUT,
            clock: None,
        }
    }
}

impl RouterConfig {
    /// Replaces the wall clock used to stamp envelopes.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

///
/// [`IngestionRouter`] binds one [`IngressEndpoint`] per descriptor and runs inbound messages
/// through the shared ingestion pipeline.
///
/// All endpoints share one context builder, one audit sink and one broker client. The
/// descriptor table is injected as an immutable value and never changes after startup.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use fhir_streamer::{
///     BrokerClient, BrokerError, DescriptorTable, InboundMessage, IngestionRouter,
///     IngestionState, PublishRecord, RouterConfig,
/// };
/// use std::sync::Arc;
///
/// struct DiscardingBroker;
///
/// #[async_trait]
/// impl BrokerClient for DiscardingBroker {
///     async fn publish(&self, _record: PublishRecord) -> Result<(), BrokerError> {
///         Ok(())
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let router = IngestionRouter::new(
///     "doc",
///     Arc::new(DescriptorTable::builtin().unwrap()),
///     Arc::new(DiscardingBroker),
///     RouterConfig::default(),
/// )
/// .unwrap();
///
/// let receipt = router
///     .ingest("patient", InboundMessage::new(r#"{"resourceType":"Patient"}"#))
///     .await
///     .unwrap();
/// assert_eq!(receipt.destination_topic, "FHIRSvr_Patient");
/// assert_eq!(receipt.state, IngestionState::Done);
///
/// assert!(router.ingest("unknown", InboundMessage::new("")).await.is_err());
/// router.shutdown().await;
/// # });
/// ```
pub struct IngestionRouter {
    name: String,
    table: Arc<DescriptorTable>,
    endpoints: HashMap<String, IngressEndpoint>,
    pipeline: Arc<IngestPipeline>,
}

impl IngestionRouter {
    /// Starts the audit worker and binds every descriptor in `table` to its endpoint.
    pub fn new(
        name: &str,
        table: Arc<DescriptorTable>,
        broker: Arc<dyn BrokerClient>,
        config: RouterConfig,
    ) -> Result<Self, AuditSinkError> {
        let audit_sink = AuditSinkPublisher::spawn(
            broker.clone(),
            AuditSinkConfig {
                topic: config.audit_topic,
                queue_size: config.audit_queue_size,
                publish_timeout: config.audit_publish_timeout,
                drain_timeout: config.audit_drain_timeout,
            },
        )?;
        let context_builder = match config.clock {
            Some(clock) => CorrelationContextBuilder::new(clock),
            None => CorrelationContextBuilder::default(),
        };
        let pipeline = Arc::new(IngestPipeline::new(
            name,
            context_builder,
            audit_sink,
            broker,
            config.publish_timeout,
        ));

        let mut endpoints = HashMap::with_capacity(table.len());
        for descriptor in table.descriptors() {
            debug!(
                event = events::ENDPOINT_BIND,
                component = COMPONENT,
                router = name,
                endpoint = descriptor.endpoint(),
                route_id = descriptor.route_id(),
                topic = descriptor.destination_topic(),
                "binding ingress endpoint"
            );
            endpoints.insert(
                descriptor.endpoint().to_string(),
                IngressEndpoint::new(descriptor.clone(), pipeline.clone()),
            );
        }

        info!(
            event = events::ROUTER_START,
            component = COMPONENT,
            router = name,
            endpoints = endpoints.len(),
            audit_topic = pipeline.audit_sink().topic(),
            "ingestion router started"
        );

        Ok(Self {
            name: name.to_string(),
            table,
            endpoints,
            pipeline,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor_table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Resolves the endpoint bound to `endpoint_key` (case-insensitive, surrounding `/` ignored).
    pub fn endpoint(&self, endpoint_key: &str) -> Result<&IngressEndpoint, UnknownRouteKind> {
        let descriptor = self.table.lookup(endpoint_key)?;
        self.endpoints
            .get(descriptor.endpoint())
            .ok_or_else(|| UnknownRouteKind {
                endpoint: descriptor.endpoint().to_string(),
            })
    }

    /// Bound endpoints in descriptor table order.
    pub fn endpoints(&self) -> impl Iterator<Item = &IngressEndpoint> {
        self.table
            .descriptors()
            .filter_map(|descriptor| self.endpoints.get(descriptor.endpoint()))
    }

    /// Ingests `message` on the endpoint addressed by `endpoint_key`.
    pub async fn ingest(
        &self,
        endpoint_key: &str,
        message: InboundMessage,
    ) -> Result<IngestionReceipt, IngestError> {
        let endpoint = self.endpoint(endpoint_key).inspect_err(|err| {
            warn!(
                event = events::INGRESS_UNKNOWN_ROUTE_KIND,
                component = COMPONENT,
                router = self.name.as_str(),
                endpoint = err.endpoint.as_str(),
                "rejecting message for unknown route kind"
            );
        })?;
        endpoint.on_receive(message).await
    }

    pub fn audit_stats(&self) -> AuditStatsSnapshot {
        self.pipeline.audit_sink().stats()
    }

    /// Stops the audit worker after publishing already queued envelopes. Later ingestions still
    /// publish on the main path; their audit envelopes are dropped and counted.
    pub async fn shutdown(&self) {
        self.pipeline.audit_sink().shutdown().await;
        info!(
            event = events::ROUTER_SHUTDOWN,
            component = COMPONENT,
            router = self.name.as_str(),
            "ingestion router stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{IngestError, IngestionRouter, IngestionState, PublishFailure, RouterConfig};
    use crate::broker::{BrokerClient, BrokerError, PublishRecord};
    use crate::control_plane::descriptor_table::DescriptorTable;
    use crate::descriptor::{ResourceProfile, ResourceRouteDescriptor};
    use crate::message::InboundMessage;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CapturingBroker {
        records: Mutex<Vec<PublishRecord>>,
    }

    #[async_trait]
    impl BrokerClient for CapturingBroker {
        async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
            self.records.lock().await.push(record);
            Ok(())
        }
    }

    struct StuckMainPathBroker;

    #[async_trait]
    impl BrokerClient for StuckMainPathBroker {
        async fn publish(&self, _record: PublishRecord) -> Result<(), BrokerError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn small_table() -> Arc<DescriptorTable> {
        Arc::new(
            DescriptorTable::new(vec![
                ResourceRouteDescriptor::new("Patient", ResourceProfile::Clinical, "FHIRSvr_Patient"),
                ResourceRouteDescriptor::new("Claim", ResourceProfile::Financial, "FHIRSvr_Claim"),
            ])
            .expect("table should validate"),
        )
    }

    #[tokio::test]
    async fn binds_one_endpoint_per_descriptor_in_table_order() {
        let router = IngestionRouter::new(
            "bind-test",
            small_table(),
            Arc::new(CapturingBroker::default()),
            RouterConfig::default(),
        )
        .expect("router should start");

        let keys: Vec<&str> = router.endpoints().map(|endpoint| endpoint.key()).collect();
        assert_eq!(keys, vec!["patient", "claim"]);
        assert_eq!(
            router.endpoint("/Claim/").map(|endpoint| endpoint.descriptor().key()),
            Ok("Claim")
        );
        router.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_endpoint_publishes_nothing() {
        let broker = Arc::new(CapturingBroker::default());
        let router = IngestionRouter::new(
            "unknown-test",
            small_table(),
            broker.clone(),
            RouterConfig::default(),
        )
        .expect("router should start");

        let err = router
            .ingest("observation", InboundMessage::new("{}"))
            .await
            .expect_err("observation is not bound");
        assert!(matches!(err, IngestError::UnknownRouteKind(ref unknown) if unknown.endpoint == "observation"));
        assert_eq!(err.state(), None);

        router.shutdown().await;
        assert!(broker.records.lock().await.is_empty());
        assert_eq!(router.audit_stats().dispatched, 0);
    }

    #[tokio::test]
    async fn main_path_publish_is_bounded_by_timeout() {
        let router = IngestionRouter::new(
            "timeout-test",
            small_table(),
            Arc::new(StuckMainPathBroker),
            RouterConfig {
                publish_timeout: Duration::from_millis(30),
                audit_publish_timeout: Duration::from_millis(10),
                ..Default::default()
            },
        )
        .expect("router should start");

        let err = router
            .ingest("patient", InboundMessage::new("{}"))
            .await
            .expect_err("publish should time out");

        assert_eq!(
            err,
            IngestError::PublishFailure(PublishFailure::Timeout {
                topic: "FHIRSvr_Patient".to_string(),
                timeout: Duration::from_millis(30),
            })
        );
        assert_eq!(err.state(), Some(IngestionState::PublishFailed));
        router.shutdown().await;
    }

    #[tokio::test]
    async fn ingest_after_shutdown_still_publishes_main_path() {
        let broker = Arc::new(CapturingBroker::default());
        let router = IngestionRouter::new(
            "shutdown-test",
            small_table(),
            broker.clone(),
            RouterConfig::default(),
        )
        .expect("router should start");
        router.shutdown().await;

        let receipt = router
            .ingest("claim", InboundMessage::new("late"))
            .await
            .expect("main path is independent of the audit worker");

        assert!(!receipt.audit_dispatched);
        assert_eq!(receipt.state, IngestionState::Done);
        assert_eq!(router.audit_stats().dropped, 1);

        let records = broker.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "FHIRSvr_Claim");
        assert_eq!(records[0].payload, "late");
    }
}
