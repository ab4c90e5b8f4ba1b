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

//! Fire-and-forget audit sink publisher.

use crate::broker::{BrokerClient, BrokerError};
use crate::data_plane::audit_worker::{AuditDispatchContext, AuditWorker};
use crate::observability::events;
use crate::routing::correlation::CorrelationEnvelope;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError, Sender};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub const DEFAULT_AUDIT_TOPIC: &str = "opsMgmt_PlatformTransactions";
pub const DEFAULT_AUDIT_QUEUE_SIZE: usize = 1024;
pub const DEFAULT_AUDIT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const COMPONENT: &str = "audit_sink";

/// Side-channel failures. Logged and counted, never propagated to the ingesting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditDispatchFailure {
    #[error("audit queue is full")]
    QueueFull,
    #[error("audit queue is closed")]
    QueueClosed,
    #[error("unable to serialize audit envelope: {0}")]
    Serialization(String),
    #[error("audit publish failed: {0}")]
    Publish(BrokerError),
    #[error("audit publish timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum AuditSinkError {
    #[error("unable to start audit worker: {0}")]
    WorkerSpawn(#[from] io::Error),
}

/// Static audit sink settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditSinkConfig {
    pub topic: String,
    pub queue_size: usize,
    pub publish_timeout: Duration,
    /// Overall budget for publishing queued envelopes on shutdown.
    pub drain_timeout: Duration,
}

impl Default for AuditSinkConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_AUDIT_TOPIC.to_string(),
            queue_size: DEFAULT_AUDIT_QUEUE_SIZE,
            publish_timeout: DEFAULT_AUDIT_PUBLISH_TIMEOUT,
            drain_timeout: DEFAULT_AUDIT_DRAIN_TIMEOUT,
        }
    }
}

/// Running audit counters.
#[derive(Debug, Default)]
pub struct AuditStats {
    dispatched: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`AuditStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditStatsSnapshot {
    /// Envelopes accepted into the queue.
    pub dispatched: u64,
    pub published: u64,
    /// Accepted envelopes whose publish failed, timed out, or was abandoned at shutdown.
    pub failed: u64,
    /// Envelopes rejected before reaching the queue.
    pub dropped: u64,
}

impl AuditStats {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AuditStatsSnapshot {
        AuditStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

///
/// [`AuditSinkPublisher`] tees correlation envelopes to the single audit topic without ever
/// making the caller wait.
///
/// Envelopes go into a bounded queue that a dedicated worker thread drains. When the queue is
/// full, because the audit sink is slow or hung, the envelope is dropped and counted rather
/// than accumulating unbounded in-flight work. Each audit publish runs under its own timeout.
pub struct AuditSinkPublisher {
    topic: String,
    sender: Sender<CorrelationEnvelope>,
    shutdown: Arc<Notify>,
    stats: Arc<AuditStats>,
    worker: Mutex<Option<AuditWorker>>,
}

impl AuditSinkPublisher {
    /// Starts the audit worker publishing through `broker`.
    pub fn spawn(
        broker: Arc<dyn BrokerClient>,
        config: AuditSinkConfig,
    ) -> Result<Self, AuditSinkError> {
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let shutdown = Arc::new(Notify::new());
        let stats = Arc::new(AuditStats::default());

        let worker = AuditWorker::new(
            AuditDispatchContext {
                broker,
                topic: config.topic.clone(),
                publish_timeout: config.publish_timeout,
                drain_timeout: config.drain_timeout,
                stats: stats.clone(),
            },
            receiver,
            shutdown.clone(),
        )?;

        Ok(Self {
            topic: config.topic,
            sender,
            shutdown,
            stats,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Queues `envelope` for the audit topic without waiting. Failures are logged and counted
    /// here; the result only informs the caller whether the tee was accepted.
    pub fn dispatch(&self, envelope: CorrelationEnvelope) -> Result<(), AuditDispatchFailure> {
        match self.sender.try_send(envelope) {
            Ok(()) => {
                self.stats.record_dispatched();
                Ok(())
            }
            Err(err) => {
                let (failure, envelope) = match err {
                    TrySendError::Full(envelope) => (AuditDispatchFailure::QueueFull, envelope),
                    TrySendError::Closed(envelope) => {
                        (AuditDispatchFailure::QueueClosed, envelope)
                    }
                };
                self.stats.record_dropped();
                warn!(
                    event = events::INGRESS_AUDIT_REJECTED,
                    component = COMPONENT,
                    route_id = envelope.route_id(),
                    exchange_id = envelope.exchange_id(),
                    topic = self.topic.as_str(),
                    err = %failure,
                    "audit envelope dropped"
                );
                Err(failure)
            }
        }
    }

    /// Tee-and-forget form of [`AuditSinkPublisher::dispatch`].
    pub fn publish(&self, envelope: CorrelationEnvelope) {
        let _ = self.dispatch(envelope);
    }

    pub fn stats(&self) -> AuditStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stops accepting envelopes, publishes what is already queued within the drain timeout,
    /// and joins the worker. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let worker = self.worker.lock().ok().and_then(|mut slot| slot.take());
        let Some(worker) = worker else {
            return;
        };

        self.shutdown.notify_one();
        let worker_id = worker.worker_id().to_string();
        let join_handle = worker.into_dispatch_handle().into_join_handle();

        match tokio::task::spawn_blocking(move || join_handle.join()).await {
            Ok(Ok(())) => {
                info!(
                    event = events::AUDIT_WORKER_STOP,
                    component = COMPONENT,
                    worker_id = worker_id.as_str(),
                    "audit worker joined"
                );
            }
            Ok(Err(_)) => {
                warn!(
                    event = events::AUDIT_WORKER_STOP,
                    component = COMPONENT,
                    worker_id = worker_id.as_str(),
                    reason = "worker_panicked",
                    "audit worker exited abnormally"
                );
            }
            Err(err) => {
                warn!(
                    event = events::AUDIT_WORKER_STOP,
                    component = COMPONENT,
                    worker_id = worker_id.as_str(),
                    err = %err,
                    "unable to join audit worker"
                );
            }
        }
        debug!(
            component = COMPONENT,
            stats = ?self.stats.snapshot(),
            "audit sink shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditDispatchFailure, AuditSinkConfig, AuditSinkPublisher};
    use crate::broker::{BrokerClient, BrokerError, PublishRecord};
    use crate::descriptor::{ResourceProfile, ResourceRouteDescriptor};
    use crate::message::InboundMessage;
    use crate::routing::correlation::{headers, CorrelationContextBuilder, CorrelationEnvelope, RuntimeIds};
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

    struct RejectingBroker;

    #[async_trait]
    impl BrokerClient for RejectingBroker {
        async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
            Err(BrokerError::Rejected {
                topic: record.topic,
                reason: "audit store offline".to_string(),
            })
        }
    }

    struct HungBroker;

    #[async_trait]
    impl BrokerClient for HungBroker {
        async fn publish(&self, _record: PublishRecord) -> Result<(), BrokerError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn envelope(body: &str) -> CorrelationEnvelope {
        let descriptor =
            ResourceRouteDescriptor::new("Encounter", ResourceProfile::Clinical, "FHIRSvr_Encounter");
        let message = InboundMessage::new(body);
        CorrelationContextBuilder::default()
            .build(
                &message,
                &descriptor,
                RuntimeIds::for_message("audit-test", &descriptor, &message),
            )
            .expect("context should build")
    }

    fn config(queue_size: usize, publish_timeout: Duration) -> AuditSinkConfig {
        AuditSinkConfig {
            queue_size,
            publish_timeout,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn dispatch_publishes_serialized_envelope_to_audit_topic() {
        let broker = Arc::new(CapturingBroker::default());
        let sink = AuditSinkPublisher::spawn(broker.clone(), AuditSinkConfig::default())
            .expect("audit sink should start");

        sink.dispatch(envelope("first")).expect("queue should accept");
        sink.publish(envelope("second"));
        sink.shutdown().await;

        let records = broker.records.lock().await;
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|record| record.topic == "opsMgmt_PlatformTransactions"));
        let first: serde_json::Value = serde_json::from_str(&records[0].payload).unwrap();
        assert_eq!(first["bodySnapshot"], "first");
        assert_eq!(
            records[1].headers.get(headers::BODY_DATA).map(String::as_str),
            Some("second")
        );

        let stats = sink.stats();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn rejected_audit_publishes_are_counted_not_raised() {
        let sink = AuditSinkPublisher::spawn(Arc::new(RejectingBroker), AuditSinkConfig::default())
            .expect("audit sink should start");

        for _ in 0..3 {
            assert!(sink.dispatch(envelope("x")).is_ok());
        }
        sink.shutdown().await;

        let stats = sink.stats();
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.published, 0);
    }

    #[tokio::test]
    async fn hung_sink_fills_queue_and_drops_instead_of_blocking() {
        let sink = AuditSinkPublisher::spawn(
            Arc::new(HungBroker),
            config(1, Duration::from_millis(20)),
        )
        .expect("audit sink should start");

        let results: Vec<_> = (0..5).map(|_| sink.dispatch(envelope("x"))).collect();
        let dropped = results
            .iter()
            .filter(|result| **result == Err(AuditDispatchFailure::QueueFull))
            .count();

        assert!(dropped >= 3);
        sink.shutdown().await;

        let stats = sink.stats();
        assert_eq!(stats.dispatched + stats.dropped, 5);
        assert_eq!(stats.failed, stats.dispatched);
    }

    #[tokio::test]
    async fn shutdown_with_hung_sink_is_bounded_by_drain_timeout() {
        let sink = AuditSinkPublisher::spawn(
            Arc::new(HungBroker),
            AuditSinkConfig {
                queue_size: 64,
                publish_timeout: Duration::from_secs(1),
                drain_timeout: Duration::from_millis(100),
                ..Default::default()
            },
        )
        .expect("audit sink should start");

        for _ in 0..32 {
            sink.publish(envelope("x"));
        }

        tokio::time::timeout(Duration::from_secs(3), sink.shutdown())
            .await
            .expect("shutdown should finish within the drain budget");

        let stats = sink.stats();
        assert_eq!(stats.published, 0);
        assert_eq!(stats.failed, stats.dispatched);
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_reports_closed_queue() {
        let sink = AuditSinkPublisher::spawn(
            Arc::new(CapturingBroker::default()),
            AuditSinkConfig::default(),
        )
        .expect("audit sink should start");

        sink.shutdown().await;
        sink.shutdown().await;

        assert_eq!(
            sink.dispatch(envelope("late")),
            Err(AuditDispatchFailure::QueueClosed)
        );
        assert_eq!(sink.stats().dropped, 1);
    }
}
