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

//! Audit worker that drains queued envelopes onto the fixed audit topic.

use crate::broker::{BrokerClient, PublishRecord};
use crate::data_plane::audit_sink::{AuditDispatchFailure, AuditStats};
use crate::observability::{events, fields, fields::WorkerContext};
use crate::routing::correlation::CorrelationEnvelope;
use crate::runtime::worker_runtime::{
    spawn_dispatch_loop, DispatchLoopHandle, DEFAULT_AUDIT_RUNTIME_THREAD_NAME,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc::Receiver, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

const AUDIT_RUNTIME_THREAD_NAME_PREFIX: &str = "fhir-audit-";
const AUDIT_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "audit_worker";

/// Everything the dispatch loop needs besides its queue.
#[derive(Clone)]
pub(crate) struct AuditDispatchContext {
    pub(crate) broker: Arc<dyn BrokerClient>,
    pub(crate) topic: String,
    pub(crate) publish_timeout: Duration,
    pub(crate) drain_timeout: Duration,
    pub(crate) stats: Arc<AuditStats>,
}

/// Worker state that owns the spawned audit-dispatch thread handle.
pub(crate) struct AuditWorker {
    worker_id: String,
    dispatch_handle: DispatchLoopHandle,
}

impl AuditWorker {
    /// Spawns a dedicated runtime thread for the audit dispatch loop.
    pub(crate) fn new(
        context: AuditDispatchContext,
        envelope_receiver: Receiver<CorrelationEnvelope>,
        shutdown: Arc<Notify>,
    ) -> io::Result<Self> {
        let worker_id = Uuid::new_v4().to_string();
        let runtime_thread_name = Self::build_runtime_thread_name(&worker_id);
        let worker_id_for_loop = worker_id.clone();

        let dispatch_handle = spawn_dispatch_loop(runtime_thread_name, move || async move {
            Self::audit_dispatch_loop(worker_id_for_loop, context, envelope_receiver, shutdown)
                .await;
        })?;

        info!(
            event = events::AUDIT_WORKER_CREATE,
            component = COMPONENT,
            worker_id = worker_id.as_str(),
            worker_thread = dispatch_handle.worker_thread(),
            "audit worker started"
        );

        Ok(Self {
            worker_id,
            dispatch_handle,
        })
    }

    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub(crate) fn into_dispatch_handle(self) -> DispatchLoopHandle {
        self.dispatch_handle
    }

    fn build_runtime_thread_name(worker_id: &str) -> String {
        let suffix_len =
            AUDIT_RUNTIME_THREAD_NAME_MAX_LEN - AUDIT_RUNTIME_THREAD_NAME_PREFIX.len();
        let suffix: String = worker_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{AUDIT_RUNTIME_THREAD_NAME_PREFIX}{suffix}")
        } else {
            DEFAULT_AUDIT_RUNTIME_THREAD_NAME.to_string()
        }
    }

    /// Publishes queued envelopes until the queue closes or shutdown is signalled, then drains.
    /// Shutdown takes priority over queued envelopes; the drain then runs under one deadline.
    pub(crate) async fn audit_dispatch_loop(
        worker_id: String,
        context: AuditDispatchContext,
        mut envelope_receiver: Receiver<CorrelationEnvelope>,
        shutdown: Arc<Notify>,
    ) {
        let worker_context = WorkerContext::with_current_thread(worker_id);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    envelope_receiver.close();
                    let (drained, abandoned) =
                        Self::drain(&context, &worker_context, &mut envelope_receiver).await;
                    info!(
                        event = events::AUDIT_WORKER_STOP,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        drained,
                        abandoned,
                        "audit worker stopped"
                    );
                    break;
                }
                received = envelope_receiver.recv() => match received {
                    Some(envelope) => {
                        Self::publish_and_record(
                            &context,
                            &worker_context,
                            envelope,
                            context.publish_timeout,
                        )
                        .await;
                    }
                    None => {
                        info!(
                            event = events::AUDIT_RECV_CLOSED,
                            component = COMPONENT,
                            worker_id = worker_context.worker_id.as_str(),
                            worker_thread = worker_context.worker_thread.as_str(),
                            reason = fields::REASON_QUEUE_CLOSED,
                            "audit queue closed; stopping dispatch loop"
                        );
                        break;
                    }
                },
            }
        }
    }

    /// Publishes what is left in the closed queue until the drain deadline passes. Envelopes
    /// still queued after the deadline are counted as failed without a publish attempt.
    async fn drain(
        context: &AuditDispatchContext,
        worker_context: &WorkerContext,
        envelope_receiver: &mut Receiver<CorrelationEnvelope>,
    ) -> (usize, usize) {
        let deadline = Instant::now() + context.drain_timeout;
        let mut drained = 0usize;
        let mut abandoned = 0usize;

        while let Some(envelope) = envelope_receiver.recv().await {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                context.stats.record_failed();
                abandoned += 1;
                continue;
            }
            Self::publish_and_record(
                context,
                worker_context,
                envelope,
                remaining.min(context.publish_timeout),
            )
            .await;
            drained += 1;
        }

        if abandoned > 0 {
            warn!(
                event = events::AUDIT_SEND_FAILED,
                component = COMPONENT,
                worker_id = worker_context.worker_id.as_str(),
                abandoned,
                drain_timeout_ms = context.drain_timeout.as_millis() as u64,
                reason = fields::REASON_DRAIN_DEADLINE,
                "audit drain deadline passed; remaining envelopes abandoned"
            );
        }
        (drained, abandoned)
    }

    async fn publish_and_record(
        context: &AuditDispatchContext,
        worker_context: &WorkerContext,
        envelope: CorrelationEnvelope,
        publish_timeout: Duration,
    ) {
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::AUDIT_SEND_ATTEMPT,
                component = COMPONENT,
                worker_id = worker_context.worker_id.as_str(),
                route_id = envelope.route_id(),
                exchange_id = envelope.exchange_id(),
                topic = context.topic.as_str(),
                "attempting audit send"
            );
        }

        match Self::publish_envelope(context, &envelope, publish_timeout).await {
            Ok(()) => {
                context.stats.record_published();
                debug!(
                    event = events::AUDIT_SEND_OK,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    route_id = envelope.route_id(),
                    exchange_id = envelope.exchange_id(),
                    "audit send succeeded"
                );
            }
            Err(err) => {
                context.stats.record_failed();
                warn!(
                    event = events::AUDIT_SEND_FAILED,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    worker_thread = worker_context.worker_thread.as_str(),
                    route_id = envelope.route_id(),
                    exchange_id = envelope.exchange_id(),
                    topic = context.topic.as_str(),
                    err = %err,
                    "audit send failed"
                );
            }
        }
    }

    async fn publish_envelope(
        context: &AuditDispatchContext,
        envelope: &CorrelationEnvelope,
        publish_timeout: Duration,
    ) -> Result<(), AuditDispatchFailure> {
        let payload = envelope
            .to_json()
            .map_err(|err| AuditDispatchFailure::Serialization(err.to_string()))?;
        let record =
            PublishRecord::new(context.topic.as_str(), payload).with_headers(envelope.to_headers());

        match tokio::time::timeout(publish_timeout, context.broker.publish(record)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(AuditDispatchFailure::Publish(err)),
            Err(_) => Err(AuditDispatchFailure::Timeout(publish_timeout)),
        }
    }
}
