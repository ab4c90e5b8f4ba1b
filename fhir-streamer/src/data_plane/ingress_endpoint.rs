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

//! Ingress endpoint bound to exactly one resource route descriptor.

use crate::broker::{BrokerClient, PublishRecord};
use crate::data_plane::audit_sink::AuditSinkPublisher;
use crate::descriptor::ResourceRouteDescriptor;
use crate::message::InboundMessage;
use crate::observability::{events, fields};
use crate::router::{IngestError, IngestionReceipt, IngestionState, PublishFailure};
use crate::routing::correlation::{CorrelationContextBuilder, RuntimeIds};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "ingress_endpoint";

/// State shared by every endpoint of one router: the context builder, the audit tee and the
/// main-path broker.
pub(crate) struct IngestPipeline {
    context_id: String,
    context_builder: CorrelationContextBuilder,
    audit_sink: AuditSinkPublisher,
    broker: Arc<dyn BrokerClient>,
    publish_timeout: Duration,
}

impl IngestPipeline {
    pub(crate) fn new(
        context_id: &str,
        context_builder: CorrelationContextBuilder,
        audit_sink: AuditSinkPublisher,
        broker: Arc<dyn BrokerClient>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            context_id: context_id.to_string(),
            context_builder,
            audit_sink,
            broker,
            publish_timeout,
        }
    }

    pub(crate) fn audit_sink(&self) -> &AuditSinkPublisher {
        &self.audit_sink
    }
}

///
/// [`IngressEndpoint`] accepts inbound messages for one resource type.
///
/// The binding between an endpoint and its descriptor is fixed when the router starts. Each
/// received message walks `Received -> ContextBuilt -> AuditDispatched -> Published -> Done`;
/// a context failure stops before anything is audited or published, and only a failed main
/// publish is reported as a delivery failure.
#[derive(Clone)]
pub struct IngressEndpoint {
    descriptor: Arc<ResourceRouteDescriptor>,
    pipeline: Arc<IngestPipeline>,
}

impl IngressEndpoint {
    pub(crate) fn new(
        descriptor: Arc<ResourceRouteDescriptor>,
        pipeline: Arc<IngestPipeline>,
    ) -> Self {
        Self {
            descriptor,
            pipeline,
        }
    }

    /// Lower-case endpoint key this endpoint is addressed by.
    pub fn key(&self) -> &str {
        self.descriptor.endpoint()
    }

    pub fn descriptor(&self) -> &ResourceRouteDescriptor {
        &self.descriptor
    }

    /// Runs one message through the pipeline.
    pub async fn on_receive(
        &self,
        message: InboundMessage,
    ) -> Result<IngestionReceipt, IngestError> {
        let descriptor = self.descriptor.as_ref();
        let pipeline = self.pipeline.as_ref();
        let route_id = descriptor.route_id();
        let topic = descriptor.destination_topic();

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::INGRESS_RECEIVE,
                component = COMPONENT,
                route_id,
                endpoint = descriptor.endpoint(),
                exchange_id = fields::format_exchange_id(&message).as_str(),
                msg_id = fields::format_message_id(&message).as_str(),
                body_len = message.body().len(),
                state = ?IngestionState::Received,
                "received ingress message"
            );
            debug!(
                event = events::INGRESS_BODY_TAP,
                component = COMPONENT,
                route_id,
                body = fields::format_body_preview(message.body()).as_str(),
                "ingress body"
            );
        }

        let envelope = match pipeline.context_builder.build(
            &message,
            descriptor,
            RuntimeIds::for_message(&pipeline.context_id, descriptor, &message),
        ) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(
                    event = events::INGRESS_CONTEXT_FAILED,
                    component = COMPONENT,
                    route_id,
                    state = ?IngestionState::ContextFailed,
                    err = %err,
                    "correlation context incomplete; message not audited or published"
                );
                return Err(IngestError::IncompleteContext(err));
            }
        };
        let exchange_id = envelope.exchange_id().to_string();

        debug!(
            event = events::INGRESS_CONTEXT_BUILT,
            component = COMPONENT,
            route_id,
            exchange_id = exchange_id.as_str(),
            state = ?IngestionState::ContextBuilt,
            "correlation context built"
        );

        // Enqueue only; the audit publish completes on the audit worker.
        let audit_dispatched = pipeline.audit_sink.dispatch(envelope).is_ok();
        if audit_dispatched {
            debug!(
                event = events::INGRESS_AUDIT_DISPATCHED,
                component = COMPONENT,
                route_id,
                exchange_id = exchange_id.as_str(),
                state = ?IngestionState::AuditDispatched,
                "audit envelope dispatched"
            );
        }

        let record = PublishRecord::new(topic, message.into_body());
        let published =
            tokio::time::timeout(pipeline.publish_timeout, pipeline.broker.publish(record)).await;

        let failure = match published {
            Ok(Ok(())) => None,
            Ok(Err(source)) => Some(PublishFailure::Broker {
                topic: topic.to_string(),
                source,
            }),
            Err(_) => Some(PublishFailure::Timeout {
                topic: topic.to_string(),
                timeout: pipeline.publish_timeout,
            }),
        };

        if let Some(failure) = failure {
            warn!(
                event = events::INGRESS_PUBLISH_FAILED,
                component = COMPONENT,
                route_id,
                exchange_id = exchange_id.as_str(),
                topic,
                state = ?IngestionState::PublishFailed,
                err = %failure,
                "main path publish failed"
            );
            return Err(IngestError::PublishFailure(failure));
        }

        debug!(
            event = events::INGRESS_PUBLISH_OK,
            component = COMPONENT,
            route_id,
            exchange_id = exchange_id.as_str(),
            topic,
            state = ?IngestionState::Published,
            "main path publish succeeded"
        );
        debug!(
            event = events::INGRESS_DONE,
            component = COMPONENT,
            route_id,
            exchange_id = exchange_id.as_str(),
            "ingestion done"
        );

        Ok(IngestionReceipt {
            route_id: route_id.to_string(),
            destination_topic: topic.to_string(),
            exchange_id,
            state: IngestionState::Done,
            audit_dispatched,
        })
    }
}
