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

use async_trait::async_trait;
use std::collections::BTreeMap;

/// One message handed to the broker: a topic, a textual payload and string headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishRecord {
    pub topic: String,
    pub payload: String,
    pub headers: BTreeMap<String, String>,
}

impl PublishRecord {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Broker-side publish failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("broker rejected publish to `{topic}`: {reason}")]
    Rejected { topic: String, reason: String },
}

///
/// [`BrokerClient`] is the black-box publish API of the outbound message broker.
///
/// Implementations must be safe to call concurrently from many in-flight ingestions and own
/// whatever connection pooling or serialization they need. The router applies its own
/// timeouts around every call.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use fhir_streamer::{BrokerClient, BrokerError, PublishRecord};
///
/// struct DiscardingBroker;
///
/// #[async_trait]
/// impl BrokerClient for DiscardingBroker {
///     async fn publish(&self, _record: PublishRecord) -> Result<(), BrokerError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError>;
}
