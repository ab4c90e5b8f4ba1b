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

use crate::config::BrokerDelivery;
use async_nats::connection::State;
use async_nats::jetstream::{self, context::PublishErrorKind};
use async_nats::{Client, ConnectOptions, HeaderMap, HeaderValue};
use async_trait::async_trait;
use fhir_streamer::{headers, BrokerClient, BrokerError, PublishRecord};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Server default, used until the first INFO from the server arrives.
const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

const HEADER_PREAMBLE: &str = "NATS/1.0\r\n";

/// Publishes records on NATS, one subject per topic.
///
/// Destination topics are confirmed according to [`BrokerDelivery`]: a JetStream ack or a
/// connection flush. The audit topic is published on core NATS without waiting for the
/// server.
pub struct NatsBroker {
    client: Client,
    jetstream: jetstream::Context,
    delivery: BrokerDelivery,
    audit_topic: String,
}

impl NatsBroker {
    pub async fn connect(
        address: &str,
        connection_timeout: Duration,
        delivery: BrokerDelivery,
        audit_topic: impl Into<String>,
    ) -> Result<Self, async_nats::ConnectError> {
        info!(
            address,
            timeout_ms = connection_timeout.as_millis() as u64,
            ?delivery,
            "connecting to NATS"
        );
        let client = ConnectOptions::new()
            .connection_timeout(connection_timeout)
            .connect(address)
            .await?;
        info!(address, "connected to NATS");
        Ok(Self::with_client(client, delivery, audit_topic))
    }

    pub fn with_client(
        client: Client,
        delivery: BrokerDelivery,
        audit_topic: impl Into<String>,
    ) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self {
            client,
            jetstream,
            delivery,
            audit_topic: audit_topic.into(),
        }
    }

    /// Bounds how long a JetStream publish waits for its ack.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.jetstream.set_timeout(timeout);
        self
    }

    /// Waits for buffered publishes to reach the server.
    pub async fn flush(&self) -> Result<(), BrokerError> {
        self.client
            .flush()
            .await
            .map_err(|err| BrokerError::Unavailable(err.to_string()))
    }

    fn max_payload(&self) -> usize {
        match self.client.server_info().max_payload {
            0 => DEFAULT_MAX_PAYLOAD,
            max_payload => max_payload,
        }
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        match self.client.connection_state() {
            State::Connected => Ok(()),
            state => Err(BrokerError::Unavailable(format!(
                "NATS connection is {state:?}"
            ))),
        }
    }

    async fn publish_confirmed(
        &self,
        topic: String,
        headers: HeaderMap,
        payload: String,
    ) -> Result<(), BrokerError> {
        match self.delivery {
            BrokerDelivery::JetStream => {
                let ack = self
                    .jetstream
                    .publish_with_headers(topic.clone(), headers, payload.into())
                    .await
                    .map_err(|err| jetstream_failure(&topic, err.kind(), err.to_string()))?;
                ack.await
                    .map_err(|err| jetstream_failure(&topic, err.kind(), err.to_string()))?;
                Ok(())
            }
            BrokerDelivery::Flush => {
                self.client
                    .publish_with_headers(topic.clone(), headers, payload.into())
                    .await
                    .map_err(|err| BrokerError::Rejected {
                        topic,
                        reason: err.to_string(),
                    })?;
                self.flush().await
            }
        }
    }
}

fn jetstream_failure(topic: &str, kind: PublishErrorKind, reason: String) -> BrokerError {
    match kind {
        PublishErrorKind::TimedOut | PublishErrorKind::BrokenPipe => {
            BrokerError::Unavailable(reason)
        }
        _ => BrokerError::Rejected {
            topic: topic.to_string(),
            reason,
        },
    }
}

/// NATS headers for a record, plus the size of their encoded block.
///
/// The body snapshot already travels in the payload and is left out. Values NATS cannot carry
/// on a header line are skipped.
fn to_header_map(record: &PublishRecord) -> (HeaderMap, usize) {
    let mut map = HeaderMap::new();
    let mut encoded_len = HEADER_PREAMBLE.len() + 2;
    for (name, value) in &record.headers {
        if name == headers::BODY_DATA {
            continue;
        }
        let Ok(header_value) = HeaderValue::from_str(value) else {
            warn!(
                topic = record.topic.as_str(),
                header = name.as_str(),
                "skipping header value containing a line break"
            );
            continue;
        };
        encoded_len += name.len() + value.len() + 4;
        map.insert(name.as_str(), header_value);
    }
    (map, encoded_len)
}

fn check_size(topic: &str, message_len: usize, max_payload: usize) -> Result<(), BrokerError> {
    if message_len > max_payload {
        return Err(BrokerError::Rejected {
            topic: topic.to_string(),
            reason: format!("message size {message_len} exceeds server max_payload {max_payload}"),
        });
    }
    Ok(())
}

#[async_trait]
impl BrokerClient for NatsBroker {
    async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
        let is_audit = record.topic == self.audit_topic;
        debug!(
            topic = record.topic.as_str(),
            payload_size = record.payload.len(),
            headers = record.headers.len(),
            audit = is_audit,
            "publishing to NATS"
        );
        if !is_audit {
            self.ensure_connected()?;
        }

        let (nats_headers, header_len) = to_header_map(&record);
        check_size(
            &record.topic,
            header_len + record.payload.len(),
            self.max_payload(),
        )?;
        let PublishRecord { topic, payload, .. } = record;

        if is_audit {
            return self
                .client
                .publish_with_headers(topic.clone(), nats_headers, payload.into())
                .await
                .map_err(|err| BrokerError::Rejected {
                    topic,
                    reason: err.to_string(),
                });
        }
        self.publish_confirmed(topic, nats_headers, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::{check_size, to_header_map, NatsBroker, DEFAULT_MAX_PAYLOAD};
    use crate::config::BrokerDelivery;
    use async_nats::ConnectOptions;
    use fhir_streamer::{headers, BrokerClient, BrokerError, PublishRecord};
    use std::collections::BTreeMap;
    use std::time::Duration;

    const AUDIT_TOPIC: &str = "opsMgmt_PlatformTransactions";

    async fn unreachable_broker(delivery: BrokerDelivery) -> NatsBroker {
        let client = ConnectOptions::new()
            .retry_on_initial_connect()
            .connect("127.0.0.1:1")
            .await
            .expect("client with deferred connect");
        NatsBroker::with_client(client, delivery, AUDIT_TOPIC)
            .with_ack_timeout(Duration::from_millis(200))
    }

    fn audit_record(body: &str) -> PublishRecord {
        PublishRecord::new(AUDIT_TOPIC, format!("{{\"bodyData\":{body:?}}}")).with_headers(
            BTreeMap::from([
                (headers::CONTEXT_ID.to_string(), "idaas-connect-fhir".to_string()),
                (headers::PROCESS_NAME.to_string(), "Input".to_string()),
                (headers::EXCHANGE_ID.to_string(), "ID-1".to_string()),
                (headers::BODY_DATA.to_string(), body.to_string()),
            ]),
        )
    }

    #[test]
    fn record_headers_become_nats_headers() {
        let (nats_headers, _) = to_header_map(&audit_record("{}"));

        assert_eq!(
            nats_headers.get(headers::CONTEXT_ID).map(|value| value.as_str()),
            Some("idaas-connect-fhir")
        );
        assert_eq!(
            nats_headers.get(headers::PROCESS_NAME).map(|value| value.as_str()),
            Some("Input")
        );
    }

    #[test]
    fn multi_line_body_stays_out_of_the_header_block() {
        let body = "{\r\n  \"resourceType\": \"Patient\"\r\n}\r\nexchangeID: forged";

        let (nats_headers, _) = to_header_map(&audit_record(body));

        assert!(nats_headers.get(headers::BODY_DATA).is_none());
        assert_eq!(
            nats_headers.get(headers::EXCHANGE_ID).map(|value| value.as_str()),
            Some("ID-1")
        );
        for (_, values) in nats_headers.iter() {
            for value in values {
                assert!(!value.as_str().contains(['\r', '\n']));
            }
        }
    }

    #[test]
    fn header_values_with_line_breaks_are_skipped() {
        let record = PublishRecord::new(AUDIT_TOPIC, "{}").with_headers(BTreeMap::from([
            (headers::AUDIT_DETAILS.to_string(), "first\nsecond".to_string()),
            (headers::PROCESS_NAME.to_string(), "Input".to_string()),
        ]));

        let (nats_headers, encoded_len) = to_header_map(&record);

        assert!(nats_headers.get(headers::AUDIT_DETAILS).is_none());
        assert_eq!(
            encoded_len,
            "NATS/1.0\r\n".len() + "processname: Input\r\n".len() + 2
        );
    }

    #[test]
    fn main_path_record_carries_an_empty_header_block() {
        let record = PublishRecord::new("FHIRSvr_Patient", "{}");

        let (nats_headers, encoded_len) = to_header_map(&record);

        assert!(nats_headers.is_empty());
        assert_eq!(encoded_len, "NATS/1.0\r\n\r\n".len());
    }

    #[test]
    fn oversized_message_is_rejected_before_publish() {
        let err = check_size("FHIRSvr_Patient", DEFAULT_MAX_PAYLOAD + 1, DEFAULT_MAX_PAYLOAD)
            .expect_err("oversized message");
        assert!(matches!(err, BrokerError::Rejected { topic, .. } if topic == "FHIRSvr_Patient"));

        assert!(check_size("FHIRSvr_Patient", DEFAULT_MAX_PAYLOAD, DEFAULT_MAX_PAYLOAD).is_ok());
    }

    #[tokio::test]
    async fn oversized_audit_record_is_rejected() {
        let broker = unreachable_broker(BrokerDelivery::JetStream).await;
        let body = "x".repeat(DEFAULT_MAX_PAYLOAD);

        let result = broker.publish(audit_record(&body)).await;

        assert!(matches!(result, Err(BrokerError::Rejected { .. })));
    }

    #[tokio::test]
    async fn jetstream_publish_without_server_fails() {
        let broker = unreachable_broker(BrokerDelivery::JetStream).await;

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            broker.publish(PublishRecord::new("FHIRSvr_Patient", "{}")),
        )
        .await
        .expect("publish returns without waiting for a reconnect");

        assert!(matches!(result, Err(BrokerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn flush_publish_without_server_fails() {
        let broker = unreachable_broker(BrokerDelivery::Flush).await;

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            broker.publish(PublishRecord::new("FHIRSvr_Patient", "{}")),
        )
        .await
        .expect("publish returns without waiting for a reconnect");

        assert!(matches!(result, Err(BrokerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn audit_publish_is_buffered_while_disconnected() {
        let broker = unreachable_broker(BrokerDelivery::JetStream).await;

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            broker.publish(audit_record("{\"resourceType\":\"Patient\"}")),
        )
        .await
        .expect("audit publish does not wait for the server");

        assert!(result.is_ok());
    }
}
