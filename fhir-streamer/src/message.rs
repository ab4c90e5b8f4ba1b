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

use uuid::Uuid;

///
/// [`InboundMessage`] is one raw message handed to the router by an ingress adapter.
///
/// The body is treated as opaque text. Adapters that receive bytes convert them with
/// [`InboundMessage::from_bytes`] before routing, so every downstream publish carries the
/// textual wire form of what arrived.
///
/// The exchange and message identifiers mirror what a transport runtime would attach to an
/// in-flight exchange. [`InboundMessage::new`] stamps fresh identifiers; adapters that already
/// carry transport identifiers use [`InboundMessage::with_ids`].
///
/// # Examples
///
/// ```
/// use fhir_streamer::InboundMessage;
///
/// let message = InboundMessage::new(r#"{"resourceType":"Patient","id":"42"}"#);
/// assert!(message.exchange_id().is_some());
///
/// let raw = InboundMessage::from_bytes(b"{}".to_vec());
/// assert_eq!(raw.body(), "{}");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    body: String,
    exchange_id: Option<String>,
    message_id: Option<String>,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            exchange_id: Some(format!("ID-{}", Uuid::new_v4())),
            message_id: Some(Uuid::new_v4().to_string()),
        }
    }

    pub fn from_bytes(body: impl AsRef<[u8]>) -> Self {
        Self::new(String::from_utf8_lossy(body.as_ref()).into_owned())
    }

    pub fn with_ids(
        body: impl Into<String>,
        exchange_id: Option<&str>,
        message_id: Option<&str>,
    ) -> Self {
        Self {
            body: body.into(),
            exchange_id: exchange_id.map(str::to_string),
            message_id: message_id.map(str::to_string),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut String {
        &mut self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn exchange_id(&self) -> Option<&str> {
        self.exchange_id.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::InboundMessage;

    #[test]
    fn new_stamps_distinct_identifiers() {
        let first = InboundMessage::new("a");
        let second = InboundMessage::new("a");

        assert!(first.exchange_id().unwrap().starts_with("ID-"));
        assert_ne!(first.exchange_id(), second.exchange_id());
        assert_ne!(first.message_id(), second.message_id());
    }

    #[test]
    fn from_bytes_replaces_invalid_utf8() {
        let message = InboundMessage::from_bytes([0x7b, 0xff, 0x7d]);

        assert_eq!(message.body(), "{\u{fffd}}");
    }

    #[test]
    fn with_ids_keeps_adapter_identifiers() {
        let message = InboundMessage::with_ids("", Some("ex-9"), Some("msg-9"));

        assert_eq!(message.body(), "");
        assert_eq!(message.exchange_id(), Some("ex-9"));
        assert_eq!(message.message_id(), Some("msg-9"));
    }
}
