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

//! Correlation context builder and the audit envelope it produces.

use crate::descriptor::ResourceRouteDescriptor;
use crate::message::InboundMessage;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PROCESSING_TYPE_DATA: &str = "data";
pub const PROCESS_NAME_INPUT: &str = "Input";

const PROCESSED_DATE_FORMAT: &str = "%Y-%m-%d";
const PROCESSED_TIME_FORMAT: &str = "%H:%M:%S:%3f";

/// Audit header names, as downstream audit consumers read them.
pub mod headers {
    pub const PROCESSED_DATE: &str = "messageprocesseddate";
    pub const PROCESSED_TIME: &str = "messageprocessedtime";
    pub const PROCESSING_TYPE: &str = "processingtype";
    pub const INDUSTRY_STANDARD: &str = "industrystd";
    pub const COMPONENT: &str = "component";
    pub const MESSAGE_TRIGGER: &str = "messagetrigger";
    pub const PROCESS_NAME: &str = "processname";
    pub const AUDIT_DETAILS: &str = "auditdetails";
    pub const CONTEXT_ID: &str = "camelID";
    pub const EXCHANGE_ID: &str = "exchangeID";
    pub const INTERNAL_MESSAGE_ID: &str = "internalMsgID";
    pub const BODY_DATA: &str = "bodyData";
}

/// Source of the ingestion capture time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the host's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Correlation identifiers the runtime attaches to one in-flight message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeIds<'a> {
    pub context_id: Option<&'a str>,
    pub route_id: Option<&'a str>,
    pub exchange_id: Option<&'a str>,
    pub internal_message_id: Option<&'a str>,
}

impl<'a> RuntimeIds<'a> {
    /// Collects the identifiers for `message` arriving on `descriptor`'s endpoint.
    pub fn for_message(
        context_id: &'a str,
        descriptor: &'a ResourceRouteDescriptor,
        message: &'a InboundMessage,
    ) -> Self {
        Self {
            context_id: Some(context_id),
            route_id: Some(descriptor.route_id()),
            exchange_id: message.exchange_id(),
            internal_message_id: message.message_id(),
        }
    }
}

/// Correlation context failures. The message must be neither audited nor published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("incomplete correlation context: missing {missing}")]
    IncompleteContext { missing: &'static str },
}

///
/// [`CorrelationEnvelope`] is the audit record built for exactly one inbound message.
///
/// It is only constructed by [`CorrelationContextBuilder::build`], which populates every
/// field up front, so a partially built envelope cannot reach the audit sink. The body is
/// captured by value: mutating the in-flight message afterwards does not change the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationEnvelope {
    processed_date: String,
    processed_time: String,
    processing_type: String,
    industry_standard: Option<String>,
    application: String,
    message_trigger: String,
    component: String,
    process_name: String,
    audit_details: String,
    context_id: String,
    route_id: String,
    exchange_id: String,
    internal_message_id: String,
    body_snapshot: String,
}

impl CorrelationEnvelope {
    pub fn processed_date(&self) -> &str {
        &self.processed_date
    }

    pub fn processed_time(&self) -> &str {
        &self.processed_time
    }

    pub fn processing_type(&self) -> &str {
        &self.processing_type
    }

    pub fn industry_standard(&self) -> Option<&str> {
        self.industry_standard.as_deref()
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn message_trigger(&self) -> &str {
        &self.message_trigger
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn audit_details(&self) -> &str {
        &self.audit_details
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    pub fn internal_message_id(&self) -> &str {
        &self.internal_message_id
    }

    pub fn body_snapshot(&self) -> &str {
        &self.body_snapshot
    }

    /// Textual form sent as the audit record payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Envelope flattened into audit headers. An absent industry tag is omitted.
    pub fn to_headers(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let mut put = |name: &str, value: &str| {
            map.insert(name.to_string(), value.to_string());
        };

        put(headers::PROCESSED_DATE, &self.processed_date);
        put(headers::PROCESSED_TIME, &self.processed_time);
        put(headers::PROCESSING_TYPE, &self.processing_type);
        if let Some(industry_standard) = self.industry_standard.as_deref() {
            put(headers::INDUSTRY_STANDARD, industry_standard);
        }
        put(headers::COMPONENT, &self.component);
        put(headers::MESSAGE_TRIGGER, &self.message_trigger);
        put(headers::PROCESS_NAME, &self.process_name);
        put(headers::AUDIT_DETAILS, &self.audit_details);
        put(headers::CONTEXT_ID, &self.context_id);
        put(headers::EXCHANGE_ID, &self.exchange_id);
        put(headers::INTERNAL_MESSAGE_ID, &self.internal_message_id);
        put(headers::BODY_DATA, &self.body_snapshot);
        map
    }
}

fn require<'a>(value: Option<&'a str>, missing: &'static str) -> Result<&'a str, ContextError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ContextError::IncompleteContext { missing })
}

/// Builds [`CorrelationEnvelope`]s. Pure apart from reading the injected clock.
#[derive(Clone)]
pub struct CorrelationContextBuilder {
    clock: Arc<dyn Clock>,
}

impl Default for CorrelationContextBuilder {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl CorrelationContextBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn build(
        &self,
        message: &InboundMessage,
        descriptor: &ResourceRouteDescriptor,
        runtime_ids: RuntimeIds<'_>,
    ) -> Result<CorrelationEnvelope, ContextError> {
        let context_id = require(runtime_ids.context_id, "context id")?;
        let route_id = require(runtime_ids.route_id, "route id")?;
        let exchange_id = require(runtime_ids.exchange_id, "exchange id")?;
        let internal_message_id =
            require(runtime_ids.internal_message_id, "internal message id")?;

        let captured_at = self.clock.now();

        Ok(CorrelationEnvelope {
            processed_date: captured_at.format(PROCESSED_DATE_FORMAT).to_string(),
            processed_time: captured_at.format(PROCESSED_TIME_FORMAT).to_string(),
            processing_type: PROCESSING_TYPE_DATA.to_string(),
            industry_standard: descriptor.industry_standard().map(str::to_string),
            application: descriptor.owner_application().to_string(),
            message_trigger: descriptor.trigger_name().to_string(),
            component: route_id.to_string(),
            process_name: PROCESS_NAME_INPUT.to_string(),
            audit_details: descriptor.audit_details().to_string(),
            context_id: context_id.to_string(),
            route_id: route_id.to_string(),
            exchange_id: exchange_id.to_string(),
            internal_message_id: internal_message_id.to_string(),
            body_snapshot: message.body().to_string(),
        })
    }
}
