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

use serde::{Deserialize, Serialize};

pub const FHIR_INDUSTRY_STANDARD: &str = "FHIR";
pub const CLINICAL_APPLICATION: &str = "iDAAS-ConnectClinical-IndustryStd";
pub const FINANCIAL_APPLICATION: &str = "iDAAS-ConnectFinancial-IndustryStd";
const ROUTE_ID_PREFIX: &str = "FHIR";

/// Application profile a resource type belongs to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceProfile {
    #[default]
    Clinical,
    Financial,
}

impl ResourceProfile {
    pub fn owner_application(&self) -> &'static str {
        match self {
            ResourceProfile::Clinical => CLINICAL_APPLICATION,
            ResourceProfile::Financial => FINANCIAL_APPLICATION,
        }
    }
}

///
/// [`ResourceRouteDescriptor`] describes how one resource type is ingested, audited and
/// published.
///
/// Only `key`, `profile` and `destination_topic` are required. Everything else is derived
/// from the key unless overridden:
///
/// | field | default |
/// |---|---|
/// | `endpoint` | lower-cased `key` |
/// | `route_id` | `"FHIR" + key` |
/// | `trigger_name` | `key` |
/// | `audit_details` | `"<key> message received"` |
/// | `industry_standard` | `Some("FHIR")` |
/// | `owner_application` | the profile's application name |
///
/// # Examples
///
/// ```
/// use fhir_streamer::{ResourceProfile, ResourceRouteDescriptor};
///
/// let patient = ResourceRouteDescriptor::new("Patient", ResourceProfile::Clinical, "FHIRSvr_Patient");
///
/// assert_eq!(patient.endpoint(), "patient");
/// assert_eq!(patient.route_id(), "FHIRPatient");
/// assert_eq!(patient.audit_details(), "Patient message received");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRouteDescriptor {
    key: String,
    endpoint: String,
    route_id: String,
    trigger_name: String,
    industry_standard: Option<String>,
    owner_application: String,
    destination_topic: String,
    audit_details: String,
    profile: ResourceProfile,
}

impl ResourceRouteDescriptor {
    pub fn new(key: &str, profile: ResourceProfile, destination_topic: &str) -> Self {
        Self {
            key: key.to_string(),
            endpoint: key.to_ascii_lowercase(),
            route_id: format!("{ROUTE_ID_PREFIX}{key}"),
            trigger_name: key.to_string(),
            industry_standard: Some(FHIR_INDUSTRY_STANDARD.to_string()),
            owner_application: profile.owner_application().to_string(),
            destination_topic: destination_topic.to_string(),
            audit_details: format!("{key} message received"),
            profile,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_ascii_lowercase();
        self
    }

    pub fn with_route_id(mut self, route_id: &str) -> Self {
        self.route_id = route_id.to_string();
        self
    }

    pub fn with_trigger_name(mut self, trigger_name: &str) -> Self {
        self.trigger_name = trigger_name.to_string();
        self
    }

    pub fn with_industry_standard(mut self, industry_standard: Option<&str>) -> Self {
        self.industry_standard = industry_standard.map(str::to_string);
        self
    }

    pub fn with_owner_application(mut self, owner_application: &str) -> Self {
        self.owner_application = owner_application.to_string();
        self
    }

    pub fn with_audit_details(mut self, audit_details: &str) -> Self {
        self.audit_details = audit_details.to_string();
        self
    }

    pub(crate) fn with_destination_topic(mut self, destination_topic: &str) -> Self {
        self.destination_topic = destination_topic.to_string();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn trigger_name(&self) -> &str {
        &self.trigger_name
    }

    pub fn industry_standard(&self) -> Option<&str> {
        self.industry_standard.as_deref()
    }

    pub fn owner_application(&self) -> &str {
        &self.owner_application
    }

    pub fn destination_topic(&self) -> &str {
        &self.destination_topic
    }

    pub fn audit_details(&self) -> &str {
        &self.audit_details
    }

    pub fn profile(&self) -> ResourceProfile {
        self.profile
    }
}
