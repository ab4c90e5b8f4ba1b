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

use fhir_streamer::{
    DescriptorTable, DescriptorTableError, ResourceProfile, ResourceRouteDescriptor,
    RouterConfig, DEFAULT_AUDIT_DRAIN_TIMEOUT, DEFAULT_AUDIT_PUBLISH_TIMEOUT,
    DEFAULT_AUDIT_QUEUE_SIZE, DEFAULT_AUDIT_TOPIC, DEFAULT_PUBLISH_TIMEOUT,
    FHIR_INDUSTRY_STANDARD,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to parse config file: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid route configuration: {0}")]
    Routes(#[from] DescriptorTableError),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) streamer: StreamerConfig,
    pub(crate) broker: BrokerConfig,
    #[serde(default)]
    pub(crate) audit: AuditConfig,
    pub(crate) ingress: IngressConfig,
    #[serde(default)]
    pub(crate) routes: RoutesConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct StreamerConfig {
    pub(crate) name: String,
    #[serde(default = "default_audit_queue_size")]
    pub(crate) audit_queue_size: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub(crate) address: String,
    #[serde(default = "default_publish_timeout_ms")]
    pub(crate) publish_timeout_ms: u64,
    #[serde(default = "default_audit_publish_timeout_ms")]
    pub(crate) audit_publish_timeout_ms: u64,
    #[serde(default = "default_audit_drain_timeout_ms")]
    pub(crate) audit_drain_timeout_ms: u64,
    #[serde(default)]
    pub(crate) delivery: BrokerDelivery,
}

/// How a destination-topic publish is confirmed before it counts as delivered.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrokerDelivery {
    /// Wait for the JetStream ack. Destination topics must be bound to a stream.
    #[default]
    #[serde(rename = "jetstream")]
    JetStream,
    /// Core NATS publish followed by a connection flush.
    Flush,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    #[serde(default = "default_audit_topic")]
    pub(crate) topic: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            topic: default_audit_topic(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct IngressConfig {
    pub(crate) bind_address: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RoutesConfig {
    #[serde(default = "default_include_builtin")]
    pub(crate) include_builtin: bool,
    /// Destination topic overrides keyed by resource key.
    #[serde(default)]
    pub(crate) topic_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) additional: Vec<RouteConfig>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            include_builtin: default_include_builtin(),
            topic_overrides: BTreeMap::new(),
            additional: Vec::new(),
        }
    }
}

/// One extra resource route. Omitted fields are derived from `key`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub(crate) key: String,
    #[serde(default)]
    pub(crate) profile: ResourceProfile,
    pub(crate) destination_topic: String,
    pub(crate) endpoint: Option<String>,
    pub(crate) route_id: Option<String>,
    pub(crate) trigger_name: Option<String>,
    /// `null` leaves the industry-standard tag off the audit envelope.
    #[serde(default = "default_industry_standard")]
    pub(crate) industry_standard: Option<String>,
    pub(crate) audit_details: Option<String>,
}

fn default_audit_queue_size() -> usize {
    DEFAULT_AUDIT_QUEUE_SIZE
}

fn default_publish_timeout_ms() -> u64 {
    DEFAULT_PUBLISH_TIMEOUT.as_millis() as u64
}

fn default_audit_publish_timeout_ms() -> u64 {
    DEFAULT_AUDIT_PUBLISH_TIMEOUT.as_millis() as u64
}

fn default_audit_drain_timeout_ms() -> u64 {
    DEFAULT_AUDIT_DRAIN_TIMEOUT.as_millis() as u64
}

fn default_audit_topic() -> String {
    DEFAULT_AUDIT_TOPIC.to_string()
}

fn default_include_builtin() -> bool {
    true
}

fn default_industry_standard() -> Option<String> {
    Some(FHIR_INDUSTRY_STANDARD.to_string())
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5(&contents)
    }

    pub fn from_json5(contents: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(contents)?)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            audit_topic: self.audit.topic.clone(),
            audit_queue_size: self.streamer.audit_queue_size,
            publish_timeout: Duration::from_millis(self.broker.publish_timeout_ms),
            audit_publish_timeout: Duration::from_millis(self.broker.audit_publish_timeout_ms),
            audit_drain_timeout: Duration::from_millis(self.broker.audit_drain_timeout_ms),
            ..Default::default()
        }
    }

    /// Builds the validated descriptor table: built-in catalog (unless disabled), then
    /// additional routes, then topic overrides.
    pub fn descriptor_table(&self) -> Result<DescriptorTable, ConfigError> {
        let additional = self
            .routes
            .additional
            .iter()
            .map(RouteConfig::to_descriptor)
            .collect();

        let table = if self.routes.include_builtin {
            DescriptorTable::builtin_with(additional, &self.routes.topic_overrides)?
        } else {
            DescriptorTable::with_topic_overrides(additional, &self.routes.topic_overrides)?
        };
        Ok(table)
    }
}

impl RouteConfig {
    fn to_descriptor(&self) -> ResourceRouteDescriptor {
        let mut descriptor =
            ResourceRouteDescriptor::new(&self.key, self.profile, &self.destination_topic)
                .with_industry_standard(self.industry_standard.as_deref());
        if let Some(endpoint) = &self.endpoint {
            descriptor = descriptor.with_endpoint(endpoint);
        }
        if let Some(route_id) = &self.route_id {
            descriptor = descriptor.with_route_id(route_id);
        }
        if let Some(trigger_name) = &self.trigger_name {
            descriptor = descriptor.with_trigger_name(trigger_name);
        }
        if let Some(audit_details) = &self.audit_details {
            descriptor = descriptor.with_audit_details(audit_details);
        }
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::{BrokerDelivery, Config, ConfigError};
    use fhir_streamer::DescriptorTableError;
    use std::path::Path;
    use std::time::Duration;

    const MINIMAL: &str = r#"{
        streamer: { name: "test" },
        broker: { address: "localhost:4222" },
        ingress: { bind_address: "127.0.0.1:0" },
    }"#;

    #[test]
    fn sample_config_file_parses() {
        let config = Config::load(Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/fhir-streamer.json5"
        )))
        .expect("sample config should parse");

        assert_eq!(config.streamer.name, "idaas-connect-fhir");
        assert_eq!(config.audit.topic, "opsMgmt_PlatformTransactions");
        let table = config.descriptor_table().expect("sample routes should validate");
        assert!(table.lookup("patient").is_ok());
        assert!(table.lookup("medicationdispense").is_ok());
    }

    #[test]
    fn defaults_apply_when_sections_are_omitted() {
        let config = Config::from_json5(MINIMAL).expect("minimal config should parse");
        let router_config = config.router_config();

        assert_eq!(router_config.audit_topic, "opsMgmt_PlatformTransactions");
        assert_eq!(router_config.audit_queue_size, 1024);
        assert_eq!(router_config.publish_timeout, Duration::from_millis(5000));
        assert_eq!(router_config.audit_publish_timeout, Duration::from_millis(1000));
        assert_eq!(router_config.audit_drain_timeout, Duration::from_millis(5000));
        assert!(config.routes.include_builtin);
        assert_eq!(config.broker.delivery, BrokerDelivery::JetStream);
    }

    #[test]
    fn flush_delivery_can_be_selected() {
        let config = Config::from_json5(
            r#"{
                streamer: { name: "test" },
                broker: { address: "localhost:4222", delivery: "flush" },
                ingress: { bind_address: "127.0.0.1:0" },
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.broker.delivery, BrokerDelivery::Flush);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_json5(
            r#"{
                streamer: { name: "test", message_queue_size: 8 },
                broker: { address: "localhost:4222" },
                ingress: { bind_address: "127.0.0.1:0" },
            }"#,
        )
        .expect_err("unknown field should be rejected");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn topic_overrides_and_additional_routes_are_applied() {
        let config = Config::from_json5(
            r#"{
                streamer: { name: "test" },
                broker: { address: "localhost:4222" },
                ingress: { bind_address: "127.0.0.1:0" },
                routes: {
                    include_builtin: false,
                    topic_overrides: { vitals: "Vitals_Renamed" },
                    additional: [
                        { key: "Vitals", destination_topic: "Vitals_In", industry_standard: null },
                        { key: "Remit", profile: "financial", destination_topic: "Remit_In",
                          endpoint: "era835", audit_details: "ERA message received" },
                    ],
                },
            }"#,
        )
        .expect("config should parse");

        let table = config.descriptor_table().expect("routes should validate");
        assert_eq!(table.len(), 2);

        let vitals = table.lookup("vitals").expect("vitals is bound");
        assert_eq!(vitals.destination_topic(), "Vitals_Renamed");
        assert_eq!(vitals.industry_standard(), None);

        let remit = table.lookup("ERA835").expect("remit is bound by its endpoint");
        assert_eq!(remit.owner_application(), "iDAAS-ConnectFinancial-IndustryStd");
        assert_eq!(remit.audit_details(), "ERA message received");
        assert_eq!(remit.industry_standard(), Some("FHIR"));
    }

    #[test]
    fn colliding_additional_route_fails_startup() {
        let config = Config::from_json5(
            r#"{
                streamer: { name: "test" },
                broker: { address: "localhost:4222" },
                ingress: { bind_address: "127.0.0.1:0" },
                routes: { additional: [ { key: "Patient", destination_topic: "Other" } ] },
            }"#,
        )
        .expect("config should parse");

        assert!(matches!(
            config.descriptor_table(),
            Err(ConfigError::Routes(DescriptorTableError::DuplicateKey { .. }))
        ));
    }
}
