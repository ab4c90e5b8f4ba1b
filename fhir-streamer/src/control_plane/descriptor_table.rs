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

//! Immutable resource route descriptor table and its load-time validation.

use crate::control_plane::catalog::builtin_descriptors;
use crate::descriptor::ResourceRouteDescriptor;
use crate::observability::events;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "descriptor_table";

/// Load-time descriptor table failures. Every variant is a fatal startup error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorTableError {
    #[error("descriptor table is empty")]
    NoDescriptors,
    #[error("descriptor key must not be empty")]
    EmptyKey,
    #[error("descriptor `{key}` has an empty endpoint")]
    EmptyEndpoint { key: String },
    #[error("descriptor `{key}` has an empty route id")]
    EmptyRouteId { key: String },
    #[error("descriptor `{key}` has an empty destination topic")]
    EmptyDestinationTopic { key: String },
    #[error("duplicate descriptor key `{key}`")]
    DuplicateKey { key: String },
    #[error("duplicate endpoint `{endpoint}`")]
    DuplicateEndpoint { endpoint: String },
    #[error("duplicate route id `{route_id}`")]
    DuplicateRouteId { route_id: String },
    #[error("topic override for unknown descriptor key `{key}`")]
    UnknownOverrideKey { key: String },
}

/// No descriptor is bound to the requested endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no route descriptor bound to endpoint `{endpoint}`")]
pub struct UnknownRouteKind {
    pub endpoint: String,
}

/// Normalizes an endpoint key the way endpoints are bound: no surrounding slashes, lower case.
pub(crate) fn normalize_endpoint_key(endpoint_key: &str) -> String {
    endpoint_key.trim().trim_matches('/').to_ascii_lowercase()
}

///
/// [`DescriptorTable`] is the process-wide, read-only map from endpoint key to
/// [`ResourceRouteDescriptor`].
///
/// The table is validated once when it is built and never mutated afterwards, so it can be
/// shared behind an [`Arc`] by any number of in-flight ingestions without locking.
///
/// # Examples
///
/// ```
/// use fhir_streamer::DescriptorTable;
///
/// let table = DescriptorTable::builtin().unwrap();
/// let patient = table.lookup("patient").unwrap();
/// assert_eq!(patient.destination_topic(), "FHIRSvr_Patient");
///
/// assert!(table.lookup("not-a-resource").is_err());
/// ```
#[derive(Debug)]
pub struct DescriptorTable {
    descriptors: Vec<Arc<ResourceRouteDescriptor>>,
    by_endpoint: HashMap<String, usize>,
}

impl DescriptorTable {
    /// Validates and indexes `descriptors`.
    pub fn new(descriptors: Vec<ResourceRouteDescriptor>) -> Result<Self, DescriptorTableError> {
        match Self::validate(descriptors) {
            Ok(table) => {
                info!(
                    event = events::DESCRIPTOR_TABLE_LOADED,
                    component = COMPONENT,
                    descriptors = table.len(),
                    "descriptor table loaded"
                );
                Ok(table)
            }
            Err(err) => {
                warn!(
                    event = events::DESCRIPTOR_TABLE_REJECTED,
                    component = COMPONENT,
                    err = %err,
                    "descriptor table rejected"
                );
                Err(err)
            }
        }
    }

    /// The built-in clinical and financial catalog.
    pub fn builtin() -> Result<Self, DescriptorTableError> {
        Self::new(builtin_descriptors())
    }

    /// Built-in catalog followed by `additional`, with per-key topic overrides applied before
    /// validation.
    pub fn builtin_with(
        additional: Vec<ResourceRouteDescriptor>,
        topic_overrides: &BTreeMap<String, String>,
    ) -> Result<Self, DescriptorTableError> {
        let mut descriptors = builtin_descriptors();
        descriptors.extend(additional);
        Self::with_topic_overrides(descriptors, topic_overrides)
    }

    /// Applies `topic_overrides` (keyed by descriptor key, case-insensitive) then validates.
    pub fn with_topic_overrides(
        descriptors: Vec<ResourceRouteDescriptor>,
        topic_overrides: &BTreeMap<String, String>,
    ) -> Result<Self, DescriptorTableError> {
        let mut pending: HashMap<String, &str> = topic_overrides
            .iter()
            .map(|(key, topic)| (key.to_ascii_lowercase(), topic.as_str()))
            .collect();

        let descriptors = descriptors
            .into_iter()
            .map(|descriptor| {
                match pending.remove(&descriptor.key().to_ascii_lowercase()) {
                    Some(topic) => descriptor.with_destination_topic(topic),
                    None => descriptor,
                }
            })
            .collect();

        if let Some(key) = topic_overrides
            .keys()
            .find(|key| pending.contains_key(&key.to_ascii_lowercase()))
        {
            return Err(DescriptorTableError::UnknownOverrideKey { key: key.clone() });
        }

        Self::new(descriptors)
    }

    fn validate(descriptors: Vec<ResourceRouteDescriptor>) -> Result<Self, DescriptorTableError> {
        if descriptors.is_empty() {
            return Err(DescriptorTableError::NoDescriptors);
        }

        let mut keys = HashSet::new();
        let mut route_ids = HashSet::new();
        let mut by_endpoint = HashMap::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            let key = descriptor.key();
            if key.trim().is_empty() {
                return Err(DescriptorTableError::EmptyKey);
            }
            if descriptor.endpoint().trim().is_empty() {
                return Err(DescriptorTableError::EmptyEndpoint { key: key.to_string() });
            }
            if descriptor.route_id().trim().is_empty() {
                return Err(DescriptorTableError::EmptyRouteId { key: key.to_string() });
            }
            if descriptor.destination_topic().trim().is_empty() {
                return Err(DescriptorTableError::EmptyDestinationTopic {
                    key: key.to_string(),
                });
            }
            if !keys.insert(key.to_ascii_lowercase()) {
                return Err(DescriptorTableError::DuplicateKey { key: key.to_string() });
            }
            if !route_ids.insert(descriptor.route_id()) {
                return Err(DescriptorTableError::DuplicateRouteId {
                    route_id: descriptor.route_id().to_string(),
                });
            }
            let endpoint = normalize_endpoint_key(descriptor.endpoint());
            if by_endpoint.insert(endpoint.clone(), index).is_some() {
                return Err(DescriptorTableError::DuplicateEndpoint { endpoint });
            }
        }

        Ok(Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
            by_endpoint,
        })
    }

    /// Resolves the descriptor bound to `endpoint_key`.
    pub fn lookup(
        &self,
        endpoint_key: &str,
    ) -> Result<&Arc<ResourceRouteDescriptor>, UnknownRouteKind> {
        let endpoint = normalize_endpoint_key(endpoint_key);
        self.by_endpoint
            .get(&endpoint)
            .map(|index| &self.descriptors[*index])
            .ok_or(UnknownRouteKind { endpoint })
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<ResourceRouteDescriptor>> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
