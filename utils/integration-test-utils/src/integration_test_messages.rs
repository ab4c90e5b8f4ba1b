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

use fhir_streamer::{ResourceProfile, ResourceRouteDescriptor};

pub fn clinical_descriptor(key: &str) -> ResourceRouteDescriptor {
    ResourceRouteDescriptor::new(key, ResourceProfile::Clinical, &format!("FHIRSvr_{key}"))
}

pub fn financial_descriptor(key: &str) -> ResourceRouteDescriptor {
    ResourceRouteDescriptor::new(key, ResourceProfile::Financial, &format!("FHIRSvr_{key}"))
}

/// Minimal JSON resource body; opaque to the router.
pub fn resource_body(resource_type: &str, id: usize) -> String {
    format!(r#"{{"resourceType":"{resource_type}","id":"{id}"}}"#)
}
