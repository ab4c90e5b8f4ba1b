//! Control-plane layer.
//!
//! Owns the resource route descriptor table: the built-in catalog, load-time validation, and
//! the static endpoint-to-descriptor binding every ingestion resolves against.
//!
//! ```
//! use fhir_streamer::{DescriptorTable, DescriptorTableError, ResourceProfile, ResourceRouteDescriptor};
//!
//! // Two endpoints registered under one route id are a startup error, not a silent ambiguity.
//! let result = DescriptorTable::new(vec![
//!     ResourceRouteDescriptor::new("CodeSystem", ResourceProfile::Clinical, "FHIRSvr_CodeSystem"),
//!     ResourceRouteDescriptor::new("ClinicalImpression", ResourceProfile::Clinical, "FHIRSvr_ClinicalImpression")
//!         .with_route_id("FHIRCodeSystem"),
//! ]);
//! assert!(matches!(result, Err(DescriptorTableError::DuplicateRouteId { .. })));
//! ```

pub(crate) mod catalog;
pub(crate) mod descriptor_table;
