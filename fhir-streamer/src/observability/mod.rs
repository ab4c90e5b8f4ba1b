//! Structured logging vocabulary shared by every layer of `fhir-streamer`.

pub mod events;
pub mod fields;
