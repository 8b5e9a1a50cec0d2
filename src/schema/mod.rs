//! Declarative schema inputs
//!
//! Everything the engine is told, rather than discovers at runtime:
//!
//! - [`descriptor`] - operation descriptors, field mappings, pagination
//!   configuration, the resource-description bundle
//! - [`openapi`] - introspection over the parsed OpenAPI document

pub mod descriptor;
pub mod openapi;
