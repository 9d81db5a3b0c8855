//! # Schema & Metadata
//!
//! The metadata document (tables, fields, keys), the [`MetadataProvider`]
//! contract the modeler depends on, and a file-backed implementation that
//! loads tables from CSV.

pub mod load;
pub mod metadata;
pub mod types;

pub use metadata::{Metadata, MetadataProvider};
