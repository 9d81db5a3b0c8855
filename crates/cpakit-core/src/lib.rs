pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod modeler;
pub mod output;
pub mod report;
pub mod schema;
pub mod table;
pub mod transform;

// Re-export key types for convenience
pub use error::{CpaError, Result};
pub use model::{ModelConfig, ModelFactory, ModelKind, TableModel};
pub use modeler::Modeler;
pub use schema::{Metadata, MetadataProvider};
pub use table::{Frame, RawTable, Tables};
