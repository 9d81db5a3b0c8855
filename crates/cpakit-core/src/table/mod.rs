//! # Tabular Data
//!
//! Raw tables as loaded ([`RawTable`] of [`Value`]s) and the transformed,
//! extendable frames the modeler works on ([`Frame`]).

pub mod frame;
pub mod raw;
pub mod value;

use indexmap::IndexMap;

pub use frame::{Column, Frame, Index};
pub use raw::RawTable;
pub use value::{Key, Value};

/// Already-loaded raw tables keyed by table name.
pub type Tables = IndexMap<String, RawTable>;
