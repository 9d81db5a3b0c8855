//! # Output
//!
//! Writers for extended tables.

pub mod csv;

pub use self::csv::write_frame_csv;
