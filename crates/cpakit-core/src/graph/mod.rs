//! # Table Dependency Graph
//!
//! Parent/child relations induced by foreign keys, validated to form a
//! forest, plus Mermaid/DOT rendering for the `graph` command.

pub mod dag;
pub mod visualize;
