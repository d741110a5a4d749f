//! Configuration resolution engine.
//!
//! # Responsibility
//! - Discover configuration units among registered definitions.
//! - Expand them (scans, imports, factory methods, registrars) to a fixed point.
//! - Enhance full units and expose the import side-table to components.
//!
//! # See also
//! - `processor` for the extension that drives both phases.

pub mod catalog;
pub mod condition;
pub mod enhance;
pub mod imports;
pub mod loader;
pub mod naming;
pub mod parser;
pub mod problems;
pub mod processor;
pub mod reader;
