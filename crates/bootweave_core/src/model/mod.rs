//! Definition and metadata model.
//!
//! # Responsibility
//! - Define the data the registry stores and the resolution engine reads.
//! - Keep capability flags explicit so no runtime type inspection is needed.
//!
//! # Invariants
//! - Definitions are mutated in place; the pipeline never deletes them.

pub mod definition;
pub mod metadata;
