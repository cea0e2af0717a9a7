//! Search entry points over the working document.
//!
//! # Responsibility
//! - Build the searchable-name table and the type-reference graph.
//! - Keep completion ranking inside core.

pub mod name_index;
