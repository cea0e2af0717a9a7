//! Typed schema document model.
//!
//! # Responsibility
//! - Define the category/unit/field records edited by the engine.
//! - Keep baseline, working and delta copies as plain owned values.
//!
//! # Invariants
//! - Generic markup trees exist only at the persistence boundary.
//! - Every copy is a deep value; no node is shared across copies.

pub mod delta;
pub mod document;
pub mod unit;
