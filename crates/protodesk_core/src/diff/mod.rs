//! Change tracking between the baseline and the working document.
//!
//! # Responsibility
//! - Compare two versions of one unit structurally.
//! - Produce the full add/delete/update delta between two documents.
//!
//! # Invariants
//! - The delta is a pure function of (baseline, working); it is never
//!   patched incrementally.

pub mod engine;
pub mod equality;
