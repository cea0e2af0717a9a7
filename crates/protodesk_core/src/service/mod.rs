//! Session and mutation services.
//!
//! # Responsibility
//! - Validate caller-supplied unit definitions at the mutation boundary.
//! - Orchestrate repository, diff and index calls into session operations.
//! - Keep CLI/UI layers decoupled from document storage details.

pub mod session;
pub mod unit_input;
