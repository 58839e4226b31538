//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls and lifecycle decisions into editor actions.
//! - Keep the UI shell decoupled from HTTP and cache details.

pub mod chapter_workflow;
pub mod ports;
pub mod unlock;
