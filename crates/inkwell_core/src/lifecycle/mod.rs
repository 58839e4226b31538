//! Chapter lifecycle: legal transitions and default selection.
//!
//! # Responsibility
//! - Hold the pure decision logic between UI events and store calls.
//!
//! # Invariants
//! - Nothing here performs I/O or keeps state between calls.

pub mod engine;
pub mod selection;
