//! Batch publication.
//!
//! # Responsibility
//! - Select draft chapters for a batch and publish them sequentially.
//!
//! # Invariants
//! - Per-chapter failures become report entries, never errors.

pub mod driver;
pub mod pipeline;
pub mod select;
