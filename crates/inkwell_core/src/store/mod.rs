//! Chapter store: the client's authoritative in-memory chapter view.
//!
//! # Responsibility
//! - Keep server round-trips and cache updates in one place.
//! - Translate API failures into per-operation store errors.

pub mod chapter_store;
