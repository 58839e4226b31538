//! Domain model for chapters and the request shapes around them.
//!
//! # Responsibility
//! - Define canonical data structures used by store, engine and driver.
//! - Keep the wire naming (`order_index`) at the serde boundary only.
//!
//! # Invariants
//! - Every saved chapter is identified by a server-assigned `ChapterId`.
//! - Placeholders carry no id and are always `draft`.

pub mod chapter;
