//! Canonical attendance document model.
//!
//! # Responsibility
//! - Define the single document aggregate persisted locally and remotely.
//! - Keep one storage shape shared by mutation, statistics and sync code.
//!
//! # Invariants
//! - Class ids are unique across the document; person ids are unique within
//!   their owning class.
//! - A missing attendance entry means "not recorded", which is distinct from
//!   a record with `present = false`.

pub mod document;
pub mod normalize;
