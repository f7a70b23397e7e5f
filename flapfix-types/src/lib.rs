//! Shared DTOs for the flapfix workspace.
//!
//! # Design constraints
//! - These types may be serialized to disk (`flapfix check --format json`).
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod patch;
pub mod probe;

pub use patch::{PatchOutcome, PatchStatus};
pub use probe::{Check, CheckStatus, Isolation, ProbeReport};
