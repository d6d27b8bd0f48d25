//! Record and document model shared by every store backend.
//!
//! # Responsibility
//! - Define the `Record` capability every stored type implements.
//! - Provide an untyped `Document` for callers without a schema.
//!
//! # Invariants
//! - Every persisted document carries exactly one string `_id`.

pub mod document;
pub mod record;
