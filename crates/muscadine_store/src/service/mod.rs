//! Use-case services over document stores.
//!
//! # Responsibility
//! - Keep callers decoupled from the concrete store backend.
//! - Turn absent documents into `NotFound` where existence is required.

pub mod record_service;
