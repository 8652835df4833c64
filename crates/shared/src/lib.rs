//! Shared utilities for the Clubhouse backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Token generation and hashing
//! - Email normalization and request validation helpers

pub mod crypto;
pub mod validation;
