//! Persistence layer for the Clubhouse backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store traits
//! - SQL migrations, embedded by the binary

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
