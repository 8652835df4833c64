//! Domain layer for the Clubhouse backend.
//!
//! This crate contains:
//! - Domain models and request/response DTOs
//! - Collaborator contracts (stores, mailer, clock) and an in-memory store
//! - Token lifecycle services: magic links, invitations, sessions and clubs

pub mod models;
pub mod repositories;
pub mod services;
