//! HTTP route handlers.

pub mod auth;
pub mod clubs;
pub mod health;
pub mod invitations;
