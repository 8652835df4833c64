//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod club;
pub mod invitation;
pub mod magic_link;
pub mod session;
pub mod user;

pub use club::{ClubEntity, ClubWithRoleEntity, UserClubEntity};
pub use invitation::InvitationEntity;
pub use magic_link::MagicLinkEntity;
pub use session::SessionEntity;
pub use user::UserEntity;

use domain::models::ClubRole;

/// Parses a stored role. The column is constrained, so an unknown value
/// only appears after a bad manual edit and falls back to the lowest role.
fn parse_role(value: &str) -> ClubRole {
    value.parse().unwrap_or_else(|_| {
        tracing::warn!(role = %value, "Unknown club role in database");
        ClubRole::Parent
    })
}
