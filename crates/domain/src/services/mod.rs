//! Domain services for Clubhouse.
//!
//! Services contain the token lifecycles and the membership rules that
//! operate on domain models through the collaborator traits.

pub mod club;
pub mod error;
pub mod invitation;
pub mod magic_link;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use club::ClubService;
pub use error::AuthError;
pub use invitation::{InvitationDraft, InvitationService, InvitationSettings, IssuedInvitation};
pub use magic_link::{MagicLinkService, MagicLinkSettings};
pub use session::{IssuedSession, SessionService};
