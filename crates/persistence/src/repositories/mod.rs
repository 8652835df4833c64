//! Repository implementations of the domain store traits.

pub mod club;
pub mod invitation;
pub mod magic_link;
pub mod session;
pub mod user;

pub use club::ClubRepository;
pub use invitation::InvitationRepository;
pub use magic_link::MagicLinkRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
