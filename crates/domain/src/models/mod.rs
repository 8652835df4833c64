//! Domain models for Clubhouse.

pub mod club;
pub mod invitation;
pub mod magic_link;
pub mod role;
pub mod session;
pub mod token;
pub mod user;

pub use club::{Club, ClubWithRole, CreateClubRequest, Membership, MembershipStatus};
pub use invitation::{
    AcceptInvitationRequest, CreateInvitationRequest, CreateInvitationResponse,
    InvalidInvitationReason, Invitation, InvitationResponse, InvitationValidation, NewInvitation,
    ValidateInvitationResponse,
};
pub use magic_link::{
    MagicLink, MagicLinkIssued, NewMagicLink, SignInRequest, SignInResponse, VerifyFailure,
    VerifyQuery,
};
pub use role::ClubRole;
pub use session::{NewSession, Session};
pub use token::TokenState;
pub use user::{User, UserIdentity};
