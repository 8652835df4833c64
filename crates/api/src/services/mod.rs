//! Email transport and cookie handling.

pub mod cookies;
pub mod email;

pub use cookies::SessionCookie;
pub use email::EmailService;
