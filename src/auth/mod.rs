//! Authentication and session lifecycle.
//!
//! [`credentials`] checks email/password pairs, [`tokens`] mints and rotates
//! the two token types, [`service`] composes both into the login/register/
//! refresh operations, and [`principal`] resolves bearer tokens into a caller
//! identity for protected routes.

pub mod credentials;
pub mod principal;
pub mod service;
pub mod tokens;

pub use principal::{require_auth, Principal};
pub use service::{AuthResponse, SessionService, UserProfile};
pub use tokens::TokenConfig;
