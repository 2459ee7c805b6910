//! Business logic services for the admin site.
//!
//! # Services
//!
//! - `auth` - Email/password authentication, password changes and reset tokens
//! - `email` - Password reset email delivery via SMTP

pub mod auth;
pub mod email;

pub use auth::{AdminAuthService, AuthError, PasswordResetTokens, TokenError};
pub use email::{EmailService, MailError};
