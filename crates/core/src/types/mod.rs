//! Core value types for LTE Admin.

pub mod email;
pub mod id;

pub use email::{Email, EmailError};
pub use id::*;
