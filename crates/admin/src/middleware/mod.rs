//! HTTP middleware stack for the admin site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. No-cache headers
//! 5. [`RequireStaff`] extractor on private handlers

pub mod auth;
pub mod cache;
pub mod session;

pub use auth::{AuthRejection, RequireStaff, login_url};
pub use cache::{NO_CACHE, no_cache_layer};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, postgres_store};
