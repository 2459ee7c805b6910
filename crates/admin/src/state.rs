//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{EmailService, PasswordResetTokens};
use crate::site::AdminSite;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    site: AdminSite,
    tokens: PasswordResetTokens,
    email: Option<EmailService>,
}

impl AppState {
    /// Assemble state. The email service is built from `config.email` when present.
    ///
    /// # Errors
    ///
    /// Returns the SMTP error if the configured relay cannot be set up.
    pub fn new(
        config: AdminConfig,
        pool: PgPool,
        site: AdminSite,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let tokens = PasswordResetTokens::new(
            config.secret_key.clone(),
            config.password_reset_timeout_secs,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                site,
                tokens,
                email,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn site(&self) -> &AdminSite {
        &self.inner.site
    }

    #[must_use]
    pub fn tokens(&self) -> &PasswordResetTokens {
        &self.inner.tokens
    }

    /// `None` when SMTP is not configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
