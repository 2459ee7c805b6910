//! Unified error handling for the admin site.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use lte_admin_core::{MenuError, ReverseError};

use crate::db::RepositoryError;

/// Application-level error type for the admin site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MenuError> for AppError {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::AccessDenied(_) => Self::Forbidden(err.to_string()),
            MenuError::PageNotFound(_) | MenuError::GroupNotRegistered(_) => {
                Self::NotFound(err.to_string())
            }
        }
    }
}

impl From<ReverseError> for AppError {
    fn from(err: ReverseError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Template(_) | Self::Session(_) | Self::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Template(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        };

        // Don't expose internal error details to clients
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use lte_admin_core::EntityKey;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("blog".to_string());
        assert_eq!(err.to_string(), "Not found: blog");

        let err = AppError::Forbidden("cannot view accounts.adminuser".to_string());
        assert_eq!(err.to_string(), "Forbidden: cannot view accounts.adminuser");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_menu_errors_map_to_404_and_403() {
        assert_eq!(
            get_status(MenuError::GroupNotRegistered("nope".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(MenuError::PageNotFound("blog".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(MenuError::AccessDenied(EntityKey::new("blog", "post")).into()),
            StatusCode::FORBIDDEN
        );
    }
}
