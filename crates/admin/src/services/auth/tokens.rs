//! Password reset tokens.
//!
//! A token is `{uid}-{ts}-{mac}`: the base64url user id, the issue time in
//! Unix seconds, and a hex HMAC-SHA256 over the id, password hash, last login
//! and issue time. Changing the password or logging in invalidates every
//! token issued before, with no server-side storage.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use lte_admin_core::AdminUserId;

use crate::models::AdminUser;

type HmacSha256 = Hmac<Sha256>;

/// Why a reset token was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Not shaped like a token.
    #[error("malformed reset token")]
    Malformed,

    /// Signature does not match the user's current state.
    #[error("invalid reset token")]
    Invalid,

    /// Older than the configured timeout.
    #[error("reset token has expired")]
    Expired,
}

/// Issues and checks password reset tokens.
#[derive(Clone)]
pub struct PasswordResetTokens {
    secret: SecretString,
    timeout_secs: i64,
}

impl std::fmt::Debug for PasswordResetTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetTokens")
            .field("secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PasswordResetTokens {
    #[must_use]
    pub fn new(secret: SecretString, timeout_secs: u64) -> Self {
        Self {
            secret,
            timeout_secs: i64::try_from(timeout_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for `user` at `now`.
    #[must_use]
    pub fn make_token(&self, user: &AdminUser, now: DateTime<Utc>) -> String {
        let ts = now.timestamp();
        let uid = URL_SAFE_NO_PAD.encode(user.id.to_string());
        let mac = hex::encode(self.mac(user, ts).finalize().into_bytes());
        format!("{uid}-{ts}-{mac}")
    }

    /// User id a token claims to belong to. Says nothing about validity.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if the token cannot be split or decoded.
    pub fn user_id(token: &str) -> Result<AdminUserId, TokenError> {
        let (uid, _, _) = split(token)?;
        let raw = URL_SAFE_NO_PAD
            .decode(uid)
            .map_err(|_| TokenError::Malformed)?;
        std::str::from_utf8(&raw)
            .map_err(|_| TokenError::Malformed)?
            .parse()
            .map_err(|_| TokenError::Malformed)
    }

    /// Check `token` against the user's current state.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed`, `TokenError::Invalid` (wrong user,
    /// changed password, newer login, bad signature) or `TokenError::Expired`.
    pub fn check_token(
        &self,
        user: &AdminUser,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        if Self::user_id(token)? != user.id {
            return Err(TokenError::Invalid);
        }
        let (_, ts, mac) = split(token)?;
        let ts: i64 = ts.parse().map_err(|_| TokenError::Malformed)?;
        let mac = hex::decode(mac).map_err(|_| TokenError::Malformed)?;

        self.mac(user, ts)
            .verify_slice(&mac)
            .map_err(|_| TokenError::Invalid)?;

        if now.timestamp().saturating_sub(ts) > self.timeout_secs {
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    fn mac(&self, user: &AdminUser, ts: i64) -> HmacSha256 {
        let last_login = user
            .last_login
            .map(|at| at.timestamp_micros().to_string())
            .unwrap_or_default();

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC takes keys of any size"));
        let id = user.id.to_string();
        let ts = ts.to_string();
        for part in [&id, &user.password_hash, &last_login, &ts] {
            mac.update(part.as_bytes());
            mac.update(b"\x1f");
        }
        mac
    }
}

/// Split `uid-ts-mac`. The uid alphabet includes `-`, so split from the right.
fn split(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.rsplitn(3, '-');
    let mac = parts.next().filter(|s| !s.is_empty());
    let ts = parts.next().filter(|s| !s.is_empty());
    let uid = parts.next().filter(|s| !s.is_empty());
    match (uid, ts, mac) {
        (Some(uid), Some(ts), Some(mac)) => Ok((uid, ts, mac)),
        _ => Err(TokenError::Malformed),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::admin_user::test_user;

    fn tokens() -> PasswordResetTokens {
        PasswordResetTokens::new(
            SecretString::from("k3Y$9vQ!xT2#mL7&pR4*wZ8^bN1@cF6%"),
            3600,
        )
    }

    #[test]
    fn test_token_round_trip() {
        let user = test_user();
        let now = Utc::now();
        let token = tokens().make_token(&user, now);

        assert_eq!(PasswordResetTokens::user_id(&token).unwrap(), user.id);
        assert_eq!(tokens().check_token(&user, &token, now), Ok(()));
        assert_eq!(
            tokens().check_token(&user, &token, now + Duration::seconds(3600)),
            Ok(())
        );
    }

    #[test]
    fn test_token_expires() {
        let user = test_user();
        let now = Utc::now();
        let token = tokens().make_token(&user, now);

        assert_eq!(
            tokens().check_token(&user, &token, now + Duration::seconds(3601)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_password_change_invalidates_token() {
        let mut user = test_user();
        let now = Utc::now();
        let token = tokens().make_token(&user, now);

        user.password_hash = "$argon2id$v=19$m=19456,t=2,p=1$bmV3$bmV3".to_string();
        assert_eq!(
            tokens().check_token(&user, &token, now),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_login_invalidates_token() {
        let mut user = test_user();
        let now = Utc::now();
        let token = tokens().make_token(&user, now);

        user.last_login = Some(now);
        assert_eq!(
            tokens().check_token(&user, &token, now),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_token_for_other_user_rejected() {
        let user = test_user();
        let mut other = test_user();
        other.id = AdminUserId::new(8);
        let token = tokens().make_token(&user, Utc::now());

        assert_eq!(
            tokens().check_token(&other, &token, Utc::now()),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_different_secret_rejects() {
        let user = test_user();
        let now = Utc::now();
        let token = tokens().make_token(&user, now);
        let other = PasswordResetTokens::new(
            SecretString::from("Zq7!mW2@rT9#kX4$vB8%nP3^cL6&hJ1*"),
            3600,
        );

        assert_eq!(
            other.check_token(&user, &token, now),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let user = test_user();
        let now = Utc::now();
        for token in ["", "abc", "abc-123", "-123-ff", "Nw-notanumber-ff", "Nw-123-zz"] {
            assert_eq!(
                tokens().check_token(&user, token, now),
                Err(TokenError::Malformed),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let output = format!("{:?}", tokens());
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("k3Y$"));
    }
}
