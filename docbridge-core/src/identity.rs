//! Identity provider abstraction.
//!
//! The gateway never verifies passwords or signs tokens itself. It talks to an
//! [`IdentityProvider`], which covers two audiences:
//!
//! - the *client* interface: password sign-in and sign-up, which hand back a short-lived
//!   identity token, and password-reset mail;
//! - the *administrative* interface: exchanging an identity token for a long-lived
//!   session cookie, verifying and revoking sessions, updating and deleting accounts.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by an identity provider.
///
/// [`IdentityError::code`] returns the provider-style error code surfaced to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The email address is malformed.
    #[error("invalid email address")]
    InvalidEmail,
    /// No account exists for the email or uid.
    #[error("user not found")]
    UserNotFound,
    /// The password does not match the account.
    #[error("wrong password")]
    WrongPassword,
    /// The password does not satisfy the provider's policy.
    #[error("weak password: {0}")]
    WeakPassword(String),
    /// An account with this email already exists.
    #[error("email already in use")]
    EmailAlreadyInUse,
    /// The account has been disabled.
    #[error("user disabled")]
    UserDisabled,
    /// The identity token is malformed, unknown or expired.
    #[error("invalid id token")]
    InvalidIdToken,
    /// The session cookie is malformed, unknown or expired.
    #[error("invalid session cookie")]
    InvalidSessionCookie,
    /// The session cookie was revoked.
    #[error("session cookie revoked")]
    SessionCookieRevoked,
    /// An update carried an invalid property.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The provider could not be reached.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    /// Any other provider-side failure.
    #[error("identity provider error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::InvalidEmail => "auth/invalid-email",
            IdentityError::UserNotFound => "auth/user-not-found",
            IdentityError::WrongPassword => "auth/wrong-password",
            IdentityError::WeakPassword(_) => "auth/weak-password",
            IdentityError::EmailAlreadyInUse => "auth/email-already-in-use",
            IdentityError::UserDisabled => "auth/user-disabled",
            IdentityError::InvalidIdToken => "auth/invalid-id-token",
            IdentityError::InvalidSessionCookie => "auth/invalid-session-cookie",
            IdentityError::SessionCookieRevoked => "auth/session-cookie-revoked",
            IdentityError::InvalidArgument(_) => "auth/invalid-argument",
            IdentityError::Unavailable(_) => "auth/network-request-failed",
            IdentityError::Internal(_) => "auth/internal-error",
        }
    }
}

/// A specialized `Result` type for identity provider operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// An account as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Provider-assigned user id.
    pub uid: String,
    /// Primary email address.
    pub email: Option<String>,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// Display name.
    pub display_name: Option<String>,
    /// Profile photo URL.
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Phone number in E.164 form.
    pub phone_number: Option<String>,
    /// Whether the account is disabled.
    pub disabled: bool,
}

impl UserRecord {
    /// Creates a record for a freshly registered email account.
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            email_verified: false,
            display_name: None,
            photo_url: None,
            phone_number: None,
            disabled: false,
        }
    }
}

/// The result of a successful password sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    /// The account that signed in.
    pub user: UserRecord,
    /// A short-lived identity token, only good for minting a session cookie.
    pub id_token: String,
}

/// Claims carried by a verified session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// The user the session belongs to.
    pub uid: String,
    /// When the session cookie was minted.
    pub issued_at: DateTime<Utc>,
    /// When the session cookie stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// Properties to change on an account. `None` leaves a property untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    /// New email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New profile photo URL.
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// New phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// New email-verified flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// New disabled flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl UserUpdate {
    /// Returns `true` when the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &UserUpdate::default()
    }
}

/// Returns `true` when `email` has the shape `local@domain.tld`.
///
/// This is a syntax check only; whether the mailbox exists is the provider's business.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !local.chars().any(char::is_whitespace)
                && !domain.contains('@')
                && !domain.chars().any(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        },
        None => false,
    }
}

/// Abstract interface for identity providers.
#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    /// Verifies an email/password pair and returns a short-lived identity token.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> IdentityResult<SignedInUser>;

    /// Registers a new email/password account and signs it in.
    async fn create_user_with_password(&self, email: &str, password: &str) -> IdentityResult<SignedInUser>;

    /// Exchanges an identity token for a session cookie valid for `expires_in`.
    async fn create_session_cookie(&self, id_token: &str, expires_in: Duration) -> IdentityResult<String>;

    /// Verifies a session cookie.
    ///
    /// With `check_revoked`, a cookie minted before the user's tokens were last revoked
    /// is rejected. Providers that remember revoked cookies answer
    /// [`IdentityError::SessionCookieRevoked`], others [`IdentityError::InvalidSessionCookie`].
    async fn verify_session_cookie(&self, session_cookie: &str, check_revoked: bool) -> IdentityResult<SessionClaims>;

    /// Revokes every refresh token and session of `uid`.
    async fn revoke_refresh_tokens(&self, uid: &str) -> IdentityResult<()>;

    /// Sends a password-reset mail to `email`.
    async fn send_password_reset_email(&self, email: &str) -> IdentityResult<()>;

    /// Applies `update` to the account `uid` and returns the updated record.
    async fn update_user(&self, uid: &str, update: UserUpdate) -> IdentityResult<UserRecord>;

    /// Deletes the account `uid`.
    async fn delete_user(&self, uid: &str) -> IdentityResult<()>;
}
