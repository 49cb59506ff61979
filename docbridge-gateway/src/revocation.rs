//! Session Revocation: verifies a session cookie, then revokes every token of its owner.

use std::sync::Arc;

use docbridge::identity::{IdentityError, IdentityProvider};

use crate::{
    deadline::Deadline,
    error::{ApiError, ApiResult},
};

#[derive(Debug, Clone)]
pub struct SessionRevocation {
    identity: Arc<dyn IdentityProvider>,
    deadline: Deadline,
}

impl SessionRevocation {
    pub fn new(identity: Arc<dyn IdentityProvider>, deadline: Deadline) -> Self {
        Self { identity, deadline }
    }

    /// Revokes the session carried by `cookie` and returns the owner's uid.
    ///
    /// A missing or empty cookie fails with [`ApiError::NoActiveSession`] without
    /// contacting the provider; a cookie the provider rejects fails with
    /// [`ApiError::InvalidSession`] and nothing is revoked.
    pub async fn sign_out(&self, cookie: Option<&str>) -> ApiResult<String> {
        let cookie = match cookie.map(str::trim) {
            Some(cookie) if !cookie.is_empty() => cookie,
            _ => return Err(ApiError::NoActiveSession),
        };

        let claims = match self
            .deadline
            .within(self.identity.verify_session_cookie(cookie, true))
            .await?
        {
            Ok(claims) => claims,
            Err(err) if rejects_session(&err) => {
                tracing::info!(code = %err.code(), "session cookie rejected");
                return Err(ApiError::InvalidSession);
            },
            Err(err) => return Err(err.into()),
        };

        self.deadline
            .run(self.identity.revoke_refresh_tokens(&claims.uid))
            .await?;

        tracing::info!(uid = %claims.uid, "session revoked");

        Ok(claims.uid)
    }
}

fn rejects_session(err: &IdentityError) -> bool {
    matches!(
        err,
        IdentityError::InvalidSessionCookie
            | IdentityError::SessionCookieRevoked
            | IdentityError::InvalidIdToken
            | IdentityError::UserNotFound
            | IdentityError::UserDisabled
    )
}
