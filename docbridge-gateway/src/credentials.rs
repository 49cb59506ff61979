//! Credential Exchange: password sign-in and sign-up, traded for long-lived sessions.
//!
//! A successful password check yields a short-lived identity token, which is exchanged
//! for a [`SESSION_TTL`] session cookie through the provider's administrative interface.
//! Sign-up additionally provisions the `users/<uid>` profile document. When either the
//! exchange or the provisioning fails after the identity was created, the identity is
//! deleted again and the original error is reported.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use docbridge::{
    document::Document,
    identity::{IdentityProvider, SignedInUser, UserUpdate, is_valid_email},
    store::DocumentStore,
};

use crate::{
    deadline::Deadline,
    error::{ApiError, ApiResult},
};

/// Lifetime of an issued session cookie.
pub const SESSION_TTL: Duration = Duration::from_secs(5 * 24 * 60 * 60);
/// Shortest password accepted at the boundary.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Email and password as submitted by a client.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        validate_email("email", &self.email)?;
        validate_password("password", &self.password)
    }
}

fn validate_email(key: &str, email: &str) -> ApiResult<()> {
    if email.trim().is_empty() {
        return Err(ApiError::validation(format!("\"{key}\" is not allowed to be empty")));
    }
    if !is_valid_email(email) {
        return Err(ApiError::validation(format!("\"{key}\" must be a valid email")));
    }

    Ok(())
}

fn validate_password(key: &str, password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "\"{key}\" length must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    Ok(())
}

/// A freshly issued session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub cookie: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("uid", &self.uid)
            .field("cookie", &"<redacted>")
            .finish()
    }
}

/// The profile document provisioned once per identity, at `users/<uid>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub role: String,
    pub status: String,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            role: "user".to_string(),
            status: "active".to_string(),
        }
    }
}

impl Document for UserProfile {
    fn id(&self) -> &str {
        &self.uid
    }

    fn collection_name() -> &'static str {
        "users"
    }
}

#[derive(Debug, Clone)]
pub struct CredentialExchange {
    identity: Arc<dyn IdentityProvider>,
    store: DocumentStore,
    deadline: Deadline,
}

impl CredentialExchange {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: DocumentStore, deadline: Deadline) -> Self {
        Self {
            identity,
            store,
            deadline,
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> ApiResult<Session> {
        credentials.validate()?;

        let signed_in = self
            .deadline
            .run(
                self.identity
                    .sign_in_with_password(&credentials.email, &credentials.password),
            )
            .await?;
        let cookie = self.exchange(&signed_in).await?;

        tracing::info!(uid = %signed_in.user.uid, "signed in");

        Ok(Session {
            uid: signed_in.user.uid,
            cookie,
        })
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> ApiResult<Session> {
        credentials.validate()?;

        let signed_in = self
            .deadline
            .run(
                self.identity
                    .create_user_with_password(&credentials.email, &credentials.password),
            )
            .await?;

        match self.provision(&signed_in, &credentials.email).await {
            Ok(cookie) => {
                tracing::info!(uid = %signed_in.user.uid, "signed up");

                Ok(Session {
                    uid: signed_in.user.uid,
                    cookie,
                })
            },
            Err(err) => {
                self.remove_orphan(&signed_in.user.uid).await;
                Err(err)
            },
        }
    }

    pub async fn reset_password(&self, email: &str) -> ApiResult<()> {
        validate_email("email", email)?;

        self.deadline
            .run(self.identity.send_password_reset_email(email.trim()))
            .await
    }

    pub async fn update_user(&self, uid: &str, update: UserUpdate) -> ApiResult<String> {
        if uid.trim().is_empty() {
            return Err(ApiError::validation("\"credentials.uid\" is not allowed to be empty"));
        }
        if update.is_empty() {
            return Err(ApiError::validation("\"credentials.user\" must have at least 1 key"));
        }
        if let Some(email) = &update.email {
            validate_email("credentials.user.email", email)?;
        }
        if let Some(password) = &update.password {
            validate_password("credentials.user.password", password)?;
        }

        let user = self
            .deadline
            .run(self.identity.update_user(uid, update))
            .await?;

        tracing::info!(uid = %user.uid, "user updated");

        Ok(format!("User {} successful updated", user.uid))
    }

    async fn exchange(&self, signed_in: &SignedInUser) -> ApiResult<String> {
        self.deadline
            .run(
                self.identity
                    .create_session_cookie(&signed_in.id_token, SESSION_TTL),
            )
            .await
    }

    async fn provision(&self, signed_in: &SignedInUser, submitted_email: &str) -> ApiResult<String> {
        let cookie = self.exchange(signed_in).await?;

        let email = signed_in
            .user
            .email
            .clone()
            .unwrap_or_else(|| submitted_email.trim().to_string());
        let profile = UserProfile::new(signed_in.user.uid.clone(), email);

        let profiles = self.store.typed_collection::<UserProfile>()?;

        self.deadline.run(profiles.create(&profile)).await?;

        Ok(cookie)
    }

    async fn remove_orphan(&self, uid: &str) {
        match self
            .deadline
            .run(self.identity.delete_user(uid))
            .await
        {
            Ok(()) => tracing::warn!(uid = %uid, "sign-up rolled back, identity deleted"),
            Err(err) => tracing::error!(
                uid = %uid,
                code = %err.message(),
                "sign-up rollback failed, identity left without profile"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use docbridge::{
        document::DocumentExt,
        memory::{InMemoryIdentityProvider, InMemoryStore},
    };

    use super::*;

    fn exchange() -> (CredentialExchange, InMemoryIdentityProvider, DocumentStore) {
        let identity = InMemoryIdentityProvider::new();
        let store = DocumentStore::new(InMemoryStore::new());
        let exchange = CredentialExchange::new(Arc::new(identity.clone()), store.clone(), Deadline::default());

        (exchange, identity, store)
    }

    #[tokio::test]
    async fn sign_up_provisions_a_profile() {
        let (exchange, identity, store) = exchange();
        let session = exchange
            .sign_up(&Credentials::new("Ada@Example.com", "secret1"))
            .await
            .unwrap();

        let profile = store
            .typed_collection::<UserProfile>()
            .unwrap()
            .get(&session.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile, UserProfile::new(session.uid.clone(), "ada@example.com"));
        assert!(!profile.to_fields().unwrap().contains_key("id"));

        let claims = identity.verify_session_cookie(&session.cookie, true).await.unwrap();
        assert_eq!(claims.uid, session.uid);
        assert_eq!((claims.expires_at - claims.issued_at).num_days(), 5);
    }

    #[tokio::test]
    async fn sign_in_after_sign_up() {
        let (exchange, _, _) = exchange();
        let created = exchange.sign_up(&Credentials::new("ada@example.com", "secret1")).await.unwrap();
        let session = exchange.sign_in(&Credentials::new("ada@example.com", "secret1")).await.unwrap();

        assert_eq!(session.uid, created.uid);
        assert_ne!(session.cookie, created.cookie);

        let err = exchange
            .sign_in(&Credentials::new("ada@example.com", "wrong-one"))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "auth/wrong-password");
    }

    #[tokio::test]
    async fn duplicate_sign_up_keeps_the_first_identity() {
        let (exchange, identity, _) = exchange();
        let first = exchange.sign_up(&Credentials::new("ada@example.com", "secret1")).await.unwrap();

        let err = exchange
            .sign_up(&Credentials::new("ada@example.com", "secret2"))
            .await
            .unwrap_err();

        assert_eq!(err.message(), "auth/email-already-in-use");
        assert!(identity.user(&first.uid).await.is_some());
    }

    #[tokio::test]
    async fn credentials_are_validated_before_any_call() {
        let (exchange, identity, _) = exchange();

        assert_eq!(
            exchange.sign_up(&Credentials::new("not-an-email", "secret1")).await,
            Err(ApiError::validation("\"email\" must be a valid email"))
        );
        assert_eq!(
            exchange.sign_up(&Credentials::new("ada@example.com", "short")).await,
            Err(ApiError::validation("\"password\" length must be at least 6 characters long"))
        );
        assert!(identity.user_by_email("ada@example.com").await.is_none());
    }

    #[tokio::test]
    async fn account_maintenance() {
        let (exchange, identity, _) = exchange();
        let session = exchange.sign_up(&Credentials::new("ada@example.com", "secret1")).await.unwrap();

        exchange.reset_password("ada@example.com").await.unwrap();
        assert_eq!(identity.password_reset_outbox().await, vec!["ada@example.com".to_string()]);

        let update = UserUpdate {
            display_name: Some("Ada".into()),
            ..UserUpdate::default()
        };
        let message = exchange.update_user(&session.uid, update).await.unwrap();
        assert_eq!(message, format!("User {} successful updated", session.uid));
        assert_eq!(
            identity.user(&session.uid).await.unwrap().display_name.as_deref(),
            Some("Ada")
        );

        assert!(matches!(
            exchange.update_user(&session.uid, UserUpdate::default()).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let rendered = format!("{:?}", Credentials::new("ada@example.com", "hunter22"));

        assert!(rendered.contains("ada@example.com"));
        assert!(!rendered.contains("hunter22"));
    }
}
