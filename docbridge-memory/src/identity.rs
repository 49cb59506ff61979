//! In-memory identity provider.
//!
//! Accounts are email/password pairs with salted SHA-256 password digests. Identity
//! tokens live for an hour and are consumed by the exchange for a session cookie.
//! Revoking a user's tokens forgets every id token and session cookie of the account, so
//! those cookies fail verification afterwards. Expired tokens and cookies are pruned on
//! every write.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mea::rwlock::RwLock;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use docbridge_core::identity::{
    IdentityError, IdentityProvider, IdentityResult, SessionClaims, SignedInUser, UserRecord, UserUpdate,
    is_valid_email,
};

/// Lifetime of an identity token.
pub const ID_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// Shortest session a cookie may be minted for.
pub const MIN_SESSION_TTL: Duration = Duration::from_secs(5 * 60);
/// Longest session a cookie may be minted for.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;
/// Number of password-reset mails kept for inspection.
pub const RESET_OUTBOX_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
struct Account {
    record: UserRecord,
    salt: String,
    password_digest: String,
}

#[derive(Debug, Clone)]
struct IdToken {
    uid: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct IdentityState {
    accounts: HashMap<String, Account>,
    uids_by_email: HashMap<String, String>,
    id_tokens: HashMap<String, IdToken>,
    sessions: HashMap<String, SessionClaims>,
    reset_outbox: VecDeque<String>,
}

impl IdentityState {
    fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.id_tokens.retain(|_, token| token.expires_at > now);
        self.sessions.retain(|_, claims| claims.expires_at > now);
    }

    fn forget_tokens_of(&mut self, uid: &str) {
        self.id_tokens.retain(|_, token| token.uid != uid);
        self.sessions.retain(|_, claims| claims.uid != uid);
    }
}

/// Thread-safe in-memory [`IdentityProvider`].
///
/// Clones share the same accounts and sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<IdentityState>>,
}

impl InMemoryIdentityProvider {
    /// Creates a provider with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account `uid`, if it exists.
    pub async fn user(&self, uid: &str) -> Option<UserRecord> {
        self.state
            .read()
            .await
            .accounts
            .get(uid)
            .map(|account| account.record.clone())
    }

    /// Returns the account registered under `email`, if any.
    pub async fn user_by_email(&self, email: &str) -> Option<UserRecord> {
        let state = self.state.read().await;

        state
            .uids_by_email
            .get(&normalize_email(email))
            .and_then(|uid| state.accounts.get(uid))
            .map(|account| account.record.clone())
    }

    /// Returns the addresses of the latest password-reset mails, oldest first.
    pub async fn password_reset_outbox(&self) -> Vec<String> {
        self.state.read().await.reset_outbox.iter().cloned().collect()
    }

    fn issue_id_token(state: &mut IdentityState, uid: &str) -> String {
        let token = format!("idt_{}", Uuid::new_v4().simple());

        state.prune_expired(Utc::now());
        state.id_tokens.insert(
            token.clone(),
            IdToken {
                uid: uid.to_string(),
                expires_at: Utc::now() + ttl(ID_TOKEN_TTL),
            },
        );

        token
    }
}

fn ttl(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> IdentityResult<String> {
    if !is_valid_email(email) {
        return Err(IdentityError::InvalidEmail);
    }

    Ok(normalize_email(email))
}

fn validate_password(password: &str) -> IdentityResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword(format!(
            "password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(())
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());

    hex::encode(hasher.finalize())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> IdentityResult<SignedInUser> {
        let email = validate_email(email)?;
        let mut state = self.state.write().await;

        let uid = state
            .uids_by_email
            .get(&email)
            .cloned()
            .ok_or(IdentityError::UserNotFound)?;
        let account = state
            .accounts
            .get(&uid)
            .ok_or(IdentityError::UserNotFound)?;

        if account.password_digest != digest(&account.salt, password) {
            return Err(IdentityError::WrongPassword);
        }
        if account.record.disabled {
            return Err(IdentityError::UserDisabled);
        }

        let user = account.record.clone();
        let id_token = Self::issue_id_token(&mut state, &uid);

        Ok(SignedInUser { user, id_token })
    }

    async fn create_user_with_password(&self, email: &str, password: &str) -> IdentityResult<SignedInUser> {
        let email = validate_email(email)?;
        validate_password(password)?;

        let mut state = self.state.write().await;

        if state.uids_by_email.contains_key(&email) {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        let uid = Uuid::new_v4().simple().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        let account = Account {
            record: UserRecord::new(uid.clone(), email.clone()),
            password_digest: digest(&salt, password),
            salt,
        };
        let user = account.record.clone();

        state.uids_by_email.insert(email, uid.clone());
        state.accounts.insert(uid.clone(), account);

        let id_token = Self::issue_id_token(&mut state, &uid);

        Ok(SignedInUser { user, id_token })
    }

    async fn create_session_cookie(&self, id_token: &str, expires_in: Duration) -> IdentityResult<String> {
        if !(MIN_SESSION_TTL..=MAX_SESSION_TTL).contains(&expires_in) {
            return Err(IdentityError::InvalidArgument(format!(
                "session duration must be between {} and {} seconds",
                MIN_SESSION_TTL.as_secs(),
                MAX_SESSION_TTL.as_secs()
            )));
        }

        let mut state = self.state.write().await;
        let now = Utc::now();

        state.prune_expired(now);

        let token = state
            .id_tokens
            .remove(id_token)
            .ok_or(IdentityError::InvalidIdToken)?;
        if !state.accounts.contains_key(&token.uid) {
            return Err(IdentityError::UserNotFound);
        }

        let cookie = format!("sess_{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        state.sessions.insert(
            cookie.clone(),
            SessionClaims {
                uid: token.uid,
                issued_at: now,
                expires_at: now + ttl(expires_in),
            },
        );

        Ok(cookie)
    }

    async fn verify_session_cookie(&self, session_cookie: &str, check_revoked: bool) -> IdentityResult<SessionClaims> {
        let state = self.state.read().await;

        let claims = state
            .sessions
            .get(session_cookie)
            .filter(|claims| claims.expires_at > Utc::now())
            .ok_or(IdentityError::InvalidSessionCookie)?;

        if check_revoked {
            let account = state
                .accounts
                .get(&claims.uid)
                .ok_or(IdentityError::UserNotFound)?;

            if account.record.disabled {
                return Err(IdentityError::UserDisabled);
            }
        }

        Ok(claims.clone())
    }

    async fn revoke_refresh_tokens(&self, uid: &str) -> IdentityResult<()> {
        let mut state = self.state.write().await;

        if !state.accounts.contains_key(uid) {
            return Err(IdentityError::UserNotFound);
        }

        state.forget_tokens_of(uid);
        state.prune_expired(Utc::now());

        Ok(())
    }

    async fn send_password_reset_email(&self, email: &str) -> IdentityResult<()> {
        let email = validate_email(email)?;
        let mut state = self.state.write().await;

        if !state.uids_by_email.contains_key(&email) {
            return Err(IdentityError::UserNotFound);
        }

        if state.reset_outbox.len() >= RESET_OUTBOX_CAPACITY {
            state.reset_outbox.pop_front();
        }
        state.reset_outbox.push_back(email);

        Ok(())
    }

    async fn update_user(&self, uid: &str, update: UserUpdate) -> IdentityResult<UserRecord> {
        let new_email = update
            .email
            .as_deref()
            .map(validate_email)
            .transpose()?;

        if let Some(password) = &update.password {
            validate_password(password)?;
        }

        let mut state = self.state.write().await;
        let old_email = state
            .accounts
            .get(uid)
            .ok_or(IdentityError::UserNotFound)?
            .record
            .email
            .clone();

        if let Some(email) = &new_email {
            if state.uids_by_email.get(email).is_some_and(|owner| owner != uid) {
                return Err(IdentityError::EmailAlreadyInUse);
            }
            if let Some(old) = &old_email {
                state.uids_by_email.remove(old);
            }

            state.uids_by_email.insert(email.clone(), uid.to_string());
        }

        let account = state
            .accounts
            .get_mut(uid)
            .ok_or(IdentityError::UserNotFound)?;

        if let Some(email) = new_email {
            account.record.email = Some(email);
        }
        if let Some(password) = update.password {
            account.password_digest = digest(&account.salt, &password);
        }
        if let Some(display_name) = update.display_name {
            account.record.display_name = Some(display_name);
        }
        if let Some(photo_url) = update.photo_url {
            account.record.photo_url = Some(photo_url);
        }
        if let Some(phone_number) = update.phone_number {
            account.record.phone_number = Some(phone_number);
        }
        if let Some(email_verified) = update.email_verified {
            account.record.email_verified = email_verified;
        }
        if let Some(disabled) = update.disabled {
            account.record.disabled = disabled;
        }

        Ok(account.record.clone())
    }

    async fn delete_user(&self, uid: &str) -> IdentityResult<()> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .remove(uid)
            .ok_or(IdentityError::UserNotFound)?;

        if let Some(email) = account.record.email {
            state.uids_by_email.remove(&email);
        }

        state.forget_tokens_of(uid);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_DAYS: Duration = Duration::from_secs(5 * 24 * 60 * 60);

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let provider = InMemoryIdentityProvider::new();

        let created = provider
            .create_user_with_password("Ada@Example.com", "secret1")
            .await
            .unwrap();
        let signed_in = provider
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(created.user.uid, signed_in.user.uid);
        assert_eq!(signed_in.user.email.as_deref(), Some("ada@example.com"));
        assert_ne!(created.id_token, signed_in.id_token);
    }

    #[tokio::test]
    async fn wrong_password_and_duplicates_are_rejected() {
        let provider = InMemoryIdentityProvider::new();
        provider.create_user_with_password("a@b.co", "secret1").await.unwrap();

        assert_eq!(
            provider.sign_in_with_password("a@b.co", "nope123").await.unwrap_err(),
            IdentityError::WrongPassword
        );
        assert_eq!(
            provider.create_user_with_password("a@b.co", "secret2").await.unwrap_err(),
            IdentityError::EmailAlreadyInUse
        );
        assert_eq!(
            provider.create_user_with_password("c@d.co", "123").await.unwrap_err().code(),
            "auth/weak-password"
        );
        assert_eq!(
            provider.sign_in_with_password("not-an-email", "secret1").await.unwrap_err(),
            IdentityError::InvalidEmail
        );
    }

    #[tokio::test]
    async fn revoked_sessions_fail_verification() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user_with_password("a@b.co", "secret1").await.unwrap();
        let cookie = provider.create_session_cookie(&user.id_token, FIVE_DAYS).await.unwrap();

        let claims = provider.verify_session_cookie(&cookie, true).await.unwrap();
        assert_eq!(claims.uid, user.user.uid);
        assert!(claims.expires_at > claims.issued_at);

        provider.revoke_refresh_tokens(&claims.uid).await.unwrap();

        assert_eq!(
            provider.verify_session_cookie(&cookie, true).await.unwrap_err(),
            IdentityError::InvalidSessionCookie
        );
        assert_eq!(
            provider.create_session_cookie(&user.id_token, FIVE_DAYS).await.unwrap_err(),
            IdentityError::InvalidIdToken
        );
    }

    #[tokio::test]
    async fn id_tokens_are_consumed_by_the_exchange() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user_with_password("a@b.co", "secret1").await.unwrap();

        provider.create_session_cookie(&user.id_token, FIVE_DAYS).await.unwrap();

        assert_eq!(
            provider.create_session_cookie(&user.id_token, FIVE_DAYS).await.unwrap_err(),
            IdentityError::InvalidIdToken
        );
        assert!(provider.state.read().await.id_tokens.is_empty());
    }

    #[tokio::test]
    async fn revocation_and_expiry_release_state() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user_with_password("a@b.co", "secret1").await.unwrap();
        let uid = user.user.uid.clone();
        provider.create_session_cookie(&user.id_token, FIVE_DAYS).await.unwrap();

        for _ in 0..100 {
            let signed_in = provider.sign_in_with_password("a@b.co", "secret1").await.unwrap();
            provider.create_session_cookie(&signed_in.id_token, FIVE_DAYS).await.unwrap();
        }
        {
            let state = provider.state.read().await;
            assert_eq!(state.id_tokens.len(), 0);
            assert_eq!(state.sessions.len(), 101);
        }

        provider.revoke_refresh_tokens(&uid).await.unwrap();
        {
            let state = provider.state.read().await;
            assert_eq!(state.id_tokens.len(), 0);
            assert_eq!(state.sessions.len(), 0);
        }

        let past = Utc::now() - TimeDelta::seconds(1);
        {
            let mut state = provider.state.write().await;
            state.id_tokens.insert("idt_old".into(), IdToken { uid: uid.clone(), expires_at: past });
            state.sessions.insert(
                "sess_old".into(),
                SessionClaims { uid: uid.clone(), issued_at: past, expires_at: past },
            );
        }

        provider.sign_in_with_password("a@b.co", "secret1").await.unwrap();

        let state = provider.state.read().await;
        assert!(!state.id_tokens.contains_key("idt_old"));
        assert!(!state.sessions.contains_key("sess_old"));
        assert_eq!(state.id_tokens.len(), 1);
    }

    #[tokio::test]
    async fn session_cookies_need_a_live_id_token() {
        let provider = InMemoryIdentityProvider::new();

        assert_eq!(
            provider.create_session_cookie("forged", FIVE_DAYS).await.unwrap_err(),
            IdentityError::InvalidIdToken
        );
        assert_eq!(
            provider.verify_session_cookie("forged", true).await.unwrap_err(),
            IdentityError::InvalidSessionCookie
        );

        let user = provider.create_user_with_password("a@b.co", "secret1").await.unwrap();
        assert!(matches!(
            provider.create_session_cookie(&user.id_token, Duration::from_secs(1)).await,
            Err(IdentityError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn updates_and_deletes_apply_to_the_account() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.create_user_with_password("a@b.co", "secret1").await.unwrap();
        let uid = user.user.uid;

        let updated = provider
            .update_user(
                &uid,
                UserUpdate {
                    email: Some("new@b.co".into()),
                    password: Some("secret2".into()),
                    display_name: Some("Ada".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name.as_deref(), Some("Ada"));
        assert!(provider.sign_in_with_password("new@b.co", "secret2").await.is_ok());
        assert_eq!(
            provider.sign_in_with_password("a@b.co", "secret1").await.unwrap_err(),
            IdentityError::UserNotFound
        );

        provider.delete_user(&uid).await.unwrap();
        assert!(provider.user(&uid).await.is_none());
        assert!(provider.user_by_email("new@b.co").await.is_none());
    }

    #[tokio::test]
    async fn password_reset_mail_lands_in_the_outbox() {
        let provider = InMemoryIdentityProvider::new();
        provider.create_user_with_password("a@b.co", "secret1").await.unwrap();

        provider.send_password_reset_email("a@b.co").await.unwrap();

        assert_eq!(provider.password_reset_outbox().await, ["a@b.co"]);

        for _ in 0..RESET_OUTBOX_CAPACITY {
            provider.send_password_reset_email("a@b.co").await.unwrap();
        }
        assert_eq!(provider.password_reset_outbox().await.len(), RESET_OUTBOX_CAPACITY);
        assert_eq!(
            provider.send_password_reset_email("x@b.co").await.unwrap_err(),
            IdentityError::UserNotFound
        );
    }
}
