//! Session/auth store.
//!
//! One signed-in user at a time, checked against a fixed demo credential
//! table. The user record reaches the key-value store only when
//! "remember me" was requested.
//!
//! Key properties:
//! - Password digests are zeroed on drop
//! - Digest comparison is constant time
//! - A failed session write never fails the login

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::{Role, User};
use crate::notifications::Notifications;
use crate::storage::{read_json, write_json, KeyValueStore, StorageError};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// ═══════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════

/// SHA-256 of a password, zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct PasswordDigest([u8; 32]);

impl PasswordDigest {
    fn of(password: &str) -> Self {
        Self(Sha256::digest(password.as_bytes()).into())
    }

    fn matches(&self, other: &PasswordDigest) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

struct Credential {
    user_id: &'static str,
    email: &'static str,
    name: &'static str,
    role: Role,
    digest: PasswordDigest,
}

const DEMO_ACCOUNTS: &[(&str, &str, &str, Role, &str)] = &[
    ("1", "admin@docintel.com", "Admin User", Role::Admin, "admin123"),
    ("2", "analyst@docintel.com", "Analyst User", Role::Analyst, "analyst123"),
    ("3", "viewer@docintel.com", "Viewer User", Role::Viewer, "viewer123"),
];

fn demo_credentials() -> Vec<Credential> {
    DEMO_ACCOUNTS
        .iter()
        .map(|&(user_id, email, name, role, password)| Credential {
            user_id,
            email,
            name,
            role,
            digest: PasswordDigest::of(password),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

pub struct SessionStore {
    credentials: Vec<Credential>,
    current: Mutex<Option<User>>,
    kv: Arc<dyn KeyValueStore>,
    key: String,
    notifications: Arc<Notifications>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, notifications: Arc<Notifications>) -> Self {
        Self {
            credentials: demo_credentials(),
            current: Mutex::new(None),
            kv,
            key: key.into(),
            notifications,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<User>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check credentials and sign in. With `remember_me` the user is also
    /// written to the key-value store.
    pub fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<User, AuthError> {
        let email = email.trim();
        let supplied = PasswordDigest::of(password);

        // No early exit: every entry is compared.
        let mut found = None;
        for credential in &self.credentials {
            let email_match = credential.email.eq_ignore_ascii_case(email);
            let password_match = credential.digest.matches(&supplied);
            if email_match && password_match {
                found = Some(credential);
            }
        }

        let Some(credential) = found else {
            tracing::info!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let user = User {
            id: credential.user_id.to_string(),
            email: credential.email.to_string(),
            name: credential.name.to_string(),
            role: credential.role,
            last_login: Utc::now(),
        };

        if remember_me {
            if let Err(e) = write_json(self.kv.as_ref(), &self.key, &user) {
                tracing::warn!(error = %e, "Failed to persist session");
                self.notifications.error("Failed to remember session");
            }
        } else if let Err(e) = self.kv.remove(&self.key) {
            tracing::warn!(error = %e, "Failed to clear stale session");
        }

        tracing::info!(user_id = %user.id, role = %user.role, remember_me, "User signed in");
        *self.lock() = Some(user.clone());
        Ok(user)
    }

    /// Sign out and forget any remembered session.
    pub fn logout(&self) {
        let previous = self.lock().take();
        if let Err(e) = self.kv.remove(&self.key) {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, "User signed out");
        }
    }

    /// Load a remembered session, if any.
    pub fn restore(&self) -> Result<Option<User>, AuthError> {
        let user: Option<User> = read_json(self.kv.as_ref(), &self.key)?;
        if let Some(user) = &user {
            tracing::info!(user_id = %user.id, "Session restored");
            *self.lock() = Some(user.clone());
        }
        Ok(user)
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationLevel;
    use crate::storage::MemoryKeyValueStore;

    const KEY: &str = "docintel_user";

    fn store_with(kv: Arc<dyn KeyValueStore>) -> (SessionStore, Arc<Notifications>) {
        let notifications = Arc::new(Notifications::new());
        (SessionStore::new(kv, KEY, notifications.clone()), notifications)
    }

    fn store() -> (SessionStore, Arc<dyn KeyValueStore>) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new(4096));
        (store_with(kv.clone()).0, kv)
    }

    #[test]
    fn login_with_valid_credentials() {
        let (sessions, _) = store();
        let user = sessions.login("admin@docintel.com", "admin123", false).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(sessions.is_authenticated());
        assert_eq!(sessions.current_user(), Some(user));
    }

    #[test]
    fn email_is_case_insensitive() {
        let (sessions, _) = store();
        let user = sessions.login("  Analyst@DocIntel.com", "analyst123", false).unwrap();
        assert_eq!(user.role, Role::Analyst);
    }

    #[test]
    fn wrong_password_rejected() {
        let (sessions, _) = store();
        assert!(matches!(
            sessions.login("viewer@docintel.com", "admin123", false),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(!sessions.is_authenticated());
    }

    #[test]
    fn remember_me_persists_and_restores() {
        let (sessions, kv) = store();
        sessions.login("viewer@docintel.com", "viewer123", true).unwrap();
        assert!(kv.get(KEY).unwrap().is_some());

        let (reopened, _) = store_with(kv);
        let restored = reopened.restore().unwrap().unwrap();
        assert_eq!(restored.email, "viewer@docintel.com");
        assert!(reopened.is_authenticated());
    }

    #[test]
    fn without_remember_me_nothing_persisted() {
        let (sessions, kv) = store();
        sessions.login("viewer@docintel.com", "viewer123", false).unwrap();
        assert!(kv.get(KEY).unwrap().is_none());
    }

    #[test]
    fn logout_clears_memory_and_storage() {
        let (sessions, kv) = store();
        sessions.login("admin@docintel.com", "admin123", true).unwrap();
        sessions.logout();
        assert!(!sessions.is_authenticated());
        assert!(kv.get(KEY).unwrap().is_none());
        assert!(sessions.restore().unwrap().is_none());
    }

    #[test]
    fn storage_failure_does_not_fail_login() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new(8));
        let (sessions, notifications) = store_with(kv);
        assert!(sessions.login("admin@docintel.com", "admin123", true).is_ok());
        assert!(sessions.is_authenticated());
        assert!(notifications
            .entries()
            .iter()
            .any(|n| n.level == NotificationLevel::Error));
    }

    #[test]
    fn digest_comparison() {
        assert!(PasswordDigest::of("a").matches(&PasswordDigest::of("a")));
        assert!(!PasswordDigest::of("a").matches(&PasswordDigest::of("b")));
    }
}
