//! Signed-in user and the session context that replaces global app state

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::KeyValueStore;
use crate::error::StoreError;

/// Local key holding the remote session credential between runs
pub const SESSION_KEY: &str = "session";

/// Profile document from the users collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Profile document id; progress keys are derived from it
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(default)]
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Who is signed in, with explicit begin/end lifecycle
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user: Option<User>,
}

impl SessionContext {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Start a session for `user` after sign-in
    pub fn begin(user: User) -> Self {
        info!(user_id = %user.id, "Session started");
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Tear the session down: wipe all local state and forget the user.
    ///
    /// If clearing the store fails the user stays signed in and `end` can be retried.
    pub fn end(&mut self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.clear()?;
        if let Some(user) = self.user.take() {
            info!(user_id = %user.id, "Session ended, local state cleared");
        }
        Ok(())
    }
}

/// Remote session credential saved by a previous run
pub fn load_session_token(store: &dyn KeyValueStore) -> Option<String> {
    match store.get(SESSION_KEY) {
        Ok(token) => token.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            warn!(error = %e, "Failed to read saved session");
            None
        }
    }
}

pub fn save_session_token(store: &dyn KeyValueStore, token: Option<&str>) -> Result<(), StoreError> {
    match token {
        Some(token) => store.set(SESSION_KEY, token),
        None => store.remove(SESSION_KEY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            account_id: "acc-1".to_string(),
            email: "sam@example.com".to_string(),
            username: "sam".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_user_parses_profile_document() {
        let user: User = serde_json::from_value(serde_json::json!({
            "$id": "u1",
            "accountId": "acc-1",
            "email": "sam@example.com",
            "username": "sam",
            "avatar": "https://example.com/avatars/initials?name=sam"
        }))
        .unwrap();

        assert_eq!(user.account_id, "acc-1");
        assert_eq!(user.username, "sam");
    }

    #[test]
    fn test_begin_and_end_lifecycle() {
        let store = MemoryStore::new();
        store.set("u1_2024-05-01", r#"{"date":"2024-05-01","status":true}"#).unwrap();
        store.set("selectedBodyPart", "chest").unwrap();
        store.set(SESSION_KEY, "tok").unwrap();

        let mut session = SessionContext::begin(user());
        assert!(session.is_logged_in());
        assert_eq!(session.user().map(|u| u.username.as_str()), Some("sam"));

        session.end(&store).unwrap();
        assert!(!session.is_logged_in());
        assert!(store.is_empty());
    }

    /// Store whose `clear` always fails
    struct StuckStore(MemoryStore);

    impl KeyValueStore for StuckStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key)
        }
        fn all_keys(&self) -> Result<Vec<String>, StoreError> {
            self.0.all_keys()
        }
        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn test_failed_end_keeps_user_signed_in() {
        let store = StuckStore(MemoryStore::new());
        store.set("u1_2024-05-01", r#"{"date":"2024-05-01","status":true}"#).unwrap();

        let mut session = SessionContext::begin(user());
        assert!(session.end(&store).is_err());

        assert!(session.is_logged_in());
        assert_eq!(session.user().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(store.all_keys().unwrap(), vec!["u1_2024-05-01"]);
    }

    #[test]
    fn test_signed_out_has_no_user() {
        let session = SessionContext::signed_out();
        assert!(session.user().is_none());
    }

    #[test]
    fn test_session_token_roundtrip_through_store() {
        let store = MemoryStore::new();
        assert_eq!(load_session_token(&store), None);

        save_session_token(&store, Some("tok")).unwrap();
        assert_eq!(load_session_token(&store).as_deref(), Some("tok"));

        save_session_token(&store, None).unwrap();
        assert_eq!(load_session_token(&store), None);
    }

    #[test]
    fn test_blank_session_token_ignored() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "   ").unwrap();
        assert_eq!(load_session_token(&store), None);
    }
}
