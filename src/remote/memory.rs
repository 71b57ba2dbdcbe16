//! In-memory document store for tests

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{Account, CURRENT_SESSION, Document, DocumentStore, Query, Session, UNIQUE_ID};
use crate::error::RemoteError;

#[derive(Default)]
struct State {
    /// (database, collection) -> documents in insertion order
    collections: BTreeMap<(String, String), Vec<Document>>,
    /// email -> (account, password)
    accounts: BTreeMap<String, (Account, String)>,
    session: Option<String>,
    /// Collections whose reads fail
    broken: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, database_id: &str, collection_id: &str, document: Document) {
        let mut state = self.state.lock().unwrap();
        state
            .collections
            .entry((database_id.to_string(), collection_id.to_string()))
            .or_default()
            .push(document);
    }

    pub fn documents(&self, database_id: &str, collection_id: &str) -> Vec<Document> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&(database_id.to_string(), collection_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Make every read of `collection_id` fail with a service error
    pub fn break_collection(&self, collection_id: &str) {
        self.state.lock().unwrap().broken.insert(collection_id.to_string());
    }

    fn generate_id(&self, requested: &str, prefix: &str) -> String {
        if requested == UNIQUE_ID {
            format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        } else {
            requested.to_string()
        }
    }

    fn check_broken(state: &State, collection_id: &str) -> Result<(), RemoteError> {
        if state.broken.contains(collection_id) {
            return Err(RemoteError::Service {
                status: 500,
                message: format!("collection {} unavailable", collection_id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, RemoteError> {
        let state = self.state.lock().unwrap();
        Self::check_broken(&state, collection_id)?;
        let docs = state
            .collections
            .get(&(database_id.to_string(), collection_id.to_string()))
            .map(|docs| {
                docs.iter()
                    .filter(|doc| queries.iter().all(|q| q.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Document, RemoteError> {
        let state = self.state.lock().unwrap();
        Self::check_broken(&state, collection_id)?;
        state
            .collections
            .get(&(database_id.to_string(), collection_id.to_string()))
            .and_then(|docs| docs.iter().find(|doc| doc.id == document_id))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection_id, document_id)))
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, RemoteError> {
        if self.state.lock().unwrap().session.is_none() {
            return Err(RemoteError::Unauthorized("no session".to_string()));
        }
        let document = Document::new(self.generate_id(document_id, "doc"), data);
        self.insert(database_id, collection_id, document.clone());
        Ok(document)
    }

    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, RemoteError> {
        let id = self.generate_id(user_id, "acc");
        let mut state = self.state.lock().unwrap();
        if state.accounts.contains_key(email) {
            return Err(RemoteError::Conflict(format!("account {} exists", email)));
        }
        let account = Account {
            id,
            name: name.to_string(),
            email: email.to_string(),
        };
        state
            .accounts
            .insert(email.to_string(), (account.clone(), password.to_string()));
        Ok(account)
    }

    async fn get_account(&self) -> Result<Account, RemoteError> {
        let state = self.state.lock().unwrap();
        let account_id = state
            .session
            .clone()
            .ok_or_else(|| RemoteError::Unauthorized("no session".to_string()))?;
        state
            .accounts
            .values()
            .find(|(account, _)| account.id == account_id)
            .map(|(account, _)| account.clone())
            .ok_or_else(|| RemoteError::Unauthorized("unknown session".to_string()))
    }

    async fn create_email_session(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let account = match state.accounts.get(email) {
            Some((account, stored)) if stored == password => account.clone(),
            _ => return Err(RemoteError::Unauthorized("invalid credentials".to_string())),
        };
        state.session = Some(account.id.clone());
        Ok(Session {
            id: format!("sess-{}", account.id),
            user_id: account.id,
            expire: None,
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if session_id != CURRENT_SESSION || state.session.is_none() {
            return Err(RemoteError::Unauthorized("no session".to_string()));
        }
        state.session = None;
        Ok(())
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        format!("memory://avatars/initials?name={}", name)
    }

    async fn session_token(&self) -> Option<String> {
        self.state.lock().unwrap().session.clone()
    }

    async fn restore_session(&self, token: Option<String>) {
        self.state.lock().unwrap().session = token;
    }
}
