//! Remote calls the app makes: accounts, sessions and the workout catalog
//!
//! Failures are logged here with context and handed back to the caller,
//! except `current_user`, which degrades to `None`.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info};

use crate::config::Collections;
use crate::error::RemoteError;
use crate::exercises::{BodyPart, Exercise};
use crate::remote::{CURRENT_SESSION, DocumentStore, Query, Session, UNIQUE_ID};
use crate::session::User;
use crate::tips::Tip;

#[derive(Clone)]
pub struct FitnessApi {
    remote: Arc<dyn DocumentStore>,
    database_id: String,
    collections: Collections,
}

impl FitnessApi {
    pub fn new(remote: Arc<dyn DocumentStore>, database_id: impl Into<String>, collections: Collections) -> Self {
        Self {
            remote,
            database_id: database_id.into(),
            collections,
        }
    }

    pub fn remote(&self) -> &Arc<dyn DocumentStore> {
        &self.remote
    }

    // ─── Accounts & Sessions ─────────────────────────────────────

    /// Register an account, sign in, then create its profile document.
    pub async fn create_user(&self, email: &str, password: &str, username: &str) -> Result<User, RemoteError> {
        let account = self
            .remote
            .create_account(UNIQUE_ID, email, password, username)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create account"))?;

        let avatar = self.remote.avatar_initials_url(username);
        self.sign_in(email, password).await?;

        let document = self
            .remote
            .create_document(
                &self.database_id,
                &self.collections.users,
                UNIQUE_ID,
                json!({
                    "accountId": account.id,
                    "email": email,
                    "username": username,
                    "avatar": avatar,
                }),
            )
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create user profile"))?;

        let user: User = document.into_model()?;
        info!(user_id = %user.id, account_id = %user.account_id, "User registered");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        self.remote
            .create_email_session(email, password)
            .await
            .inspect_err(|e| error!(error = %e, "Sign-in failed"))
    }

    /// Profile of the signed-in account, or `None` on any failure
    pub async fn current_user(&self) -> Option<User> {
        match self.try_current_user().await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Failed to resolve current user");
                None
            }
        }
    }

    async fn try_current_user(&self) -> Result<Option<User>, RemoteError> {
        let account = self.remote.get_account().await?;
        let documents = self
            .remote
            .list_documents(
                &self.database_id,
                &self.collections.users,
                &[Query::equal("accountId", account.id.as_str())],
            )
            .await?;
        documents
            .into_iter()
            .next()
            .map(|doc| doc.into_model())
            .transpose()
    }

    pub async fn sign_out(&self) -> Result<(), RemoteError> {
        self.remote
            .delete_session(CURRENT_SESSION)
            .await
            .inspect_err(|e| error!(error = %e, "Sign-out failed"))
    }

    // ─── Catalog ─────────────────────────────────────────────────

    pub async fn body_parts(&self) -> Result<Vec<BodyPart>, RemoteError> {
        self.list(&self.collections.body_parts)
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching body parts"))
    }

    pub async fn body_part(&self, id: &str) -> Result<BodyPart, RemoteError> {
        self.get(&self.collections.body_parts, id)
            .await
            .inspect_err(|e| error!(body_part = id, error = %e, "Error fetching body part"))
    }

    /// Exercises of a body part, fetched concurrently, in the body part's order
    pub async fn exercises_for_body_part(&self, body_part_id: &str) -> Result<Vec<Exercise>, RemoteError> {
        let result = async {
            let body_part = self.body_part(body_part_id).await?;
            let ids = body_part.exercise_ids();
            debug!(body_part = body_part_id, count = ids.len(), "Fetching exercises");
            try_join_all(ids.into_iter().map(|id| self.get(&self.collections.exercises, id))).await
        }
        .await;
        result.inspect_err(|e| error!(body_part = body_part_id, error = %e, "Error fetching exercises by body part"))
    }

    pub async fn exercise(&self, id: &str) -> Result<Exercise, RemoteError> {
        self.get(&self.collections.exercises, id)
            .await
            .inspect_err(|e| error!(exercise = id, error = %e, "Error fetching exercise"))
    }

    pub async fn tips(&self) -> Result<Vec<Tip>, RemoteError> {
        self.list(&self.collections.tips)
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching workout tips"))
    }

    async fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, RemoteError> {
        self.remote
            .list_documents(&self.database_id, collection, &[])
            .await?
            .into_iter()
            .map(|doc| doc.into_model())
            .collect()
    }

    async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T, RemoteError> {
        self.remote
            .get_document(&self.database_id, collection, id)
            .await?
            .into_model()
    }
}
