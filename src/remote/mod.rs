//! Remote document store contract
//!
//! Collection-oriented documents scoped by database and collection id, an
//! equality filter, and session-based authentication.

mod appwrite;
mod retry;

#[cfg(test)]
pub(crate) mod memory;

pub use appwrite::AppwriteClient;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RemoteError;

/// Placeholder id asking the server to generate a unique one
pub const UNIQUE_ID: &str = "unique()";

/// Session id naming the caller's own active session
pub const CURRENT_SESSION: &str = "current";

/// Schemaless document: `$id` plus every other field the server returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { id: id.into(), fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Decode into a typed model; the model sees `$id` as well
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T, RemoteError> {
        let id = self.id;
        let mut object = self.fields;
        object.insert("$id".to_string(), Value::String(id.clone()));
        serde_json::from_value(Value::Object(object))
            .map_err(|e| RemoteError::Decode(format!("document {}: {}", id, e)))
    }
}

/// Equality filter on one attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, values: Vec<Value> },
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    /// Does `document` satisfy this filter
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Query::Equal { attribute, values } => {
                let actual = if attribute == "$id" {
                    Some(Value::String(document.id.clone()))
                } else {
                    document.field(attribute).cloned()
                };
                actual.is_some_and(|v| values.contains(&v))
            }
        }
    }

    /// Wire form: `{"method":"equal","attribute":..,"values":[..]}`
    pub fn to_wire(&self) -> String {
        match self {
            Query::Equal { attribute, values } => serde_json::json!({
                "method": "equal",
                "attribute": attribute,
                "values": values,
            })
            .to_string(),
        }
    }
}

/// Authenticated account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Session created from credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub expire: Option<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, RemoteError>;

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Document, RemoteError>;

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, RemoteError>;

    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, RemoteError>;

    async fn get_account(&self) -> Result<Account, RemoteError>;

    async fn create_email_session(&self, email: &str, password: &str)
    -> Result<Session, RemoteError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), RemoteError>;

    /// Initials avatar URL for a display name; nothing is fetched
    fn avatar_initials_url(&self, name: &str) -> String;

    /// Opaque credential of the active session, if any
    async fn session_token(&self) -> Option<String>;

    async fn restore_session(&self, token: Option<String>);
}
