//! Clients for the hosted services the app talks to.
//!
//! Each service sits behind a trait so the session logic can run against fakes.

pub mod auth;
pub mod client;
pub mod events;
pub mod firestore;
pub mod media;
pub mod models;

use crate::error::{AuthError, QueryError, UploadError};
use async_trait::async_trait;
use firestore::Document;
use models::AttachmentType;
use serde_json::{Map, Value};

/// Credentials handed back by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn update_display_name(&self, session: &AuthSession, name: &str) -> Result<(), AuthError>;
    async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`.
    async fn list(&self, collection: &str, token: Option<&str>) -> Result<Vec<Document>, QueryError>;

    /// Documents whose `field` equals `value` exactly.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        token: Option<&str>,
    ) -> Result<Vec<Document>, QueryError>;

    async fn get(&self, collection: &str, id: &str, token: Option<&str>) -> Result<Option<Document>, QueryError>;

    /// Create a document with a generated id. `server_time_field`, when given, is filled
    /// with the store's request time. Returns the new id.
    async fn add(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        server_time_field: Option<&str>,
        token: Option<&str>,
    ) -> Result<String, QueryError>;

    /// Write only the given fields of `collection/id`, creating the document if needed.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), QueryError>;

    /// Overwrite `collection/id` with exactly `fields`.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), QueryError>;
}

/// A file ready for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload and return the public retrieval URL.
    async fn upload(&self, file: UploadFile, kind: AttachmentType) -> Result<String, UploadError>;
}
