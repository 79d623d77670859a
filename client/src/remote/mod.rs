//! Remote collection access.
//!
//! [`RemoteCollections`] is the raw transport: one user-owned document per
//! collection kind, with find/create/patch/delete. [`RemoteClient`] layers the
//! client policy on top: nothing is sent without a session, and a patch that
//! hits a deleted document recreates it.

mod document;
mod http;
mod memory;

pub use document::{CollectionDoc, CreateResponse, FindResponse};
pub use http::PayloadHttp;
pub use memory::{MemoryRemote, RemoteCall};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tote_engine::{
    CollectionKind, Credentials, EntityList, RemoteId, RemoteSnapshot, Session, UserId,
};

/// Remote errors, classified by what the caller can do about them.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote collection not found")]
    NotFound,

    #[error("not authorized (status {0})")]
    Unauthorized(u16),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("no authenticated session")]
    NoSession,
}

impl RemoteError {
    /// Human readable message for a failed `action`, e.g. "load cart".
    pub fn user_message(&self, action: &str) -> String {
        match self {
            RemoteError::NotFound => format!("Failed to {action}: it no longer exists."),
            RemoteError::Unauthorized(_) => format!("Authorization error when trying to {action}."),
            RemoteError::Status { status, .. } => {
                format!("Failed to {action} (status: {status}).")
            }
            RemoteError::Transport(_) => format!("Network error while trying to {action}."),
            RemoteError::Decode(_) => format!("Unexpected server response while trying to {action}."),
            RemoteError::NoSession => format!("Sign in to {action}."),
        }
    }
}

/// A user's collection as stored on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCollection {
    pub id: RemoteId,
    pub owner: UserId,
    pub entities: EntityList,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteCollection {
    /// The part of the collection that reconciliation looks at.
    pub fn snapshot(&self) -> RemoteSnapshot {
        RemoteSnapshot {
            id: self.id.clone(),
            entities: self.entities.clone(),
        }
    }
}

/// Raw CRUD over user-owned collection documents.
#[async_trait]
pub trait RemoteCollections: Send + Sync {
    /// First collection of `kind` owned by the user, if any.
    async fn find_owned(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
    ) -> Result<Option<RemoteCollection>, RemoteError>;

    /// Create a collection and return its id.
    async fn create(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        entities: &EntityList,
    ) -> Result<RemoteId, RemoteError>;

    /// Replace the contents of an existing collection.
    async fn patch(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
        entities: &EntityList,
    ) -> Result<(), RemoteError>;

    async fn delete(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
    ) -> Result<(), RemoteError>;
}

/// Session-aware access to one collection kind.
#[derive(Clone)]
pub struct RemoteClient {
    kind: CollectionKind,
    transport: Arc<dyn RemoteCollections>,
}

impl RemoteClient {
    pub fn new(kind: CollectionKind, transport: Arc<dyn RemoteCollections>) -> Self {
        Self { kind, transport }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// The user's collection. `Ok(None)` without a session or when none exists.
    pub async fn fetch_for_user(
        &self,
        session: &Session,
    ) -> Result<Option<RemoteCollection>, RemoteError> {
        let Some(credentials) = session.credentials() else {
            tracing::debug!(kind = %self.kind, "No session, skipping remote fetch");
            return Ok(None);
        };

        match self.transport.find_owned(self.kind, credentials).await {
            Ok(Some(collection)) => {
                tracing::info!(
                    kind = %self.kind,
                    remote_id = %collection.id,
                    entities = collection.entities.len(),
                    "Fetched remote collection"
                );
                Ok(Some(collection))
            }
            Ok(None) | Err(RemoteError::NotFound) => {
                tracing::info!(kind = %self.kind, user_id = %credentials.user_id, "No remote collection for user");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(kind = %self.kind, error = %e, "Error fetching remote collection");
                Err(e)
            }
        }
    }

    /// Create a collection. `Ok(None)` without a session.
    pub async fn create(
        &self,
        session: &Session,
        entities: &EntityList,
    ) -> Result<Option<RemoteId>, RemoteError> {
        let Some(credentials) = session.credentials() else {
            return Ok(None);
        };

        let remote_id = self
            .transport
            .create(self.kind, credentials, entities)
            .await
            .inspect_err(|e| {
                tracing::error!(kind = %self.kind, error = %e, "Error creating remote collection")
            })?;
        tracing::info!(kind = %self.kind, remote_id = %remote_id, "Created remote collection");
        Ok(Some(remote_id))
    }

    /// Replace the contents of `remote_id`, recreating it if it is gone.
    ///
    /// Returns the id that now holds the contents. `Ok(None)` without a
    /// session.
    pub async fn update(
        &self,
        session: &Session,
        remote_id: &str,
        entities: &EntityList,
    ) -> Result<Option<RemoteId>, RemoteError> {
        let Some(credentials) = session.credentials() else {
            return Ok(None);
        };

        match self
            .transport
            .patch(self.kind, credentials, remote_id, entities)
            .await
        {
            Ok(()) => {
                tracing::debug!(kind = %self.kind, remote_id = %remote_id, "Updated remote collection");
                Ok(Some(remote_id.to_string()))
            }
            Err(RemoteError::NotFound) => {
                tracing::info!(
                    kind = %self.kind,
                    remote_id = %remote_id,
                    "Remote collection not found (404), creating a new one"
                );
                self.create(session, entities).await
            }
            Err(e) => {
                tracing::error!(kind = %self.kind, remote_id = %remote_id, error = %e, "Error updating remote collection");
                Err(e)
            }
        }
    }

    /// Delete `remote_id`. Returns false without a session.
    ///
    /// A document that is already gone counts as deleted.
    pub async fn delete(&self, session: &Session, remote_id: &str) -> Result<bool, RemoteError> {
        let Some(credentials) = session.credentials() else {
            return Ok(false);
        };

        match self.transport.delete(self.kind, credentials, remote_id).await {
            Ok(()) | Err(RemoteError::NotFound) => {
                tracing::info!(kind = %self.kind, remote_id = %remote_id, "Deleted remote collection");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(kind = %self.kind, remote_id = %remote_id, error = %e, "Error deleting remote collection");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tote_engine::{Entity, Product};

    fn entities() -> EntityList {
        EntityList::from_entities(
            CollectionKind::Cart,
            vec![Entity::cart(Product::new("A", "Mug", 4.0), 1)],
        )
    }

    fn client(remote: &Arc<MemoryRemote>) -> RemoteClient {
        RemoteClient::new(CollectionKind::Cart, remote.clone())
    }

    #[tokio::test]
    async fn no_session_sends_nothing() {
        let remote = Arc::new(MemoryRemote::new());
        let client = client(&remote);
        let anon = Session::anonymous();

        assert!(client.fetch_for_user(&anon).await.unwrap().is_none());
        assert!(client.create(&anon, &entities()).await.unwrap().is_none());
        assert!(client.update(&anon, "r1", &entities()).await.unwrap().is_none());
        assert!(!client.delete(&anon, "r1").await.unwrap());
        assert!(remote.calls().await.is_empty());
    }

    #[tokio::test]
    async fn update_recreates_missing_document() {
        let remote = Arc::new(MemoryRemote::new());
        let client = client(&remote);
        let session = Session::authenticated("u1", "t");

        let new_id = client
            .update(&session, "stale", &entities())
            .await
            .unwrap()
            .unwrap();

        assert_ne!(new_id, "stale");
        assert_eq!(remote.entities_of(&new_id), Some(entities()));
        assert!(matches!(
            remote.calls().await.as_slice(),
            [RemoteCall::Patch { .. }, RemoteCall::Create { .. }]
        ));
    }

    #[tokio::test]
    async fn unauthorized_fetch_is_an_error() {
        let remote = Arc::new(MemoryRemote::new());
        remote.set_unauthorized(true);
        let err = client(&remote)
            .fetch_for_user(&Session::authenticated("u1", "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unauthorized(401)));
        assert_eq!(
            err.user_message("load cart"),
            "Authorization error when trying to load cart."
        );
    }

    #[tokio::test]
    async fn deleting_a_missing_document_succeeds() {
        let remote = Arc::new(MemoryRemote::new());
        let deleted = client(&remote)
            .delete(&Session::authenticated("u1", "t"), "gone")
            .await
            .unwrap();
        assert!(deleted);
    }
}
