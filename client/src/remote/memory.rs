//! In-process remote backend.
//!
//! Behaves like the REST API (one document per user and kind, 404 for
//! unknown ids) and records every call, which makes it the backend of choice
//! for tests and for running the CLI without a server.

use super::{RemoteCollection, RemoteCollections, RemoteError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tote_engine::{CollectionKind, Credentials, EntityList, RemoteId, UserId};
use uuid::Uuid;

/// One call received by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Find {
        kind: CollectionKind,
        user_id: UserId,
    },
    Create {
        kind: CollectionKind,
        entities: EntityList,
    },
    Patch {
        kind: CollectionKind,
        remote_id: RemoteId,
        entities: EntityList,
    },
    Delete {
        kind: CollectionKind,
        remote_id: RemoteId,
    },
}

#[derive(Debug, Clone)]
struct StoredDoc {
    kind: CollectionKind,
    owner: UserId,
    entities: EntityList,
    seq: u64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    docs: DashMap<RemoteId, StoredDoc>,
    calls: Mutex<Vec<RemoteCall>>,
    next_seq: AtomicU64,
    unauthorized: AtomicBool,
    offline: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document directly, without recording a call.
    pub fn insert(&self, kind: CollectionKind, owner: &str, entities: EntityList) -> RemoteId {
        let id = Uuid::new_v4().to_string();
        self.docs.insert(id.clone(), self.stored(kind, owner, entities));
        id
    }

    /// Drop a document, as if it was deleted by another device.
    pub fn forget(&self, remote_id: &str) -> bool {
        self.docs.remove(remote_id).is_some()
    }

    pub fn entities_of(&self, remote_id: &str) -> Option<EntityList> {
        self.docs.get(remote_id).map(|doc| doc.entities.clone())
    }

    /// Ids of all documents of `kind` owned by `owner`, oldest first.
    pub fn ids_for(&self, kind: CollectionKind, owner: &str) -> Vec<RemoteId> {
        let mut owned: Vec<(u64, RemoteId)> = self
            .docs
            .iter()
            .filter(|entry| entry.kind == kind && entry.owner == owner)
            .map(|entry| (entry.seq, entry.key().clone()))
            .collect();
        owned.sort();
        owned.into_iter().map(|(_, id)| id).collect()
    }

    /// Answer every request with 401.
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.unauthorized.store(unauthorized, Ordering::SeqCst);
    }

    /// Answer every request with 503.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    fn stored(&self, kind: CollectionKind, owner: &str, entities: EntityList) -> StoredDoc {
        StoredDoc {
            kind,
            owner: owner.to_string(),
            entities,
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            updated_at: Utc::now(),
        }
    }

    async fn record(&self, call: RemoteCall) -> Result<(), RemoteError> {
        self.calls.lock().await.push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 503,
                body: "offline".into(),
            });
        }
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized(401));
        }
        Ok(())
    }

    fn owned_doc(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
    ) -> Result<(), RemoteError> {
        match self.docs.get(remote_id) {
            Some(doc) if doc.kind == kind && doc.owner == credentials.user_id => Ok(()),
            Some(_) => Err(RemoteError::Unauthorized(403)),
            None => Err(RemoteError::NotFound),
        }
    }
}

#[async_trait]
impl RemoteCollections for MemoryRemote {
    async fn find_owned(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
    ) -> Result<Option<RemoteCollection>, RemoteError> {
        self.record(RemoteCall::Find {
            kind,
            user_id: credentials.user_id.to_string(),
        })
        .await?;

        let first = self.ids_for(kind, credentials.user_id).into_iter().next();
        Ok(first.and_then(|id| {
            self.docs.get(&id).map(|doc| RemoteCollection {
                id: id.clone(),
                owner: doc.owner.clone(),
                entities: doc.entities.clone(),
                updated_at: Some(doc.updated_at),
            })
        }))
    }

    async fn create(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        entities: &EntityList,
    ) -> Result<RemoteId, RemoteError> {
        self.record(RemoteCall::Create {
            kind,
            entities: entities.clone(),
        })
        .await?;

        Ok(self.insert(kind, credentials.user_id, entities.clone()))
    }

    async fn patch(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
        entities: &EntityList,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::Patch {
            kind,
            remote_id: remote_id.to_string(),
            entities: entities.clone(),
        })
        .await?;

        self.owned_doc(kind, credentials, remote_id)?;
        if let Some(mut doc) = self.docs.get_mut(remote_id) {
            doc.entities = entities.clone();
            doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(
        &self,
        kind: CollectionKind,
        credentials: Credentials<'_>,
        remote_id: &str,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::Delete {
            kind,
            remote_id: remote_id.to_string(),
        })
        .await?;

        self.owned_doc(kind, credentials, remote_id)?;
        self.docs.remove(remote_id);
        Ok(())
    }
}
