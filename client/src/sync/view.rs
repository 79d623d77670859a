//! Snapshot of a collection as the UI sees it.

use serde::Serialize;
use tote_engine::{CollectionKind, EntityList, RemoteId, SyncPhase};

/// Published on every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub kind: CollectionKind,
    pub entities: EntityList,
    pub remote_id: Option<RemoteId>,
    pub phase: SyncPhase,
    /// A remote call is in flight
    pub is_loading: bool,
    /// Last remote failure, cleared by the next successful remote call
    pub error: Option<String>,
    pub total_count: u64,
    pub total_price: f64,
}

impl CollectionView {
    pub fn empty(kind: CollectionKind) -> Self {
        Self {
            kind,
            entities: EntityList::new(),
            remote_id: None,
            phase: SyncPhase::Uninitialized,
            is_loading: false,
            error: None,
            total_count: 0,
            total_price: 0.0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase.accepts_mutations()
    }
}
