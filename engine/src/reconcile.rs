//! Reconciliation planning for local and remote collection state.
//!
//! This is the core of determinism. Given what the device holds and what the
//! server holds for the signed-in user, this module decides the resulting
//! collection, the remote id to keep, and the single remote write (if any)
//! needed to converge. It performs no IO; the runtime executes the plan.
//!
//! # Algorithm
//!
//! 1. No session: local state is authoritative, nothing is sent
//! 2. No remote collection: create one from a non-empty local list
//! 3. Remote id matches the local one: remote is authoritative
//! 4. Ids differ, or the local list was never linked: union both sides,
//!    local wins on shared products, and push the union to the remote id
//! 5. Unlinked empty local list: adopt the remote collection as is

use crate::{CollectionKind, Entity, EntityList, LocalSnapshot, ProductId, RemoteId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A product present on both sides with differing attributes.
///
/// Always resolved in favour of the local entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub product_id: ProductId,
    /// The entity that was kept
    pub local: Entity,
    /// The entity that was discarded
    pub remote: Entity,
}

/// Output of [`merge_local_wins`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub entities: EntityList,
    pub conflicts: Vec<Conflict>,
    /// Remote-only products appended to the local list
    pub appended: Vec<ProductId>,
}

/// Union of two lists where local entities win.
///
/// The result keeps every local entity in local order, followed by the
/// remote entities whose product id is not held locally, in remote order.
pub fn merge_local_wins(local: &EntityList, remote: &EntityList) -> MergeOutcome {
    let local_ids: HashSet<&str> = local.iter().map(Entity::id).collect();
    let mut entities = local.clone();
    let mut conflicts = Vec::new();
    let mut appended = Vec::new();

    for entity in remote {
        if local_ids.contains(entity.id()) {
            if let Some(kept) = local.get(entity.id()) {
                if kept != entity {
                    conflicts.push(Conflict {
                        product_id: entity.product.id.clone(),
                        local: kept.clone(),
                        remote: entity.clone(),
                    });
                }
            }
        } else {
            appended.push(entity.product.id.clone());
            entities.push_unchecked(entity.clone());
        }
    }

    MergeOutcome {
        entities,
        conflicts,
        appended,
    }
}

/// The remote collection as the planner sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    pub id: RemoteId,
    pub entities: EntityList,
}

/// Which case of the algorithm a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcileBranch {
    /// No session, local state used as is
    LocalOnly,
    /// No remote collection, local entities pushed as a new one
    CreateFromLocal,
    /// Nothing on either side
    Empty,
    /// Remote id matches the local one, remote wins
    RemoteAuthoritative,
    /// Local was linked to a different remote id, lists merged
    MergeMismatched,
    /// Local was never linked, lists merged
    MergeUnlinked,
    /// Local was never linked and is empty, remote adopted
    AdoptRemote,
}

impl std::fmt::Display for ReconcileBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReconcileBranch::LocalOnly => "local-only",
            ReconcileBranch::CreateFromLocal => "create-from-local",
            ReconcileBranch::Empty => "empty",
            ReconcileBranch::RemoteAuthoritative => "remote-authoritative",
            ReconcileBranch::MergeMismatched => "merge-mismatched",
            ReconcileBranch::MergeUnlinked => "merge-unlinked",
            ReconcileBranch::AdoptRemote => "adopt-remote",
        };
        f.write_str(name)
    }
}

/// The remote write needed to converge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RemoteAction {
    None,
    /// Create a new remote collection holding the plan's entities
    Create,
    /// Replace the contents of an existing remote collection
    Update { remote_id: RemoteId },
}

/// Decision produced by [`plan_reconcile`].
///
/// `remote_id` is the linkage to keep once the action succeeds. When the
/// action is a create, or an update that has to recreate a stale document,
/// the runtime replaces it with the id the server returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePlan {
    pub branch: ReconcileBranch,
    pub entities: EntityList,
    pub remote_id: Option<RemoteId>,
    pub action: RemoteAction,
    pub conflicts: Vec<Conflict>,
}

impl ReconcilePlan {
    /// Plan for a device without a session: keep everything local.
    pub fn local_only(local: &LocalSnapshot) -> Self {
        Self {
            branch: ReconcileBranch::LocalOnly,
            entities: local.entities.clone(),
            remote_id: local.remote_id.clone(),
            action: RemoteAction::None,
            conflicts: Vec::new(),
        }
    }

    fn adopt(branch: ReconcileBranch, remote: &RemoteSnapshot) -> Self {
        Self {
            branch,
            entities: remote.entities.clone(),
            remote_id: Some(remote.id.clone()),
            action: RemoteAction::None,
            conflicts: Vec::new(),
        }
    }

    fn merge(branch: ReconcileBranch, local: &LocalSnapshot, remote: &RemoteSnapshot) -> Self {
        let outcome = merge_local_wins(&local.entities, &remote.entities);
        Self {
            branch,
            entities: outcome.entities,
            remote_id: Some(remote.id.clone()),
            action: RemoteAction::Update {
                remote_id: remote.id.clone(),
            },
            conflicts: outcome.conflicts,
        }
    }

    /// Whether the plan needs a remote write.
    pub fn needs_remote_write(&self) -> bool {
        self.action != RemoteAction::None
    }
}

/// Plan reconciliation for an authenticated session.
///
/// `kind` normalizes the merged entities. Both kinds follow the same cases.
pub fn plan_reconcile(
    kind: CollectionKind,
    local: &LocalSnapshot,
    remote: Option<&RemoteSnapshot>,
) -> ReconcilePlan {
    let mut plan = match remote {
        None if local.entities.is_empty() => ReconcilePlan {
            branch: ReconcileBranch::Empty,
            entities: EntityList::new(),
            remote_id: None,
            action: RemoteAction::None,
            conflicts: Vec::new(),
        },
        None => ReconcilePlan {
            branch: ReconcileBranch::CreateFromLocal,
            entities: local.entities.clone(),
            remote_id: None,
            action: RemoteAction::Create,
            conflicts: Vec::new(),
        },
        Some(remote) => match local.remote_id.as_deref() {
            Some(id) if id == remote.id => {
                ReconcilePlan::adopt(ReconcileBranch::RemoteAuthoritative, remote)
            }
            Some(_) => ReconcilePlan::merge(ReconcileBranch::MergeMismatched, local, remote),
            None if local.entities.is_empty() => {
                ReconcilePlan::adopt(ReconcileBranch::AdoptRemote, remote)
            }
            None => ReconcilePlan::merge(ReconcileBranch::MergeUnlinked, local, remote),
        },
    };

    plan.entities = EntityList::from_entities(kind, plan.entities.into_vec());
    plan
}

/// Everything the planner needs, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileInput {
    pub authenticated: bool,
    pub local: LocalSnapshot,
    #[serde(default)]
    pub remote: Option<RemoteSnapshot>,
}

impl ReconcileInput {
    pub fn plan(&self, kind: CollectionKind) -> ReconcilePlan {
        if self.authenticated {
            plan_reconcile(kind, &self.local, self.remote.as_ref())
        } else {
            ReconcilePlan::local_only(&self.local)
        }
    }
}
