//! Per-collection sync engine.
//!
//! A [`SyncEngine`] owns the in-memory state of one collection kind. It loads
//! the device copy, reconciles it with the user's remote collection once per
//! session identity, applies mutations optimistically and pushes the result to
//! the server from a background writer task.
//!
//! All state changes happen under one FIFO lock, so mutations are serialized
//! and never interleave with reconciliation. Mutations issued before the first
//! reconciliation are deferred and replayed once it finishes.

mod view;
mod writer;

pub use view::CollectionView;
pub use writer::{PendingWrite, WriteQueue};

use crate::error::{Result, SyncError};
use crate::remote::{RemoteClient, RemoteCollection, RemoteCollections};
use crate::storage::{KeyValueStore, LocalStore};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tote_engine::{
    plan_reconcile, ApplyResult, CollectionKind, Entity, EntityList, LocalSnapshot, Mutation,
    PhaseEvent, Product, ProductId, Quantity, RemoteAction, RemoteId, Session, SessionTransition,
    SyncPhase, Totals,
};

/// A mutation waiting for the first reconciliation.
struct Deferred {
    mutation: Mutation,
    done: oneshot::Sender<Result<ApplyResult>>,
}

struct State {
    phase: SyncPhase,
    session: Option<Session>,
    entities: EntityList,
    remote_id: Option<RemoteId>,
    deferred: VecDeque<Deferred>,
    error: Option<String>,
    loading: bool,
    /// The last remote load failed, so an unlinked list may still have a
    /// remote counterpart
    remote_unverified: bool,
    /// Bumped on every session reset; writes of older generations are dropped
    generation: u64,
}

impl State {
    fn new() -> Self {
        Self {
            phase: SyncPhase::Uninitialized,
            session: None,
            entities: EntityList::new(),
            remote_id: None,
            deferred: VecDeque::new(),
            error: None,
            loading: false,
            remote_unverified: false,
            generation: 0,
        }
    }

    fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_authenticated)
    }

    fn view(&self, kind: CollectionKind) -> CollectionView {
        let totals = self.entities.totals(kind);
        CollectionView {
            kind,
            entities: self.entities.clone(),
            remote_id: self.remote_id.clone(),
            phase: self.phase,
            is_loading: self.loading,
            error: self.error.clone(),
            total_count: totals.count,
            total_price: totals.price,
        }
    }
}

struct Shared {
    kind: CollectionKind,
    local: LocalStore,
    remote: RemoteClient,
    state: Mutex<State>,
    view: watch::Sender<CollectionView>,
    queue: WriteQueue,
    /// Held by the writer for the whole of a remote write
    in_flight: Mutex<()>,
}

/// Outcome of one remote write.
enum Written {
    Linked(Option<RemoteId>),
    Deleted { remote_id: RemoteId, deleted: bool },
    Skipped,
}

impl Shared {
    fn publish(&self, state: &State) {
        self.view.send_replace(state.view(self.kind));
    }

    fn transition(&self, state: &mut State, event: PhaseEvent) {
        match state.phase.on(event) {
            Ok(next) => {
                tracing::debug!(kind = %self.kind, from = %state.phase, to = %next, "Phase transition");
                state.phase = next;
            }
            Err(e) => tracing::warn!(kind = %self.kind, error = %e, "Ignoring phase event"),
        }
    }

    fn reset(&self, state: &mut State) {
        self.transition(state, PhaseEvent::SessionReset);
        state.generation += 1;
        state.loading = false;
        state.error = None;
        state.remote_unverified = false;
    }

    async fn apply_locked(&self, state: &mut State, mutation: &Mutation) -> Result<ApplyResult> {
        let result = state.entities.apply(self.kind, mutation)?;
        if !result.changed {
            tracing::debug!(kind = %self.kind, mutation = mutation.name(), "Mutation changed nothing");
            return Ok(result);
        }

        let authenticated = state.is_authenticated();
        if state.entities.is_empty() && !authenticated {
            state.remote_id = None;
        }

        tracing::debug!(
            kind = %self.kind,
            mutation = mutation.name(),
            entities = result.len,
            "Applied mutation"
        );
        self.publish(state);
        self.local
            .save(&state.entities, state.remote_id.as_deref())
            .await;

        if authenticated {
            self.queue.push(PendingWrite {
                generation: state.generation,
                entities: state.entities.clone(),
            });
        }
        Ok(result)
    }

    async fn replay_deferred(&self, state: &mut State) {
        if !state.deferred.is_empty() {
            tracing::debug!(kind = %self.kind, count = state.deferred.len(), "Replaying deferred mutations");
        }
        while let Some(Deferred { mutation, done }) = state.deferred.pop_front() {
            let result = self.apply_locked(state, &mutation).await;
            // The caller may have given up waiting.
            let _ = done.send(result);
        }
    }

    /// Load the device copy and converge with the remote collection.
    ///
    /// Runs only from `Uninitialized`, so at most once per session identity.
    async fn reconcile(&self, state: &mut State) {
        if state.phase.is_initialized() {
            tracing::debug!(kind = %self.kind, "Already reconciled for this session");
            return;
        }

        let session = state.session.clone().unwrap_or_default();
        let local = self.local.load().await;
        state.entities = local.entities.clone();
        state.remote_id = local.remote_id.clone();

        let authenticated = session.is_authenticated();
        self.transition(state, PhaseEvent::LocalLoaded { authenticated });
        self.publish(state);

        if !authenticated {
            tracing::info!(kind = %self.kind, entities = state.entities.len(), "No authenticated user, using local collection only");
            self.replay_deferred(state).await;
            return;
        }

        state.loading = true;
        self.publish(state);

        match self.remote.fetch_for_user(&session).await {
            Ok(remote) => {
                state.error = None;
                state.remote_unverified = false;
                self.converge(state, &session, &local, remote).await;
            }
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "Remote unavailable, keeping local collection");
                state.error = Some(e.user_message(&format!("load {}", self.kind.label())));
                state.remote_unverified = state.remote_id.is_none();
            }
        }

        self.transition(state, PhaseEvent::RemoteSettled);
        state.loading = false;
        self.publish(state);
        self.replay_deferred(state).await;
    }

    async fn converge(
        &self,
        state: &mut State,
        session: &Session,
        local: &LocalSnapshot,
        remote: Option<RemoteCollection>,
    ) {
        let remote = remote.map(|collection| collection.snapshot());
        let plan = plan_reconcile(self.kind, local, remote.as_ref());

        tracing::info!(
            kind = %self.kind,
            branch = %plan.branch,
            entities = plan.entities.len(),
            remote_id = ?plan.remote_id,
            remote_write = plan.needs_remote_write(),
            "Reconciled collection"
        );
        for conflict in &plan.conflicts {
            tracing::debug!(kind = %self.kind, product_id = %conflict.product_id, "Kept local version of conflicting product");
        }

        state.entities = plan.entities.clone();
        state.remote_id = plan.remote_id.clone();

        let written = match &plan.action {
            RemoteAction::None => Ok(None),
            RemoteAction::Create => self.remote.create(session, &plan.entities).await,
            RemoteAction::Update { remote_id } => {
                self.remote.update(session, remote_id, &plan.entities).await
            }
        };
        match written {
            Ok(Some(remote_id)) => state.remote_id = Some(remote_id),
            Ok(None) => {}
            Err(e) => {
                state.error = Some(e.user_message(&format!("save {}", self.kind.label())));
            }
        }

        self.local
            .save(&state.entities, state.remote_id.as_deref())
            .await;
    }

    /// Send one queued write, reading the remote id at send time.
    async fn send(&self, write: PendingWrite) {
        let (session, remote_id, unverified) = {
            let mut state = self.state.lock().await;
            if state.generation != write.generation {
                tracing::debug!(kind = %self.kind, "Dropping remote write from a previous session");
                return;
            }
            state.loading = true;
            self.publish(&state);
            (
                state.session.clone().unwrap_or_default(),
                state.remote_id.clone(),
                state.remote_unverified,
            )
        };

        if unverified && remote_id.is_none() && !write.entities.is_empty() {
            self.relink(&session, write).await;
            return;
        }

        let (action, result) = match (write.entities.is_empty(), remote_id) {
            (true, Some(remote_id)) => (
                "delete",
                self.remote
                    .delete(&session, &remote_id)
                    .await
                    .map(|deleted| Written::Deleted { remote_id, deleted }),
            ),
            (true, None) => ("save", Ok(Written::Skipped)),
            (false, Some(remote_id)) => (
                "save",
                self.remote
                    .update(&session, &remote_id, &write.entities)
                    .await
                    .map(Written::Linked),
            ),
            (false, None) => (
                "save",
                self.remote
                    .create(&session, &write.entities)
                    .await
                    .map(Written::Linked),
            ),
        };

        let mut state = self.state.lock().await;
        if state.generation != write.generation {
            tracing::warn!(kind = %self.kind, "Session changed during remote write, discarding result");
            return;
        }

        match result {
            Ok(Written::Linked(Some(remote_id))) => {
                state.error = None;
                if state.remote_id.as_deref() != Some(remote_id.as_str()) {
                    state.remote_id = Some(remote_id);
                    self.local
                        .save(&state.entities, state.remote_id.as_deref())
                        .await;
                }
            }
            Ok(Written::Deleted {
                remote_id,
                deleted: true,
            }) => {
                state.error = None;
                if state.remote_id.as_deref() == Some(remote_id.as_str()) {
                    state.remote_id = None;
                    self.local.save(&state.entities, None).await;
                }
            }
            Ok(_) => {}
            Err(e) => {
                state.error = Some(e.user_message(&format!("{action} {}", self.kind.label())));
            }
        }

        state.loading = false;
        self.publish(&state);
    }

    /// Look for the user's remote collection before creating one.
    ///
    /// Runs instead of a create when the load during reconciliation failed.
    /// A collection found now is merged in as reconciliation would have done,
    /// and the latest contents are queued again against the resulting link.
    async fn relink(&self, session: &Session, write: PendingWrite) {
        let fetched = self.remote.fetch_for_user(session).await;

        let mut state = self.state.lock().await;
        if state.generation != write.generation {
            tracing::warn!(kind = %self.kind, "Session changed during remote lookup, discarding result");
            return;
        }

        match fetched {
            Ok(found) => {
                state.remote_unverified = false;
                state.error = None;
                if let Some(remote) = found {
                    let local = LocalSnapshot::new(state.entities.clone(), None);
                    let plan = plan_reconcile(self.kind, &local, Some(&remote.snapshot()));
                    tracing::info!(
                        kind = %self.kind,
                        branch = %plan.branch,
                        remote_id = %remote.id,
                        "Linked to existing remote collection"
                    );
                    state.entities = plan.entities;
                    state.remote_id = plan.remote_id;
                    self.local
                        .save(&state.entities, state.remote_id.as_deref())
                        .await;
                }
                self.queue.push(PendingWrite {
                    generation: state.generation,
                    entities: state.entities.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "Remote still unavailable, not creating a collection");
                state.error = Some(e.user_message(&format!("save {}", self.kind.label())));
            }
        }

        state.loading = false;
        self.publish(&state);
    }
}

async fn write_loop(shared: Arc<Shared>) {
    loop {
        let (seq, write) = shared.queue.next().await;
        {
            let _sending = shared.in_flight.lock().await;
            shared.send(write).await;
        }
        shared.queue.complete(seq);
    }
}

/// Sync engine of one collection kind.
///
/// Must be created inside a tokio runtime: it spawns its remote writer task,
/// which is aborted when the engine is dropped.
pub struct SyncEngine {
    shared: Arc<Shared>,
    writer: JoinHandle<()>,
}

impl SyncEngine {
    pub fn new(
        kind: CollectionKind,
        kv: Arc<dyn KeyValueStore>,
        transport: Arc<dyn RemoteCollections>,
    ) -> Self {
        let (view, _) = watch::channel(CollectionView::empty(kind));
        let shared = Arc::new(Shared {
            kind,
            local: LocalStore::new(kind, kv),
            remote: RemoteClient::new(kind, transport),
            state: Mutex::new(State::new()),
            view,
            queue: WriteQueue::new(),
            in_flight: Mutex::new(()),
        });
        let writer = tokio::spawn(write_loop(shared.clone()));
        Self { shared, writer }
    }

    pub fn kind(&self) -> CollectionKind {
        self.shared.kind
    }

    /// Receive a [`CollectionView`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<CollectionView> {
        self.shared.view.subscribe()
    }

    /// The latest published view.
    pub fn view(&self) -> CollectionView {
        self.shared.view.borrow().clone()
    }

    /// Wait until mutations are applied directly.
    pub async fn ready(&self) {
        let mut view = self.subscribe();
        // The sender is owned by `self`.
        let _ = view.wait_for(CollectionView::is_ready).await;
    }

    /// Wait until every remote write queued so far was sent or superseded.
    pub async fn flush(&self) {
        self.shared.queue.flush().await;
    }

    /// React to a new session value.
    pub async fn on_session(&self, session: Session) {
        let shared = &self.shared;
        let mut state = shared.state.lock().await;
        let transition = SessionTransition::between(state.session.as_ref(), &session);
        tracing::info!(kind = %shared.kind, ?transition, user_id = ?session.identity(), "Session changed");
        state.session = Some(session);

        if !transition.requires_reconcile() {
            return;
        }

        match transition {
            SessionTransition::Logout => {
                state.remote_id = None;
                shared.local.save(&state.entities, None).await;
            }
            SessionTransition::UserSwitch => {
                state.entities = EntityList::new();
                state.remote_id = None;
                shared.local.save(&state.entities, None).await;
            }
            _ => {}
        }
        if transition != SessionTransition::Initial {
            shared.reset(&mut state);
        }
        shared.reconcile(&mut state).await;
    }

    /// Apply `mutation`, deferring it until the first reconciliation is done.
    pub async fn apply(&self, mutation: Mutation) -> Result<ApplyResult> {
        let mut state = self.shared.state.lock().await;
        if state.phase.accepts_mutations() {
            return self.shared.apply_locked(&mut state, &mutation).await;
        }

        tracing::debug!(kind = %self.shared.kind, mutation = mutation.name(), "Deferring mutation until reconciled");
        let (done, applied) = oneshot::channel();
        state.deferred.push_back(Deferred { mutation, done });
        drop(state);
        applied.await.map_err(|_| SyncError::Closed)?
    }

    pub async fn add(&self, product: Product, quantity: Quantity) -> Result<ApplyResult> {
        self.apply(Mutation::add(product, quantity)).await
    }

    pub async fn remove(&self, product_id: impl Into<ProductId>) -> Result<ApplyResult> {
        self.apply(Mutation::remove(product_id)).await
    }

    /// Set a cart quantity. Zero or less removes the product.
    pub async fn update_quantity(
        &self,
        product_id: impl Into<ProductId>,
        quantity: i64,
    ) -> Result<ApplyResult> {
        self.apply(Mutation::set_quantity(product_id, quantity)).await
    }

    pub async fn clear(&self) -> Result<ApplyResult> {
        self.apply(Mutation::clear()).await
    }

    /// Reload from the source of truth, dropping unsent local changes.
    ///
    /// Without a session that is the device copy. With one, the remote
    /// collection replaces the local one; when there is none, local entities
    /// are uploaded as a new collection.
    pub async fn refetch(&self) -> Result<()> {
        let shared = &self.shared;
        // A write still in flight could create a collection this fetch misses.
        let _writer = shared.in_flight.lock().await;
        let mut state = shared.state.lock().await;
        if !state.phase.is_initialized() {
            tracing::debug!(kind = %shared.kind, "Nothing loaded yet, skipping refetch");
            return Ok(());
        }
        state.generation += 1;

        if !state.is_authenticated() {
            let local = shared.local.load().await;
            state.entities = local.entities;
            state.remote_id = local.remote_id;
            shared.publish(&state);
            return Ok(());
        }

        let session = state.session.clone().unwrap_or_default();
        state.loading = true;
        shared.publish(&state);

        let outcome = match shared.remote.fetch_for_user(&session).await {
            Ok(Some(remote)) => {
                tracing::info!(kind = %shared.kind, remote_id = %remote.id, "Adopting remote collection");
                state.entities = remote.entities;
                state.remote_id = Some(remote.id);
                Ok(())
            }
            Ok(None) if !state.entities.is_empty() => {
                match shared.remote.create(&session, &state.entities).await {
                    Ok(remote_id) => {
                        state.remote_id = remote_id;
                        Ok(())
                    }
                    Err(e) => Err((format!("save {}", shared.kind.label()), e)),
                }
            }
            Ok(None) => {
                state.entities = EntityList::new();
                state.remote_id = None;
                Ok(())
            }
            Err(e) => Err((format!("load {}", shared.kind.label()), e)),
        };

        state.loading = false;
        let result = match outcome {
            Ok(()) => {
                state.error = None;
                state.remote_unverified = false;
                shared
                    .local
                    .save(&state.entities, state.remote_id.as_deref())
                    .await;
                Ok(())
            }
            Err((action, e)) => {
                state.error = Some(e.user_message(&action));
                Err(e.into())
            }
        };
        shared.publish(&state);
        result
    }

    pub fn get(&self, product_id: &str) -> Option<Entity> {
        self.shared.view.borrow().entities.get(product_id).cloned()
    }

    pub fn quantity_of(&self, product_id: &str) -> Quantity {
        self.shared.view.borrow().entities.quantity_of(product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.shared.view.borrow().entities.contains(product_id)
    }

    pub fn totals(&self) -> Totals {
        let view = self.shared.view.borrow();
        Totals {
            count: view.total_count,
            price: view.total_price,
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("kind", &self.shared.kind)
            .finish_non_exhaustive()
    }
}
