//! # Tote Engine
//!
//! A deterministic reconciliation engine for offline-first shopping carts
//! and liked-item lists.
//!
//! This crate provides the core logic behind keeping a device-local
//! collection and a per-user server collection in step. It owns the data
//! model, the mutation rules, the local-wins merge, the reconciliation plan
//! and the sync state machine. The same inputs always produce the same
//! outputs.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of storage, network, or platform
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic, no mocks needed
//! - **Portable**: Runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! An [`Entity`] is a product snapshot, with a quantity when it sits in a
//! cart. An [`EntityList`] keeps entities in insertion order and never holds
//! two entries for the same product id.
//!
//! ### Collection kinds
//!
//! [`CollectionKind::Cart`] accumulates quantities when the same product is
//! added twice. [`CollectionKind::Liked`] ignores repeated adds. Storage keys
//! and wire names are per kind.
//!
//! ### Mutations
//!
//! Changes are expressed as [`Mutation`] values and applied with
//! [`EntityList::apply`]:
//! - `Add` - Add a product (accumulate or ignore, per kind)
//! - `SetQuantity` - Set a cart line's quantity, removing it at zero
//! - `Remove` - Remove a product
//! - `Clear` - Empty the collection
//!
//! ### Reconciliation
//!
//! [`plan_reconcile`] decides how a [`LocalSnapshot`] and the user's
//! [`RemoteSnapshot`] converge. Shared products keep their local attributes
//! ([`merge_local_wins`]) and the plan names the single remote write to
//! perform.
//!
//! ### Phases and sessions
//!
//! [`SyncPhase`] gates when mutations may run. [`SessionTransition`]
//! classifies login, logout, user switch and token refresh.
//!
//! ## Quick Start
//!
//! ```rust
//! use tote_engine::{
//!     plan_reconcile, CollectionKind, Entity, EntityList, LocalSnapshot, Mutation, Product,
//!     ReconcileBranch, RemoteSnapshot,
//! };
//!
//! let kind = CollectionKind::Cart;
//!
//! // 1. Build up a cart while signed out
//! let mut local = EntityList::new();
//! local.apply(kind, &Mutation::add(Product::new("mug", "Mug", 12.0), 2)).unwrap();
//!
//! // 2. The user signs in and already has a cart on the server
//! let remote = RemoteSnapshot {
//!     id: "cart-1".to_string(),
//!     entities: EntityList::from_entities(
//!         kind,
//!         vec![Entity::cart(Product::new("bowl", "Bowl", 8.0), 1)],
//!     ),
//! };
//!
//! // 3. Plan the reconciliation
//! let plan = plan_reconcile(kind, &LocalSnapshot::new(local, None), Some(&remote));
//! assert_eq!(plan.branch, ReconcileBranch::MergeUnlinked);
//! assert_eq!(plan.entities.ids(), vec!["mug", "bowl"]);
//! assert_eq!(plan.remote_id.as_deref(), Some("cart-1"));
//! assert_eq!(plan.entities.totals(kind).price, 32.0);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other languages
//! (Dart/Flutter, Swift, Kotlin, etc.). All data is exchanged as JSON strings.
//!
//! ## Persistence
//!
//! Use [`LocalSnapshot::encode_entities`] and [`LocalSnapshot::decode`] to
//! move a collection in and out of a key-value store.

pub mod collection;
pub mod entity;
pub mod error;
pub mod ffi;
pub mod kind;
pub mod mutation;
pub mod phase;
pub mod reconcile;
pub mod session;
pub mod snapshot;

// Re-export main types at crate root
pub use collection::{ApplyResult, EntityList, Totals};
pub use entity::{Entity, Product};
pub use error::Error;
pub use kind::{AddPolicy, CollectionKind, StorageKeys};
pub use mutation::Mutation;
pub use phase::{PhaseEvent, SyncPhase};
pub use reconcile::{
    merge_local_wins, plan_reconcile, Conflict, MergeOutcome, ReconcileBranch, ReconcileInput,
    ReconcilePlan, RemoteAction, RemoteSnapshot,
};
pub use session::{Credentials, Session, SessionTransition};
pub use snapshot::LocalSnapshot;

/// Type aliases for clarity
pub type ProductId = String;
pub type RemoteId = String;
pub type UserId = String;
pub type Quantity = u32;
