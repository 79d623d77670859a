//! # Tote Client
//!
//! Async runtime that keeps a storefront's cart and liked products usable
//! offline and in step with the user's collections on the server.
//!
//! Each collection kind gets a [`SyncEngine`]. It persists every change to a
//! device-local key-value store, reconciles with the remote collection when a
//! session appears, and pushes changes to the server in the background. The
//! merge decisions themselves come from the pure `tote_engine` crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tote_client::{MemoryRemote, SessionSource, SqliteKv, Storefront};
//! use tote_engine::{Product, Session};
//!
//! # async fn run() -> tote_client::Result<()> {
//! let kv = SqliteKv::connect("sqlite::memory:").await?;
//! let store = Storefront::new(Arc::new(kv), Arc::new(MemoryRemote::new()));
//!
//! let sessions = SessionSource::new(Session::authenticated("user-1", "token"));
//! store.attach(sessions.subscribe());
//!
//! store.cart.add(Product::new("mug", "Mug", 12.0), 2).await?;
//! store.flush().await;
//! assert_eq!(store.cart.quantity_of("mug"), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod remote;
pub mod session;
pub mod storage;
pub mod storefront;
pub mod sync;

pub use config::{Config, ConfigError};
pub use error::{Result, SyncError};
pub use remote::{MemoryRemote, PayloadHttp, RemoteClient, RemoteCollections, RemoteError};
pub use session::{spawn_session_listener, SessionSource};
pub use storage::{KeyValueStore, LocalStore, MemoryKv, SqliteKv, StorageError};
pub use storefront::Storefront;
pub use sync::{CollectionView, SyncEngine};
