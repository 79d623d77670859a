//! The cart and liked-products engines, built once and passed around.

use crate::config::Config;
use crate::error::Result;
use crate::remote::{PayloadHttp, RemoteCollections};
use crate::session::spawn_session_listener;
use crate::storage::{KeyValueStore, SqliteKv};
use crate::sync::SyncEngine;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tote_engine::{CollectionKind, Session};

#[derive(Debug, Clone)]
pub struct Storefront {
    pub cart: Arc<SyncEngine>,
    pub liked: Arc<SyncEngine>,
}

impl Storefront {
    /// Both engines over the same stores. They use disjoint local keys.
    pub fn new(kv: Arc<dyn KeyValueStore>, remote: Arc<dyn RemoteCollections>) -> Self {
        Self {
            cart: Arc::new(SyncEngine::new(
                CollectionKind::Cart,
                kv.clone(),
                remote.clone(),
            )),
            liked: Arc::new(SyncEngine::new(CollectionKind::Liked, kv, remote)),
        }
    }

    /// Open the local database and the HTTP backend described by `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let kv = SqliteKv::connect(&config.database_url).await?;
        let remote = PayloadHttp::new(config.require_api_url()?, config.request_timeout)?;
        tracing::info!(api_url = %config.require_api_url()?, database_url = %config.database_url, "Storefront connected");
        Ok(Self::new(Arc::new(kv), Arc::new(remote)))
    }

    pub fn engine(&self, kind: CollectionKind) -> &Arc<SyncEngine> {
        match kind {
            CollectionKind::Cart => &self.cart,
            CollectionKind::Liked => &self.liked,
        }
    }

    /// Drive both engines from `sessions`.
    pub fn attach(&self, sessions: watch::Receiver<Option<Session>>) -> JoinHandle<()> {
        spawn_session_listener(sessions, vec![self.cart.clone(), self.liked.clone()])
    }

    /// Wait for pending remote writes of both collections.
    pub async fn flush(&self) {
        futures::join!(self.cart.flush(), self.liked.flush());
    }
}
