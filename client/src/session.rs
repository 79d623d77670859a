//! Session propagation from the auth layer to the sync engines.

use crate::sync::SyncEngine;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tote_engine::Session;

/// Publishes the current session.
///
/// `None` means authentication is still bootstrapping; engines wait for the
/// first defined value, anonymous included, before loading anything.
#[derive(Debug)]
pub struct SessionSource {
    tx: watch::Sender<Option<Session>>,
}

impl SessionSource {
    pub fn new(initial: Session) -> Self {
        let (tx, _) = watch::channel(Some(initial));
        Self { tx }
    }

    /// A source whose session is not known yet.
    pub fn pending() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn set(&self, session: Session) {
        self.tx.send_replace(Some(session));
    }

    pub fn login(&self, user_id: impl Into<String>, auth_token: impl Into<String>) {
        self.set(Session::authenticated(user_id, auth_token));
    }

    pub fn logout(&self) {
        self.set(Session::anonymous());
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

/// Forward every session change to `engines` until the source is dropped.
pub fn spawn_session_listener(
    mut rx: watch::Receiver<Option<Session>>,
    engines: Vec<Arc<SyncEngine>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let session = rx.borrow_and_update().clone();
            if let Some(session) = session {
                futures::future::join_all(
                    engines
                        .iter()
                        .map(|engine| engine.on_session(session.clone())),
                )
                .await;
            }

            if rx.changed().await.is_err() {
                tracing::debug!("Session source dropped, stopping listener");
                break;
            }
        }
    })
}
