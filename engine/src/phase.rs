//! The per-collection sync state machine.
//!
//! ```text
//!                  LocalLoaded{authenticated: false}
//!   Uninitialized ──────────────────────────────────▶ LocalOnly
//!        │
//!        │ LocalLoaded{authenticated: true}
//!        ▼
//!   Reconciling ──── RemoteSettled ───▶ Ready
//!
//!   any ──── SessionReset ───▶ Uninitialized
//! ```
//!
//! Mutations are only applied in `LocalOnly` and `Ready`. Reconciliation only
//! starts from `Uninitialized`, which makes it run once per session identity.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    /// Nothing loaded yet
    #[default]
    Uninitialized,
    /// Local state loaded, no session to reconcile against
    LocalOnly,
    /// Local state loaded, remote fetch and merge in progress
    Reconciling,
    /// Reconciled with the remote collection
    Ready,
}

/// Inputs that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PhaseEvent {
    LocalLoaded { authenticated: bool },
    RemoteSettled,
    SessionReset,
}

impl SyncPhase {
    /// Next phase for `event`, or an error if the event makes no sense here.
    pub fn on(self, event: PhaseEvent) -> Result<SyncPhase> {
        match (self, event) {
            (_, PhaseEvent::SessionReset) => Ok(SyncPhase::Uninitialized),
            (SyncPhase::Uninitialized, PhaseEvent::LocalLoaded { authenticated: false }) => {
                Ok(SyncPhase::LocalOnly)
            }
            (SyncPhase::Uninitialized, PhaseEvent::LocalLoaded { authenticated: true }) => {
                Ok(SyncPhase::Reconciling)
            }
            (SyncPhase::Reconciling, PhaseEvent::RemoteSettled) => Ok(SyncPhase::Ready),
            (from, event) => Err(Error::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            }),
        }
    }

    /// Whether mutations can be applied directly.
    pub fn accepts_mutations(&self) -> bool {
        matches!(self, SyncPhase::LocalOnly | SyncPhase::Ready)
    }

    pub fn is_initialized(&self) -> bool {
        *self != SyncPhase::Uninitialized
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Uninitialized => "uninitialized",
            SyncPhase::LocalOnly => "localOnly",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Ready => "ready",
        };
        f.write_str(name)
    }
}

impl std::fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PhaseEvent::LocalLoaded { .. } => "localLoaded",
            PhaseEvent::RemoteSettled => "remoteSettled",
            PhaseEvent::SessionReset => "sessionReset",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_path() {
        let phase = SyncPhase::default()
            .on(PhaseEvent::LocalLoaded {
                authenticated: false,
            })
            .unwrap();
        assert_eq!(phase, SyncPhase::LocalOnly);
        assert!(phase.accepts_mutations());
    }

    #[test]
    fn authenticated_path() {
        let phase = SyncPhase::Uninitialized
            .on(PhaseEvent::LocalLoaded {
                authenticated: true,
            })
            .unwrap();
        assert_eq!(phase, SyncPhase::Reconciling);
        assert!(!phase.accepts_mutations());

        let phase = phase.on(PhaseEvent::RemoteSettled).unwrap();
        assert_eq!(phase, SyncPhase::Ready);
        assert!(phase.accepts_mutations());
    }

    #[test]
    fn reset_from_anywhere() {
        for phase in [
            SyncPhase::Uninitialized,
            SyncPhase::LocalOnly,
            SyncPhase::Reconciling,
            SyncPhase::Ready,
        ] {
            assert_eq!(
                phase.on(PhaseEvent::SessionReset).unwrap(),
                SyncPhase::Uninitialized
            );
        }
    }

    #[test]
    fn loading_twice_is_rejected() {
        let err = SyncPhase::Ready
            .on(PhaseEvent::LocalLoaded {
                authenticated: true,
            })
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransition {
                from: "ready".into(),
                event: "localLoaded".into(),
            }
        );

        assert!(SyncPhase::LocalOnly.on(PhaseEvent::RemoteSettled).is_err());
    }
}
