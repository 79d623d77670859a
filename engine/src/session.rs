//! Session identity and the transitions between sessions.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// Who is using the device. Authenticated only when both fields are set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Borrowed credentials of an authenticated session.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub user_id: &'a str,
    pub token: &'a str,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: impl Into<UserId>, auth_token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            auth_token: Some(auth_token.into()),
        }
    }

    pub fn credentials(&self) -> Option<Credentials<'_>> {
        match (self.user_id.as_deref(), self.auth_token.as_deref()) {
            (Some(user_id), Some(token)) if !user_id.is_empty() && !token.is_empty() => {
                Some(Credentials { user_id, token })
            }
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }

    /// The user this session acts for, if authenticated.
    pub fn identity(&self) -> Option<&str> {
        self.credentials().map(|c| c.user_id)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// How the session changed between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionTransition {
    /// First observed session
    Initial,
    Unchanged,
    /// Same user, new token
    TokenRefresh,
    /// Anonymous to signed in
    Login,
    /// Signed in to anonymous
    Logout,
    /// One user replaced by another
    UserSwitch,
}

impl SessionTransition {
    pub fn between(prev: Option<&Session>, next: &Session) -> Self {
        let Some(prev) = prev else {
            return SessionTransition::Initial;
        };

        match (prev.identity(), next.identity()) {
            (None, None) => SessionTransition::Unchanged,
            (None, Some(_)) => SessionTransition::Login,
            (Some(_), None) => SessionTransition::Logout,
            (Some(a), Some(b)) if a != b => SessionTransition::UserSwitch,
            (Some(_), Some(_)) if prev.auth_token != next.auth_token => {
                SessionTransition::TokenRefresh
            }
            (Some(_), Some(_)) => SessionTransition::Unchanged,
        }
    }

    /// Whether the collection has to be loaded and reconciled again.
    pub fn requires_reconcile(&self) -> bool {
        matches!(
            self,
            SessionTransition::Initial
                | SessionTransition::Login
                | SessionTransition::Logout
                | SessionTransition::UserSwitch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_needs_both_fields() {
        assert!(Session::authenticated("u1", "t").is_authenticated());
        assert!(!Session::anonymous().is_authenticated());

        let half = Session {
            user_id: Some("u1".into()),
            auth_token: None,
        };
        assert!(!half.is_authenticated());

        let blank = Session::authenticated("u1", "");
        assert!(!blank.is_authenticated());
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", Session::authenticated("u1", "secret-token"));
        assert!(rendered.contains("u1"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn classify_transitions() {
        let anon = Session::anonymous();
        let alice = Session::authenticated("alice", "t1");
        let alice_refreshed = Session::authenticated("alice", "t2");
        let bob = Session::authenticated("bob", "t3");

        assert_eq!(
            SessionTransition::between(None, &anon),
            SessionTransition::Initial
        );
        assert_eq!(
            SessionTransition::between(Some(&anon), &anon),
            SessionTransition::Unchanged
        );
        assert_eq!(
            SessionTransition::between(Some(&anon), &alice),
            SessionTransition::Login
        );
        assert_eq!(
            SessionTransition::between(Some(&alice), &alice_refreshed),
            SessionTransition::TokenRefresh
        );
        assert_eq!(
            SessionTransition::between(Some(&alice), &alice),
            SessionTransition::Unchanged
        );
        assert_eq!(
            SessionTransition::between(Some(&alice), &bob),
            SessionTransition::UserSwitch
        );
        assert_eq!(
            SessionTransition::between(Some(&bob), &anon),
            SessionTransition::Logout
        );
    }

    #[test]
    fn reconcile_needed_only_on_identity_change() {
        assert!(SessionTransition::Initial.requires_reconcile());
        assert!(SessionTransition::Login.requires_reconcile());
        assert!(SessionTransition::UserSwitch.requires_reconcile());
        assert!(SessionTransition::Logout.requires_reconcile());
        assert!(!SessionTransition::TokenRefresh.requires_reconcile());
        assert!(!SessionTransition::Unchanged.requires_reconcile());
    }
}
