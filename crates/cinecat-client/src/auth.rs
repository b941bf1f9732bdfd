//! Identity seam consumed by the synchronization store.
//!
//! Sign-in flows belong to the identity provider; the core only consumes
//! "who is the current user" plus the display snapshot copied onto created
//! records.

use std::sync::Mutex;

use cinecat_shared::UserId;
use cinecat_store::Author;

/// The signed-in user as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    /// Resolved display name (nickname over display name over a fallback).
    pub name: String,
    /// Avatar marker shown next to the name.
    pub avatar: String,
}

impl CurrentUser {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            avatar: avatar.into(),
        }
    }

    /// Snapshot denormalized onto posts and comments at creation time.
    pub fn author(&self) -> Author {
        Author {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Source of the current identity.
pub trait Identity: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// Fixed identity for tests, the demo binary and hosts that manage sign-in
/// themselves.
pub struct StaticIdentity {
    user: Mutex<Option<CurrentUser>>,
}

impl StaticIdentity {
    pub fn signed_out() -> Self {
        Self {
            user: Mutex::new(None),
        }
    }

    pub fn signed_in(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user: Mutex::new(Some(CurrentUser::new(id, name, "👤"))),
        }
    }

    pub fn sign_in(&self, user: CurrentUser) {
        *self.user.lock().unwrap_or_else(|p| p.into_inner()) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
