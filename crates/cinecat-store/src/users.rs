//! User-profile access and the denormalized stat field paths.
//!
//! Profiles are seeded with zeroed counters when an identity first appears;
//! the post and comment repositories then maintain the counters with atomic
//! increments riding in their own batches.

use std::sync::Arc;

use serde_json::Value;

use cinecat_shared::{PostKind, UserId};

use crate::backend::{DocumentStore, Fields};
use crate::error::Result;
use crate::models::{collections, decode, UserProfile, UserStats};

pub(crate) const STAT_POSTS: &str = "stats.postsCount";
pub(crate) const STAT_LIKES_RECEIVED: &str = "stats.likesReceived";
pub(crate) const STAT_COMMENTS_RECEIVED: &str = "stats.commentsReceived";

/// Type-specific counter bumped alongside `stats.postsCount`, if any.
pub(crate) fn kind_stat(kind: PostKind) -> Option<&'static str> {
    match kind {
        PostKind::Review => Some("stats.reviewsCount"),
        PostKind::Discussion => Some("stats.discussionsCount"),
        PostKind::Emotion => Some("stats.emotionsCount"),
        PostKind::General => None,
    }
}

pub struct UserRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> UserRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch a profile. Missing profiles read as `None`.
    pub async fn get(&self, user: &UserId) -> Result<Option<UserProfile>> {
        match self.store.get(collections::USERS, user.as_str()).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Seed a profile document with zeroed stats.
    ///
    /// The counters the other repositories increment live under `stats`;
    /// the profile must exist before its owner's first post or comment.
    pub async fn create_profile(
        &self,
        user: &UserId,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<()> {
        let mut fields = Fields::new();
        if let Some(name) = display_name {
            fields.insert("displayName".into(), Value::String(name.to_owned()));
        }
        if let Some(url) = photo_url {
            fields.insert("photoURL".into(), Value::String(url.to_owned()));
        }
        fields.insert("stats".into(), serde_json::to_value(UserStats::default())?);
        self.store
            .insert(collections::USERS, user.as_str(), fields)
            .await
    }
}
