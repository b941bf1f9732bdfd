//! The synchronization store.
//!
//! Single owner of the in-memory session cache: all mutation goes through
//! its action methods, which decide the ordering of local-vs-remote effects
//! and reconcile the two. Actions call the repositories, then update the
//! cache — optimistically with the repository's returned outcome where one
//! exists, so the cache never diverges from a local guess.

use std::sync::{Arc, Mutex, MutexGuard};

use cinecat_store::{
    CatRepository, CommentRepository, DocumentStore, EmotionRepository, PostFilters, Post,
    PostRepository, StoreError,
};

use crate::auth::{CurrentUser, Identity};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::state::CommunityState;

pub struct CommunityStore<S, I> {
    pub(crate) posts: PostRepository<S>,
    pub(crate) comments: CommentRepository<S>,
    pub(crate) cats: CatRepository<S>,
    pub(crate) emotions: EmotionRepository<S>,
    pub(crate) identity: I,
    pub(crate) config: ClientConfig,
    pub(crate) state: Arc<Mutex<CommunityState>>,
}

impl<S: DocumentStore, I: Identity> CommunityStore<S, I> {
    pub fn new(store: Arc<S>, identity: I) -> Self {
        Self::with_config(store, identity, ClientConfig::default())
    }

    pub fn with_config(store: Arc<S>, identity: I, config: ClientConfig) -> Self {
        Self {
            posts: PostRepository::new(store.clone()),
            comments: CommentRepository::new(store.clone()),
            cats: CatRepository::new(store.clone()),
            emotions: EmotionRepository::new(store),
            identity,
            config,
            state: Arc::new(Mutex::new(CommunityState::new())),
        }
    }

    /// Clone of the current session cache, for rendering and assertions.
    pub fn snapshot(&self) -> CommunityState {
        self.lock().clone()
    }

    /// Reset all four error strings. Loading phases and cached data are
    /// left alone.
    pub fn clear_errors(&self) {
        let mut state = self.lock();
        state.posts_status.error = None;
        state.comments_status.error = None;
        state.cats_status.error = None;
        state.emotions_status.error = None;
    }

    pub fn set_filters(&self, filters: PostFilters) {
        self.lock().filters = filters;
    }

    pub fn set_current_post(&self, post: Option<Post>) {
        self.lock().current_post = post;
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CommunityState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutating actions fail fast without a signed-in identity.
    pub(crate) fn require_user(&self) -> Result<CurrentUser> {
        self.identity
            .current_user()
            .ok_or(ClientError::AuthorizationRequired)
    }

    pub(crate) fn fail_posts(&self, err: StoreError) -> ClientError {
        self.lock().posts_status.fail(err.to_string());
        err.into()
    }

    pub(crate) fn fail_comments(&self, err: StoreError) -> ClientError {
        self.lock().comments_status.fail(err.to_string());
        err.into()
    }

    pub(crate) fn fail_cats(&self, err: StoreError) -> ClientError {
        self.lock().cats_status.fail(err.to_string());
        err.into()
    }

    pub(crate) fn fail_emotions(&self, err: StoreError) -> ClientError {
        self.lock().emotions_status.fail(err.to_string());
        err.into()
    }
}
