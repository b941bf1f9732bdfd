//! Post actions: feed pagination, creation with experience grants,
//! authorship-checked edits, like toggles and view telemetry.

use chrono::Utc;
use tracing::warn;

use cinecat_shared::{PostId, UserId};
use cinecat_store::{DocumentStore, Post, PostDraft, PostFilters, PostUpdate, SubscriptionId};

use crate::auth::Identity;
use crate::error::{ClientError, Result};
use crate::state::LoadPhase;
use crate::store::CommunityStore;

impl<S: DocumentStore, I: Identity> CommunityStore<S, I> {
    /// Fetch the first page of the unfiltered feed. `reset` replaces the
    /// cached list; otherwise the page is appended.
    pub async fn fetch_posts(&self, reset: bool) -> Result<()> {
        self.lock().posts_status.begin();
        match self.posts.list(self.config.page_size, None).await {
            Ok((posts, cursor)) => {
                let mut state = self.lock();
                state.has_more_posts = posts.len() as u32 == self.config.page_size;
                state.cursor = cursor;
                if reset {
                    state.posts = posts;
                } else {
                    state.posts.extend(posts);
                }
                state.posts_status.succeed();
                Ok(())
            }
            Err(err) => Err(self.fail_posts(err)),
        }
    }

    /// Filtered first page. The filters are remembered so
    /// [`load_more_posts`](Self::load_more_posts) continues the same search.
    pub async fn search_posts(&self, filters: PostFilters, reset: bool) -> Result<()> {
        {
            let mut state = self.lock();
            state.posts_status.begin();
            state.filters = filters.clone();
        }
        match self
            .posts
            .list_filtered(&filters, self.config.page_size, None)
            .await
        {
            Ok((posts, cursor)) => {
                let mut state = self.lock();
                state.has_more_posts = posts.len() as u32 == self.config.page_size;
                state.cursor = cursor;
                if reset {
                    state.posts = posts;
                } else {
                    state.posts.extend(posts);
                }
                state.posts_status.succeed();
                Ok(())
            }
            Err(err) => Err(self.fail_posts(err)),
        }
    }

    /// Append the next page of the last-used listing. No-op while a page is
    /// already loading, or once the feed is exhausted.
    pub async fn load_more_posts(&self) -> Result<()> {
        let (filters, cursor) = {
            let mut state = self.lock();
            if !state.has_more_posts || state.cursor.is_none() || state.is_loading_more {
                return Ok(());
            }
            state.is_loading_more = true;
            state.posts_status.phase = LoadPhase::Loading;
            (state.filters.clone(), state.cursor.clone())
        };

        let result = if filters.is_empty() {
            self.posts.list(self.config.page_size, cursor).await
        } else {
            self.posts
                .list_filtered(&filters, self.config.page_size, cursor)
                .await
        };

        match result {
            Ok((posts, cursor)) => {
                let mut state = self.lock();
                state.is_loading_more = false;
                state.has_more_posts = posts.len() as u32 == self.config.page_size;
                state.cursor = cursor;
                state.posts.extend(posts);
                state.posts_status.succeed();
                Ok(())
            }
            Err(err) => {
                self.lock().is_loading_more = false;
                Err(self.fail_posts(err))
            }
        }
    }

    /// Focus a single post. A missing post clears the focus rather than
    /// erroring.
    pub async fn fetch_post_by_id(&self, id: PostId) -> Result<()> {
        self.lock().posts_status.begin();
        match self.posts.get(id).await {
            Ok(post) => {
                let mut state = self.lock();
                state.current_post = post;
                state.posts_status.succeed();
                Ok(())
            }
            Err(err) => Err(self.fail_posts(err)),
        }
    }

    /// Create a post, grant companion experience for rewarded kinds, and
    /// splice the new post onto the front of the feed using locally known
    /// timestamps (the persisted ones may differ slightly).
    pub async fn add_post(&self, draft: PostDraft) -> Result<PostId> {
        let user = self.require_user()?;
        let author = user.author();

        let id = self
            .posts
            .create(&author, draft.clone())
            .await
            .map_err(|err| self.fail_posts(err))?;

        if let Some(activity) = draft.kind.activity() {
            self.cats
                .add_experience(&user.id, activity, activity.points())
                .await
                .map_err(|err| self.fail_posts(err))?;
        }

        let now = Utc::now();
        let post = Post {
            id,
            kind: draft.kind,
            author_id: author.id,
            author_name: author.name,
            author_avatar: author.avatar,
            title: draft.title,
            content: draft.content,
            movie_title: draft.movie_title,
            rating: draft.rating,
            emotion: draft.emotion,
            emotion_emoji: draft.emotion_emoji,
            emotion_intensity: draft.emotion_intensity,
            tags: draft.tags,
            likes: 0,
            liked_by: Vec::new(),
            comments: 0,
            views: 0,
            is_active: draft.is_active,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        self.lock().posts.insert(0, post);
        Ok(id)
    }

    /// Edit one's own post. Authorship is checked against the cached copy.
    pub async fn update_post(&self, id: PostId, updates: Vec<PostUpdate>) -> Result<()> {
        let user = self.require_user()?;
        self.check_authorship(id, &user.id)?;

        self.posts
            .update(id, &updates)
            .await
            .map_err(|err| self.fail_posts(err))?;

        let now = Utc::now();
        let mut state = self.lock();
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == id) {
            for update in &updates {
                update.apply(post);
            }
            post.updated_at = now;
        }
        if let Some(post) = state.current_post.as_mut().filter(|p| p.id == id) {
            for update in &updates {
                update.apply(post);
            }
            post.updated_at = now;
        }
        Ok(())
    }

    /// Delete one's own post and drop it from the cache.
    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        let user = self.require_user()?;
        self.check_authorship(id, &user.id)?;

        self.posts
            .delete(id)
            .await
            .map_err(|err| self.fail_posts(err))?;

        let mut state = self.lock();
        state.posts.retain(|p| p.id != id);
        if state.current_post.as_ref().is_some_and(|p| p.id == id) {
            state.current_post = None;
        }
        Ok(())
    }

    /// Toggle the current user's like and update the cached copies from the
    /// repository's returned outcome.
    pub async fn toggle_post_like(&self, id: PostId) -> Result<()> {
        let user = self.require_user()?;
        let outcome = self
            .posts
            .toggle_like(id, &user.id)
            .await
            .map_err(|err| self.fail_posts(err))?;

        let mut state = self.lock();
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == id) {
            outcome.apply(&user.id, &mut post.likes, &mut post.liked_by);
        }
        if let Some(post) = state.current_post.as_mut().filter(|p| p.id == id) {
            outcome.apply(&user.id, &mut post.likes, &mut post.liked_by);
        }
        Ok(())
    }

    /// Best-effort view telemetry: failures are logged and swallowed, and
    /// never touch the posts error flag.
    pub async fn increment_post_views(&self, id: PostId) {
        match self.posts.increment_views(id).await {
            Ok(()) => {
                let mut state = self.lock();
                if let Some(post) = state.posts.iter_mut().find(|p| p.id == id) {
                    post.views += 1;
                }
                if let Some(post) = state.current_post.as_mut().filter(|p| p.id == id) {
                    post.views += 1;
                }
            }
            Err(err) => warn!(post = %id, %err, "view increment failed"),
        }
    }

    /// Keep the cached copies of one post in sync with the remote document.
    pub fn watch_post(&self, id: PostId) -> SubscriptionId {
        let state = self.state.clone();
        self.posts.watch(id, move |post| {
            let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match post {
                Some(post) => {
                    if let Some(entry) = state.posts.iter_mut().find(|p| p.id == post.id) {
                        *entry = post.clone();
                    }
                    if state.current_post.as_ref().is_some_and(|p| p.id == post.id) {
                        state.current_post = Some(post);
                    }
                }
                None => {
                    state.posts.retain(|p| p.id != id);
                    if state.current_post.as_ref().is_some_and(|p| p.id == id) {
                        state.current_post = None;
                    }
                }
            }
        })
    }

    pub fn unwatch_post(&self, subscription: SubscriptionId) {
        self.posts.unwatch(subscription);
    }

    /// A stale cache can let this pass; the store's own access rules are the
    /// real gate.
    fn check_authorship(&self, id: PostId, user: &UserId) -> Result<()> {
        let violates = {
            let state = self.lock();
            state
                .posts
                .iter()
                .find(|p| p.id == id)
                .or(state.current_post.as_ref().filter(|p| p.id == id))
                .is_some_and(|post| post.author_id != *user)
        };
        if violates {
            let err = ClientError::AuthorshipViolation;
            self.lock().posts_status.error = Some(err.to_string());
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cinecat_shared::{PostKind, UserId};
    use cinecat_store::{CatDraft, CatRepository, MemoryStore, UserRepository};

    use super::*;
    use crate::auth::StaticIdentity;
    use crate::config::ClientConfig;
    use crate::state::LoadPhase;

    fn draft(kind: PostKind, title: &str) -> PostDraft {
        PostDraft {
            kind,
            title: title.into(),
            content: format!("{title} content"),
            movie_title: None,
            rating: None,
            emotion: None,
            emotion_emoji: None,
            emotion_intensity: None,
            tags: Vec::new(),
            is_active: None,
            status: None,
        }
    }

    async fn harness(
        signed_in: bool,
    ) -> (Arc<MemoryStore>, CommunityStore<MemoryStore, StaticIdentity>) {
        let store = Arc::new(MemoryStore::new());
        let users = UserRepository::new(store.clone());
        for uid in ["mina", "rival"] {
            users
                .create_profile(&UserId::new(uid), Some(uid), None)
                .await
                .unwrap();
        }
        let identity = if signed_in {
            StaticIdentity::signed_in("mina", "Mina")
        } else {
            StaticIdentity::signed_out()
        };
        let community = CommunityStore::with_config(
            store.clone(),
            identity,
            ClientConfig { page_size: 3 },
        );
        (store, community)
    }

    #[tokio::test]
    async fn mutations_require_identity_and_leave_no_trace() {
        let (_, community) = harness(false).await;

        let err = community
            .add_post(draft(PostKind::General, "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorizationRequired));

        let state = community.snapshot();
        assert!(state.posts.is_empty());
        assert_eq!(state.posts_status.phase, LoadPhase::Idle);
        assert!(state.posts_status.error.is_none());
    }

    #[tokio::test]
    async fn add_post_splices_front_and_grants_experience() {
        let (store, community) = harness(true).await;
        let cats = CatRepository::new(store);
        cats.create(
            &UserId::new("mina"),
            CatDraft {
                name: "Mochi".into(),
                emoji: "🐱".into(),
                kind: "movie critic".into(),
                description: "…".into(),
                specialty: "film noir".into(),
            },
        )
        .await
        .unwrap();

        community
            .add_post(draft(PostKind::General, "older"))
            .await
            .unwrap();
        let id = community
            .add_post(draft(PostKind::Review, "newest"))
            .await
            .unwrap();

        let state = community.snapshot();
        assert_eq!(state.posts.len(), 2);
        assert_eq!(state.posts[0].id, id);
        assert_eq!(state.posts[0].title, "newest");

        let owned = cats.list_by_user(&UserId::new("mina")).await.unwrap();
        assert_eq!(owned[0].experience, 20);
        assert_eq!(owned[0].stats.reviews, 1);
    }

    #[tokio::test]
    async fn pagination_tracks_exhaustion_from_page_length() {
        let (_, community) = harness(true).await;
        for i in 0..4 {
            community
                .add_post(draft(PostKind::General, &format!("p{i}")))
                .await
                .unwrap();
        }

        // Full page of 3: more may follow.
        community.fetch_posts(true).await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.posts.len(), 3);
        assert!(state.has_more_posts);

        // Short page of 1: exhausted.
        community.load_more_posts().await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.posts.len(), 4);
        assert!(!state.has_more_posts);

        // Exhausted feed: loading more is a no-op.
        community.load_more_posts().await.unwrap();
        assert_eq!(community.snapshot().posts.len(), 4);
    }

    #[tokio::test]
    async fn search_remembers_filters_for_load_more() {
        let (_, community) = harness(true).await;
        for i in 0..4 {
            community
                .add_post(draft(PostKind::Review, &format!("r{i}")))
                .await
                .unwrap();
        }
        community
            .add_post(draft(PostKind::Discussion, "talk"))
            .await
            .unwrap();

        let filters = PostFilters {
            kind: Some(PostKind::Review),
            ..Default::default()
        };
        community.search_posts(filters.clone(), true).await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.posts.len(), 3);
        assert_eq!(state.filters, filters);

        community.load_more_posts().await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.posts.len(), 4);
        assert!(state.posts.iter().all(|p| p.kind == PostKind::Review));
        assert!(!state.has_more_posts);
    }

    #[tokio::test]
    async fn toggle_applies_the_repository_outcome() {
        let (_, community) = harness(true).await;
        let id = community
            .add_post(draft(PostKind::General, "likeable"))
            .await
            .unwrap();

        community.toggle_post_like(id).await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.posts[0].likes, 1);
        assert!(state.posts[0].liked_by.contains(&UserId::new("mina")));

        community.toggle_post_like(id).await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.posts[0].likes, 0);
        assert!(state.posts[0].liked_by.is_empty());
    }

    #[tokio::test]
    async fn editing_someone_elses_cached_post_is_refused() {
        let (store, community) = harness(true).await;

        let rival = CommunityStore::new(store, StaticIdentity::signed_in("rival", "Rival"));
        let id = rival
            .add_post(draft(PostKind::General, "rival post"))
            .await
            .unwrap();

        community.fetch_posts(true).await.unwrap();
        let err = community
            .update_post(id, vec![PostUpdate::Title("mine now".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthorshipViolation));

        let state = community.snapshot();
        assert!(state.posts_status.error.is_some());
        assert_eq!(state.posts[0].title, "rival post");
    }

    #[tokio::test]
    async fn store_errors_set_the_family_flag_and_rethrow() {
        let (_, community) = harness(true).await;

        // Not cached, so the authorship check cannot object; the store's
        // NotFound comes back instead.
        let err = community
            .update_post(PostId::new(), vec![PostUpdate::Title("x".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Store(_)));

        let state = community.snapshot();
        assert_eq!(state.posts_status.phase, LoadPhase::Failed);
        assert!(state.posts_status.error.is_some());

        community.clear_errors();
        let state = community.snapshot();
        assert!(state.posts_status.error.is_none());
        assert_eq!(state.posts_status.phase, LoadPhase::Failed);
    }

    #[tokio::test]
    async fn view_failures_are_swallowed() {
        let (_, community) = harness(true).await;

        community.increment_post_views(PostId::new()).await;

        let state = community.snapshot();
        assert!(state.posts_status.error.is_none());
        assert_eq!(state.posts_status.phase, LoadPhase::Idle);
    }

    #[tokio::test]
    async fn views_bump_locally_on_success() {
        let (_, community) = harness(true).await;
        let id = community
            .add_post(draft(PostKind::General, "seen"))
            .await
            .unwrap();

        community.increment_post_views(id).await;
        community.increment_post_views(id).await;

        let state = community.snapshot();
        assert_eq!(state.posts[0].views, 2);
    }

    #[tokio::test]
    async fn watch_post_mirrors_remote_changes_into_the_cache() {
        let (store, community) = harness(true).await;
        let id = community
            .add_post(draft(PostKind::General, "watched"))
            .await
            .unwrap();
        community.fetch_post_by_id(id).await.unwrap();

        let subscription = community.watch_post(id);

        let rival = CommunityStore::new(store, StaticIdentity::signed_in("rival", "Rival"));
        rival.toggle_post_like(id).await.unwrap();

        let state = community.snapshot();
        assert_eq!(state.current_post.as_ref().unwrap().likes, 1);
        assert_eq!(state.posts[0].likes, 1);

        community.unwatch_post(subscription);
        rival.toggle_post_like(id).await.unwrap();
        assert_eq!(community.snapshot().posts[0].likes, 1);
    }

    #[tokio::test]
    async fn missing_post_clears_the_focus() {
        let (_, community) = harness(true).await;
        community.fetch_post_by_id(PostId::new()).await.unwrap();

        let state = community.snapshot();
        assert!(state.current_post.is_none());
        assert_eq!(state.posts_status.phase, LoadPhase::Loaded);
    }

    #[tokio::test]
    async fn delete_post_drops_cached_copies() {
        let (_, community) = harness(true).await;
        let id = community
            .add_post(draft(PostKind::General, "bye"))
            .await
            .unwrap();
        community.fetch_post_by_id(id).await.unwrap();

        community.delete_post(id).await.unwrap();

        let state = community.snapshot();
        assert!(state.posts.is_empty());
        assert!(state.current_post.is_none());
    }
}
