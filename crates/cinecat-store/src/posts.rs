//! CRUD and denormalized-stat maintenance for community posts.
//!
//! Every cross-document effect (author counters, like counters) rides in the
//! same atomic batch as its causing write, so partial application is never
//! observable.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use cinecat_shared::{PostId, SortDirection, UserId};

use crate::backend::{
    DocumentStore, Fields, OrderBy, PageCursor, Predicate, Query, SubscriptionId, WriteOp,
};
use crate::error::{Result, StoreError};
use crate::models::{
    collections, decode, encode, validate_intensity, validate_rating, Author, LikeOutcome, Post,
    PostDraft, PostFilters, PostUpdate,
};
use crate::users;

pub struct PostRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> PostRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// List posts, newest first. Pass the returned cursor back unchanged to
    /// continue; a page shorter than `page_size` signals exhaustion.
    pub async fn list(
        &self,
        page_size: u32,
        cursor: Option<PageCursor>,
    ) -> Result<(Vec<Post>, Option<PageCursor>)> {
        let query = Query::new(OrderBy::created_desc())
            .limit(page_size)
            .after(cursor);
        self.run(query).await
    }

    /// Same contract as [`list`](Self::list), constrained by the given
    /// filters and sorted by the caller-chosen field.
    pub async fn list_filtered(
        &self,
        filters: &PostFilters,
        page_size: u32,
        cursor: Option<PageCursor>,
    ) -> Result<(Vec<Post>, Option<PageCursor>)> {
        let order = OrderBy::by(
            filters
                .sort_by
                .map(|field| field.field_name())
                .unwrap_or("createdAt"),
            filters.sort_direction.unwrap_or(SortDirection::Desc),
        );
        let mut query = Query::new(order).limit(page_size).after(cursor);
        if let Some(kind) = filters.kind {
            query = query.filter(Predicate::Eq("type".into(), serde_json::to_value(kind)?));
        }
        if let Some(status) = filters.status {
            query = query.filter(Predicate::Eq("status".into(), serde_json::to_value(status)?));
        }
        if let Some(author) = &filters.author {
            query = query.filter(Predicate::Eq(
                "authorId".into(),
                Value::String(author.to_string()),
            ));
        }
        if !filters.tags.is_empty() {
            query = query.filter(Predicate::ArrayContainsAny(
                "tags".into(),
                filters
                    .tags
                    .iter()
                    .map(|tag| Value::String(tag.clone()))
                    .collect(),
            ));
        }
        self.run(query).await
    }

    async fn run(&self, query: Query) -> Result<(Vec<Post>, Option<PageCursor>)> {
        let page = self.store.query(collections::POSTS, &query).await?;
        let next = page.next;
        let posts = page
            .docs
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<Post>>>()?;
        Ok((posts, next))
    }

    /// Fetch one post. Missing posts read as `None`.
    pub async fn get(&self, id: PostId) -> Result<Option<Post>> {
        match self.store.get(collections::POSTS, &id.to_string()).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Insert the post and bump the author's `postsCount` plus the
    /// type-specific counter, atomically.
    pub async fn create(&self, author: &Author, draft: PostDraft) -> Result<PostId> {
        validate_rating(draft.rating)?;
        validate_intensity(draft.emotion_intensity)?;

        let id = PostId::new();
        let mut fields = encode(&draft)?;
        fields.insert("authorId".into(), Value::String(author.id.to_string()));
        fields.insert("authorName".into(), Value::String(author.name.clone()));
        fields.insert("authorAvatar".into(), Value::String(author.avatar.clone()));
        fields.insert("likes".into(), Value::from(0));
        fields.insert("likedBy".into(), Value::Array(Vec::new()));
        fields.insert("comments".into(), Value::from(0));
        fields.insert("views".into(), Value::from(0));

        let mut ops = vec![
            WriteOp::Insert {
                collection: collections::POSTS.into(),
                id: id.to_string(),
                fields,
            },
            WriteOp::Increment {
                collection: collections::USERS.into(),
                id: author.id.to_string(),
                field: users::STAT_POSTS.into(),
                delta: 1,
            },
        ];
        if let Some(path) = users::kind_stat(draft.kind) {
            ops.push(WriteOp::Increment {
                collection: collections::USERS.into(),
                id: author.id.to_string(),
                field: path.into(),
                delta: 1,
            });
        }
        self.store.batch(ops).await?;

        debug!(post = %id, kind = ?draft.kind, "post created");
        Ok(id)
    }

    /// Merge the given field mutations. Counters are never touched here.
    pub async fn update(&self, id: PostId, updates: &[PostUpdate]) -> Result<()> {
        let mut fields = Fields::new();
        for update in updates {
            if let PostUpdate::Rating(rating) = update {
                validate_rating(*rating)?;
            }
            if let PostUpdate::EmotionIntensity(intensity) = update {
                validate_intensity(*intensity)?;
            }
            let (field, value) = update.field()?;
            fields.insert(field.into(), value);
        }
        self.store
            .update(collections::POSTS, &id.to_string(), fields)
            .await
    }

    /// Delete a post, its comments, and the author-counter contributions the
    /// post made, in one batch. Deleting a missing post is a no-op.
    pub async fn delete(&self, id: PostId) -> Result<()> {
        let Some(post) = self.get(id).await? else {
            return Ok(());
        };

        let comments = self
            .store
            .query(
                collections::COMMENTS,
                &Query::new(OrderBy::created_asc()).filter(Predicate::Eq(
                    "postId".into(),
                    Value::String(id.to_string()),
                )),
            )
            .await?;

        let mut ops = vec![WriteOp::Delete {
            collection: collections::POSTS.into(),
            id: id.to_string(),
        }];
        let orphaned = comments.docs.len();
        for doc in comments.docs {
            ops.push(WriteOp::Delete {
                collection: collections::COMMENTS.into(),
                id: doc.id,
            });
        }
        ops.push(WriteOp::Increment {
            collection: collections::USERS.into(),
            id: post.author_id.to_string(),
            field: users::STAT_POSTS.into(),
            delta: -1,
        });
        if let Some(path) = users::kind_stat(post.kind) {
            ops.push(WriteOp::Increment {
                collection: collections::USERS.into(),
                id: post.author_id.to_string(),
                field: path.into(),
                delta: -1,
            });
        }
        self.store.batch(ops).await?;

        debug!(post = %id, comments = orphaned, "post deleted");
        Ok(())
    }

    /// Toggle the caller's like in one atomic multi-document write and
    /// return the outcome decided against store state.
    ///
    /// Likes on one's own post never touch the author's `likesReceived`.
    pub async fn toggle_like(&self, id: PostId, user: &UserId) -> Result<LikeOutcome> {
        let post = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{id}", collections::POSTS)))?;
        let was_liked = post.liked_by.contains(user);
        let delta = if was_liked { -1 } else { 1 };

        let membership = if was_liked {
            WriteOp::ArrayRemove {
                collection: collections::POSTS.into(),
                id: id.to_string(),
                field: "likedBy".into(),
                value: Value::String(user.to_string()),
            }
        } else {
            WriteOp::ArrayAdd {
                collection: collections::POSTS.into(),
                id: id.to_string(),
                field: "likedBy".into(),
                value: Value::String(user.to_string()),
            }
        };
        let mut ops = vec![
            WriteOp::Increment {
                collection: collections::POSTS.into(),
                id: id.to_string(),
                field: "likes".into(),
                delta,
            },
            membership,
        ];
        if post.author_id != *user {
            ops.push(WriteOp::Increment {
                collection: collections::USERS.into(),
                id: post.author_id.to_string(),
                field: users::STAT_LIKES_RECEIVED.into(),
                delta,
            });
        }
        self.store.batch(ops).await?;

        Ok(LikeOutcome {
            liked: !was_liked,
            likes: if was_liked {
                post.likes.saturating_sub(1)
            } else {
                post.likes + 1
            },
        })
    }

    /// Bump the view counter. Accuracy is non-critical telemetry; callers
    /// typically swallow failures.
    pub async fn increment_views(&self, id: PostId) -> Result<()> {
        self.store
            .increment(collections::POSTS, &id.to_string(), "views", 1)
            .await
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Watch one post. The callback fires with the current snapshot
    /// immediately, then on every change, and with `None` once deleted.
    pub fn watch(
        &self,
        id: PostId,
        callback: impl Fn(Option<Post>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.store.subscribe(
            collections::POSTS,
            &id.to_string(),
            Arc::new(move |doc| match doc {
                None => callback(None),
                Some(doc) => match decode::<Post>(doc) {
                    Ok(post) => callback(Some(post)),
                    Err(err) => warn!(%err, "ignoring undecodable post snapshot"),
                },
            }),
        )
    }

    pub fn unwatch(&self, subscription: SubscriptionId) {
        self.store.unsubscribe(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinecat_shared::{PostKind, SortField};
    use crate::memory::MemoryStore;
    use crate::users::UserRepository;

    fn author(id: &str) -> Author {
        Author {
            id: UserId::new(id),
            name: format!("user-{id}"),
            avatar: "👤".into(),
        }
    }

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

    async fn setup() -> (Arc<MemoryStore>, PostRepository<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let users = UserRepository::new(store.clone());
        for uid in ["a", "b", "c", "d"] {
            users
                .create_profile(&UserId::new(uid), None, None)
                .await
                .unwrap();
        }
        (store.clone(), PostRepository::new(store))
    }

    #[tokio::test]
    async fn create_then_get_returns_zeroed_counters() {
        let (store, posts) = setup().await;
        let mut d = draft(PostKind::Review, "Dune");
        d.movie_title = Some("Dune".into());
        d.rating = Some(5);

        let id = posts.create(&author("a"), d).await.unwrap();
        let post = posts.get(id).await.unwrap().unwrap();

        assert_eq!(post.author_id, UserId::new("a"));
        assert_eq!(post.title, "Dune");
        assert_eq!(post.content, "Dune content");
        assert_eq!(post.likes, 0);
        assert!(post.liked_by.is_empty());
        assert_eq!(post.comments, 0);
        assert_eq!(post.views, 0);

        let profile = UserRepository::new(store)
            .get(&UserId::new("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.stats.posts_count, 1);
        assert_eq!(profile.stats.reviews_count, 1);
        assert_eq!(profile.stats.discussions_count, 0);
    }

    #[tokio::test]
    async fn rating_out_of_bounds_is_rejected() {
        let (_, posts) = setup().await;
        let mut d = draft(PostKind::Review, "bad");
        d.rating = Some(6);
        let err = posts.create(&author("a"), d).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue(_)));
    }

    #[tokio::test]
    async fn toggle_like_keeps_count_equal_to_membership() {
        let (_, posts) = setup().await;
        let id = posts
            .create(&author("a"), draft(PostKind::General, "likes"))
            .await
            .unwrap();

        for uid in ["a", "b", "c"] {
            posts.toggle_like(id, &UserId::new(uid)).await.unwrap();
        }
        let post = posts.get(id).await.unwrap().unwrap();
        assert_eq!(post.likes, 3);
        assert_eq!(post.likes as usize, post.liked_by.len());

        let outcome = posts.toggle_like(id, &UserId::new("d")).await.unwrap();
        assert!(outcome.liked);
        assert_eq!(outcome.likes, 4);
        let post = posts.get(id).await.unwrap().unwrap();
        assert!(post.liked_by.contains(&UserId::new("d")));

        let outcome = posts.toggle_like(id, &UserId::new("d")).await.unwrap();
        assert!(!outcome.liked);
        assert_eq!(outcome.likes, 3);
        let post = posts.get(id).await.unwrap().unwrap();
        assert_eq!(post.likes, 3);
        assert!(!post.liked_by.contains(&UserId::new("d")));
    }

    #[tokio::test]
    async fn likes_received_skips_self_likes(){
        let (store, posts) = setup().await;
        let id = posts
            .create(&author("a"), draft(PostKind::General, "self"))
            .await
            .unwrap();

        posts.toggle_like(id, &UserId::new("a")).await.unwrap();
        posts.toggle_like(id, &UserId::new("b")).await.unwrap();

        let profile = UserRepository::new(store)
            .get(&UserId::new("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.stats.likes_received, 1);
    }

    #[tokio::test]
    async fn views_increment_exactly_once_per_call() {
        let (_, posts) = setup().await;
        let id = posts
            .create(&author("a"), draft(PostKind::General, "views"))
            .await
            .unwrap();

        posts.increment_views(id).await.unwrap();
        posts.increment_views(id).await.unwrap();

        let post = posts.get(id).await.unwrap().unwrap();
        assert_eq!(post.views, 2);
    }

    #[tokio::test]
    async fn filtered_listing_by_kind_tags_and_sort() {
        let (_, posts) = setup().await;
        let mut tagged = draft(PostKind::Review, "tagged");
        tagged.tags = vec!["nolan".into(), "imax".into()];
        posts.create(&author("a"), tagged).await.unwrap();
        posts
            .create(&author("b"), draft(PostKind::Discussion, "talk"))
            .await
            .unwrap();

        let filters = PostFilters {
            kind: Some(PostKind::Review),
            ..Default::default()
        };
        let (reviews, _) = posts.list_filtered(&filters, 20, None).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].title, "tagged");

        let filters = PostFilters {
            tags: vec!["imax".into(), "unknown".into()],
            sort_by: Some(SortField::Likes),
            sort_direction: Some(SortDirection::Asc),
            ..Default::default()
        };
        let (by_tag, _) = posts.list_filtered(&filters, 20, None).await.unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].title, "tagged");
    }

    #[tokio::test]
    async fn pagination_pages_are_disjoint_and_ordered() {
        let (_, posts) = setup().await;
        for i in 0..5 {
            posts
                .create(&author("a"), draft(PostKind::General, &format!("p{i}")))
                .await
                .unwrap();
        }

        let (page1, cursor) = posts.list(2, None).await.unwrap();
        assert_eq!(page1.len(), 2);
        let (page2, cursor) = posts.list(2, cursor).await.unwrap();
        assert_eq!(page2.len(), 2);
        let (page3, _) = posts.list(2, cursor).await.unwrap();
        assert_eq!(page3.len(), 1);

        let mut seen: Vec<PostId> = Vec::new();
        for post in page1.iter().chain(&page2).chain(&page3) {
            assert!(!seen.contains(&post.id));
            seen.push(post.id);
        }
    }

    #[tokio::test]
    async fn delete_cascades_comments_and_corrects_counters() {
        let (store, posts) = setup().await;
        let id = posts
            .create(&author("a"), draft(PostKind::Review, "doomed"))
            .await
            .unwrap();

        let comments = crate::comments::CommentRepository::new(store.clone());
        for text in ["first", "second"] {
            comments
                .add(
                    &author("b"),
                    crate::models::CommentDraft {
                        post_id: id,
                        content: text.into(),
                        parent_comment_id: None,
                    },
                )
                .await
                .unwrap();
        }

        posts.delete(id).await.unwrap();

        assert!(posts.get(id).await.unwrap().is_none());
        assert!(comments.list_by_post(id).await.unwrap().is_empty());
        let profile = UserRepository::new(store)
            .get(&UserId::new("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.stats.posts_count, 0);
        assert_eq!(profile.stats.reviews_count, 0);
    }

    #[tokio::test]
    async fn update_merges_fields_without_touching_counters() {
        let (_, posts) = setup().await;
        let id = posts
            .create(&author("a"), draft(PostKind::General, "before"))
            .await
            .unwrap();
        posts.toggle_like(id, &UserId::new("b")).await.unwrap();

        posts
            .update(
                id,
                &[
                    PostUpdate::Title("after".into()),
                    PostUpdate::Tags(vec!["edited".into()]),
                ],
            )
            .await
            .unwrap();

        let post = posts.get(id).await.unwrap().unwrap();
        assert_eq!(post.title, "after");
        assert_eq!(post.tags, vec!["edited".to_owned()]);
        assert_eq!(post.likes, 1);
    }
}
