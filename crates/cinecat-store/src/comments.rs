//! Comment records and the derived reply forest.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use cinecat_shared::{CommentId, PostId, UserId};

use crate::backend::{DocumentStore, Fields, OrderBy, Predicate, Query, WriteOp};
use crate::error::{Result, StoreError};
use crate::models::{
    collections, decode, encode, Author, Comment, CommentDraft, CommentUpdate, LikeOutcome, Post,
};
use crate::users;

pub struct CommentRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> CommentRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch every comment of a post (oldest first) and rebuild the reply
    /// forest.
    pub async fn list_by_post(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let page = self
            .store
            .query(
                collections::COMMENTS,
                &Query::new(OrderBy::created_asc()).filter(Predicate::Eq(
                    "postId".into(),
                    Value::String(post_id.to_string()),
                )),
            )
            .await?;
        let flat = page
            .docs
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<Comment>>>()?;
        Ok(build_forest(flat))
    }

    /// Insert the comment, bump the post's `comments` counter, and — when the
    /// commenter is not the post's author — bump the author's
    /// `commentsReceived`, all in one atomic batch.
    pub async fn add(&self, author: &Author, draft: CommentDraft) -> Result<CommentId> {
        let post_doc = self
            .store
            .get(collections::POSTS, &draft.post_id.to_string())
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("{}/{}", collections::POSTS, draft.post_id))
            })?;
        let post: Post = decode(post_doc)?;

        let id = CommentId::new();
        let mut fields = encode(&draft)?;
        fields.insert("authorId".into(), Value::String(author.id.to_string()));
        fields.insert("authorName".into(), Value::String(author.name.clone()));
        fields.insert("authorAvatar".into(), Value::String(author.avatar.clone()));
        fields.insert("likes".into(), Value::from(0));
        fields.insert("likedBy".into(), Value::Array(Vec::new()));

        let mut ops = vec![
            WriteOp::Insert {
                collection: collections::COMMENTS.into(),
                id: id.to_string(),
                fields,
            },
            WriteOp::Increment {
                collection: collections::POSTS.into(),
                id: draft.post_id.to_string(),
                field: "comments".into(),
                delta: 1,
            },
        ];
        if post.author_id != author.id {
            ops.push(WriteOp::Increment {
                collection: collections::USERS.into(),
                id: post.author_id.to_string(),
                field: users::STAT_COMMENTS_RECEIVED.into(),
                delta: 1,
            });
        }
        self.store.batch(ops).await?;

        debug!(comment = %id, post = %draft.post_id, "comment added");
        Ok(id)
    }

    pub async fn update(&self, id: CommentId, updates: &[CommentUpdate]) -> Result<()> {
        let mut fields = Fields::new();
        for update in updates {
            let (field, value) = update.field();
            fields.insert(field.into(), value);
        }
        self.store
            .update(collections::COMMENTS, &id.to_string(), fields)
            .await
    }

    /// Remove the comment and decrement the post's counter atomically.
    ///
    /// Replies are left in place; on the next fetch they surface as
    /// root-level comments because their parent is gone.
    pub async fn delete(&self, id: CommentId, post_id: PostId) -> Result<()> {
        self.store
            .batch(vec![
                WriteOp::Delete {
                    collection: collections::COMMENTS.into(),
                    id: id.to_string(),
                },
                WriteOp::Increment {
                    collection: collections::POSTS.into(),
                    id: post_id.to_string(),
                    field: "comments".into(),
                    delta: -1,
                },
            ])
            .await?;
        debug!(comment = %id, post = %post_id, "comment deleted");
        Ok(())
    }

    /// Toggle the caller's like on a comment. A single-document write; no
    /// author stats are involved.
    pub async fn toggle_like(&self, id: CommentId, user: &UserId) -> Result<LikeOutcome> {
        let doc = self
            .store
            .get(collections::COMMENTS, &id.to_string())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{id}", collections::COMMENTS)))?;
        let comment: Comment = decode(doc)?;
        let was_liked = comment.liked_by.contains(user);

        let membership = if was_liked {
            WriteOp::ArrayRemove {
                collection: collections::COMMENTS.into(),
                id: id.to_string(),
                field: "likedBy".into(),
                value: Value::String(user.to_string()),
            }
        } else {
            WriteOp::ArrayAdd {
                collection: collections::COMMENTS.into(),
                id: id.to_string(),
                field: "likedBy".into(),
                value: Value::String(user.to_string()),
            }
        };
        self.store
            .batch(vec![
                WriteOp::Increment {
                    collection: collections::COMMENTS.into(),
                    id: id.to_string(),
                    field: "likes".into(),
                    delta: if was_liked { -1 } else { 1 },
                },
                membership,
            ])
            .await?;

        Ok(LikeOutcome {
            liked: !was_liked,
            likes: if was_liked {
                comment.likes.saturating_sub(1)
            } else {
                comment.likes + 1
            },
        })
    }
}

/// Rebuild the parent/child forest from a flat, creation-ordered list.
///
/// Every fetched comment appears exactly once: under its parent when the
/// parent is present in the set, otherwise as a root. A comment whose
/// declared parent is missing (deleted) is an orphan and surfaces as a
/// root rather than being dropped.
pub fn build_forest(flat: Vec<Comment>) -> Vec<Comment> {
    let ids: HashSet<CommentId> = flat.iter().map(|comment| comment.id).collect();
    let mut children: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    let mut roots: Vec<Comment> = Vec::new();

    for comment in flat {
        match comment.parent_comment_id {
            Some(parent) if ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            }
            Some(parent) => {
                debug!(comment = %comment.id, %parent, "parent missing; surfacing orphan as root");
                roots.push(comment);
            }
            None => roots.push(comment),
        }
    }

    for root in &mut roots {
        attach_replies(root, &mut children);
    }
    roots
}

fn attach_replies(node: &mut Comment, children: &mut HashMap<CommentId, Vec<Comment>>) {
    node.replies = children.remove(&node.id).unwrap_or_default();
    for reply in &mut node.replies {
        attach_replies(reply, children);
    }
}
