//! Comment actions: forest fetch, optimistic splice and recursive in-tree
//! edits of the cached reply forest.

use chrono::Utc;

use cinecat_shared::{CommentId, PostId};
use cinecat_store::{Comment, CommentDraft, CommentUpdate, DocumentStore};

use crate::auth::Identity;
use crate::error::Result;
use crate::store::CommunityStore;

impl<S: DocumentStore, I: Identity> CommunityStore<S, I> {
    /// Fetch the reply forest for a post.
    pub async fn fetch_comments(&self, post_id: PostId) -> Result<()> {
        self.lock().comments_status.begin();
        match self.comments.list_by_post(post_id).await {
            Ok(forest) => {
                let mut state = self.lock();
                state.comments = forest;
                state.comments_status.succeed();
                Ok(())
            }
            Err(err) => Err(self.fail_comments(err)),
        }
    }

    /// Create a comment and splice it into the cached forest: under its
    /// parent when it is a reply, appended as a new root otherwise. The
    /// post's cached comment counters bump alongside.
    pub async fn add_comment(&self, draft: CommentDraft) -> Result<CommentId> {
        let user = self.require_user()?;
        let author = user.author();

        let id = self
            .comments
            .add(&author, draft.clone())
            .await
            .map_err(|err| self.fail_comments(err))?;

        let now = Utc::now();
        let comment = Comment {
            id,
            post_id: draft.post_id,
            author_id: author.id,
            author_name: author.name,
            author_avatar: author.avatar,
            content: draft.content,
            likes: 0,
            liked_by: Vec::new(),
            parent_comment_id: draft.parent_comment_id,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock();
        match draft.parent_comment_id {
            Some(parent) => {
                if let Some(root) = state.comments.iter_mut().find(|c| c.id == parent) {
                    root.replies.push(comment);
                }
            }
            None => state.comments.push(comment),
        }
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == draft.post_id) {
            post.comments += 1;
        }
        if let Some(post) = state.current_post.as_mut().filter(|p| p.id == draft.post_id) {
            post.comments += 1;
        }
        Ok(id)
    }

    pub async fn update_comment(&self, id: CommentId, updates: Vec<CommentUpdate>) -> Result<()> {
        self.require_user()?;
        self.comments
            .update(id, &updates)
            .await
            .map_err(|err| self.fail_comments(err))?;

        let now = Utc::now();
        let mut state = self.lock();
        edit_in_tree(&mut state.comments, id, &mut |comment| {
            for update in &updates {
                update.apply(comment);
            }
            comment.updated_at = now;
        });
        Ok(())
    }

    /// Delete a comment. Replies stay persisted and surface as roots on the
    /// next fetch; locally the whole subtree disappears until then.
    pub async fn delete_comment(&self, id: CommentId, post_id: PostId) -> Result<()> {
        self.require_user()?;
        self.comments
            .delete(id, post_id)
            .await
            .map_err(|err| self.fail_comments(err))?;

        let mut state = self.lock();
        remove_from_tree(&mut state.comments, id);
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.comments = post.comments.saturating_sub(1);
        }
        if let Some(post) = state.current_post.as_mut().filter(|p| p.id == post_id) {
            post.comments = post.comments.saturating_sub(1);
        }
        Ok(())
    }

    /// Toggle the current user's like on a comment and apply the outcome
    /// wherever the comment sits in the cached forest.
    pub async fn toggle_comment_like(&self, id: CommentId) -> Result<()> {
        let user = self.require_user()?;
        let outcome = self
            .comments
            .toggle_like(id, &user.id)
            .await
            .map_err(|err| self.fail_comments(err))?;

        let mut state = self.lock();
        edit_in_tree(&mut state.comments, id, &mut |comment| {
            outcome.apply(&user.id, &mut comment.likes, &mut comment.liked_by);
        });
        Ok(())
    }
}

/// Apply `edit` to the comment with `id`, wherever it sits in the forest.
fn edit_in_tree(
    comments: &mut [Comment],
    id: CommentId,
    edit: &mut impl FnMut(&mut Comment),
) -> bool {
    for comment in comments {
        if comment.id == id {
            edit(comment);
            return true;
        }
        if edit_in_tree(&mut comment.replies, id, edit) {
            return true;
        }
    }
    false
}

/// Drop the comment with `id` from the forest, pruning reply lists too.
fn remove_from_tree(comments: &mut Vec<Comment>, id: CommentId) {
    comments.retain(|comment| comment.id != id);
    for comment in comments {
        remove_from_tree(&mut comment.replies, id);
    }
}
