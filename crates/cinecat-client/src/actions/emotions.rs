//! Emotion-journal actions.

use chrono::Utc;

use cinecat_shared::{EmotionId, UserId};
use cinecat_store::{DocumentStore, EmotionDraft, EmotionRecord, EmotionUpdate};

use crate::auth::Identity;
use crate::error::Result;
use crate::store::CommunityStore;

impl<S: DocumentStore, I: Identity> CommunityStore<S, I> {
    /// Fetch the journal — another user's when `user` is given, otherwise
    /// the signed-in user's.
    pub async fn fetch_emotions(&self, user: Option<&UserId>) -> Result<()> {
        let target = match user {
            Some(user) => user.clone(),
            None => self.require_user()?.id,
        };
        self.lock().emotions_status.begin();
        match self.emotions.list_by_user(&target).await {
            Ok(emotions) => {
                let mut state = self.lock();
                state.emotions = emotions;
                state.emotions_status.succeed();
                Ok(())
            }
            Err(err) => Err(self.fail_emotions(err)),
        }
    }

    /// Log an emotion; the repository grants companion experience before
    /// this returns. The new entry is spliced onto the front of the journal.
    pub async fn add_emotion(&self, draft: EmotionDraft) -> Result<EmotionId> {
        let user = self.require_user()?;
        let id = self
            .emotions
            .create(&user.id, draft.clone())
            .await
            .map_err(|err| self.fail_emotions(err))?;

        let now = Utc::now();
        self.lock().emotions.insert(
            0,
            EmotionRecord {
                id,
                user_id: user.id,
                movie_title: draft.movie_title,
                emotion: draft.emotion,
                emoji: draft.emoji,
                text: draft.text,
                intensity: draft.intensity,
                tags: draft.tags,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    pub async fn update_emotion(&self, id: EmotionId, updates: Vec<EmotionUpdate>) -> Result<()> {
        self.require_user()?;
        self.emotions
            .update(id, &updates)
            .await
            .map_err(|err| self.fail_emotions(err))?;

        let now = Utc::now();
        let mut state = self.lock();
        if let Some(record) = state.emotions.iter_mut().find(|e| e.id == id) {
            for update in &updates {
                update.apply(record);
            }
            record.updated_at = now;
        }
        Ok(())
    }

    pub async fn delete_emotion(&self, id: EmotionId) -> Result<()> {
        self.require_user()?;
        self.emotions
            .delete(id)
            .await
            .map_err(|err| self.fail_emotions(err))?;

        self.lock().emotions.retain(|e| e.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cinecat_store::{CatDraft, CatRepository, MemoryStore, UserRepository};

    use super::*;
    use crate::auth::StaticIdentity;
    use crate::error::ClientError;
    use crate::state::LoadPhase;
    use crate::store::CommunityStore;

    fn draft(movie: &str) -> EmotionDraft {
        EmotionDraft {
            movie_title: movie.into(),
            emotion: "wistful".into(),
            emoji: "🥲".into(),
            text: "…".into(),
            intensity: 4,
            tags: vec![],
        }
    }

    async fn harness() -> (Arc<MemoryStore>, CommunityStore<MemoryStore, StaticIdentity>) {
        let store = Arc::new(MemoryStore::new());
        UserRepository::new(store.clone())
            .create_profile(&UserId::new("mina"), Some("mina"), None)
            .await
            .unwrap();
        let community =
            CommunityStore::new(store.clone(), StaticIdentity::signed_in("mina", "Mina"));
        (store, community)
    }

    #[tokio::test]
    async fn logging_splices_front_and_feeds_the_cats() {
        let (store, community) = harness().await;
        let cats = CatRepository::new(store);
        cats.create(
            &UserId::new("mina"),
            CatDraft {
                name: "Mochi".into(),
                emoji: "🐱".into(),
                kind: "feelings expert".into(),
                description: "…".into(),
                specialty: "tearjerkers".into(),
            },
        )
        .await
        .unwrap();

        community.add_emotion(draft("First")).await.unwrap();
        community.add_emotion(draft("Second")).await.unwrap();

        let state = community.snapshot();
        assert_eq!(state.emotions.len(), 2);
        assert_eq!(state.emotions[0].movie_title, "Second");

        let owned = cats.list_by_user(&UserId::new("mina")).await.unwrap();
        assert_eq!(owned[0].experience, 20);
        assert_eq!(owned[0].stats.emotions, 2);
    }

    #[tokio::test]
    async fn families_fail_independently() {
        let (_, community) = harness().await;

        // An invalid draft fails the emotions family only.
        let mut invalid = draft("Too much");
        invalid.intensity = 9;
        let err = community.add_emotion(invalid).await.unwrap_err();
        assert!(matches!(err, ClientError::Store(_)));

        let state = community.snapshot();
        assert_eq!(state.emotions_status.phase, LoadPhase::Failed);
        assert!(state.emotions_status.error.is_some());
        assert_eq!(state.posts_status.phase, LoadPhase::Idle);
        assert!(state.posts_status.error.is_none());

        // A later fetch retries out of the failed phase.
        community.fetch_emotions(None).await.unwrap();
        let state = community.snapshot();
        assert_eq!(state.emotions_status.phase, LoadPhase::Loaded);
        assert!(state.emotions_status.error.is_none());
    }

    #[tokio::test]
    async fn edits_and_deletes_mirror_into_the_cache() {
        let (_, community) = harness().await;
        let id = community.add_emotion(draft("Heat")).await.unwrap();

        community
            .update_emotion(id, vec![EmotionUpdate::Intensity(5)])
            .await
            .unwrap();
        assert_eq!(community.snapshot().emotions[0].intensity, 5);

        community.delete_emotion(id).await.unwrap();
        assert!(community.snapshot().emotions.is_empty());
    }
}
