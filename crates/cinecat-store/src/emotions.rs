//! Personal emotion-journal entries.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use cinecat_shared::{ActivityKind, EmotionId, UserId};

use crate::backend::{DocumentStore, Fields, OrderBy, Predicate, Query};
use crate::cats::CatRepository;
use crate::error::Result;
use crate::models::{
    collections, decode, encode, validate_intensity, EmotionDraft, EmotionRecord, EmotionUpdate,
};

pub struct EmotionRepository<S> {
    store: Arc<S>,
    cats: CatRepository<S>,
}

impl<S: DocumentStore> EmotionRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            cats: CatRepository::new(store.clone()),
            store,
        }
    }

    /// The user's journal, newest first.
    pub async fn list_by_user(&self, user: &UserId) -> Result<Vec<EmotionRecord>> {
        let page = self
            .store
            .query(
                collections::EMOTIONS,
                &Query::new(OrderBy::created_desc()).filter(Predicate::Eq(
                    "userId".into(),
                    Value::String(user.to_string()),
                )),
            )
            .await?;
        page.docs.into_iter().map(decode).collect()
    }

    /// Insert the record, then grant companion experience.
    ///
    /// The two are sequential, independent operations: the journal entry
    /// persists even when the grant fails, and the caller sees the grant's
    /// error in that case.
    pub async fn create(&self, user: &UserId, draft: EmotionDraft) -> Result<EmotionId> {
        validate_intensity(Some(draft.intensity))?;

        let id = EmotionId::new();
        let mut fields = encode(&draft)?;
        fields.insert("userId".into(), Value::String(user.to_string()));
        self.store
            .insert(collections::EMOTIONS, &id.to_string(), fields)
            .await?;
        debug!(emotion = %id, user = %user, "emotion logged");

        self.cats
            .add_experience(user, ActivityKind::Emotion, ActivityKind::Emotion.points())
            .await?;
        Ok(id)
    }

    pub async fn update(&self, id: EmotionId, updates: &[EmotionUpdate]) -> Result<()> {
        let mut fields = Fields::new();
        for update in updates {
            if let EmotionUpdate::Intensity(intensity) = update {
                validate_intensity(Some(*intensity))?;
            }
            let (field, value) = update.field()?;
            fields.insert(field.into(), value);
        }
        self.store
            .update(collections::EMOTIONS, &id.to_string(), fields)
            .await
    }

    pub async fn delete(&self, id: EmotionId) -> Result<()> {
        self.store
            .delete(collections::EMOTIONS, &id.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatDraft;

    use crate::memory::MemoryStore;

    fn draft(movie: &str, intensity: u8) -> EmotionDraft {
        EmotionDraft {
            movie_title: movie.into(),
            emotion: "wistful".into(),
            emoji: "🥲".into(),
            text: "…".into(),
            intensity,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn creation_grants_companion_experience() {
        let store = Arc::new(MemoryStore::new());
        let emotions = EmotionRepository::new(store.clone());
        let cats = CatRepository::new(store);
        let user = UserId::new("u1");
        cats.create(
            &user,
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

        emotions.create(&user, draft("Her", 4)).await.unwrap();

        let owned = cats.list_by_user(&user).await.unwrap();
        assert_eq!(owned[0].experience, 10);
        assert_eq!(owned[0].stats.emotions, 1);
    }

    #[tokio::test]
    async fn journal_lists_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let emotions = EmotionRepository::new(store);
        let user = UserId::new("u1");

        emotions.create(&user, draft("First", 2)).await.unwrap();
        emotions.create(&user, draft("Second", 3)).await.unwrap();

        let listed = emotions.list_by_user(&user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }

    #[tokio::test]
    async fn intensity_bounds_are_enforced() {
        let store = Arc::new(MemoryStore::new());
        let emotions = EmotionRepository::new(store);
        let err = emotions
            .create(&UserId::new("u1"), draft("Too much", 9))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StoreError::InvalidValue(_)));

        let listed = emotions.list_by_user(&UserId::new("u1")).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_have_no_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let emotions = EmotionRepository::new(store.clone());
        let cats = CatRepository::new(store);
        let user = UserId::new("u1");

        let id = emotions.create(&user, draft("Heat", 3)).await.unwrap();
        emotions
            .update(id, &[EmotionUpdate::Intensity(5)])
            .await
            .unwrap();

        let listed = emotions.list_by_user(&user).await.unwrap();
        assert_eq!(listed[0].intensity, 5);

        emotions.delete(id).await.unwrap();
        assert!(emotions.list_by_user(&user).await.unwrap().is_empty());
        assert!(cats.list_by_user(&user).await.unwrap().is_empty());
    }
}
