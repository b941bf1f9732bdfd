//! Companion ("cat") records and the experience fan-out.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use cinecat_shared::constants::{level_for, XP_PER_LEVEL};
use cinecat_shared::{ActivityKind, CatId, UserId};

use crate::backend::{DocumentStore, Fields, OrderBy, Predicate, Query};
use crate::error::Result;
use crate::models::{collections, decode, encode, Cat, CatDraft, CatStats, CatUpdate};

pub struct CatRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> CatRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every companion the user owns, oldest first.
    pub async fn list_by_user(&self, user: &UserId) -> Result<Vec<Cat>> {
        let page = self
            .store
            .query(
                collections::CATS,
                &Query::new(OrderBy::created_asc()).filter(Predicate::Eq(
                    "userId".into(),
                    Value::String(user.to_string()),
                )),
            )
            .await?;
        page.docs.into_iter().map(decode).collect()
    }

    /// Adopt a new companion at level 1 with zeroed activity stats.
    pub async fn create(&self, user: &UserId, draft: CatDraft) -> Result<CatId> {
        let id = CatId::new();
        let mut fields = encode(&draft)?;
        fields.insert("userId".into(), Value::String(user.to_string()));
        fields.insert("level".into(), Value::from(1));
        fields.insert("experience".into(), Value::from(0));
        fields.insert("maxExperience".into(), Value::from(XP_PER_LEVEL));
        fields.insert("achievements".into(), Value::Array(Vec::new()));
        fields.insert("stats".into(), serde_json::to_value(CatStats::default())?);
        self.store
            .insert(collections::CATS, &id.to_string(), fields)
            .await?;

        debug!(cat = %id, user = %user, "companion adopted");
        Ok(id)
    }

    pub async fn update(&self, id: CatId, updates: &[CatUpdate]) -> Result<()> {
        let mut fields = Fields::new();
        for update in updates {
            let (field, value) = update.field()?;
            fields.insert(field.into(), value);
        }
        self.store
            .update(collections::CATS, &id.to_string(), fields)
            .await
    }

    /// Grant `points` to every companion the user owns.
    ///
    /// Intentionally fan-out: one rewarded action grows all companions at
    /// once. Each companion update is an independent write, so a failure
    /// partway leaves earlier companions updated and later ones not.
    pub async fn add_experience(
        &self,
        user: &UserId,
        kind: ActivityKind,
        points: u32,
    ) -> Result<()> {
        for cat in self.list_by_user(user).await? {
            let experience = cat.experience + points;
            let mut stats = cat.stats.clone();
            match kind {
                ActivityKind::Review => stats.reviews += 1,
                ActivityKind::Discussion => stats.discussions += 1,
                ActivityKind::Emotion => stats.emotions += 1,
            }

            let mut fields = Fields::new();
            fields.insert("experience".into(), Value::from(experience));
            fields.insert("level".into(), Value::from(level_for(experience)));
            fields.insert("stats".into(), serde_json::to_value(&stats)?);
            self.store
                .update(collections::CATS, &cat.id.to_string(), fields)
                .await?;

            debug!(cat = %cat.id, experience, level = level_for(experience), "experience granted");
        }
        Ok(())
    }
}
