//! Companion actions.

use chrono::Utc;

use cinecat_shared::constants::XP_PER_LEVEL;
use cinecat_shared::{CatId, UserId};
use cinecat_store::{Cat, CatDraft, CatStats, CatUpdate, DocumentStore};

use crate::auth::Identity;
use crate::error::Result;
use crate::store::CommunityStore;

impl<S: DocumentStore, I: Identity> CommunityStore<S, I> {
    /// Fetch companions — another user's when `user` is given, otherwise the
    /// signed-in user's.
    pub async fn fetch_cats(&self, user: Option<&UserId>) -> Result<()> {
        let target = match user {
            Some(user) => user.clone(),
            None => self.require_user()?.id,
        };
        self.lock().cats_status.begin();
        match self.cats.list_by_user(&target).await {
            Ok(cats) => {
                let mut state = self.lock();
                state.cats = cats;
                state.cats_status.succeed();
                Ok(())
            }
            Err(err) => Err(self.fail_cats(err)),
        }
    }

    /// Adopt a companion and append it to the cache at level 1.
    pub async fn add_cat(&self, draft: CatDraft) -> Result<CatId> {
        let user = self.require_user()?;
        let id = self
            .cats
            .create(&user.id, draft.clone())
            .await
            .map_err(|err| self.fail_cats(err))?;

        let now = Utc::now();
        self.lock().cats.push(Cat {
            id,
            user_id: user.id,
            name: draft.name,
            emoji: draft.emoji,
            level: 1,
            kind: draft.kind,
            experience: 0,
            max_experience: XP_PER_LEVEL,
            description: draft.description,
            specialty: draft.specialty,
            achievements: Vec::new(),
            stats: CatStats::default(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    pub async fn update_cat(&self, id: CatId, updates: Vec<CatUpdate>) -> Result<()> {
        self.require_user()?;
        self.cats
            .update(id, &updates)
            .await
            .map_err(|err| self.fail_cats(err))?;

        let now = Utc::now();
        let mut state = self.lock();
        if let Some(cat) = state.cats.iter_mut().find(|c| c.id == id) {
            for update in &updates {
                update.apply(cat);
            }
            cat.updated_at = now;
        }
        Ok(())
    }
}
