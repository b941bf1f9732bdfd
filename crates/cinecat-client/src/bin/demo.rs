//! Seeded walkthrough of the community core against the in-memory store.
//!
//! Creates two users with companions, then runs through a session: posting,
//! commenting, liking, emotion-logging and feed pagination. Run with
//! `cargo run --bin cinecat-demo`.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use cinecat_client::{CommunityStore, StaticIdentity};
use cinecat_shared::{PostKind, PostStatus, UserId};
use cinecat_store::{
    CatDraft, CatRepository, CommentDraft, EmotionDraft, MemoryStore, PostDraft, PostFilters,
    UserRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    cinecat_client::init_tracing();

    let store = Arc::new(MemoryStore::new());
    seed(&store).await?;

    let mina = CommunityStore::new(store.clone(), StaticIdentity::signed_in("mina", "Mina"));
    let leo = CommunityStore::new(store.clone(), StaticIdentity::signed_in("leo", "Leo"));

    // A review earns Mina's companions 20 experience each.
    let review = mina
        .add_post(PostDraft {
            kind: PostKind::Review,
            title: "Oppenheimer".into(),
            content: "The sound design alone deserves the big screen.".into(),
            movie_title: Some("Oppenheimer".into()),
            rating: Some(4),
            emotion: None,
            emotion_emoji: None,
            emotion_intensity: None,
            tags: vec!["nolan".into(), "imax".into()],
            is_active: None,
            status: Some(PostStatus::New),
        })
        .await?;

    leo.add_post(PostDraft {
        kind: PostKind::Discussion,
        title: "Best theatre experience this year?".into(),
        content: "Sound, seats, crowd — what made it for you?".into(),
        movie_title: None,
        rating: None,
        emotion: None,
        emotion_emoji: None,
        emotion_intensity: None,
        tags: vec!["theatres".into()],
        is_active: Some(true),
        status: Some(PostStatus::Hot),
    })
    .await?;

    // Leo reads and likes the review, then replies to his own comment.
    leo.fetch_post_by_id(review).await?;
    leo.increment_post_views(review).await;
    leo.toggle_post_like(review).await?;
    let root = leo
        .add_comment(CommentDraft {
            post_id: review,
            content: "Seconded. The Trinity sequence was unreal.".into(),
            parent_comment_id: None,
        })
        .await?;
    mina.add_comment(CommentDraft {
        post_id: review,
        content: "Glad it wasn't just me!".into(),
        parent_comment_id: Some(root),
    })
    .await?;

    // Mina logs an emotion; her companions grow again.
    mina.add_emotion(EmotionDraft {
        movie_title: "Past Lives".into(),
        emotion: "wistful".into(),
        emoji: "🥲".into(),
        text: "Still thinking about the bar scene.".into(),
        intensity: 5,
        tags: vec!["a24".into()],
    })
    .await?;

    // Render what a feed screen would see.
    mina.fetch_posts(true).await?;
    mina.search_posts(
        PostFilters {
            kind: Some(PostKind::Review),
            ..Default::default()
        },
        true,
    )
    .await?;
    mina.fetch_comments(review).await?;
    mina.fetch_cats(None).await?;
    mina.fetch_emotions(None).await?;

    let state = mina.snapshot();
    info!(
        posts = state.posts.len(),
        comments = state.comments.len(),
        emotions = state.emotions.len(),
        "session summary"
    );
    for cat in &state.cats {
        info!(
            name = %cat.name,
            level = cat.level,
            experience = cat.experience,
            reviews = cat.stats.reviews,
            emotions = cat.stats.emotions,
            "companion"
        );
    }
    let profile = UserRepository::new(store)
        .get(&UserId::new("mina"))
        .await?;
    if let Some(profile) = profile {
        info!(
            posts = profile.stats.posts_count,
            likes_received = profile.stats.likes_received,
            comments_received = profile.stats.comments_received,
            "mina's stats"
        );
    }

    Ok(())
}

async fn seed(store: &Arc<MemoryStore>) -> Result<()> {
    let users = UserRepository::new(store.clone());
    users
        .create_profile(&UserId::new("mina"), Some("Mina"), None)
        .await?;
    users
        .create_profile(&UserId::new("leo"), Some("Leo"), None)
        .await?;

    let cats = CatRepository::new(store.clone());
    cats.create(
        &UserId::new("mina"),
        CatDraft {
            name: "Mochi".into(),
            emoji: "🐈".into(),
            kind: "movie critic".into(),
            description: "Purrs only at practical effects.".into(),
            specialty: "film noir".into(),
        },
    )
    .await?;
    cats.create(
        &UserId::new("mina"),
        CatDraft {
            name: "Nori".into(),
            emoji: "🐈‍⬛".into(),
            kind: "feelings expert".into(),
            description: "Cries at every ending.".into(),
            specialty: "tearjerkers".into(),
        },
    )
    .await?;
    Ok(())
}
