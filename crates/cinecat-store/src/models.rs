//! Domain model structs persisted in the remote document store.
//!
//! Field names follow the stored camelCase document schema, so every struct
//! (de)serializes directly against raw documents. Every struct derives
//! `Serialize` and `Deserialize` so it can be handed to a presentation layer
//! unchanged.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cinecat_shared::{
    CatId, CommentId, EmotionId, PostId, PostKind, PostStatus, SortDirection, SortField, UserId,
};

use crate::backend::{Document, Fields};
use crate::error::{Result, StoreError};

/// Collection names in the remote store.
pub mod collections {
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const CATS: &str = "cats";
    pub const EMOTIONS: &str = "emotions";
    pub const USERS: &str = "users";
}

// ---------------------------------------------------------------------------
// Author snapshot
// ---------------------------------------------------------------------------

/// Denormalized author display fields copied onto posts and comments at
/// creation time. A snapshot, not a live reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A community post: review, discussion, emotion share or general talk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_title: Option<String>,
    /// Movie rating, 1-5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_emoji: Option<String>,
    /// Emotion intensity, 1-5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_intensity: Option<u8>,
    /// Display order matters.
    pub tags: Vec<String>,
    /// Always equals `liked_by.len()` once a toggle has completed.
    pub likes: u32,
    pub liked_by: Vec<UserId>,
    /// Count of comment records referencing this post, flattened.
    pub comments: u32,
    /// Monotonically non-decreasing.
    pub views: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating a post. The repository fills the
/// author snapshot and zeroed counters; the store assigns timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_intensity: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
}

/// One allowed post mutation. Unknown fields are unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum PostUpdate {
    Title(String),
    Content(String),
    MovieTitle(Option<String>),
    Rating(Option<u8>),
    Emotion(Option<String>),
    EmotionEmoji(Option<String>),
    EmotionIntensity(Option<u8>),
    Tags(Vec<String>),
    IsActive(Option<bool>),
    Status(Option<PostStatus>),
}

impl PostUpdate {
    pub(crate) fn field(&self) -> Result<(&'static str, Value)> {
        Ok(match self {
            PostUpdate::Title(v) => ("title", Value::String(v.clone())),
            PostUpdate::Content(v) => ("content", Value::String(v.clone())),
            PostUpdate::MovieTitle(v) => ("movieTitle", opt_string(v)),
            PostUpdate::Rating(v) => ("rating", opt_number(v)),
            PostUpdate::Emotion(v) => ("emotion", opt_string(v)),
            PostUpdate::EmotionEmoji(v) => ("emotionEmoji", opt_string(v)),
            PostUpdate::EmotionIntensity(v) => ("emotionIntensity", opt_number(v)),
            PostUpdate::Tags(v) => ("tags", serde_json::to_value(v)?),
            PostUpdate::IsActive(v) => ("isActive", v.map(Value::Bool).unwrap_or(Value::Null)),
            PostUpdate::Status(v) => ("status", serde_json::to_value(v)?),
        })
    }

    /// Mirror this mutation onto a cached copy.
    pub fn apply(&self, post: &mut Post) {
        match self {
            PostUpdate::Title(v) => post.title = v.clone(),
            PostUpdate::Content(v) => post.content = v.clone(),
            PostUpdate::MovieTitle(v) => post.movie_title = v.clone(),
            PostUpdate::Rating(v) => post.rating = *v,
            PostUpdate::Emotion(v) => post.emotion = v.clone(),
            PostUpdate::EmotionEmoji(v) => post.emotion_emoji = v.clone(),
            PostUpdate::EmotionIntensity(v) => post.emotion_intensity = *v,
            PostUpdate::Tags(v) => post.tags = v.clone(),
            PostUpdate::IsActive(v) => post.is_active = *v,
            PostUpdate::Status(v) => post.status = *v,
        }
    }
}

/// Listing filters. A post qualifies for the tag filter when it carries at
/// least one of the requested tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilters {
    pub kind: Option<PostKind>,
    pub status: Option<PostStatus>,
    pub author: Option<UserId>,
    pub tags: Vec<String>,
    pub sort_by: Option<SortField>,
    pub sort_direction: Option<SortDirection>,
}

impl PostFilters {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.status.is_none()
            && self.author.is_none()
            && self.tags.is_empty()
            && self.sort_by.is_none()
            && self.sort_direction.is_none()
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment on a post. Flat in storage; `replies` is derived on read and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar: String,
    pub content: String,
    pub likes: u32,
    pub liked_by: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<CommentId>,
    #[serde(skip)]
    pub replies: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    pub post_id: PostId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<CommentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentUpdate {
    Content(String),
}

impl CommentUpdate {
    pub(crate) fn field(&self) -> (&'static str, Value) {
        match self {
            CommentUpdate::Content(v) => ("content", Value::String(v.clone())),
        }
    }

    pub fn apply(&self, comment: &mut Comment) {
        match self {
            CommentUpdate::Content(v) => comment.content = v.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cat (companion)
// ---------------------------------------------------------------------------

/// Per-activity counters on a companion cat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatStats {
    pub reviews: u32,
    pub discussions: u32,
    pub emotions: u32,
}

/// A gamified companion. One user may own several; every rewarded activity
/// grows all of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cat {
    pub id: CatId,
    pub user_id: UserId,
    pub name: String,
    pub emoji: String,
    /// Always `experience / 100 + 1`; recomputed on every grant, never set
    /// independently.
    pub level: u32,
    /// Free-form persona label shown on the profile card.
    #[serde(rename = "type")]
    pub kind: String,
    pub experience: u32,
    /// Display ceiling for the experience bar; not enforced.
    pub max_experience: u32,
    pub description: String,
    pub specialty: String,
    pub achievements: Vec<String>,
    pub stats: CatStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatDraft {
    pub name: String,
    pub emoji: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub specialty: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatUpdate {
    Name(String),
    Emoji(String),
    Kind(String),
    Description(String),
    Specialty(String),
    Achievements(Vec<String>),
}

impl CatUpdate {
    pub(crate) fn field(&self) -> Result<(&'static str, Value)> {
        Ok(match self {
            CatUpdate::Name(v) => ("name", Value::String(v.clone())),
            CatUpdate::Emoji(v) => ("emoji", Value::String(v.clone())),
            CatUpdate::Kind(v) => ("type", Value::String(v.clone())),
            CatUpdate::Description(v) => ("description", Value::String(v.clone())),
            CatUpdate::Specialty(v) => ("specialty", Value::String(v.clone())),
            CatUpdate::Achievements(v) => ("achievements", serde_json::to_value(v)?),
        })
    }

    pub fn apply(&self, cat: &mut Cat) {
        match self {
            CatUpdate::Name(v) => cat.name = v.clone(),
            CatUpdate::Emoji(v) => cat.emoji = v.clone(),
            CatUpdate::Kind(v) => cat.kind = v.clone(),
            CatUpdate::Description(v) => cat.description = v.clone(),
            CatUpdate::Specialty(v) => cat.specialty = v.clone(),
            CatUpdate::Achievements(v) => cat.achievements = v.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Emotion journal
// ---------------------------------------------------------------------------

/// A personal mood-log entry tied to one user and one movie title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionRecord {
    pub id: EmotionId,
    pub user_id: UserId,
    pub movie_title: String,
    /// Free-form emotion label.
    pub emotion: String,
    pub emoji: String,
    pub text: String,
    /// 1-5.
    pub intensity: u8,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionDraft {
    pub movie_title: String,
    pub emotion: String,
    pub emoji: String,
    pub text: String,
    pub intensity: u8,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmotionUpdate {
    MovieTitle(String),
    Emotion(String),
    Emoji(String),
    Text(String),
    Intensity(u8),
    Tags(Vec<String>),
}

impl EmotionUpdate {
    pub(crate) fn field(&self) -> Result<(&'static str, Value)> {
        Ok(match self {
            EmotionUpdate::MovieTitle(v) => ("movieTitle", Value::String(v.clone())),
            EmotionUpdate::Emotion(v) => ("emotion", Value::String(v.clone())),
            EmotionUpdate::Emoji(v) => ("emoji", Value::String(v.clone())),
            EmotionUpdate::Text(v) => ("text", Value::String(v.clone())),
            EmotionUpdate::Intensity(v) => ("intensity", Value::from(*v)),
            EmotionUpdate::Tags(v) => ("tags", serde_json::to_value(v)?),
        })
    }

    pub fn apply(&self, record: &mut EmotionRecord) {
        match self {
            EmotionUpdate::MovieTitle(v) => record.movie_title = v.clone(),
            EmotionUpdate::Emotion(v) => record.emotion = v.clone(),
            EmotionUpdate::Emoji(v) => record.emoji = v.clone(),
            EmotionUpdate::Text(v) => record.text = v.clone(),
            EmotionUpdate::Intensity(v) => record.intensity = *v,
            EmotionUpdate::Tags(v) => record.tags = v.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Denormalized per-user counters, maintained by increments issued alongside
/// each causing action — best-effort mirrors, never recomputed from source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub posts_count: u32,
    pub reviews_count: u32,
    pub discussions_count: u32,
    pub emotions_count: u32,
    pub likes_received: u32,
    pub comments_received: u32,
}

/// Local mirror of an identity-provider user, plus activity counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(
        default,
        rename = "photoURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Like toggle outcome
// ---------------------------------------------------------------------------

/// Result of a like toggle, decided against store state. Callers update
/// their caches from this, never from a local guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    /// Whether the user likes the record after the toggle.
    pub liked: bool,
    /// The like count after the toggle.
    pub likes: u32,
}

impl LikeOutcome {
    /// Mirror the outcome onto a cached count and membership set.
    pub fn apply(self, user: &UserId, likes: &mut u32, liked_by: &mut Vec<UserId>) {
        *likes = self.likes;
        if self.liked {
            if !liked_by.contains(user) {
                liked_by.push(user.clone());
            }
        } else {
            liked_by.retain(|liker| liker != user);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn validate_rating(rating: Option<u8>) -> Result<()> {
    use cinecat_shared::constants::MAX_RATING;
    match rating {
        Some(r) if !(1..=MAX_RATING).contains(&r) => Err(StoreError::InvalidValue(format!(
            "rating must be between 1 and {MAX_RATING}, got {r}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn validate_intensity(intensity: Option<u8>) -> Result<()> {
    use cinecat_shared::constants::MAX_INTENSITY;
    match intensity {
        Some(i) if !(1..=MAX_INTENSITY).contains(&i) => Err(StoreError::InvalidValue(format!(
            "intensity must be between 1 and {MAX_INTENSITY}, got {i}"
        ))),
        _ => Ok(()),
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn opt_number(value: &Option<u8>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// Decode a fetched document into a model, injecting the document id under
/// the `id` field the models expect.
pub(crate) fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    let Document { id, mut fields } = doc;
    fields.insert("id".into(), Value::String(id));
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Serialize a model or draft into a field map, dropping any `id` field
/// (the id lives outside the document body).
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        _ => Err(StoreError::InvalidValue(
            "expected a JSON object".to_owned(),
        )),
    }
}
