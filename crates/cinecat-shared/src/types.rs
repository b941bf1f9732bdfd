use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity = opaque id issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! document_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

document_id!(
    /// Identifier of a community post.
    PostId
);
document_id!(
    /// Identifier of a comment.
    CommentId
);
document_id!(
    /// Identifier of a companion cat.
    CatId
);
document_id!(
    /// Identifier of an emotion-journal entry.
    EmotionId
);

/// What kind of community post this is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Review,
    Discussion,
    Emotion,
    General,
}

impl PostKind {
    /// The rewarded activity this post kind counts as, if any.
    /// `General` posts earn nothing.
    pub fn activity(self) -> Option<ActivityKind> {
        match self {
            PostKind::Review => Some(ActivityKind::Review),
            PostKind::Discussion => Some(ActivityKind::Discussion),
            PostKind::Emotion => Some(ActivityKind::Emotion),
            PostKind::General => None,
        }
    }
}

/// Editorial status badge on a post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Hot,
    New,
    Solved,
}

/// A rewarded user activity, tracked per companion cat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Review,
    Discussion,
    Emotion,
}

impl ActivityKind {
    /// Experience points granted for one action of this kind.
    pub fn points(self) -> u32 {
        match self {
            ActivityKind::Review => crate::constants::XP_REVIEW,
            ActivityKind::Discussion => crate::constants::XP_DISCUSSION,
            ActivityKind::Emotion => crate::constants::XP_EMOTION,
        }
    }
}

/// Post field a listing can be sorted by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    Likes,
    Comments,
    Views,
}

impl SortField {
    /// Stored field name, as persisted in post documents.
    pub fn field_name(self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::Likes => "likes",
            SortField::Comments => "comments",
            SortField::Views => "views",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}
