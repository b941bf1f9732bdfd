//! Session cache shared by all synchronization-store actions.
//!
//! The cache is a shared, mutable, non-authoritative mirror of the remote
//! store. Its lifetime is the application session; it is discarded on
//! reload and is never the source of truth.

use cinecat_store::{Cat, Comment, EmotionRecord, PageCursor, Post, PostFilters};

/// Load state of one entity family:
/// `Idle → Loading → {Loaded, Failed}`, `Loaded → Loading` on refetch,
/// `Failed → Loading` on retry. Families are independent; one family's
/// fetch failing never blocks another's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Per-family load phase plus the last human-readable error.
#[derive(Debug, Clone, Default)]
pub struct FamilyStatus {
    pub phase: LoadPhase,
    pub error: Option<String>,
}

impl FamilyStatus {
    /// Entering a fetch clears the previous error.
    pub fn begin(&mut self) {
        self.phase = LoadPhase::Loading;
        self.error = None;
    }

    pub fn succeed(&mut self) {
        self.phase = LoadPhase::Loaded;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = LoadPhase::Failed;
        self.error = Some(message.into());
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }
}

/// Everything the presentation layer renders from, per session.
#[derive(Debug, Clone)]
pub struct CommunityState {
    /// The paginated feed, newest first.
    pub posts: Vec<Post>,
    /// The single post currently in focus, if any.
    pub current_post: Option<Post>,
    pub posts_status: FamilyStatus,
    /// Filters applied to the last search; re-used by `load_more_posts`.
    pub filters: PostFilters,
    /// Opaque cursor of the last fetched page.
    pub cursor: Option<PageCursor>,
    pub has_more_posts: bool,
    /// In-flight guard preventing overlapping `load_more_posts` initiations.
    pub is_loading_more: bool,

    /// Reply forest for the focused post.
    pub comments: Vec<Comment>,
    pub comments_status: FamilyStatus,

    pub cats: Vec<Cat>,
    pub cats_status: FamilyStatus,

    pub emotions: Vec<EmotionRecord>,
    pub emotions_status: FamilyStatus,
}

impl CommunityState {
    pub fn new() -> Self {
        Self {
            posts: Vec::new(),
            current_post: None,
            posts_status: FamilyStatus::default(),
            filters: PostFilters::default(),
            cursor: None,
            has_more_posts: true,
            is_loading_more: false,
            comments: Vec::new(),
            comments_status: FamilyStatus::default(),
            cats: Vec::new(),
            cats_status: FamilyStatus::default(),
            emotions: Vec::new(),
            emotions_status: FamilyStatus::default(),
        }
    }
}

impl Default for CommunityState {
    fn default() -> Self {
        Self::new()
    }
}
