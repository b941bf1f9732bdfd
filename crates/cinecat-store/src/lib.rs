//! # cinecat-store
//!
//! Client-side access to the community document store.
//!
//! The crate owns no storage engine: persistence, querying, pagination,
//! atomic increments and batches are delegated to a remote document store
//! behind the [`DocumentStore`] trait. On top of that seam sit the four
//! repositories (posts, comments, cats, emotions) plus user-profile access,
//! each maintaining its denormalized counters with atomic multi-document
//! batches. [`MemoryStore`] implements the seam for tests, the demo binary
//! and local development.

pub mod backend;
pub mod cats;
pub mod comments;
pub mod emotions;
pub mod memory;
pub mod models;
pub mod posts;
pub mod users;

mod error;

pub use backend::{
    Document, DocumentStore, Fields, OrderBy, PageCursor, Predicate, Query, QueryPage,
    SnapshotCallback, SubscriptionId, WriteOp,
};
pub use cats::CatRepository;
pub use comments::{build_forest, CommentRepository};
pub use emotions::EmotionRepository;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::*;
pub use posts::PostRepository;
pub use users::UserRepository;
