//! Synchronization-store actions, one module per entity family.

pub mod cats;
pub mod comments;
pub mod emotions;
pub mod posts;
