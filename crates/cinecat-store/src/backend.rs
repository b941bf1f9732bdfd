//! The document-store client contract.
//!
//! The community core does not own a storage engine; it consumes a managed
//! document database through this trait: document CRUD, simple field filters,
//! ordering, cursor-based pagination, atomic numeric increments,
//! set-semantics array mutations, all-or-nothing batches and per-document
//! subscriptions.
//!
//! `createdAt`/`updatedAt` are store-assigned: implementations stamp both on
//! insert and restamp `updatedAt` on partial update. Callers never supply
//! timestamps.

use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cinecat_shared::SortDirection;

use crate::error::{Result, StoreError};

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// A fetched document: store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Filter applied to a query.
///
/// Field names may be dotted paths into nested maps (`stats.postsCount`).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the given value.
    Eq(String, Value),
    /// Array field contains at least one of the given values.
    ArrayContainsAny(String, Vec<Value>),
}

/// Sort order of a query. Ties are broken by document id in the same
/// direction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Newest first; the default listing order.
    pub fn created_desc() -> Self {
        Self::by("createdAt", SortDirection::Desc)
    }

    /// Oldest first.
    pub fn created_asc() -> Self {
        Self::by("createdAt", SortDirection::Asc)
    }
}

/// Opaque pagination token referencing the last-seen document.
///
/// Callers pass it back unchanged to continue a listing; only the backend
/// that produced it can interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCursor(String);

impl PageCursor {
    pub(crate) fn encode(sort_key: &Value, id: &str) -> Self {
        let token = Value::Array(vec![sort_key.clone(), Value::String(id.to_owned())]);
        Self(base64::engine::general_purpose::STANDARD.encode(token.to_string()))
    }

    pub(crate) fn decode(&self) -> Result<(Value, String)> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.0)
            .map_err(|_| StoreError::InvalidCursor)?;
        let token: Value = serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidCursor)?;
        match token {
            Value::Array(mut parts) if parts.len() == 2 => {
                let id = match parts.pop() {
                    Some(Value::String(id)) => id,
                    _ => return Err(StoreError::InvalidCursor),
                };
                let sort_key = parts.pop().unwrap_or(Value::Null);
                Ok((sort_key, id))
            }
            _ => Err(StoreError::InvalidCursor),
        }
    }
}

/// A filtered, ordered, paginated read.
#[derive(Debug, Clone)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub order_by: OrderBy,
    pub limit: u32,
    pub cursor: Option<PageCursor>,
}

impl Query {
    pub fn new(order_by: OrderBy) -> Self {
        Self {
            predicates: Vec::new(),
            order_by,
            limit: u32::MAX,
            cursor: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn after(mut self, cursor: Option<PageCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// One page of query results.
///
/// `next` references the last returned document and is absent only when the
/// page is empty; a page shorter than the requested limit signals exhaustion.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub docs: Vec<Document>,
    pub next: Option<PageCursor>,
}

/// A single operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert {
        collection: String,
        id: String,
        fields: Fields,
    },
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: String,
    },
    Increment {
        collection: String,
        id: String,
        field: String,
        delta: i64,
    },
    ArrayAdd {
        collection: String,
        id: String,
        field: String,
        value: Value,
    },
    ArrayRemove {
        collection: String,
        id: String,
        field: String,
        value: Value,
    },
}

/// Callback invoked with the latest snapshot of a watched document, or
/// `None` once it is deleted.
pub type SnapshotCallback = Arc<dyn Fn(Option<Document>) + Send + Sync>;

/// Handle returned by [`DocumentStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Client contract of the remote document store.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Run a filtered, ordered, paginated query.
    async fn query(&self, collection: &str, query: &Query) -> Result<QueryPage>;

    /// Insert a document under a caller-minted id, stamping
    /// `createdAt`/`updatedAt`.
    async fn insert(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Merge fields into an existing document, restamping `updatedAt`.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Delete a document. Idempotent.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Atomically add `delta` to a numeric field. A missing field reads as 0.
    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<()>;

    /// Add a value to an array field unless already present.
    async fn array_add(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<()>;

    /// Remove every element equal to `value` from an array field.
    async fn array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<()>;

    /// Apply a list of writes atomically: all commit or none do.
    async fn batch(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Watch a single document. The callback fires with the current snapshot
    /// immediately, then on every change.
    fn subscribe(&self, collection: &str, id: &str, callback: SnapshotCallback) -> SubscriptionId;

    /// Stop a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);
}
