//! In-memory implementation of the document-store contract.
//!
//! Backs tests, the demo binary and local development. Collections are
//! ordered maps behind a single mutex; batches stage against a copy of the
//! data and swap it in on success, so a failing operation leaves nothing
//! applied. Subscriber callbacks run after the lock is released.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use cinecat_shared::SortDirection;

use crate::backend::{
    Document, DocumentStore, Fields, PageCursor, Predicate, Query, QueryPage, SnapshotCallback,
    SubscriptionId, WriteOp,
};
use crate::error::{Result, StoreError};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

#[derive(Default)]
struct Inner {
    collections: Collections,
    subscribers: HashMap<u64, Subscriber>,
    next_subscription: u64,
}

struct Subscriber {
    collection: String,
    doc: String,
    callback: SnapshotCallback,
}

/// An in-process document store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `ops` all-or-nothing and notify affected subscribers.
    fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut notifications = Vec::new();
        {
            let mut inner = self.inner.lock().map_err(poisoned)?;

            let stamp = timestamp();
            let mut staged = inner.collections.clone();
            let mut touched: Vec<(String, String)> = Vec::new();
            for op in &ops {
                let key = apply_op(&mut staged, op, &stamp)?;
                if !touched.contains(&key) {
                    touched.push(key);
                }
            }
            inner.collections = staged;

            for (collection, doc) in &touched {
                let snapshot = inner
                    .collections
                    .get(collection)
                    .and_then(|col| col.get(doc))
                    .cloned();
                for sub in inner.subscribers.values() {
                    if sub.collection == *collection && sub.doc == *doc {
                        let document = snapshot.clone().map(|fields| Document {
                            id: doc.clone(),
                            fields,
                        });
                        notifications.push((sub.callback.clone(), document));
                    }
                }
            }
        }
        for (callback, document) in notifications {
            callback(document);
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.lock().map_err(poisoned)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|col| col.get(id))
            .cloned()
            .map(|fields| Document {
                id: id.to_owned(),
                fields,
            }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<QueryPage> {
        let inner = self.inner.lock().map_err(poisoned)?;

        let mut matched: Vec<(&String, &Fields)> = match inner.collections.get(collection) {
            Some(col) => col
                .iter()
                .filter(|(_, fields)| query.predicates.iter().all(|p| matches(fields, p)))
                .collect(),
            None => Vec::new(),
        };

        let field = query.order_by.field.as_str();
        let direction = query.order_by.direction;
        matched.sort_by(|(a_id, a), (b_id, b)| {
            directed(sort_cmp(a, a_id, b, b_id, field), direction)
        });

        if let Some(cursor) = &query.cursor {
            let (after_key, after_id) = cursor.decode()?;
            matched.retain(|(id, fields)| {
                let key = path_get(fields, field).cloned().unwrap_or(Value::Null);
                let cmp = cmp_values(&key, &after_key).then_with(|| id.as_str().cmp(&after_id));
                directed(cmp, direction) == Ordering::Greater
            });
        }

        matched.truncate(query.limit as usize);

        let docs: Vec<Document> = matched
            .iter()
            .map(|(id, fields)| Document {
                id: (*id).clone(),
                fields: (*fields).clone(),
            })
            .collect();
        let next = docs.last().map(|doc| {
            let key = path_get(&doc.fields, field).cloned().unwrap_or(Value::Null);
            PageCursor::encode(&key, &doc.id)
        });

        Ok(QueryPage { docs, next })
    }

    async fn insert(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.commit(vec![WriteOp::Insert {
            collection: collection.to_owned(),
            id: id.to_owned(),
            fields,
        }])
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.commit(vec![WriteOp::Update {
            collection: collection.to_owned(),
            id: id.to_owned(),
            fields,
        }])
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.commit(vec![WriteOp::Delete {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }])
    }

    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<()> {
        self.commit(vec![WriteOp::Increment {
            collection: collection.to_owned(),
            id: id.to_owned(),
            field: field.to_owned(),
            delta,
        }])
    }

    async fn array_add(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<()> {
        self.commit(vec![WriteOp::ArrayAdd {
            collection: collection.to_owned(),
            id: id.to_owned(),
            field: field.to_owned(),
            value,
        }])
    }

    async fn array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        self.commit(vec![WriteOp::ArrayRemove {
            collection: collection.to_owned(),
            id: id.to_owned(),
            field: field.to_owned(),
            value,
        }])
    }

    async fn batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        self.commit(ops)
    }

    fn subscribe(&self, collection: &str, id: &str, callback: SnapshotCallback) -> SubscriptionId {
        let (subscription, snapshot) = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
            let subscription = inner.next_subscription;
            inner.next_subscription += 1;
            inner.subscribers.insert(
                subscription,
                Subscriber {
                    collection: collection.to_owned(),
                    doc: id.to_owned(),
                    callback: callback.clone(),
                },
            );
            let snapshot = inner
                .collections
                .get(collection)
                .and_then(|col| col.get(id))
                .cloned()
                .map(|fields| Document {
                    id: id.to_owned(),
                    fields,
                });
            (subscription, snapshot)
        };
        callback(snapshot);
        SubscriptionId(subscription)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.remove(&subscription.0);
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store mutex poisoned".into())
}

/// Fixed-width RFC 3339 so lexicographic order matches chronological order.
fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Apply one write to the staged data, returning the touched document key.
fn apply_op(staged: &mut Collections, op: &WriteOp, stamp: &Value) -> Result<(String, String)> {
    match op {
        WriteOp::Insert {
            collection,
            id,
            fields,
        } => {
            let col = staged.entry(collection.clone()).or_default();
            if col.contains_key(id) {
                return Err(StoreError::AlreadyExists(format!("{collection}/{id}")));
            }
            let mut fields = fields.clone();
            fields.insert("createdAt".into(), stamp.clone());
            fields.insert("updatedAt".into(), stamp.clone());
            col.insert(id.clone(), fields);
            Ok((collection.clone(), id.clone()))
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let doc = staged_doc(staged, collection, id)?;
            for (field, value) in fields {
                doc.insert(field.clone(), value.clone());
            }
            doc.insert("updatedAt".into(), stamp.clone());
            Ok((collection.clone(), id.clone()))
        }
        WriteOp::Delete { collection, id } => {
            if let Some(col) = staged.get_mut(collection) {
                col.remove(id);
            }
            Ok((collection.clone(), id.clone()))
        }
        WriteOp::Increment {
            collection,
            id,
            field,
            delta,
        } => {
            let doc = staged_doc(staged, collection, id)?;
            let next = match path_get(doc, field) {
                None | Some(Value::Null) => Value::from(*delta),
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(i) => Value::from(i + delta),
                    None => Value::from(n.as_f64().unwrap_or(0.0) + *delta as f64),
                },
                Some(_) => return Err(StoreError::NotANumber(field.clone())),
            };
            path_set(doc, field, next);
            Ok((collection.clone(), id.clone()))
        }
        WriteOp::ArrayAdd {
            collection,
            id,
            field,
            value,
        } => {
            let doc = staged_doc(staged, collection, id)?;
            let next = match path_get(doc, field) {
                None | Some(Value::Null) => vec![value.clone()],
                Some(Value::Array(items)) => {
                    let mut items = items.clone();
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                    items
                }
                Some(_) => return Err(StoreError::NotAnArray(field.clone())),
            };
            path_set(doc, field, Value::Array(next));
            Ok((collection.clone(), id.clone()))
        }
        WriteOp::ArrayRemove {
            collection,
            id,
            field,
            value,
        } => {
            let doc = staged_doc(staged, collection, id)?;
            if let Some(Value::Array(items)) = path_get(doc, field) {
                let mut items = items.clone();
                items.retain(|item| item != value);
                path_set(doc, field, Value::Array(items));
            } else if matches!(path_get(doc, field), Some(v) if !v.is_null()) {
                return Err(StoreError::NotAnArray(field.clone()));
            }
            Ok((collection.clone(), id.clone()))
        }
    }
}

fn staged_doc<'a>(
    staged: &'a mut Collections,
    collection: &str,
    id: &str,
) -> Result<&'a mut Fields> {
    staged
        .get_mut(collection)
        .and_then(|col| col.get_mut(id))
        .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))
}

fn matches(fields: &Fields, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq(field, expected) => {
            path_get(fields, field).map(|v| v == expected).unwrap_or(false)
        }
        Predicate::ArrayContainsAny(field, values) => match path_get(fields, field) {
            Some(Value::Array(items)) => values.iter().any(|v| items.contains(v)),
            _ => false,
        },
    }
}

/// Resolve a dotted field path inside a document.
fn path_get<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => fields.get(path),
        Some((head, rest)) => match fields.get(head) {
            Some(Value::Object(child)) => path_get(child, rest),
            _ => None,
        },
    }
}

/// Set a dotted field path, creating intermediate maps as needed.
fn path_set(fields: &mut Fields, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Fields::new()));
            if !entry.is_object() {
                *entry = Value::Object(Fields::new());
            }
            if let Value::Object(child) = entry {
                path_set(child, rest, value);
            }
        }
    }
}

fn sort_cmp(a: &Fields, a_id: &str, b: &Fields, b_id: &str, field: &str) -> Ordering {
    let a_key = path_get(a, field).cloned().unwrap_or(Value::Null);
    let b_key = path_get(b, field).cloned().unwrap_or(Value::Null);
    cmp_values(&a_key, &b_key).then_with(|| a_id.cmp(b_id))
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Total order over JSON values: null < bool < number < string < array <
/// object, with same-type values compared naturally.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::OrderBy;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn insert_stamps_timestamps_and_round_trips() {
        let store = MemoryStore::new();
        store
            .insert("posts", "p1", fields(json!({"title": "Dune"})))
            .await
            .unwrap();

        let doc = store.get("posts", "p1").await.unwrap().unwrap();
        assert_eq!(doc.fields["title"], json!("Dune"));
        assert!(doc.fields["createdAt"].is_string());
        assert_eq!(doc.fields["createdAt"], doc.fields["updatedAt"]);

        assert!(store.get("posts", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        store.insert("posts", "p1", Fields::new()).await.unwrap();
        let err = store.insert("posts", "p1", Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update("posts", "ghost", fields(json!({"title": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn increment_reaches_nested_fields() {
        let store = MemoryStore::new();
        store.insert("users", "u1", Fields::new()).await.unwrap();
        store
            .increment("users", "u1", "stats.postsCount", 1)
            .await
            .unwrap();
        store
            .increment("users", "u1", "stats.postsCount", 1)
            .await
            .unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.fields["stats"]["postsCount"], json!(2));
    }

    #[tokio::test]
    async fn array_ops_have_set_semantics() {
        let store = MemoryStore::new();
        store.insert("posts", "p1", Fields::new()).await.unwrap();

        store
            .array_add("posts", "p1", "likedBy", json!("a"))
            .await
            .unwrap();
        store
            .array_add("posts", "p1", "likedBy", json!("a"))
            .await
            .unwrap();
        let doc = store.get("posts", "p1").await.unwrap().unwrap();
        assert_eq!(doc.fields["likedBy"], json!(["a"]));

        store
            .array_remove("posts", "p1", "likedBy", json!("a"))
            .await
            .unwrap();
        store
            .array_remove("posts", "p1", "likedBy", json!("b"))
            .await
            .unwrap();
        let doc = store.get("posts", "p1").await.unwrap().unwrap();
        assert_eq!(doc.fields["likedBy"], json!([]));
    }

    #[tokio::test]
    async fn failing_batch_applies_nothing() {
        let store = MemoryStore::new();
        store
            .insert("posts", "p1", fields(json!({"likes": 0})))
            .await
            .unwrap();

        let err = store
            .batch(vec![
                WriteOp::Increment {
                    collection: "posts".into(),
                    id: "p1".into(),
                    field: "likes".into(),
                    delta: 1,
                },
                WriteOp::Update {
                    collection: "users".into(),
                    id: "ghost".into(),
                    fields: Fields::new(),
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let doc = store.get("posts", "p1").await.unwrap().unwrap();
        assert_eq!(doc.fields["likes"], json!(0));
    }

    #[tokio::test]
    async fn query_filters_orders_and_paginates() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let kind = if i % 2 == 0 { "review" } else { "discussion" };
            store
                .insert(
                    "posts",
                    &format!("p{i}"),
                    fields(json!({"n": i, "type": kind, "tags": [format!("t{i}")]})),
                )
                .await
                .unwrap();
        }

        let query = Query::new(OrderBy::by("n", SortDirection::Desc)).limit(2);
        let page1 = store.query("posts", &query).await.unwrap();
        assert_eq!(
            page1.docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            ["p4", "p3"]
        );

        let query = Query::new(OrderBy::by("n", SortDirection::Desc))
            .limit(2)
            .after(page1.next);
        let page2 = store.query("posts", &query).await.unwrap();
        assert_eq!(
            page2.docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            ["p2", "p1"]
        );

        let query = Query::new(OrderBy::by("n", SortDirection::Desc))
            .limit(2)
            .after(page2.next);
        let page3 = store.query("posts", &query).await.unwrap();
        assert_eq!(
            page3.docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            ["p0"]
        );

        let reviews = store
            .query(
                "posts",
                &Query::new(OrderBy::by("n", SortDirection::Asc))
                    .filter(Predicate::Eq("type".into(), json!("review"))),
            )
            .await
            .unwrap();
        assert_eq!(reviews.docs.len(), 3);

        let tagged = store
            .query(
                "posts",
                &Query::new(OrderBy::by("n", SortDirection::Asc)).filter(
                    Predicate::ArrayContainsAny("tags".into(), vec![json!("t1"), json!("t4")]),
                ),
            )
            .await
            .unwrap();
        assert_eq!(
            tagged.docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            ["p1", "p4"]
        );
    }

    #[tokio::test]
    async fn subscriptions_follow_document_lifecycle() {
        let store = MemoryStore::new();
        store
            .insert("posts", "p1", fields(json!({"views": 0})))
            .await
            .unwrap();

        let seen: Arc<Mutex<Vec<Option<Document>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = store.subscribe(
            "posts",
            "p1",
            Arc::new(move |doc| sink.lock().unwrap().push(doc)),
        );

        store.increment("posts", "p1", "views", 1).await.unwrap();
        store.delete("posts", "p1").await.unwrap();

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 3);
            assert_eq!(seen[0].as_ref().unwrap().fields["views"], json!(0));
            assert_eq!(seen[1].as_ref().unwrap().fields["views"], json!(1));
            assert!(seen[2].is_none());
        }

        store.unsubscribe(subscription);
        store.insert("posts", "p1", Fields::new()).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }
}
