//! In-memory [`DocumentCollection`] for tests and `STORAGE=memory`.
//!
//! Documents live in a [`BTreeMap`] keyed by `_id`, so "first match" means
//! "oldest insert", the same order MongoDB returns without a sort. Nothing is
//! persisted.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocumentCollection, Filter, Record, StoreError, StoreResult};

/// Cheaply cloneable; clones share the same documents.
#[derive(Clone)]
pub struct MemoryCollection<R> {
    docs: Arc<RwLock<BTreeMap<i64, R>>>,
    last_id: Arc<AtomicI64>,
}

impl<R: Record> MemoryCollection<R> {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(RwLock::new(BTreeMap::new())),
            last_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Snapshot of every stored document in `_id` order.
    pub fn all(&self) -> Vec<R> {
        self.docs.read().values().cloned().collect()
    }
}

impl<R: Record> Default for MemoryCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> DocumentCollection<R> for MemoryCollection<R> {
    async fn insert(&self, mut record: R) -> StoreResult<R> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        record.set_id(id);
        self.docs.write().insert(id, record.clone());
        Ok(record)
    }

    async fn find_one(&self, filter: Filter<'_>) -> StoreResult<Option<R>> {
        let docs = self.docs.read();
        Ok(docs.values().find(|r| filter.matches(*r)).cloned())
    }

    async fn delete_one(&self, filter: Filter<'_>) -> StoreResult<()> {
        let mut docs = self.docs.write();
        let id = docs
            .values()
            .find(|r| filter.matches(*r))
            .map(Record::id)
            .ok_or(StoreError::NotFound)?;
        docs.remove(&id);
        Ok(())
    }

    async fn delete_all(&self, filter: Filter<'_>) -> StoreResult<u64> {
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|_, r| !filter.matches(&*r));
        Ok((before - docs.len()) as u64)
    }

    async fn count_all(&self) -> StoreResult<u64> {
        Ok(self.docs.read().len() as u64)
    }

    async fn count_matching(&self, filter: Filter<'_>) -> StoreResult<u64> {
        let docs = self.docs.read();
        Ok(docs.values().filter(|r| filter.matches(*r)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use mongodb::bson::DateTime as BsonDateTime;

    use super::*;
    use crate::models::refresh_token::RefreshTokenDoc;

    fn doc(email: &str, hash: &str) -> RefreshTokenDoc {
        RefreshTokenDoc::new(email, format!("token-{hash}"), hash.to_string())
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let coll = MemoryCollection::new();
        let a = coll.insert(doc("a@x.com", "h1")).await.unwrap();
        let b = coll.insert(doc("b@x.com", "h2")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(coll.count_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ids_keep_increasing_after_deletes() {
        let coll = MemoryCollection::new();
        coll.insert(doc("a@x.com", "h1")).await.unwrap();
        coll.delete_one(Filter::TokenHash("h1")).await.unwrap();
        let next = coll.insert(doc("a@x.com", "h2")).await.unwrap();

        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn find_by_secondary_fields() {
        let coll = MemoryCollection::new();
        coll.insert(doc("a@x.com", "h1")).await.unwrap();
        coll.insert(doc("b@x.com", "h2")).await.unwrap();

        let by_mail = coll.find_one(Filter::Email("b@x.com")).await.unwrap().unwrap();
        assert_eq!(by_mail.token_hash, "h2");

        let by_hash = coll.find_one(Filter::TokenHash("h1")).await.unwrap().unwrap();
        assert_eq!(by_hash.email, "a@x.com");

        assert!(coll.find_one(Filter::Email("c@x.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_one_reports_not_found() {
        let coll: MemoryCollection<RefreshTokenDoc> = MemoryCollection::new();
        let err = coll.delete_one(Filter::Email("nobody@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_one_removes_only_the_oldest_match() {
        let coll = MemoryCollection::new();
        coll.insert(doc("a@x.com", "h1")).await.unwrap();
        coll.insert(doc("a@x.com", "h2")).await.unwrap();

        coll.delete_one(Filter::Email("a@x.com")).await.unwrap();

        let left = coll.all();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].token_hash, "h2");
    }

    #[tokio::test]
    async fn delete_all_by_mail() {
        let coll = MemoryCollection::new();
        coll.insert(doc("a@x.com", "h1")).await.unwrap();
        coll.insert(doc("a@x.com", "h2")).await.unwrap();
        coll.insert(doc("b@x.com", "h3")).await.unwrap();

        let removed = coll.delete_all(Filter::Email("a@x.com")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(coll.count_matching(Filter::Email("a@x.com")).await.unwrap(), 0);
        assert_eq!(coll.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_older_than_cutoff() {
        let coll = MemoryCollection::new();
        let mut old = doc("a@x.com", "h1");
        old.recorded_at =
            BsonDateTime::from_millis((Utc::now() - Duration::days(40)).timestamp_millis());
        coll.insert(old).await.unwrap();
        coll.insert(doc("b@x.com", "h2")).await.unwrap();

        let cutoff =
            BsonDateTime::from_millis((Utc::now() - Duration::days(31)).timestamp_millis());
        let removed = coll.delete_all(Filter::RecordedBefore(cutoff)).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(coll.all()[0].token_hash, "h2");
    }
}
