use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use mongodb::{
    bson::doc,
    error::{Error as MongoError, ErrorKind},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};

use super::{DocumentCollection, Filter, Record, StoreError, StoreResult};

impl From<MongoError> for StoreError {
    fn from(e: MongoError) -> Self {
        match *e.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
                StoreError::Serialization(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// MongoDB collection with client-assigned, auto-incrementing integer ids.
pub struct MongoCollection<R: Send + Sync> {
    inner: Collection<R>,
    last_id: AtomicI64,
}

impl<R> MongoCollection<R>
where
    R: Record + Serialize + DeserializeOwned + Unpin,
{
    /// Opens `name`, ensures its indexes and seeds the id counter from the
    /// highest stored `_id`.
    pub async fn open(db: &Database, name: &str, unique_hash: bool) -> StoreResult<Self> {
        let inner: Collection<R> = db.collection(name);

        let email_index = IndexModel::builder().keys(doc! { "email": 1 }).build();
        inner.create_index(email_index).await?;

        let hash_index = IndexModel::builder()
            .keys(doc! { "token_hash": 1 })
            .options(
                IndexOptions::builder()
                    .unique(unique_hash)
                    .sparse(true)
                    .build(),
            )
            .build();
        inner.create_index(hash_index).await?;

        let last = inner.find_one(doc! {}).sort(doc! { "_id": -1 }).await?;
        let last_id = last.map(|r| r.id()).unwrap_or(0);
        tracing::debug!(collection = name, last_id, "opened collection");

        Ok(Self {
            inner,
            last_id: AtomicI64::new(last_id),
        })
    }
}

#[async_trait]
impl<R> DocumentCollection<R> for MongoCollection<R>
where
    R: Record + Serialize + DeserializeOwned + Unpin,
{
    async fn insert(&self, mut record: R) -> StoreResult<R> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        record.set_id(id);
        self.inner.insert_one(&record).await?;
        Ok(record)
    }

    async fn find_one(&self, filter: Filter<'_>) -> StoreResult<Option<R>> {
        Ok(self.inner.find_one(filter.to_document()).await?)
    }

    async fn delete_one(&self, filter: Filter<'_>) -> StoreResult<()> {
        let res = self.inner.delete_one(filter.to_document()).await?;
        if res.deleted_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_all(&self, filter: Filter<'_>) -> StoreResult<u64> {
        let res = self.inner.delete_many(filter.to_document()).await?;
        Ok(res.deleted_count)
    }

    async fn count_all(&self) -> StoreResult<u64> {
        Ok(self.inner.count_documents(doc! {}).await?)
    }

    async fn count_matching(&self, filter: Filter<'_>) -> StoreResult<u64> {
        Ok(self.inner.count_documents(filter.to_document()).await?)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::DateTime as BsonDateTime;

    use super::*;

    #[test]
    fn filters_translate_to_field_queries() {
        assert_eq!(Filter::Email("a@x.com").to_document(), doc! { "email": "a@x.com" });
        assert_eq!(Filter::TokenHash("abc").to_document(), doc! { "token_hash": "abc" });

        let cutoff = BsonDateTime::from_millis(1_000);
        assert_eq!(
            Filter::RecordedBefore(cutoff).to_document(),
            doc! { "recorded_at": { "$lt": cutoff } }
        );
    }
}
