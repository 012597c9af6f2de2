//! Document collections backing the token authority.
//!
//! The authority only needs a small slice of a document store: insert with
//! an auto-incrementing `_id`, lookup and deletion by a secondary field, and
//! counting. [`DocumentCollection`] captures that slice so the authority can
//! run against MongoDB in production and against [`MemoryCollection`] in
//! tests or with `STORAGE=memory`.

pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use thiserror::Error;

use crate::models::{confirmation_code::ConfirmationCodeDoc, refresh_token::RefreshTokenDoc};

pub use memory::MemoryCollection;
pub use mongo::MongoCollection;

pub const REFRESH_TOKENS: &str = "r_tokens";
pub const BLACK_LIST: &str = "black_list";
pub const CONFIRMATION_CODES: &str = "confirmation_codes";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Item not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored document. Every collection the authority owns is keyed by
/// email and stamped with the time it was recorded.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn email(&self) -> &str;

    fn token_hash(&self) -> Option<&str> {
        None
    }

    fn recorded_at(&self) -> BsonDateTime;
}

/// Predicate on a single field.
#[derive(Debug, Clone, Copy)]
pub enum Filter<'a> {
    Email(&'a str),
    TokenHash(&'a str),
    RecordedBefore(BsonDateTime),
}

impl Filter<'_> {
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match *self {
            Filter::Email(email) => record.email() == email,
            Filter::TokenHash(hash) => record.token_hash() == Some(hash),
            Filter::RecordedBefore(cutoff) => record.recorded_at() < cutoff,
        }
    }

    pub fn to_document(&self) -> Document {
        match *self {
            Filter::Email(email) => doc! { "email": email },
            Filter::TokenHash(hash) => doc! { "token_hash": hash },
            Filter::RecordedBefore(cutoff) => doc! { "recorded_at": { "$lt": cutoff } },
        }
    }
}

#[async_trait]
pub trait DocumentCollection<R: Record>: Send + Sync {
    /// Stores `record` under the next free `_id` and returns the stored copy.
    async fn insert(&self, record: R) -> StoreResult<R>;

    async fn find_one(&self, filter: Filter<'_>) -> StoreResult<Option<R>>;

    /// Deletes the first match; [`StoreError::NotFound`] when none matches.
    async fn delete_one(&self, filter: Filter<'_>) -> StoreResult<()>;

    /// Deletes every match and returns how many were removed.
    async fn delete_all(&self, filter: Filter<'_>) -> StoreResult<u64>;

    async fn count_all(&self) -> StoreResult<u64>;

    async fn count_matching(&self, filter: Filter<'_>) -> StoreResult<u64>;
}

/// Handles to the three collections owned by the authority.
#[derive(Clone)]
pub struct TokenCollections {
    pub refresh_tokens: Arc<dyn DocumentCollection<RefreshTokenDoc>>,
    pub black_list: Arc<dyn DocumentCollection<RefreshTokenDoc>>,
    pub confirmation_codes: Arc<dyn DocumentCollection<ConfirmationCodeDoc>>,
}

impl TokenCollections {
    pub fn in_memory() -> Self {
        Self {
            refresh_tokens: Arc::new(MemoryCollection::new()),
            black_list: Arc::new(MemoryCollection::new()),
            confirmation_codes: Arc::new(MemoryCollection::new()),
        }
    }

    pub async fn open_mongo(db: &mongodb::Database) -> StoreResult<Self> {
        Ok(Self {
            refresh_tokens: Arc::new(MongoCollection::open(db, REFRESH_TOKENS, true).await?),
            black_list: Arc::new(MongoCollection::open(db, BLACK_LIST, false).await?),
            confirmation_codes: Arc::new(MongoCollection::open(db, CONFIRMATION_CODES, false).await?),
        })
    }
}

/// Whether the store could be reached when the authority was built.
/// Decided once; an unavailable store stays unavailable until restart.
#[derive(Clone)]
pub enum StoreStatus {
    Connected(TokenCollections),
    Unavailable,
}
