use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Outstanding refresh token of one subject. The black list stores the
/// same shape, with `recorded_at` reset to the moment of retirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenDoc {
    #[serde(rename = "_id")]
    pub id: i64,

    pub token_hash: String, // first 20 hex chars of sha224(token)
    pub token: String,
    pub email: String,

    pub recorded_at: BsonDateTime,
}

impl RefreshTokenDoc {
    pub fn new(email: &str, token: String, token_hash: String) -> Self {
        Self {
            id: 0,
            token_hash,
            token,
            email: email.to_string(),
            recorded_at: BsonDateTime::now(),
        }
    }

    /// Copy for the black list, stamped with the retirement time.
    pub fn retired(&self) -> Self {
        Self {
            id: 0,
            recorded_at: BsonDateTime::now(),
            ..self.clone()
        }
    }
}

impl Record for RefreshTokenDoc {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn token_hash(&self) -> Option<&str> {
        Some(&self.token_hash)
    }

    fn recorded_at(&self) -> BsonDateTime {
        self.recorded_at
    }
}
