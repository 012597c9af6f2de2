use std::{fmt, str::FromStr};

use mongodb::bson::DateTime as BsonDateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::store::Record;

pub const CODE_MIN: u32 = 100_001;
pub const CODE_MAX: u32 = 999_999;

/// Six-digit one-time code proving mailbox access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationCode(u32);

impl ConfirmationCode {
    pub fn new(value: u32) -> Option<Self> {
        (CODE_MIN..=CODE_MAX).contains(&value).then_some(Self(value))
    }

    /// Uniform draw from the OS RNG.
    pub fn generate() -> Self {
        Self(rand::rngs::OsRng.gen_range(CODE_MIN..=CODE_MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Constant-time comparison against a code typed by the user.
    pub fn matches(self, submitted: &str) -> bool {
        match submitted.parse::<Self>() {
            Ok(other) => self.0.to_be_bytes().ct_eq(&other.0.to_be_bytes()).into(),
            Err(()) => false,
        }
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for ConfirmationCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(());
        }
        s.parse().ok().and_then(Self::new).ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationCodeDoc {
    #[serde(rename = "_id")]
    pub id: i64,

    pub code: ConfirmationCode,
    pub email: String,

    pub recorded_at: BsonDateTime,
}

impl ConfirmationCodeDoc {
    pub fn new(email: &str, code: ConfirmationCode) -> Self {
        Self {
            id: 0,
            code,
            email: email.to_string(),
            recorded_at: BsonDateTime::now(),
        }
    }
}

impl Record for ConfirmationCodeDoc {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn recorded_at(&self) -> BsonDateTime {
        self.recorded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_enforced() {
        assert!(ConfirmationCode::new(100_000).is_none());
        assert!(ConfirmationCode::new(100_001).is_some());
        assert!(ConfirmationCode::new(999_999).is_some());
        assert!(ConfirmationCode::new(1_000_000).is_none());
    }

    #[test]
    fn generated_codes_stay_in_range() {
        for _ in 0..1000 {
            let code = ConfirmationCode::generate();
            assert!((CODE_MIN..=CODE_MAX).contains(&code.value()));
            assert_eq!(code.to_string().len(), 6);
        }
    }

    #[test]
    fn parse_accepts_only_six_digits() {
        assert_eq!("123456".parse(), Ok(ConfirmationCode(123_456)));
        assert_eq!(" 654321 ".parse(), Ok(ConfirmationCode(654_321)));
        assert!("12345".parse::<ConfirmationCode>().is_err());
        assert!("1234567".parse::<ConfirmationCode>().is_err());
        assert!("+12345".parse::<ConfirmationCode>().is_err());
        assert!("abcdef".parse::<ConfirmationCode>().is_err());
        assert!("100000".parse::<ConfirmationCode>().is_err());
    }

    #[test]
    fn matches_exact_digits_only() {
        let code = ConfirmationCode(482_913);
        assert!(code.matches("482913"));
        assert!(code.matches("482913\n"));
        assert!(!code.matches("482914"));
        assert!(!code.matches("4829130"));
        assert!(!code.matches(""));
    }
}
