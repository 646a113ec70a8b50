//! # Transaction Kinds
//!
//! ACORD identifies each message form by a numeric transaction code
//! (103 New Business, 1125 Policy Change, 203/302 Pending Case Status, ...).
//! [`TransactionKind`] is a validated newtype over that code. Whether a kind
//! is *served* is the schema registry's decision, so registering a new form
//! never requires touching this type.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KindError;

/// Longest transaction code accepted, in digits.
const MAX_CODE_DIGITS: usize = 6;

/// An ACORD transaction code.
///
/// Parses from `"103"`, `"ACORD103"` or `"acord103"`; displays as
/// `ACORD103`. Leading zeros are rejected so every kind has one spelling.
///
/// Serializes as the bare code string (`"103"`). Deserializes from either a
/// string or an integer, so YAML registry files may write `kind: 103`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionKind(u32);

impl TransactionKind {
    /// ACORD 103: New Business Submission.
    pub const ACORD_103: Self = Self(103);
    /// ACORD 1125: Policy Change.
    pub const ACORD_1125: Self = Self(1125);
    /// ACORD 203: Pending Case Status inquiry.
    pub const ACORD_203: Self = Self(203);
    /// ACORD 302: Pending Case Status inquiry (TXLife).
    pub const ACORD_302: Self = Self(302);

    /// Parse a transaction kind from a route segment or configuration value.
    pub fn parse(input: &str) -> Result<Self, KindError> {
        let trimmed = input.trim();
        let digits = match trimmed.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("acord") => &trimmed[5..],
            _ => trimmed,
        };

        let well_formed = !digits.is_empty()
            && digits.len() <= MAX_CODE_DIGITS
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !digits.starts_with('0');
        if !well_formed {
            return Err(KindError::Unrecognized(input.to_string()));
        }

        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| KindError::Unrecognized(input.to_string()))
    }

    /// The numeric transaction code.
    pub fn code(&self) -> u32 {
        self.0
    }

    /// The route segment form (`"103"`), as used in `/acord/{kind}`.
    pub fn path_segment(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ACORD{}", self.0)
    }
}

impl FromStr for TransactionKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TransactionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KindVisitor)
    }
}

struct KindVisitor;

impl<'de> Visitor<'de> for KindVisitor {
    type Value = TransactionKind;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an ACORD transaction code such as 103 or \"ACORD1125\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        TransactionKind::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        TransactionKind::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        TransactionKind::parse(&v.to_string()).map_err(E::custom)
    }
}
