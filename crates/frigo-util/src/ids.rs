//! Strongly-typed identifiers for the ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::FrigoError;

/// Crate size code. The set is closed; stored data naming any other id is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CrateId {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
}

impl CrateId {
    /// All crate ids in display order
    pub const ALL: [CrateId; 6] = [
        CrateId::X,
        CrateId::Six,
        CrateId::Seven,
        CrateId::Eight,
        CrateId::Nine,
        CrateId::Ten,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrateId::X => "X",
            CrateId::Six => "6",
            CrateId::Seven => "7",
            CrateId::Eight => "8",
            CrateId::Nine => "9",
            CrateId::Ten => "10",
        }
    }

    /// Human readable label shown on forms and receipts
    pub fn label(&self) -> &'static str {
        match self {
            CrateId::X => "Cajón X",
            CrateId::Six => "Cajón de 6 cabezas",
            CrateId::Seven => "Cajón de 7 cabezas",
            CrateId::Eight => "Cajón de 8 cabezas",
            CrateId::Nine => "Cajón de 9 cabezas",
            CrateId::Ten => "Cajón de 10 cabezas",
        }
    }

    /// Look up an id by its code. Surrounding whitespace is ignored and `x` matches `X`.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for CrateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CrateId {
    type Err = FrigoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| FrigoError::UnknownCrate(s.to_string()))
    }
}

/// Identifier of a confirmed order, the key of the payment status map.
///
/// New orders carry a UUID. Orders written before ids existed are identified
/// by their stringified millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_timestamp(millis: i64) -> Self {
        Self(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Normalize an account identifier: decompose (NFD), drop combining
/// marks, trim, lower-case.
///
/// Two usernames are the same account iff their normalized forms are equal.
pub fn normalize_identifier(value: &str) -> String {
    let folded: String = value
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .collect();
    folded.trim().to_lowercase()
}

const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_id_roundtrips_through_code() {
        for id in CrateId::ALL {
            assert_eq!(CrateId::parse(id.as_str()), Some(id));
        }
        assert_eq!(CrateId::parse(" x "), Some(CrateId::X));
        assert_eq!(CrateId::parse("11"), None);
        assert!("5".parse::<CrateId>().is_err());
    }

    #[test]
    fn crate_id_serializes_as_code() {
        let json = serde_json::to_string(&CrateId::Ten).unwrap();
        assert_eq!(json, "\"10\"");
        let parsed: CrateId = serde_json::from_str("\"X\"").unwrap();
        assert_eq!(parsed, CrateId::X);
    }

    #[test]
    fn order_id_uniqueness() {
        let a = OrderId::new();
        let b = OrderId::new();
        assert_ne!(a, b);
        assert_eq!(OrderId::from_timestamp(1704067200000).as_str(), "1704067200000");
    }

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize_identifier("  Martín "), "martin");
        assert_eq!(normalize_identifier("NUÑEZ"), "nunez");
        // Decomposed form: 'e' followed by a combining acute accent
        assert_eq!(normalize_identifier("Jose\u{0301}"), "jose");
        assert_eq!(normalize_identifier("   "), "");
    }

    #[test]
    fn normalize_folds_letters_beyond_latin1() {
        assert_eq!(normalize_identifier("Šimon"), "simon");
        assert_eq!(normalize_identifier("Dvořák"), "dvorak");
        assert_eq!(normalize_identifier("Ağca"), "agca");
        assert_eq!(normalize_identifier("Ōno"), "ono");
        // no decomposition exists for these, so they stay as they are
        assert_eq!(normalize_identifier("Łukasz"), "łukasz");
        assert_eq!(normalize_identifier("Ørsted"), "ørsted");
    }
}
