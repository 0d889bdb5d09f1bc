//! References to content-addressed facts.
//!
//! A fact is identified by its type and the hash of its contents. Hashing
//! itself happens elsewhere; this module only carries the pair around.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between type and hash in the textual form `Type@hash`
pub const REFERENCE_SEPARATOR: char = '@';

/// Reference to a single fact by type and content hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactReference {
    /// Fact type name, e.g. `Blog.Post`
    #[serde(rename = "type")]
    pub fact_type: String,
    /// Content hash of the fact
    pub hash: String,
}

impl FactReference {
    /// Create a new fact reference
    #[must_use]
    pub fn new(fact_type: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
            hash: hash.into(),
        }
    }
}

impl fmt::Display for FactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.fact_type, REFERENCE_SEPARATOR, self.hash)
    }
}

impl FromStr for FactReference {
    type Err = CoreError;

    /// Parse `Type@hash`. Hashes may contain base64 padding, so only the
    /// first separator splits.
    fn from_str(s: &str) -> CoreResult<Self> {
        let (fact_type, hash) =
            s.split_once(REFERENCE_SEPARATOR)
                .ok_or_else(|| CoreError::InvalidReference {
                    reason: format!("expected Type{}hash, got {}", REFERENCE_SEPARATOR, s),
                })?;
        if fact_type.is_empty() || hash.is_empty() {
            return Err(CoreError::InvalidReference {
                reason: format!("type and hash must both be present in {}", s),
            });
        }
        Ok(Self::new(fact_type, hash))
    }
}

/// Pagination cursor: the descending-sorted fact ids of the last row read
///
/// An empty bookmark means "start from the beginning".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactBookmark(pub Vec<i64>);

impl FactBookmark {
    /// Bookmark positioned before the first row
    #[must_use]
    pub const fn start() -> Self {
        Self(Vec::new())
    }

    /// Check whether this bookmark is at the start
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.0.is_empty()
    }

    /// Fact ids in the bookmark
    #[must_use]
    pub fn fact_ids(&self) -> &[i64] {
        &self.0
    }
}

impl From<Vec<i64>> for FactBookmark {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_display() {
        let reference = FactReference::new("Blog", "abc=");
        assert_eq!(reference.to_string(), "Blog@abc=");
    }

    #[test]
    fn test_reference_parse() {
        let reference: FactReference = "MyApp.Project@x/y+z==".parse().unwrap();
        assert_eq!(reference.fact_type, "MyApp.Project");
        assert_eq!(reference.hash, "x/y+z==");
    }

    #[test]
    fn test_reference_parse_missing_separator() {
        let result = "Blog".parse::<FactReference>();
        assert!(matches!(result, Err(CoreError::InvalidReference { .. })));
    }

    #[test]
    fn test_reference_parse_empty_hash() {
        assert!("Blog@".parse::<FactReference>().is_err());
        assert!("@hash".parse::<FactReference>().is_err());
    }

    #[test]
    fn test_reference_json_uses_type_field() {
        let reference = FactReference::new("Blog", "h");
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, r#"{"type":"Blog","hash":"h"}"#);
    }

    #[test]
    fn test_bookmark_start() {
        let bookmark = FactBookmark::start();
        assert!(bookmark.is_start());
        assert!(!FactBookmark::from(vec![3, 2]).is_start());
    }

    proptest::proptest! {
        #[test]
        fn prop_reference_text_roundtrip(
            fact_type in "[A-Za-z][A-Za-z0-9.]{0,12}",
            hash in "[A-Za-z0-9+/=@]{1,24}"
        ) {
            let reference = FactReference::new(fact_type, hash);
            let parsed: FactReference = reference.to_string().parse().unwrap();
            proptest::prop_assert_eq!(reference, parsed);
        }
    }
}
