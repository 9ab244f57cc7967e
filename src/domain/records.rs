//! Override records and the cache-aside lookup states.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Payload field that marks a record as written by this crate's own write
/// path. Only payloads carrying the flag with value `true` are trusted as
/// configuration; the check is structural, not cryptographic, and must stay
/// that way for existing stored records to keep resolving the same.
pub const OWNED_FLAG: &str = "isOwnedOverride";

/// Cached value meaning "looked up and confirmed absent". Real record ids
/// are always positive.
pub const ABSENT_SENTINEL: i64 = -1;

/// Publication state of a stored override record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    Published,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Published => "published",
        }
    }
}

/// A user override record as held by the external content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub title: String,
    pub payload: String,
    pub status: RecordStatus,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
}

/// Three-way outcome of consulting the external cache for a record id.
///
/// The wire encoding stays an integer (`ABSENT_SENTINEL` or a positive id)
/// so entries written by earlier deployments keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedLookup {
    Found(i64),
    ConfirmedAbsent,
    Unknown,
}

impl CachedLookup {
    pub fn from_cached(value: Option<i64>) -> Self {
        match value {
            Some(id) if id > 0 => CachedLookup::Found(id),
            Some(_) => CachedLookup::ConfirmedAbsent,
            None => CachedLookup::Unknown,
        }
    }
}

/// Result of inspecting a record payload before it may become configuration.
#[derive(Debug)]
pub enum PayloadVerdict {
    /// Payload was owned by this crate's write path; the flag has been
    /// stripped and the rest is usable configuration.
    Trusted(Map<String, Value>),
    /// Structurally valid but not marked as owned. An expected state, not a
    /// malfunction.
    Untrusted,
    /// Payload text could not be decoded at all.
    Malformed(serde_json::Error),
}

/// Decode a record payload and apply the authenticity check.
pub fn inspect_payload(payload: &str) -> PayloadVerdict {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => return PayloadVerdict::Malformed(err),
    };

    let Value::Object(mut map) = value else {
        return PayloadVerdict::Untrusted;
    };

    match map.remove(OWNED_FLAG) {
        Some(Value::Bool(true)) => PayloadVerdict::Trusted(map),
        _ => PayloadVerdict::Untrusted,
    }
}

/// Payload written when a fresh, empty override record is created.
pub fn empty_owned_payload() -> String {
    serde_json::json!({ OWNED_FLAG: true, "version": 1 }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cached_lookup_maps_integer_range() {
        assert_eq!(CachedLookup::from_cached(Some(7)), CachedLookup::Found(7));
        assert_eq!(
            CachedLookup::from_cached(Some(ABSENT_SENTINEL)),
            CachedLookup::ConfirmedAbsent
        );
        assert_eq!(CachedLookup::from_cached(Some(0)), CachedLookup::ConfirmedAbsent);
        assert_eq!(CachedLookup::from_cached(None), CachedLookup::Unknown);
    }

    #[test]
    fn trusted_payload_loses_its_flag() {
        let payload = json!({ OWNED_FLAG: true, "settings": { "color": {} } }).to_string();
        match inspect_payload(&payload) {
            PayloadVerdict::Trusted(map) => {
                assert!(!map.contains_key(OWNED_FLAG));
                assert!(map.contains_key("settings"));
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn valid_payload_without_flag_is_untrusted() {
        let payload = json!({ "settings": { "color": {} } }).to_string();
        assert!(matches!(inspect_payload(&payload), PayloadVerdict::Untrusted));
    }

    #[test]
    fn false_flag_is_untrusted() {
        let payload = json!({ OWNED_FLAG: false, "settings": {} }).to_string();
        assert!(matches!(inspect_payload(&payload), PayloadVerdict::Untrusted));
    }

    #[test]
    fn non_object_payload_is_untrusted() {
        assert!(matches!(inspect_payload("[1, 2]"), PayloadVerdict::Untrusted));
    }

    #[test]
    fn undecodable_payload_is_malformed() {
        assert!(matches!(
            inspect_payload("{not json"),
            PayloadVerdict::Malformed(_)
        ));
    }

    #[test]
    fn empty_owned_payload_round_trips_as_trusted_and_empty() {
        match inspect_payload(&empty_owned_payload()) {
            PayloadVerdict::Trusted(map) => {
                assert_eq!(map.get("version"), Some(&json!(1)));
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }
}
