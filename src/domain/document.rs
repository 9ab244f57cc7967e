//! Settings documents and the merge contract.
//!
//! A [`SettingsDocument`] is an opaque tree of settings tagged with the
//! [`Origin`] it came from. The resolver only ever constructs documents and
//! folds them together; key-level semantics live entirely in here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Precedence tier a document belongs to, listed lowest to highest.
///
/// During a merge, settings from a higher tier overwrite overlapping keys
/// from a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Default,
    Theme,
    Custom,
}

impl Origin {
    /// All origins in merge order. The fold sequence must never be reordered.
    pub const ALL: [Origin; 3] = [Origin::Default, Origin::Theme, Origin::Custom];

    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Default => "default",
            Origin::Theme => "theme",
            Origin::Custom => "custom",
        }
    }
}

/// Deep merge where the argument's keys win on conflict.
///
/// Nested objects merge recursively; arrays and scalars are replaced
/// wholesale. Not commutative.
pub trait Mergeable {
    fn merge(&mut self, other: &Self);
}

/// An opaque settings tree tagged with its originating tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    origin: Origin,
    data: Value,
}

impl SettingsDocument {
    /// A document with no settings.
    pub fn empty(origin: Origin) -> Self {
        Self {
            origin,
            data: Value::Object(Map::new()),
        }
    }

    /// Construct from raw decoded data. Anything that is not a JSON object
    /// normalizes to an empty document rather than failing.
    pub fn from_raw(data: Value, origin: Origin) -> Self {
        let data = match data {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(Map::new()),
        };
        Self { origin, data }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    /// Look up a value by JSON pointer, e.g. `/settings/color/palette`.
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.data.pointer(pointer)
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_object().is_none_or(Map::is_empty)
    }
}

impl Mergeable for SettingsDocument {
    fn merge(&mut self, other: &Self) {
        merge_values(&mut self.data, &other.data);
    }
}

fn merge_values(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, value) in other_map {
                match base_map.get_mut(key) {
                    Some(slot) if slot.is_object() && value.is_object() => {
                        merge_values(slot, value);
                    }
                    _ => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(data: Value) -> SettingsDocument {
        SettingsDocument::from_raw(data, Origin::Theme)
    }

    #[test]
    fn non_object_raw_data_normalizes_to_empty() {
        let document = SettingsDocument::from_raw(json!([1, 2, 3]), Origin::Default);
        assert!(document.is_empty());
        assert_eq!(document.origin(), Origin::Default);
    }

    #[test]
    fn merge_favors_argument_keys() {
        let mut base = doc(json!({"color": {"background": "#fff", "text": "#111"}}));
        let other = doc(json!({"color": {"background": "#000"}}));
        base.merge(&other);

        assert_eq!(base.get("/color/background"), Some(&json!("#000")));
        assert_eq!(base.get("/color/text"), Some(&json!("#111")));
    }

    #[test]
    fn merge_replaces_arrays_wholesale() {
        let mut base = doc(json!({"palette": [{"slug": "a"}, {"slug": "b"}]}));
        let other = doc(json!({"palette": [{"slug": "c"}]}));
        base.merge(&other);

        assert_eq!(base.get("/palette"), Some(&json!([{"slug": "c"}])));
    }

    #[test]
    fn merge_recurses_into_nested_objects() {
        let mut base = doc(json!({"settings": {"color": {"custom": true}}}));
        let other = doc(json!({"settings": {"typography": {"fluid": false}}}));
        base.merge(&other);

        assert_eq!(base.get("/settings/color/custom"), Some(&json!(true)));
        assert_eq!(base.get("/settings/typography/fluid"), Some(&json!(false)));
    }

    #[test]
    fn merge_is_left_fold_consistent() {
        let a = doc(json!({"x": 1, "shared": "a"}));
        let b = doc(json!({"y": 2, "shared": "b"}));
        let c = doc(json!({"z": 3, "shared": "c"}));

        let mut flat = SettingsDocument::empty(Origin::Default);
        flat.merge(&a);
        flat.merge(&b);
        flat.merge(&c);

        let mut grouped = SettingsDocument::empty(Origin::Default);
        grouped.merge(&a);
        let mut bc = b.clone();
        bc.merge(&c);
        grouped.merge(&bc);

        assert_eq!(flat.data(), grouped.data());
        assert_eq!(flat.get("/shared"), Some(&json!("c")));
    }

    #[test]
    fn merge_is_not_commutative() {
        let a = doc(json!({"shared": "a"}));
        let b = doc(json!({"shared": "b"}));

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        assert_ne!(ab.data(), ba.data());
    }

    #[test]
    fn merge_keeps_own_origin_tag() {
        let mut base = SettingsDocument::empty(Origin::Default);
        base.merge(&doc(json!({"k": "v"})));
        assert_eq!(base.origin(), Origin::Default);
    }
}
