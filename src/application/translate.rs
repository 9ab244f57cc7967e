//! Schema-driven document translation.
//!
//! An i18n schema lists which string fields inside a settings document are
//! human-readable and therefore translatable (preset names, titles). The
//! schema ships embedded with the crate and is parsed lazily once per
//! process; the actual per-string lookup is delegated to a
//! [`StringTranslator`] backend.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::warn;

use crate::application::repos::{IdentityTranslator, StringTranslator};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "application::translate";

const I18N_SCHEMA: &str = include_str!("../../assets/i18n-schema.json");

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    /// Apply the remainder of the path to every element of an array.
    Each,
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaPath {
    segments: Vec<Segment>,
}

/// Translation service with a lazily memoized path schema.
pub struct Translations {
    backend: Arc<dyn StringTranslator>,
    schema: RwLock<Option<Arc<Vec<SchemaPath>>>>,
}

impl Translations {
    pub fn new(backend: Arc<dyn StringTranslator>) -> Self {
        Self {
            backend,
            schema: RwLock::new(None),
        }
    }

    /// A service that leaves every document untouched.
    pub fn identity() -> Self {
        Self::new(Arc::new(IdentityTranslator))
    }

    /// Translate every schema-listed string in `data` under `domain`.
    pub fn translate(&self, mut data: Value, domain: &str) -> Value {
        let schema = self.schema();
        for path in schema.iter() {
            apply(&mut data, &path.segments, &|text| {
                self.backend.translate(text, domain)
            });
        }
        data
    }

    pub(crate) fn memo(&self) -> &RwLock<Option<Arc<Vec<SchemaPath>>>> {
        &self.schema
    }

    fn schema(&self) -> Arc<Vec<SchemaPath>> {
        if let Some(schema) = rw_read(&self.schema, SOURCE, "schema.read").clone() {
            return schema;
        }

        let parsed = Arc::new(parse_schema(I18N_SCHEMA));
        let mut guard = rw_write(&self.schema, SOURCE, "schema.store");
        *guard = Some(parsed.clone());
        parsed
    }
}

fn parse_schema(text: &str) -> Vec<SchemaPath> {
    let entries: Vec<String> = match serde_json::from_str(text) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "Embedded i18n schema is malformed; translation disabled");
            return Vec::new();
        }
    };

    entries
        .iter()
        .map(|entry| SchemaPath {
            segments: parse_path(entry),
        })
        .collect()
}

fn parse_path(entry: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in entry.split('.') {
        match part.strip_suffix("[]") {
            Some(key) => {
                segments.push(Segment::Key(key.to_string()));
                segments.push(Segment::Each);
            }
            None => segments.push(Segment::Key(part.to_string())),
        }
    }
    segments
}

fn apply(value: &mut Value, segments: &[Segment], translate: &dyn Fn(&str) -> String) {
    match segments.split_first() {
        None => {
            if let Value::String(text) = value {
                *text = translate(text);
            }
        }
        Some((Segment::Key(key), rest)) => {
            if let Some(child) = value.get_mut(key) {
                apply(child, rest, translate);
            }
        }
        Some((Segment::Each, rest)) => {
            if let Value::Array(items) = value {
                for item in items {
                    apply(item, rest, translate);
                }
            }
        }
    }
}
