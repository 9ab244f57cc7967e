//! Platform default settings.

use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::application::translate::Translations;
use crate::domain::document::{Origin, SettingsDocument};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "loaders::core";

/// Text domain the built-in definition file is translated under.
const DEFAULT_DOMAIN: &str = "default";

const BUILTIN_DEFINITION: &str = include_str!("../../../assets/default-settings.json");

/// Loads the built-in platform defaults, once per process.
pub struct CoreLoader {
    translations: Arc<Translations>,
    pub(crate) doc: RwLock<Option<SettingsDocument>>,
}

impl CoreLoader {
    pub fn new(translations: Arc<Translations>) -> Self {
        Self {
            translations,
            doc: RwLock::new(None),
        }
    }

    /// The platform default document. The first call parses and translates
    /// the built-in definition file; later calls return the memo.
    pub fn get(&self) -> SettingsDocument {
        if let Some(doc) = rw_read(&self.doc, SOURCE, "get").clone() {
            return doc;
        }

        let doc = self.load();
        *rw_write(&self.doc, SOURCE, "store") = Some(doc.clone());
        doc
    }

    fn load(&self) -> SettingsDocument {
        let raw = match serde_json::from_str(BUILTIN_DEFINITION) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "Built-in definition file is malformed; defaults are empty");
                return SettingsDocument::empty(Origin::Default);
            }
        };

        let translated = self.translations.translate(raw, DEFAULT_DOMAIN);
        SettingsDocument::from_raw(translated, Origin::Default)
    }
}
