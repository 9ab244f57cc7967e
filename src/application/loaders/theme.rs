//! Active-theme settings: definition file, parent inheritance, and legacy
//! capability backfill.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::warn;

use crate::application::repos::{ThemeDescriptor, ThemeProvider};
use crate::application::translate::Translations;
use crate::domain::document::{Mergeable, Origin, SettingsDocument};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "loaders::theme";

/// Capability a theme declares to opt into the built-in color palette even
/// though it ships its own presets.
pub const CAP_DEFAULT_PALETTE: &str = "default-color-palette";
/// Same, for the built-in gradient set.
pub const CAP_DEFAULT_GRADIENTS: &str = "default-gradient-presets";

/// Theme subdirectory scanned for style variation files.
const VARIATIONS_DIR: &str = "styles";

/// Loads the active theme's document.
///
/// The memoized value is the file-derived base (definition file, translated,
/// parent-merged). The legacy capability layer depends on live theme-support
/// state, so it is rebuilt beneath the base on every call.
pub struct ThemeLoader {
    themes: Arc<dyn ThemeProvider>,
    translations: Arc<Translations>,
    pub(crate) doc: RwLock<Option<SettingsDocument>>,
}

impl ThemeLoader {
    pub fn new(themes: Arc<dyn ThemeProvider>, translations: Arc<Translations>) -> Self {
        Self {
            themes,
            translations,
            doc: RwLock::new(None),
        }
    }

    /// The theme document with the capability layer folded beneath it.
    pub async fn get(&self) -> SettingsDocument {
        // The memo guard must drop before load_base and the write below.
        let memo = rw_read(&self.doc, SOURCE, "get").clone();
        let base = match memo {
            Some(doc) => doc,
            None => {
                let doc = self.load_base().await;
                *rw_write(&self.doc, SOURCE, "store") = Some(doc.clone());
                doc
            }
        };

        let mut merged = self.capability_document();
        merged.merge(&base);
        merged
    }

    /// Style variation documents from the `styles/` directory of the parent
    /// theme (if any) and the active theme, in that order. Not memoized.
    pub async fn variations(&self) -> Vec<SettingsDocument> {
        let mut themes = Vec::new();
        if let Some(parent) = self.themes.parent() {
            themes.push(parent);
        }
        themes.push(self.themes.active());

        let mut out = Vec::new();
        for theme in themes {
            let Some(dir) = self.themes.theme_dir(&theme.slug) else {
                continue;
            };
            for path in variation_files(&dir.join(VARIATIONS_DIR)).await {
                if let Some(raw) = read_json(&path).await {
                    let translated = self.translations.translate(raw, &theme.text_domain);
                    out.push(SettingsDocument::from_raw(translated, Origin::Theme));
                }
            }
        }
        out
    }

    async fn load_base(&self) -> SettingsDocument {
        let child = self.read_theme(&self.themes.active()).await;
        match self.themes.parent() {
            Some(parent) => {
                let mut base = self.read_theme(&parent).await;
                base.merge(&child);
                base
            }
            None => child,
        }
    }

    async fn read_theme(&self, theme: &ThemeDescriptor) -> SettingsDocument {
        let raw = match self.themes.definition_path(&theme.slug) {
            Some(path) => read_json(&path).await,
            None => None,
        };

        match raw {
            Some(value) => {
                let translated = self.translations.translate(value, &theme.text_domain);
                SettingsDocument::from_raw(translated, Origin::Theme)
            }
            None => SettingsDocument::empty(Origin::Theme),
        }
    }

    /// Document derived from legacy capability declarations.
    ///
    /// When the theme never authored a definition file, the default-palette
    /// and default-gradient flags are backfilled so a built-in preset list is
    /// shown instead of an empty one. An explicit file means the author made
    /// an intentional choice, so nothing is injected.
    fn capability_document(&self) -> SettingsDocument {
        let mut raw = self.themes.capability_settings();

        if !self.themes.has_definition_file() {
            let default_palette = self.themes.supports(CAP_DEFAULT_PALETTE)
                || raw.pointer("/settings/color/palette").is_none();
            let default_gradients = self.themes.supports(CAP_DEFAULT_GRADIENTS)
                || raw.pointer("/settings/color/gradients").is_none();

            if let Some(color) = color_settings_mut(&mut raw) {
                color.insert("defaultPalette".into(), Value::Bool(default_palette));
                color.insert("defaultGradients".into(), Value::Bool(default_gradients));
            }
        }

        SettingsDocument::from_raw(raw, Origin::Theme)
    }
}

/// `settings.color` object of `raw`, creating intermediate objects as needed.
fn color_settings_mut(raw: &mut Value) -> Option<&mut Map<String, Value>> {
    if !raw.is_object() {
        *raw = Value::Object(Map::new());
    }
    let settings = raw
        .as_object_mut()?
        .entry("settings")
        .or_insert_with(|| Value::Object(Map::new()));
    if !settings.is_object() {
        *settings = Value::Object(Map::new());
    }
    let color = settings
        .as_object_mut()?
        .entry("color")
        .or_insert_with(|| Value::Object(Map::new()));
    if !color.is_object() {
        *color = Value::Object(Map::new());
    }
    color.as_object_mut()
}

async fn variation_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Vec::new();
    };

    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    files
}

async fn read_json(path: &Path) -> Option<Value> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Skipping malformed definition file");
            None
        }
    }
}
