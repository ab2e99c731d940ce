use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde_json::{Map, Value};

use super::palette::{Theme, ThemeChoice, THEMES};

pub const THEME_STORAGE_KEY: &str = "app-theme";

/// Durable key/value storage for client settings.
pub trait ThemeStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// String settings kept in one JSON object on disk. Writes merge into
/// whatever is currently on disk so other keys survive.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ThemeStorage for JsonFileStorage {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let payload = read_json_object(&self.path)?;
        Ok(payload.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut on_disk = if self.path.exists() {
            read_json_object(&self.path).unwrap_or_default()
        } else {
            Map::new()
        };
        if on_disk.get(key).and_then(Value::as_str) == Some(value) {
            return Ok(());
        }
        on_disk.insert(key.to_string(), Value::String(value.to_string()));
        write_json_object(&self.path, &on_disk)
    }
}

/// Active theme plus the storage it persists to.
pub struct ThemeContext<S: ThemeStorage> {
    storage: S,
    choice: ThemeChoice,
}

impl<S: ThemeStorage> ThemeContext<S> {
    /// Never fails: absent, unknown or unreadable values select the first theme.
    pub fn load(storage: S) -> Self {
        let choice = match storage.read(THEME_STORAGE_KEY) {
            Ok(Some(name)) => stored_choice(&name).unwrap_or_else(|| {
                tracing::debug!(stored = %name, "unknown stored theme; using default");
                ThemeChoice::default()
            }),
            Ok(None) => ThemeChoice::default(),
            Err(err) => {
                tracing::debug!(error = %format!("{err:#}"), "theme storage unreadable; using default");
                ThemeChoice::default()
            }
        };
        Self { storage, choice }
    }

    pub fn choice(&self) -> ThemeChoice {
        self.choice
    }

    pub fn theme(&self) -> &'static Theme {
        self.choice.theme()
    }

    pub fn themes(&self) -> &'static [Theme] {
        &THEMES
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Switches immediately; a failed write is logged and otherwise ignored.
    pub fn set_theme(&mut self, choice: ThemeChoice) {
        self.choice = choice;
        if let Err(err) = self.storage.write(THEME_STORAGE_KEY, choice.name()) {
            tracing::error!(error = %format!("{err:#}"), theme = choice.name(), "failed to save theme");
        }
    }
}

/// Stored names must match a theme name exactly.
fn stored_choice(name: &str) -> Option<ThemeChoice> {
    THEMES
        .iter()
        .map(|theme| theme.choice)
        .find(|choice| choice.name() == name)
}

fn read_json_object(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    parsed
        .as_object()
        .cloned()
        .ok_or_else(|| anyhow!("{} is not a JSON object", path.display()))
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )
    .with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}
