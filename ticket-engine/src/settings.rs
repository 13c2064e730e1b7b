//! Settings and table list persistence
//!
//! Both live as JSON files in the working directory. Writes go to a
//! temporary sibling first and are renamed into place.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Settings, SettingsPatch};
use tokio::fs;
use tracing::{info, warn};

use crate::bill::Percent;
use crate::error::SettingsError;

pub type SettingsResult<T> = Result<T, SettingsError>;

async fn read_json<T: DeserializeOwned>(path: &Path) -> SettingsResult<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> SettingsResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Settings document on disk
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load settings, starting from defaults when the file does not exist
    pub async fn load(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let settings = match read_json::<Settings>(&path).await? {
            Some(settings) => settings,
            None => {
                info!(path = %path.display(), "No settings file, using defaults");
                Settings::default()
            }
        };
        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Merge a partial update and persist it
    ///
    /// A VAT percent in the patch must parse and lie within 0-100;
    /// printer host/port are kept as entered.
    pub async fn update(&mut self, patch: SettingsPatch) -> SettingsResult<&Settings> {
        if let Some(vat) = patch.vat_percent.as_deref() {
            Percent::strict(vat)?;
        }

        let mut next = self.settings.clone();
        next.apply(patch);
        write_json_atomic(&self.path, &next).await?;
        self.settings = next;

        info!(path = %self.path.display(), "Settings saved");
        Ok(&self.settings)
    }

    pub async fn save(&self) -> SettingsResult<()> {
        write_json_atomic(&self.path, &self.settings).await
    }
}

pub const DEFAULT_TABLE_COUNT: usize = 12;

/// Master list of table names shown on the home screen
#[derive(Debug, Clone)]
pub struct TableList {
    path: PathBuf,
    names: Vec<String>,
}

impl TableList {
    /// `Bàn 1` .. `Bàn 12`
    pub fn default_names() -> Vec<String> {
        (1..=DEFAULT_TABLE_COUNT).map(|i| format!("Bàn {}", i)).collect()
    }

    pub async fn load(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let names = match read_json::<Vec<String>>(&path).await? {
            Some(names) => names,
            None => Self::default_names(),
        };
        Ok(Self { path, names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Add a table; blank or duplicate names are ignored
    pub async fn add(&mut self, name: &str) -> SettingsResult<bool> {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            warn!(table = %name, "Table not added");
            return Ok(false);
        }
        self.names.push(name.to_string());
        self.save().await?;
        Ok(true)
    }

    pub async fn remove(&mut self, name: &str) -> SettingsResult<bool> {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        if self.names.len() == before {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    pub async fn save(&self) -> SettingsResult<()> {
        write_json_atomic(&self.path, &self.names).await
    }
}
