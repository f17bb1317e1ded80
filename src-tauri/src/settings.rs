use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::PathBuf,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Store API credential. Blank input is treated as "not set".
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_true")]
    notifications_enabled: bool,
    #[serde(default = "default_true")]
    auto_launch: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            notifications_enabled: true,
            auto_launch: true,
        }
    }
}

/// JSON-backed credential and preference store. Every mutation is written
/// through to disk before returning.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Raw stored credential, as last submitted.
    pub fn api_key(&self) -> Option<String> {
        self.read().api_key.clone()
    }

    pub fn credential(&self) -> Option<ApiKey> {
        self.read().api_key.as_deref().and_then(ApiKey::new)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.read().notifications_enabled
    }

    pub fn auto_launch_enabled(&self) -> bool {
        self.read().auto_launch
    }

    pub fn update_api_key(&self, api_key: String) -> Result<()> {
        self.update(|settings| settings.api_key = Some(api_key))
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.notifications_enabled = enabled)
    }

    pub fn set_auto_launch_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.auto_launch = enabled)
    }

    fn update(&self, apply: impl FnOnce(&mut UserSettings)) -> Result<()> {
        let mut guard = self.write();
        apply(&mut guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }

        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore {
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }
}
