use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use dich_config::Config;
use dich_translator::PreferenceStore;
use dich_types::LanguageCode;
use serde::{Deserialize, Serialize};

pub const MAIN_PROFILE: &str = "main";

/// Per-user data folder, `~/.config/dich` on Linux
pub fn dich_root() -> anyhow::Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("dich"))
        .context("No user config directory available")
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    let profile: Profile = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse profile {}", path.display()))?;
    Ok(profile.value)
}

/// Named configuration snapshots stored as `<root>/profiles/<name>.json`
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join("profiles"),
        }
    }

    pub fn in_user_config() -> anyhow::Result<Self> {
        Ok(Self::new(dich_root()?))
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Initialize the profiles folder and the main profile if missing
    pub fn init(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;

        if !self.path(MAIN_PROFILE).exists() {
            self.save(MAIN_PROFILE, &Config::new())?;
            tracing::info!("Created main profile in {}", self.dir.display());
        }
        Ok(())
    }

    /// Load a profile by name, defaulting to main, then to the environment
    pub fn load(&self, name: &str) -> anyhow::Result<Config> {
        let file = self.path(name);
        if file.exists() {
            return read_profile(&file);
        }

        tracing::warn!("Profile {name} not found, falling back to main profile");
        let main = self.path(MAIN_PROFILE);
        if main.exists() {
            read_profile(&main)
        } else {
            Ok(Config::new())
        }
    }

    pub fn save(&self, name: &str, config: &Config) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let profile = Profile {
            name: name.to_string(),
            value: config.clone(),
        };
        let file = self.path(name);
        fs::write(&file, serde_json::to_string_pretty(&profile)?)?;
        tracing::info!("Saved profile: {name}");
        Ok(file)
    }

    /// Profile names, sorted
    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Preferences {
    #[serde(default)]
    target_lang: Option<LanguageCode>,
}

/// Remembers the last target language in `<root>/preferences.json`
pub struct FilePreferences {
    path: PathBuf,
    write: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn in_user_config() -> anyhow::Result<Self> {
        Ok(Self::new(dich_root()?.join("preferences.json")))
    }

    fn read(&self) -> anyhow::Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl PreferenceStore for FilePreferences {
    fn load_target(&self) -> Option<LanguageCode> {
        match self.read() {
            Ok(preferences) => preferences.target_lang,
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {:#}", self.path.display(), e);
                None
            }
        }
    }

    fn save_target(&self, target: &str) -> anyhow::Result<()> {
        let _guard = self.write.lock().unwrap_or_else(|p| p.into_inner());

        let mut preferences = self.read().unwrap_or_default();
        preferences.target_lang = Some(target.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&preferences)?)?;
        Ok(())
    }
}
