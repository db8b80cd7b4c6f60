use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{SecretError, SecretStore, validate_key};

#[derive(Serialize, Deserialize, Default)]
struct SecretFile {
    #[serde(default)]
    gemini_api_key: Option<String>,
}

/// JSON file in the user config directory, readable by the owner only
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/dich/credentials.json`
    pub fn in_user_config() -> Result<Self, SecretError> {
        let dir = dirs::config_dir().ok_or(SecretError::NoConfigDir)?;
        Ok(Self::new(dir.join("dich").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SecretFile, SecretError> {
        if !self.path.exists() {
            return Ok(SecretFile::default());
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write(&self, file: &SecretFile) -> Result<(), SecretError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(file)?)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self) -> Option<String> {
        match self.read() {
            Ok(file) => file.gemini_api_key.filter(|k| !k.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read credential store {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, key: &str) -> Result<(), SecretError> {
        let key = validate_key(key)?;
        let mut file = self.read().unwrap_or_default();
        file.gemini_api_key = Some(key);
        self.write(&file)?;
        tracing::info!("API key saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), SecretError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::info!("API key cleared");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), SecretError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), SecretError> {
    Ok(())
}
