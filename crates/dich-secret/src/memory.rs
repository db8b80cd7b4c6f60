use std::sync::Mutex;

use crate::{SecretError, SecretStore, validate_key};

/// Process-local store, used for env-provided keys and tests
#[derive(Default)]
pub struct MemorySecretStore {
    key: Mutex<Option<String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a key that already passed validation elsewhere
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self) -> Option<String> {
        self.key.lock().ok().and_then(|guard| guard.clone())
    }

    fn set(&self, key: &str) -> Result<(), SecretError> {
        let key = validate_key(key)?;
        if let Ok(mut guard) = self.key.lock() {
            *guard = Some(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), SecretError> {
        if let Ok(mut guard) = self.key.lock() {
            *guard = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VALID_KEY;

    #[test]
    fn invalid_set_keeps_previous_key() {
        let store = MemorySecretStore::with_key(VALID_KEY);
        assert!(store.set("not-a-key").is_err());
        assert_eq!(store.get().as_deref(), Some(VALID_KEY));
    }

    #[test]
    fn clear_removes_key() {
        let store = MemorySecretStore::new();
        store.set(VALID_KEY).unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
        assert!(store.masked().is_none());
    }
}
