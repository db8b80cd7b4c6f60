use anyhow::{Context, Result};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};

/// One registered global hotkey, unregistered again on drop
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl HotkeyManager {
    /// Escape, used to abort a region selection
    pub fn cancel_key() -> Result<Self> {
        Self::register(HotKey::new(None, Code::Escape))
    }

    pub fn with_hotkey(modifiers: Modifiers, code: Code) -> Result<Self> {
        Self::register(HotKey::new(Some(modifiers), code))
    }

    fn register(hotkey: HotKey) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;

        manager
            .register(hotkey)
            .context("Failed to register hotkey")?;

        Ok(Self { manager, hotkey })
    }

    /// Check if hotkey was pressed (non-blocking)
    pub fn poll(&self) -> bool {
        let receiver = GlobalHotKeyEvent::receiver();
        while let Ok(event) = receiver.try_recv() {
            if event.id == self.hotkey.id() && event.state == HotKeyState::Pressed {
                return true;
            }
            tracing::trace!("Ignoring hotkey event {:?}", event.id);
        }
        false
    }

    pub fn id(&self) -> u32 {
        self.hotkey.id()
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        if let Err(e) = self.manager.unregister(self.hotkey) {
            tracing::warn!("Failed to unregister hotkey: {}", e);
        }
    }
}
