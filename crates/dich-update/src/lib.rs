//! Update lifecycle: check, download with progress, install.

mod channel;
mod controller;
mod github;
mod state;

pub use channel::UpdateChannel;
pub use controller::UpdateController;
pub use github::{GithubReleaseChannel, is_newer};
pub use state::UpdateState;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("Update server returned {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Release lookup failed: {0}")]
    Release(#[from] self_update::errors::Error),

    #[error("Release lookup failed: {0}")]
    Lookup(String),

    #[error("No update package for this platform in release {0}")]
    NoAsset(String),

    #[error("Failed to save update: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("No downloaded update to install")]
    NotDownloaded,
}
