use std::path::PathBuf;

use async_trait::async_trait;
use dich_types::UpdateInfo;
use tokio::sync::mpsc::UnboundedSender;

use crate::UpdateError;

/// Where updates come from
#[async_trait]
pub trait UpdateChannel: Send + Sync {
    /// `None` when the running version is current
    async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError>;

    /// Fetches the package, sending percentages in `0.0..=100.0` as it goes
    async fn download(
        &self,
        info: &UpdateInfo,
        progress: UnboundedSender<f64>,
    ) -> Result<PathBuf, UpdateError>;

    /// Hands the downloaded package to the OS installer
    async fn install(&self, info: &UpdateInfo) -> Result<(), UpdateError>;
}
