use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dich_config::update::UpdateConfig;
use dich_types::UpdateInfo;
use self_update::update::{Release, ReleaseAsset};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::{UpdateChannel, UpdateError};

#[derive(Clone)]
struct ReleaseQuery {
    /// GitHub Enterprise API root, `None` for github.com
    api_base: Option<String>,
    owner: String,
    repo: String,
    current_version: String,
}

impl ReleaseQuery {
    /// Blocking lookup through `self_update`'s GitHub backend
    fn latest(&self) -> Result<Release, UpdateError> {
        let mut builder = self_update::backends::github::Update::configure();
        builder
            .repo_owner(&self.owner)
            .repo_name(&self.repo)
            .bin_name(&self.repo)
            .show_download_progress(false)
            .current_version(&self.current_version);
        if let Some(api_base) = &self.api_base {
            builder.with_url(api_base);
        }

        Ok(builder.build()?.get_latest_release()?)
    }
}

/// Latest release of a GitHub repository
pub struct GithubReleaseChannel {
    client: reqwest::Client,
    query: ReleaseQuery,
    download_dir: PathBuf,
    downloaded: Mutex<Option<PathBuf>>,
}

impl GithubReleaseChannel {
    pub fn new(config: &UpdateConfig, current_version: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("dich/{current_version}"))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        let download_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("dich")
            .join("updates");

        Self {
            client,
            query: ReleaseQuery {
                api_base: None,
                owner: config.repo_owner.clone(),
                repo: config.repo_name.clone(),
                current_version: current_version.to_string(),
            },
            download_dir,
            downloaded: Mutex::new(None),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.query.api_base = Some(api_base.into());
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}

/// `candidate` is a strictly higher semver than `current`; unparsable
/// versions never count as newer
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let strip = |v: &str| v.trim().trim_start_matches(['v', 'V']).to_string();
    self_update::version::bump_is_greater(&strip(current), &strip(candidate)).unwrap_or(false)
}

/// Package suffixes this platform can install, in order of preference
fn platform_suffixes() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &[".msi", ".exe"]
    } else if cfg!(target_os = "macos") {
        &[".dmg"]
    } else {
        &[".AppImage", ".deb"]
    }
}

fn pick_asset<'a>(assets: &'a [ReleaseAsset], suffixes: &[&str]) -> Option<&'a ReleaseAsset> {
    suffixes
        .iter()
        .find_map(|suffix| assets.iter().find(|a| a.name.ends_with(suffix)))
}

fn file_name(url: &str) -> &str {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("dich-update")
}

#[async_trait]
impl UpdateChannel for GithubReleaseChannel {
    async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let query = self.query.clone();
        tracing::info!("Checking for updates to {}/{}", query.owner, query.repo);

        let release = tokio::task::spawn_blocking(move || query.latest())
            .await
            .map_err(|e| UpdateError::Lookup(e.to_string()))??;

        let current = &self.query.current_version;
        if !is_newer(&release.version, current) {
            tracing::info!("Up to date ({} >= {})", current, release.version);
            return Ok(None);
        }

        let asset = pick_asset(&release.assets, platform_suffixes())
            .ok_or_else(|| UpdateError::NoAsset(release.version.clone()))?;

        Ok(Some(UpdateInfo {
            version: release.version.clone(),
            release_date: Some(release.date.clone()).filter(|d| !d.is_empty()),
            release_notes: release.body.clone(),
            download_url: asset.download_url.clone(),
            size: None,
        }))
    }

    async fn download(
        &self,
        info: &UpdateInfo,
        progress: UnboundedSender<f64>,
    ) -> Result<PathBuf, UpdateError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(file_name(&info.download_url));

        // Asset URLs from the releases API serve the file for this media type
        let mut response = self
            .client
            .get(&info.download_url)
            .header("Accept", "application/octet-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(UpdateError::Status(response.status().as_u16()));
        }

        let total = response.content_length().or(info.size).filter(|t| *t > 0);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut received: u64 = 0;
        let _ = progress.send(0.0);

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            if let Some(total) = total {
                let _ = progress.send(received as f64 * 100.0 / total as f64);
            }
        }
        file.flush().await?;

        let _ = progress.send(100.0);
        tracing::info!("Downloaded {} bytes to {}", received, path.display());

        if let Ok(mut slot) = self.downloaded.lock() {
            *slot = Some(path.clone());
        }
        Ok(path)
    }

    async fn install(&self, info: &UpdateInfo) -> Result<(), UpdateError> {
        let path = self
            .downloaded
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(UpdateError::NotDownloaded)?;

        tracing::info!("Installing {} from {}", info.version, path.display());
        launch_installer(&path)?;
        Ok(())
    }
}

fn launch_installer(path: &Path) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        tokio::process::Command::new(path)
    } else if cfg!(target_os = "macos") {
        let mut command = tokio::process::Command::new("open");
        command.arg(path);
        command
    } else {
        let mut command = tokio::process::Command::new("xdg-open");
        command.arg(path);
        command
    };
    command.spawn()?;
    Ok(())
}
