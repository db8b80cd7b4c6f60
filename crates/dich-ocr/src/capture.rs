use std::path::Path;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use dich_types::CaptureRegion;
use xcap::Monitor;

use crate::ImagePayload;

/// Turns a screen region into an encoded image
#[async_trait]
pub trait ScreenGrabber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn grab(&self, region: CaptureRegion) -> Result<ImagePayload>;
}

/// Full-monitor capture through xcap, cropped in-process
pub struct XcapGrabber;

#[async_trait]
impl ScreenGrabber for XcapGrabber {
    fn name(&self) -> &'static str {
        "xcap"
    }

    async fn grab(&self, region: CaptureRegion) -> Result<ImagePayload> {
        let png = tokio::task::spawn_blocking(move || capture_screen_region(region))
            .await
            .context("Capture task panicked")??;
        Ok(ImagePayload::from_bytes(png)?)
    }
}

/// Capture a region of the screen
pub fn capture_screen_region(region: CaptureRegion) -> Result<Vec<u8>> {
    let monitors = Monitor::all().context("Failed to get monitors")?;

    let monitor = monitors
        .iter()
        .find(|m| region.is_within(&CaptureRegion::new(m.x(), m.y(), m.width(), m.height())))
        .or(monitors.first())
        .context("No monitor found")?;

    let image = monitor.capture_image().context("Failed to capture screen")?;

    let (left, top) = region.offset_from(monitor.x(), monitor.y());
    let cropped = xcap::image::imageops::crop_imm(
        &image,
        left,
        top,
        region.width,
        region.height,
    )
    .to_image();

    if cropped.width() == 0 || cropped.height() == 0 {
        bail!("Region {} lies outside monitor {}", region, monitor.name());
    }

    encode_png(&cropped)
}

fn encode_png(image: &xcap::image::RgbaImage) -> Result<Vec<u8>> {
    use xcap::image::ImageEncoder;
    let mut buffer = Vec::new();
    xcap::image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            xcap::image::ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(buffer)
}

/// OS screenshot tool writing a PNG to a temp file
pub struct CommandGrabber {
    template: Option<String>,
}

impl CommandGrabber {
    /// `template` overrides the platform tool; see [`command_line`]
    pub fn new(template: Option<String>) -> Self {
        Self { template }
    }
}

/// Argument vector for capturing `region` into `out`.
///
/// A configured template is split on whitespace with `{x} {y} {w} {h} {out}`
/// substituted per token. Without one, `grim` is used on Linux and
/// `screencapture` on macOS; other platforms have no default.
pub fn command_line(
    template: Option<&str>,
    region: CaptureRegion,
    out: &Path,
) -> Option<Vec<String>> {
    let out = out.display().to_string();

    if let Some(template) = template.filter(|t| !t.trim().is_empty()) {
        return Some(
            template
                .split_whitespace()
                .map(|token| {
                    token
                        .replace("{x}", &region.x.to_string())
                        .replace("{y}", &region.y.to_string())
                        .replace("{w}", &region.width.to_string())
                        .replace("{h}", &region.height.to_string())
                        .replace("{out}", &out)
                })
                .collect(),
        );
    }

    if cfg!(target_os = "linux") {
        Some(vec!["grim".into(), "-g".into(), region.to_string(), out])
    } else if cfg!(target_os = "macos") {
        Some(vec![
            "screencapture".into(),
            "-x".into(),
            "-R".into(),
            format!(
                "{},{},{},{}",
                region.x, region.y, region.width, region.height
            ),
            out,
        ])
    } else {
        None
    }
}

#[async_trait]
impl ScreenGrabber for CommandGrabber {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn grab(&self, region: CaptureRegion) -> Result<ImagePayload> {
        let file = tempfile::Builder::new()
            .prefix("dich-capture-")
            .suffix(".png")
            .tempfile()
            .context("Failed to create capture file")?;

        let argv = command_line(self.template.as_deref(), region, file.path())
            .context("No screenshot command for this platform")?;
        let (program, args) = argv.split_first().context("Empty screenshot command")?;

        tracing::debug!("Running {} {:?}", program, args);
        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let bytes = tokio::fs::read(file.path())
            .await
            .context("Failed to read screenshot")?;
        Ok(ImagePayload::from_bytes(bytes)?)
    }
}

/// Tries `primary`, then `fallback` when it fails
pub struct FallbackGrabber {
    primary: Box<dyn ScreenGrabber>,
    fallback: Box<dyn ScreenGrabber>,
}

impl FallbackGrabber {
    pub fn new(primary: Box<dyn ScreenGrabber>, fallback: Box<dyn ScreenGrabber>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ScreenGrabber for FallbackGrabber {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn grab(&self, region: CaptureRegion) -> Result<ImagePayload> {
        match self.primary.grab(region).await {
            Ok(image) => Ok(image),
            Err(e) => {
                tracing::warn!(
                    "{} capture failed ({:#}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.grab(region).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::payload::tests::png;

    #[test]
    fn template_placeholders_are_substituted() {
        let argv = command_line(
            Some("shot --rect {x},{y},{w},{h} -o {out}"),
            CaptureRegion::new(10, 20, 300, 400),
            Path::new("/tmp/out.png"),
        )
        .unwrap();
        assert_eq!(
            argv,
            ["shot", "--rect", "10,20,300,400", "-o", "/tmp/out.png"]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_defaults_to_grim() {
        let argv = command_line(None, CaptureRegion::new(1, 2, 3, 4), Path::new("/tmp/a.png"))
            .unwrap();
        assert_eq!(argv, ["grim", "-g", "1,2 3x4", "/tmp/a.png"]);
    }

    struct Failing(AtomicUsize);

    #[async_trait]
    impl ScreenGrabber for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn grab(&self, _region: CaptureRegion) -> Result<ImagePayload> {
            self.0.fetch_add(1, Ordering::SeqCst);
            bail!("no display")
        }
    }

    struct Blank;

    #[async_trait]
    impl ScreenGrabber for Blank {
        fn name(&self) -> &'static str {
            "blank"
        }

        async fn grab(&self, region: CaptureRegion) -> Result<ImagePayload> {
            Ok(ImagePayload::from_bytes(png(region.width, region.height))?)
        }
    }

    #[tokio::test]
    async fn fallback_is_used_after_primary_fails() {
        let grabber = FallbackGrabber::new(Box::new(Failing(AtomicUsize::new(0))), Box::new(Blank));
        let image = grabber.grab(CaptureRegion::new(0, 0, 32, 16)).await.unwrap();
        assert_eq!((image.width, image.height), (32, 16));
    }

    #[tokio::test]
    async fn both_failing_reports_fallback_error() {
        let grabber = FallbackGrabber::new(
            Box::new(Failing(AtomicUsize::new(0))),
            Box::new(Failing(AtomicUsize::new(0))),
        );
        let err = grabber.grab(CaptureRegion::new(0, 0, 32, 16)).await.unwrap_err();
        assert_eq!(err.to_string(), "no display");
    }
}
