use async_trait::async_trait;
use tracing::debug;

use warden_core::{Result, WardenError};

/// Pluggable screen-capture capability.
///
/// The engine only needs JPEG bytes of the primary display, scaled down to
/// `max_width`. On platforms without a capture backend the vision feedback
/// step is skipped silently and the loop degrades gracefully.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self, display_id: Option<u32>, max_width: u32) -> Result<Vec<u8>>;
}

/// Shell-out capture: `screencapture` + `sips` on macOS, ImageMagick
/// `import`/`convert` on Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformScreenCapture;

impl PlatformScreenCapture {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScreenCapture for PlatformScreenCapture {
    async fn capture(&self, display_id: Option<u32>, max_width: u32) -> Result<Vec<u8>> {
        let path = std::env::temp_dir().join(format!(
            "warden-capture-{}.jpg",
            uuid::Uuid::new_v4().as_simple()
        ));
        let target = path.to_string_lossy().to_string();

        let line = if cfg!(target_os = "macos") {
            let display = display_id
                .map(|d| format!("-D {d} "))
                .unwrap_or_default();
            format!(
                "screencapture -x -t jpg {display}'{target}' && sips -Z {max_width} '{target}' >/dev/null"
            )
        } else if cfg!(target_os = "linux") {
            format!("import -window root -resize {max_width} jpeg:'{target}'")
        } else {
            return Err(WardenError::ScreenCapture(
                "no capture backend on this platform".into(),
            ));
        };

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| WardenError::ScreenCapture(e.to_string()))?;

        if !output.status.success() {
            return Err(WardenError::ScreenCapture(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| WardenError::ScreenCapture(e.to_string()))?;
        tokio::fs::remove_file(&path).await.ok();
        debug!(bytes = bytes.len(), "captured screen");
        Ok(bytes)
    }
}
