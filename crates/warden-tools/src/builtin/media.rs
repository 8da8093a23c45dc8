//! Screenshot tool. Captures the primary display to a JPEG in the temp
//! directory via the platform's capture utility and returns the path.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{run_shell, shell_escape};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "take_screenshot",
            "Capture the primary display to a JPEG file and return its path",
            ToolCategory::Media,
            RiskLevel::Medium,
        ),
        Arc::new(TakeScreenshot),
    );
}

struct TakeScreenshot;

#[async_trait]
impl ToolHandler for TakeScreenshot {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        let path = std::env::temp_dir().join(format!(
            "warden-shot-{}.jpg",
            uuid::Uuid::new_v4().as_simple()
        ));
        let target = shell_escape(&path.to_string_lossy());

        let line = if cfg!(target_os = "macos") {
            format!("screencapture -x -t jpg {target}")
        } else if cfg!(target_os = "linux") {
            // ImageMagick first, gnome-screenshot as fallback.
            format!("import -window root {target} 2>/dev/null || gnome-screenshot -f {target}")
        } else {
            return Ok("Error: screenshots are not supported on this platform".into());
        };

        let (code, _, stderr) = run_shell(&line, None).await?;
        if code == 0 && path.exists() {
            Ok(format!("Screenshot saved to {}", path.display()))
        } else {
            Ok(format!("Error: screenshot failed: {}", stderr.trim()))
        }
    }
}
