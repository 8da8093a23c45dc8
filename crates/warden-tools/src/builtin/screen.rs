//! Screen-control tools: mouse, keyboard, and platform scripting.
//!
//! macOS goes through `osascript` (and `cliclick` for pointer movement),
//! Linux through `xdotool`. On platforms with neither, every tool returns
//! an `Error:` string and the model is told why.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional, required, run_command, run_shell};
use crate::registry::{ToolHandler, ToolRegistry};

const UNSUPPORTED: &str = "Error: screen control is not supported on this platform";

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "get_screen_info",
            "Get the primary display's resolution",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        ),
        Arc::new(GetScreenInfo),
    );
    registry.register(
        ToolDescriptor::new(
            "move_mouse",
            "Move the mouse pointer to absolute screen coordinates",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        )
        .param("x", ParamSpec::integer("X coordinate"))
        .param("y", ParamSpec::integer("Y coordinate")),
        Arc::new(MoveMouse),
    );
    registry.register(
        ToolDescriptor::new(
            "click_mouse",
            "Click the mouse, optionally moving to coordinates first",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        )
        .param("x", ParamSpec::integer("X coordinate").optional())
        .param("y", ParamSpec::integer("Y coordinate").optional())
        .param(
            "button",
            ParamSpec::string("Mouse button").optional().one_of(&["left", "right"]),
        ),
        Arc::new(ClickMouse),
    );
    registry.register(
        ToolDescriptor::new(
            "scroll_mouse",
            "Scroll the mouse wheel",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        )
        .param(
            "direction",
            ParamSpec::string("Scroll direction").one_of(&["up", "down"]),
        )
        .param("amount", ParamSpec::integer("Scroll clicks (default: 3)").optional()),
        Arc::new(ScrollMouse),
    );
    registry.register(
        ToolDescriptor::new(
            "type_text",
            "Type text at the current focus via synthetic keystrokes",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        )
        .param("text", ParamSpec::string("Text to type")),
        Arc::new(TypeText),
    );
    registry.register(
        ToolDescriptor::new(
            "press_key",
            "Press a single key, e.g. return, tab, escape, space",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        )
        .param("key", ParamSpec::string("Key name to press")),
        Arc::new(PressKey),
    );
    registry.register(
        ToolDescriptor::new(
            "run_applescript_or_platform_script",
            "Run an AppleScript on macOS, or a shell script elsewhere",
            ToolCategory::ScreenControl,
            RiskLevel::High,
        )
        .param("script", ParamSpec::string("Script source to run")),
        Arc::new(RunPlatformScript),
    );
}

async fn report(result: Result<(i32, String, String)>, success_msg: String) -> Result<String> {
    let (code, stdout, stderr) = result?;
    if code == 0 {
        let out = stdout.trim();
        Ok(if out.is_empty() {
            success_msg
        } else {
            out.to_string()
        })
    } else {
        Ok(format!("Error: {}", stderr.trim()))
    }
}

struct GetScreenInfo;

#[async_trait]
impl ToolHandler for GetScreenInfo {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        if cfg!(target_os = "macos") {
            report(
                run_command(
                    "osascript",
                    &[
                        "-e",
                        "tell application \"Finder\" to get bounds of window of desktop",
                    ],
                    None,
                )
                .await,
                "unknown display bounds".into(),
            )
            .await
        } else if cfg!(target_os = "linux") {
            report(
                run_command("xdotool", &["getdisplaygeometry"], None).await,
                "unknown display geometry".into(),
            )
            .await
        } else {
            Ok(UNSUPPORTED.into())
        }
    }
}

struct MoveMouse;

#[async_trait]
impl ToolHandler for MoveMouse {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let x = required(args, "x", "move_mouse")?;
        let y = required(args, "y", "move_mouse")?;
        if cfg!(target_os = "macos") {
            report(
                run_command("cliclick", &[&format!("m:{x},{y}")], None).await,
                format!("Moved mouse to ({x}, {y})"),
            )
            .await
        } else if cfg!(target_os = "linux") {
            report(
                run_command("xdotool", &["mousemove", x, y], None).await,
                format!("Moved mouse to ({x}, {y})"),
            )
            .await
        } else {
            Ok(UNSUPPORTED.into())
        }
    }
}

struct ClickMouse;

#[async_trait]
impl ToolHandler for ClickMouse {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let button = optional(args, "button").unwrap_or("left");
        let at = match (optional(args, "x"), optional(args, "y")) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };

        if cfg!(target_os = "macos") {
            let op = if button == "right" { "rc" } else { "c" };
            let spec = match at {
                Some((x, y)) => format!("{op}:{x},{y}"),
                None => format!("{op}:."),
            };
            report(
                run_command("cliclick", &[&spec], None).await,
                format!("Clicked {button} button"),
            )
            .await
        } else if cfg!(target_os = "linux") {
            if let Some((x, y)) = at {
                let (code, _, stderr) =
                    run_command("xdotool", &["mousemove", x, y], None).await?;
                if code != 0 {
                    return Ok(format!("Error: {}", stderr.trim()));
                }
            }
            let btn = if button == "right" { "3" } else { "1" };
            report(
                run_command("xdotool", &["click", btn], None).await,
                format!("Clicked {button} button"),
            )
            .await
        } else {
            Ok(UNSUPPORTED.into())
        }
    }
}

struct ScrollMouse;

#[async_trait]
impl ToolHandler for ScrollMouse {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let direction = required(args, "direction", "scroll_mouse")?;
        let amount = optional(args, "amount").unwrap_or("3");

        if cfg!(target_os = "macos") {
            let sign = if direction == "up" { "+" } else { "-" };
            report(
                run_command("cliclick", &[&format!("w:{sign}{amount}")], None).await,
                format!("Scrolled {direction} {amount}"),
            )
            .await
        } else if cfg!(target_os = "linux") {
            let btn = if direction == "up" { "4" } else { "5" };
            report(
                run_command("xdotool", &["click", "--repeat", amount, btn], None).await,
                format!("Scrolled {direction} {amount}"),
            )
            .await
        } else {
            Ok(UNSUPPORTED.into())
        }
    }
}

struct TypeText;

#[async_trait]
impl ToolHandler for TypeText {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let text = required(args, "text", "type_text")?;
        if cfg!(target_os = "macos") {
            let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
            report(
                run_command(
                    "osascript",
                    &[
                        "-e",
                        &format!(
                            "tell application \"System Events\" to keystroke \"{escaped}\""
                        ),
                    ],
                    None,
                )
                .await,
                format!("Typed {} characters", text.chars().count()),
            )
            .await
        } else if cfg!(target_os = "linux") {
            report(
                run_command("xdotool", &["type", "--delay", "30", text], None).await,
                format!("Typed {} characters", text.chars().count()),
            )
            .await
        } else {
            Ok(UNSUPPORTED.into())
        }
    }
}

struct PressKey;

#[async_trait]
impl ToolHandler for PressKey {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let key = required(args, "key", "press_key")?;
        if cfg!(target_os = "macos") {
            // System Events wants key codes for specials; cover common names.
            let code = match key.to_lowercase().as_str() {
                "return" | "enter" => "36",
                "tab" => "48",
                "escape" | "esc" => "53",
                "space" => "49",
                "delete" | "backspace" => "51",
                "up" => "126",
                "down" => "125",
                "left" => "123",
                "right" => "124",
                _ => {
                    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
                    return report(
                        run_command(
                            "osascript",
                            &[
                                "-e",
                                &format!(
                                    "tell application \"System Events\" to keystroke \"{escaped}\""
                                ),
                            ],
                            None,
                        )
                        .await,
                        format!("Pressed {key}"),
                    )
                    .await;
                }
            };
            report(
                run_command(
                    "osascript",
                    &[
                        "-e",
                        &format!("tell application \"System Events\" to key code {code}"),
                    ],
                    None,
                )
                .await,
                format!("Pressed {key}"),
            )
            .await
        } else if cfg!(target_os = "linux") {
            report(
                run_command("xdotool", &["key", key], None).await,
                format!("Pressed {key}"),
            )
            .await
        } else {
            Ok(UNSUPPORTED.into())
        }
    }
}

struct RunPlatformScript;

#[async_trait]
impl ToolHandler for RunPlatformScript {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let script = required(args, "script", "run_applescript_or_platform_script")?;
        if cfg!(target_os = "macos") {
            report(
                run_command("osascript", &["-e", script], None).await,
                "Script finished".into(),
            )
            .await
        } else {
            let (code, stdout, stderr) = run_shell(script, None).await?;
            if code == 0 {
                Ok(if stdout.trim().is_empty() {
                    "Script finished".into()
                } else {
                    stdout
                })
            } else {
                Ok(format!("Error: script exited with {code}: {}", stderr.trim()))
            }
        }
    }
}
