use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::warn;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, OnceLock};

/// Duration estimate used when a file cannot be probed. Durations only feed
/// the remaining-time display, never correctness.
pub const FALLBACK_DURATION_SECS: f64 = 3.0;

/// Platform playback strategy. One implementation is selected per process;
/// supporting a new platform means adding an implementation here, not
/// branching in the playback loop.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play a single artifact at the given speed multiplier, returning once
    /// the player process exits. Non-zero exit or spawn failure is an error.
    async fn play(&self, path: &Path, rate: f64) -> Result<()>;

    /// Kill any in-flight playback. No-op when nothing is playing.
    fn stop(&self);

    /// Best-effort duration of the artifact in seconds.
    fn duration_secs(&self, path: &Path) -> f64;

    fn is_available(&self) -> bool;
}

fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn kill_by_name(name: &str) {
    let _ = Command::new("pkill")
        .arg("-f")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// --- macOS ---

pub struct AfplayPlayer;

#[async_trait]
impl AudioPlayer for AfplayPlayer {
    async fn play(&self, path: &Path, rate: f64) -> Result<()> {
        let status = tokio::process::Command::new("afplay")
            .arg("-r")
            .arg(rate.to_string())
            .arg(path)
            .status()
            .await
            .context("Failed to spawn afplay")?;

        if !status.success() {
            return Err(anyhow!("afplay exited with {}", status));
        }
        Ok(())
    }

    fn stop(&self) {
        kill_by_name("afplay");
    }

    fn duration_secs(&self, path: &Path) -> f64 {
        let output = match Command::new("afinfo").arg(path).output() {
            Ok(o) if o.status.success() => o,
            _ => return FALLBACK_DURATION_SECS,
        };
        parse_afinfo_duration(&String::from_utf8_lossy(&output.stdout))
            .unwrap_or(FALLBACK_DURATION_SECS)
    }

    fn is_available(&self) -> bool {
        binary_exists("afplay")
    }
}

/// afinfo reports "estimated duration: 12.345 sec"; any other "<n> sec"
/// token is accepted as a fallback.
fn parse_afinfo_duration(text: &str) -> Option<f64> {
    for line in text.lines() {
        let lower = line.to_lowercase();
        if let Some(rest) = lower.split("estimated duration:").nth(1) {
            if let Ok(v) = rest
                .split_whitespace()
                .next()
                .unwrap_or("")
                .parse::<f64>()
            {
                return Some(v);
            }
        }
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    for pair in tokens.windows(2) {
        if pair[1].starts_with("sec") {
            if let Ok(v) = pair[0].parse::<f64>() {
                return Some(v);
            }
        }
    }
    None
}

// --- Linux ---

pub struct MpvPlayer;

#[async_trait]
impl AudioPlayer for MpvPlayer {
    async fn play(&self, path: &Path, rate: f64) -> Result<()> {
        let status = tokio::process::Command::new("mpv")
            .arg("--really-quiet")
            .arg("--no-video")
            .arg(format!("--speed={}", rate))
            .arg(path)
            .status()
            .await
            .context("Failed to spawn mpv")?;

        if !status.success() {
            return Err(anyhow!("mpv exited with {}", status));
        }
        Ok(())
    }

    fn stop(&self) {
        kill_by_name("mpv");
    }

    fn duration_secs(&self, path: &Path) -> f64 {
        let output = match Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(path)
            .output()
        {
            Ok(o) if o.status.success() => o,
            _ => return FALLBACK_DURATION_SECS,
        };
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .unwrap_or(FALLBACK_DURATION_SECS)
    }

    fn is_available(&self) -> bool {
        binary_exists("mpv")
    }
}

/// Pick the player for the current platform.
pub fn create_player() -> Box<dyn AudioPlayer> {
    let player: Box<dyn AudioPlayer> = match std::env::consts::OS {
        "macos" => Box::new(AfplayPlayer),
        "linux" => Box::new(MpvPlayer),
        _ => Box::new(AfplayPlayer),
    };
    if !player.is_available() {
        warn!("No working audio player found; playback will fail until one is installed");
    }
    player
}

static PLAYER: OnceLock<Arc<dyn AudioPlayer>> = OnceLock::new();

/// Process-wide player instance, selected once and cached.
pub fn default_player() -> Arc<dyn AudioPlayer> {
    PLAYER.get_or_init(|| Arc::from(create_player())).clone()
}
