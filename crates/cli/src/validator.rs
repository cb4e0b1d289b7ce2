//! ffprobe-backed stream validator

use async_trait::async_trait;
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use camscout_common::{generate_rtsp_url, parse_rtsp_url, Credential, ScanError, ScanResult, StreamCheck, StreamValidator};

const FFPROBE: &str = "ffprobe";

/// Runs `ffprobe` against a URL and reports the first video stream it finds.
pub struct FfprobeValidator {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl FfprobeValidator {
    /// Locate `ffprobe` on `PATH`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: find_on_path(FFPROBE),
            timeout,
        }
    }
}

#[async_trait]
impl StreamValidator for FfprobeValidator {
    async fn verify_stream(&self, url: &str, credential: Option<&Credential>) -> ScanResult<StreamCheck> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| ScanError::Capability("ffprobe not found on PATH".to_string()))?;
        let target = with_credential(url, credential)?;

        let micros = self.timeout.as_micros().to_string();
        let child = Command::new(binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .args(["-rtsp_transport", "tcp", "-timeout", micros.as_str()])
            .arg(&target)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::Capability(format!("ffprobe spawn failed: {e}")))?;

        // ffprobe's own timeout only covers socket I/O
        let budget = self.timeout + Duration::from_secs(5);
        let output = match tokio::time::timeout(budget, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(StreamCheck::unavailable(url, format!("ffprobe failed: {e}"))),
            Err(_) => {
                warn!("ffprobe timed out on {}", url);
                return Ok(StreamCheck::unavailable(url, "ffprobe timeout"));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("ffprobe rejected {}: {}", url, stderr.trim());
            return Ok(StreamCheck::unavailable(url, describe_failure(&stderr)));
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScanError::Protocol(format!("unreadable ffprobe output: {e}")))?;
        Ok(stream_check(url, &json))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Rebuild `url` with the credential's userinfo, replacing any already present.
fn with_credential(url: &str, credential: Option<&Credential>) -> ScanResult<String> {
    let Some(credential) = credential.filter(|c| !c.is_empty()) else {
        return Ok(url.to_string());
    };
    let parts = parse_rtsp_url(url)?;
    Ok(generate_rtsp_url(
        &parts.hostname,
        parts.port,
        &parts.path,
        &credential.username,
        &credential.password,
    ))
}

fn describe_failure(stderr: &str) -> String {
    let lower = stderr.to_ascii_lowercase();
    if stderr.contains("401") || lower.contains("unauthorized") {
        "Authentication failed (401)".to_string()
    } else if stderr.contains("404") || lower.contains("not found") {
        "Stream not found (404)".to_string()
    } else if lower.contains("connection refused") {
        "Connection refused".to_string()
    } else if lower.contains("timed out") || lower.contains("timeout") {
        "Connection timeout".to_string()
    } else if stderr.trim().is_empty() {
        "ffprobe failed".to_string()
    } else {
        stderr.trim().chars().take(100).collect()
    }
}

/// Fold ffprobe's `-show_streams` JSON into a verdict.
fn stream_check(url: &str, json: &Value) -> StreamCheck {
    let video = json
        .get("streams")
        .and_then(Value::as_array)
        .and_then(|streams| streams.iter().find(|s| s.get("codec_type").and_then(Value::as_str) == Some("video")));

    let Some(video) = video else {
        return StreamCheck::unavailable(url, "No video stream found");
    };

    let codec = video
        .get("codec_name")
        .and_then(Value::as_str)
        .map(str::to_uppercase);
    let resolution = match (
        video.get("width").and_then(Value::as_u64),
        video.get("height").and_then(Value::as_u64),
    ) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{w}x{h}")),
        _ => None,
    };
    let fps = ["r_frame_rate", "avg_frame_rate"]
        .iter()
        .filter_map(|key| video.get(*key).and_then(Value::as_str))
        .find_map(parse_rate);

    StreamCheck {
        url: url.to_string(),
        playable: true,
        codec,
        resolution,
        fps,
        error: None,
    }
}

/// `"30000/1001"` -> 29.97
fn parse_rate(rate: &str) -> Option<f32> {
    let (num, den) = rate.split_once('/')?;
    let num: f32 = num.trim().parse().ok()?;
    let den: f32 = den.trim().parse().ok()?;
    (den > 0.0 && num > 0.0).then(|| num / den)
}
