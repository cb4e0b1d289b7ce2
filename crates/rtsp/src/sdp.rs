//! Minimal SDP reader: codec, resolution and control URL of the video track.

use once_cell::sync::Lazy;
use regex::Regex;

use camscout_common::SdpInfo;

static RTPMAP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)a=rtpmap:\d+\s+([\w.\-]+)/\d+").unwrap());

static RESOLUTION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)x-dimensions=(\d+),(\d+)",
        r"(?i)framesize:\d+\s+(\d+)-(\d+)",
        r"(?i)resolution[:\s]+(\d+)x(\d+)",
        r"(?is)width[:\s]*=\s*(\d+).*height[:\s]*=\s*(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// True when the body carries at least one of the fields every camera SDP has.
pub fn looks_like_sdp(body: &str) -> bool {
    body.contains("v=") || body.contains("m=") || body.contains("a=rtpmap")
}

pub fn parse_sdp(body: &str) -> SdpInfo {
    let codec = RTPMAP_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| normalize_codec(m.as_str()));

    let resolution = RESOLUTION_RES
        .iter()
        .find_map(|re| re.captures(body))
        .map(|c| format!("{}x{}", &c[1], &c[2]));

    SdpInfo {
        codec,
        resolution,
        control: video_control(body),
    }
}

fn normalize_codec(raw: &str) -> String {
    let upper = raw.to_ascii_uppercase();
    match upper.as_str() {
        "H264" | "H.264" => "H.264".to_string(),
        "H265" | "H.265" | "HEVC" => "H.265".to_string(),
        "MJPEG" | "JPEG" => "MJPEG".to_string(),
        "MPEG4" | "MP4V-ES" => "MPEG4".to_string(),
        _ => upper,
    }
}

// a=control of the first m=video section, falling back to the first one seen.
fn video_control(body: &str) -> Option<String> {
    let mut in_video = false;
    let mut first = None;
    for line in body.lines().map(str::trim) {
        if let Some(media) = line.strip_prefix("m=") {
            in_video = media.starts_with("video");
        } else if let Some(control) = line.strip_prefix("a=control:") {
            let control = control.trim().to_string();
            if in_video {
                return Some(control);
            }
            first.get_or_insert(control);
        }
    }
    first
}
