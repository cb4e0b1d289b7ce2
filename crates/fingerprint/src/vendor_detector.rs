//! Vendor detection based on RTSP server headers and channel paths
//!
//! All matching is substring based and case-insensitive. Results are advisory:
//! nothing here gates which paths get probed.

use camscout_common::StreamType;
use once_cell::sync::Lazy;
use regex::Regex;

/// Display name and the lower-case substrings that identify it in a `Server` header.
/// Order matters: the first vendor with a matching pattern wins.
static MANUFACTURERS: &[(&str, &[&str])] = &[
    ("Hikvision", &["hikvision", "hik", "dvr", "nvr", "ipc"]),
    ("Dahua", &["dahua", "dh-", "ipc-"]),
    ("Axis", &["axis", "vapix"]),
    ("Foscam", &["foscam", "ipcam"]),
    ("Amcrest", &["amcrest"]),
    ("Reolink", &["reolink"]),
    ("Uniview", &["uniview", "unv"]),
    ("Hanwha", &["hanwha", "samsung", "wisenet"]),
    ("Vivotek", &["vivotek"]),
    ("Geovision", &["geovision", "gv-"]),
    ("Bosch", &["bosch"]),
    ("Honeywell", &["honeywell"]),
    ("Pelco", &["pelco"]),
    ("Panasonic", &["panasonic"]),
    ("Sony", &["sony"]),
    ("Ubiquiti", &["ubiquiti", "ubnt", "unifi"]),
    ("TP-Link", &["tp-link", "tapo"]),
    ("Wyze", &["wyze"]),
    ("Eufy", &["eufy", "anker"]),
];

// Sub-stream markers are more specific and are checked first.
static SUB_INDICATORS: &[&str] = &[
    "/sub/",
    "subtype=1",
    "videosub",
    "/stream2",
    "/ch02",
    "/channel2",
    "/video2",
    "/cam2",
    "resolution=640x480",
    "resolution=320x240",
];

static MAIN_INDICATORS: &[&str] = &[
    "/main/",
    "subtype=0",
    "videomain",
    "/stream1",
    "/ch01",
    "/channel1",
    "/video1",
    "/cam1",
    "resolution=1920x1080",
    "resolution=1280x720",
];

// Hikvision style: /Streaming/Channels/<channel><tier>, tier 01 = main, 02 = sub
static HIK_CHANNEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/streaming/channels/\d*?(0[12])(?:$|[/?])").unwrap());

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:v|version)?\s*(\d+\.\d+(?:\.\d+)?(?:\.\d+)?)").unwrap());

/// Infer the camera manufacturer from a `Server` header value.
///
/// Returns `None` for an empty header or when no vendor pattern matches.
pub fn detect_manufacturer(server: &str) -> Option<String> {
    if server.trim().is_empty() {
        return None;
    }
    let server = server.to_lowercase();
    MANUFACTURERS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| server.contains(p)))
        .map(|(name, _)| (*name).to_string())
}

/// Guess whether a channel path serves the main or the sub stream.
pub fn detect_stream_type(path: &str) -> Option<StreamType> {
    let path = path.to_lowercase();

    if let Some(tier) = HIK_CHANNEL_RE.captures(&path).and_then(|c| c.get(1)) {
        return match tier.as_str() {
            "02" => Some(StreamType::Sub),
            _ => Some(StreamType::Main),
        };
    }
    if SUB_INDICATORS.iter().any(|i| path.contains(i)) {
        return Some(StreamType::Sub);
    }
    if MAIN_INDICATORS.iter().any(|i| path.contains(i)) {
        return Some(StreamType::Main);
    }
    None
}

/// Well-known service name for the RTSP-family ports scanned by default.
pub fn port_service(port: u16) -> Option<&'static str> {
    let service = match port {
        554 => "rtsp",
        8554 => "rtsp-alt",
        7447 => "rtsp-unifi",
        5554 => "rtsp-alt",
        88 => "http-cam",
        8000 => "hik-sdk",
        8080 => "http-proxy",
        8888 => "http-alt",
        _ => return None,
    };
    Some(service)
}

/// Version number embedded in a `Server` header, e.g. `1.0` in `Hikvision-Webs/1.0`.
pub fn server_version(server: &str) -> Option<String> {
    VERSION_RE
        .captures(server)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manufacturer_detection() {
        assert_eq!(detect_manufacturer("Hikvision-Webs").as_deref(), Some("Hikvision"));
        assert_eq!(detect_manufacturer("Dahua Rtsp Server").as_deref(), Some("Dahua"));
        assert_eq!(detect_manufacturer("AXIS P1435-LE").as_deref(), Some("Axis"));
        assert_eq!(detect_manufacturer("Ubnt Streaming Server").as_deref(), Some("Ubiquiti"));
        assert_eq!(detect_manufacturer("Tapo C200").as_deref(), Some("TP-Link"));
        assert_eq!(detect_manufacturer("GStreamer RTSP server"), None);
        assert_eq!(detect_manufacturer(""), None);
    }

    #[test]
    fn test_first_matching_vendor_wins() {
        // "ipc" is a Hikvision pattern and precedes Dahua's "ipc-"
        assert_eq!(detect_manufacturer("IPC-HFW").as_deref(), Some("Hikvision"));
    }

    #[test]
    fn test_stream_type_detection() {
        assert_eq!(detect_stream_type("/Streaming/Channels/101"), Some(StreamType::Main));
        assert_eq!(detect_stream_type("/Streaming/Channels/102"), Some(StreamType::Sub));
        assert_eq!(detect_stream_type("/Streaming/Channels/1202"), Some(StreamType::Sub));
        assert_eq!(
            detect_stream_type("/cam/realmonitor?channel=1&subtype=1"),
            Some(StreamType::Sub)
        );
        assert_eq!(
            detect_stream_type("/cam/realmonitor?channel=1&subtype=0"),
            Some(StreamType::Main)
        );
        assert_eq!(detect_stream_type("/h264/ch1/sub/av_stream"), Some(StreamType::Sub));
        assert_eq!(detect_stream_type("/videoMain"), Some(StreamType::Main));
        assert_eq!(detect_stream_type("/live"), None);
    }

    #[test]
    fn test_port_services() {
        assert_eq!(port_service(554), Some("rtsp"));
        assert_eq!(port_service(22), None);
    }

    #[test]
    fn test_server_version() {
        assert_eq!(server_version("Hikvision-Webs/1.0").as_deref(), Some("1.0"));
        assert_eq!(server_version("Rtsp Server/2.0.3 (Linux)").as_deref(), Some("2.0.3"));
        assert_eq!(server_version("Streaming Server"), None);
    }
}
