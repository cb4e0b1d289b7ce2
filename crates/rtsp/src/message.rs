//! RTSP/1.0 request encoding and response parsing. No I/O happens here.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

use camscout_common::{Method, ScanError, ScanResult};

static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^RTSP/\d\.\d\s+(\d{3})(?:\s+(.*))?$").unwrap());

/// Largest `Content-Length` taken at face value.
pub const MAX_CONTENT_LENGTH: usize = 1 << 24;

/// Outgoing request. Header order is preserved on the wire.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub cseq: u32,
    headers: Vec<(String, String)>,
}

impl Request {
    pub fn new<U: Into<String>>(method: Method, uri: U, cseq: u32) -> Self {
        Self {
            method,
            uri: uri.into(),
            cseq,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn encode(&self) -> String {
        let mut out = format!("{} {} RTSP/1.0\r\nCSeq: {}\r\n", self.method, self.uri, self.cseq);
        for (name, value) in &self.headers {
            let _ = write!(out, "{name}: {value}\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

/// Parsed response. Header lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// Parse a raw response; anything without an `RTSP/<d>.<d> <code>` status line is
    /// a protocol error.
    pub fn parse(raw: &[u8]) -> ScanResult<Self> {
        let (head, body) = match header_end(raw) {
            Some(end) => raw.split_at(end),
            None => (raw, &[][..]),
        };
        let head = String::from_utf8_lossy(head);
        let body = String::from_utf8_lossy(body);

        let mut lines = head.lines();
        let status_line = lines.next().unwrap_or("").trim();
        let caps = STATUS_RE
            .captures(status_line)
            .ok_or_else(|| ScanError::Protocol(format!("invalid status line: {:?}", truncate(status_line, 64))))?;
        let status = caps[1]
            .parse::<u16>()
            .map_err(|e| ScanError::Protocol(format!("invalid status code: {e}")))?;
        let reason = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            status,
            reason,
            headers,
            body: body.into_owned(),
        })
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated header, e.g. several `WWW-Authenticate` challenges.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn cseq(&self) -> Option<u32> {
        self.header("CSeq").and_then(|v| v.parse().ok())
    }

    /// Session id without the `;timeout=` suffix.
    pub fn session_id(&self) -> Option<&str> {
        self.header("Session")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
            .filter(|s| !s.is_empty())
    }

    /// Methods advertised in the `Public` header of an OPTIONS reply.
    pub fn public_methods(&self) -> Vec<String> {
        self.header("Public")
            .map(|v| {
                v.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_sdp(&self) -> bool {
        self.header("Content-Type")
            .map(|ct| ct.to_ascii_lowercase().contains("sdp"))
            .unwrap_or(false)
    }
}

/// Offset just past the blank line ending the header block, if it has arrived.
/// Peers that end lines with a bare `\n` are accepted too.
pub fn header_end(buf: &[u8]) -> Option<usize> {
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// `Content-Length` from a raw header block. A missing header means no body; a value
/// that does not parse or exceeds [`MAX_CONTENT_LENGTH`] is a protocol error.
pub fn content_length(head: &[u8]) -> ScanResult<usize> {
    let text = String::from_utf8_lossy(head);
    let Some((_, value)) = text
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(n, _)| n.trim().eq_ignore_ascii_case("content-length"))
    else {
        return Ok(0);
    };
    match value.trim().parse::<usize>() {
        Ok(n) if n <= MAX_CONTENT_LENGTH => Ok(n),
        _ => Err(ScanError::Protocol(format!(
            "implausible Content-Length: {:?}",
            truncate(value.trim(), 32)
        ))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_format() {
        let req = Request::new(Method::Describe, "rtsp://10.0.0.5:554/live", 2)
            .header("User-Agent", "camscout/0.1.0")
            .header("Accept", "application/sdp");
        assert_eq!(
            req.encode(),
            "DESCRIBE rtsp://10.0.0.5:554/live RTSP/1.0\r\n\
             CSeq: 2\r\n\
             User-Agent: camscout/0.1.0\r\n\
             Accept: application/sdp\r\n\r\n"
        );
    }

    #[test]
    fn parses_status_headers_and_body() {
        let raw = b"RTSP/1.0 200 OK\r\nCSeq: 3\r\nserver: Hikvision-Webs\r\n\
                    Content-Type: application/sdp\r\nContent-Length: 9\r\n\r\nv=0\r\nm=x";
        let resp = Response::parse(raw).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.cseq(), Some(3));
        assert_eq!(resp.header("Server"), Some("Hikvision-Webs"));
        assert!(resp.is_sdp());
        assert_eq!(resp.body, "v=0\r\nm=x");
    }

    #[test]
    fn rejects_non_rtsp_status_line() {
        for raw in [&b"HTTP/1.1 200 OK\r\n\r\n"[..], b"garbage", b"RTSP/1.0 abc\r\n\r\n", b""] {
            assert!(matches!(Response::parse(raw), Err(ScanError::Protocol(_))));
        }
    }

    #[test]
    fn session_and_public_headers() {
        let raw = b"RTSP/1.0 200 OK\r\nSession: 12AB34;timeout=60\r\n\
                    Public: OPTIONS, DESCRIBE, SETUP, PLAY, TEARDOWN\r\n\r\n";
        let resp = Response::parse(raw).unwrap();
        assert_eq!(resp.session_id(), Some("12AB34"));
        assert_eq!(resp.public_methods(), vec!["OPTIONS", "DESCRIBE", "SETUP", "PLAY", "TEARDOWN"]);
    }

    #[test]
    fn repeated_challenge_headers() {
        let raw = b"RTSP/1.0 401 Unauthorized\r\nWWW-Authenticate: Basic realm=\"x\"\r\n\
                    WWW-Authenticate: Digest realm=\"x\", nonce=\"n\"\r\n\r\n";
        let resp = Response::parse(raw).unwrap();
        assert_eq!(resp.headers_named("www-authenticate").count(), 2);
    }

    #[test]
    fn framing_helpers() {
        let raw = b"RTSP/1.0 200 OK\r\nContent-Length: 12\r\n\r\nbody";
        let end = header_end(raw).unwrap();
        assert_eq!(&raw[end..], b"body");
        assert_eq!(content_length(&raw[..end]).unwrap(), 12);
        assert_eq!(content_length(b"RTSP/1.0 200 OK\r\n\r\n").unwrap(), 0);
        assert_eq!(header_end(b"RTSP/1.0 200 OK\r\n"), None);
    }

    #[test]
    fn absurd_content_length_is_rejected() {
        for value in ["18446744073709551615", "99999999999999999999999", "-1", "ten"] {
            let head = format!("RTSP/1.0 200 OK\r\nContent-Length: {value}\r\n\r\n");
            assert!(matches!(content_length(head.as_bytes()), Err(ScanError::Protocol(_))), "{value}");
        }
        let head = format!("RTSP/1.0 200 OK\r\nContent-Length: {MAX_CONTENT_LENGTH}\r\n\r\n");
        assert_eq!(content_length(head.as_bytes()).unwrap(), MAX_CONTENT_LENGTH);
    }

    #[test]
    fn bare_newline_framing() {
        let raw = b"RTSP/1.0 200 OK\nCSeq: 4\nContent-Length: 3\n\nv=0";
        let end = header_end(raw).unwrap();
        assert_eq!(&raw[end..], b"v=0");
        assert_eq!(content_length(&raw[..end]).unwrap(), 3);

        let resp = Response::parse(raw).unwrap();
        assert_eq!(resp.cseq(), Some(4));
        assert_eq!(resp.body, "v=0");
    }

    #[test]
    fn crlf_head_wins_over_blank_line_in_body() {
        let raw = b"RTSP/1.0 200 OK\r\nContent-Length: 6\r\n\r\na\n\nb\r\n";
        assert_eq!(header_end(raw), Some(raw.len() - 6));
    }
}
