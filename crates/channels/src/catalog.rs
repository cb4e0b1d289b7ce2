//! Manufacturer path catalog
//!
//! Templates are literal paths, or numbered paths with exactly one channel
//! placeholder: `{ch}` (plain) or `{ch:02}` (zero-padded to two digits).

use std::collections::HashSet;

use camscout_common::{ChannelCandidate, ScanError, ScanResult};

const CH: &str = "{ch}";
const CH_PADDED: &str = "{ch:02}";

/// (tag, template, quick) for literal paths.
const LITERAL: &[(&str, &str, bool)] = &[
    ("generic", "/", true),
    ("generic", "/stream", true),
    ("generic", "/live", true),
    ("generic", "/media", false),
    ("generic", "/video", false),
    ("generic", "/h264", false),
    ("generic", "/mpeg4", false),
    ("generic", "/mjpeg", false),
    ("generic", "/live/ch00_0", false),
    ("generic", "/live/ch00_1", false),
    ("generic", "/live/ch01_0", false),
    ("generic", "/av0_0", false),
    ("generic", "/av0_1", false),
    ("generic", "/onvif1", false),
    ("generic", "/onvif2", false),
    ("generic", "/profile1", false),
    ("generic", "/profile2", false),
    ("generic", "/profile3", false),
    ("hikvision", "/Streaming/Channels/101", true),
    ("hikvision", "/Streaming/Channels/102", true),
    ("hikvision", "/h264/ch1/main/av_stream", true),
    ("hikvision", "/h264/ch1/sub/av_stream", false),
    ("dahua", "/cam/realmonitor?channel=1&subtype=0", true),
    ("dahua", "/cam/realmonitor?channel=1&subtype=1", false),
    ("axis", "/axis-media/media.amp", true),
    ("axis", "/axis-media/media.amp?videocodec=h264", false),
    ("axis", "/axis-media/media.amp?resolution=1920x1080", false),
    ("axis", "/mjpg/video.mjpg", false),
    ("foscam", "/videoMain", true),
    ("foscam", "/videoSub", false),
    ("foscam", "/video.h264", false),
    ("foscam", "/11", false),
    ("foscam", "/12", false),
    ("tp-link", "/stream1", false),
    ("tp-link", "/stream2", false),
    ("tp-link", "/h264_stream", false),
    ("uniview", "/unicast/c1/s0/live", false),
    ("uniview", "/unicast/c1/s1/live", false),
    ("uniview", "/media/video1", false),
    ("reolink", "/h264Preview_01_main", false),
    ("reolink", "/h264Preview_01_sub", false),
    ("vivotek", "/live.sdp", false),
    ("vivotek", "/live1.sdp", false),
    ("vivotek", "/live2.sdp", false),
    ("numbered", "/channel1", true),
];

/// (tag, template) for per-channel paths.
const NUMBERED: &[(&str, &str)] = &[
    ("numbered", "/channel{ch}"),
    ("numbered", "/ch{ch}"),
    ("numbered", "/ch{ch:02}"),
    ("numbered", "/video{ch}"),
    ("numbered", "/cam{ch}"),
    ("numbered", "/stream{ch}"),
    ("hikvision", "/Streaming/Channels/{ch}01"),
    ("hikvision", "/Streaming/Channels/{ch}02"),
    ("dahua", "/cam/realmonitor?channel={ch}&subtype=0"),
    ("uniview", "/unicast/c{ch}/s0/live"),
    ("reolink", "/h264Preview_{ch:02}_main"),
];

/// Validated, immutable set of path templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ChannelCandidate>,
}

impl Catalog {
    /// Validate and freeze a list of entries.
    pub fn new(entries: Vec<ChannelCandidate>) -> ScanResult<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            validate(entry)?;
            if !seen.insert((entry.manufacturer_tag.as_str(), entry.path_template.as_str())) {
                return Err(ScanError::invalid(format!(
                    "duplicate catalog entry {}:{}",
                    entry.manufacturer_tag, entry.path_template
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The catalog shipped with camscout.
    pub fn builtin() -> Self {
        let literal = LITERAL.iter().map(|&(tag, template, quick)| {
            let entry = ChannelCandidate::new(tag, template);
            if quick {
                entry.quick()
            } else {
                entry
            }
        });
        let numbered = NUMBERED
            .iter()
            .map(|&(tag, template)| ChannelCandidate::new(tag, template).numbered());

        let entries: Vec<ChannelCandidate> = literal.chain(numbered).collect();
        debug_assert!(
            Self::new(entries.clone()).is_ok(),
            "builtin catalog tables failed validation"
        );
        Self { entries }
    }

    /// Load a catalog from a JSON array of entries.
    pub fn from_json(json: &str) -> ScanResult<Self> {
        let entries: Vec<ChannelCandidate> = serde_json::from_str(json)
            .map_err(|e| ScanError::invalid(format!("catalog is not valid JSON: {e}")))?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[ChannelCandidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct manufacturer tags in catalog order.
    pub fn tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.manufacturer_tag.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Substitute a channel number into a numbered template.
pub fn instantiate(template: &str, channel: u32) -> String {
    template
        .replace(CH_PADDED, &format!("{channel:02}"))
        .replace(CH, &channel.to_string())
}

fn validate(entry: &ChannelCandidate) -> ScanResult<()> {
    let template = entry.path_template.as_str();
    let reject = |why: &str| -> ScanResult<()> { Err(ScanError::invalid(format!("catalog template {template:?}: {why}"))) };

    if entry.manufacturer_tag.trim().is_empty() {
        return reject("empty manufacturer tag");
    }
    if !template.starts_with('/') {
        return reject("must start with '/'");
    }

    let braces = template.matches('{').count();
    if entry.requires_numbering {
        let placeholders = template.matches(CH).count() + template.matches(CH_PADDED).count();
        if placeholders != 1 || braces != 1 {
            return reject("numbered templates need exactly one {ch} or {ch:02}");
        }
    } else if braces != 0 {
        return reject("placeholder in a literal template");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let builtin = Catalog::builtin();
        let revalidated = Catalog::new(builtin.entries().to_vec()).unwrap();
        assert_eq!(revalidated, builtin);
        for tag in ["generic", "hikvision", "dahua", "axis", "foscam", "tp-link", "uniview", "reolink", "vivotek", "numbered"] {
            assert!(builtin.tags().contains(&tag), "missing {tag}");
        }
        assert!(builtin.entries().iter().any(|e| e.quick));
        assert!(builtin.entries().iter().all(|e| !(e.quick && e.requires_numbering)));
    }

    #[test]
    fn first_channel_is_a_quick_literal() {
        let builtin = Catalog::builtin();
        let entry = builtin
            .entries()
            .iter()
            .find(|e| e.path_template == "/channel1")
            .unwrap();
        assert_eq!(entry.manufacturer_tag, "numbered");
        assert!(entry.quick && !entry.requires_numbering);
    }

    #[test]
    fn rejects_bad_templates() {
        let cases = [
            ChannelCandidate::new("x", "no-slash"),
            ChannelCandidate::new("x", "/literal{ch}"),
            ChannelCandidate::new("x", "/ch").numbered(),
            ChannelCandidate::new("x", "/ch{ch}/{ch}").numbered(),
            ChannelCandidate::new("x", "/ch{n}").numbered(),
            ChannelCandidate::new(" ", "/ok"),
        ];
        for entry in cases {
            let err = Catalog::new(vec![entry.clone()]).unwrap_err();
            assert!(matches!(err, ScanError::InvalidSpecification(_)), "{entry:?}");
        }
    }

    #[test]
    fn rejects_duplicates_but_allows_shared_paths_across_tags() {
        let dup = vec![ChannelCandidate::new("a", "/live"), ChannelCandidate::new("a", "/live")];
        assert!(Catalog::new(dup).is_err());

        let shared = vec![ChannelCandidate::new("a", "/live"), ChannelCandidate::new("b", "/live")];
        assert_eq!(Catalog::new(shared).unwrap().len(), 2);
    }

    #[test]
    fn instantiates_placeholders() {
        assert_eq!(instantiate("/channel{ch}", 3), "/channel3");
        assert_eq!(instantiate("/ch{ch:02}", 3), "/ch03");
        assert_eq!(instantiate("/ch{ch:02}", 12), "/ch12");
        assert_eq!(instantiate("/Streaming/Channels/{ch}01", 2), "/Streaming/Channels/201");
    }

    #[test]
    fn loads_json() {
        let json = r#"[
            {"manufacturer_tag": "acme", "path_template": "/acme/live", "quick": true},
            {"manufacturer_tag": "acme", "path_template": "/acme/{ch}", "requires_numbering": true}
        ]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.entries()[0].quick);
        assert!(catalog.entries()[1].requires_numbering);

        assert!(Catalog::from_json("{").is_err());
        assert!(Catalog::from_json(r#"[{"manufacturer_tag": "a", "path_template": "x"}]"#).is_err());
    }
}
