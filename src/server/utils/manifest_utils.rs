use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;
use url::Url;

/// where rewritten playlist entries point back to
pub const RELAY_PATH: &str = "/api/video-proxy";

/// used when the manifest was detected by extension and upstream sent no content type
pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

static URI_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"URI="([^"]+)""#).expect("Static regex should compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestLine<'a> {
    Blank,
    EndList,
    /// `#` lines, only their `URI="..."` attributes get touched
    Directive(&'a str),
    /// segment or variant playlist reference, relative or absolute
    Reference(&'a str),
}

impl<'a> ManifestLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            Self::Blank
        } else if trimmed.starts_with("#EXT-X-ENDLIST") {
            Self::EndList
        } else if trimmed.starts_with('#') {
            Self::Directive(trimmed)
        } else {
            Self::Reference(trimmed)
        }
    }
}

/// content type says mpegurl (covers the apple and x- flavours) or the path ends in .m3u8
pub fn is_manifest(content_type: Option<&str>, target: &Url) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl"))
        || target.path().to_ascii_lowercase().ends_with(".m3u8")
}

pub fn relay_url(absolute: &str) -> String {
    format!("{}?url={}", RELAY_PATH, urlencoding::encode(absolute))
}

/// resolve against the manifest location and wrap in a relay call, `None` when the reference
/// can't be resolved
pub fn rewrite_reference(reference: &str, base: &Url) -> Option<String> {
    match base.join(reference.trim()) {
        Ok(resolved) => Some(relay_url(resolved.as_str())),
        Err(e) => {
            debug!("Leaving unresolvable manifest reference {}: {}", reference, e);
            None
        }
    }
}

/// rewrites every `URI="..."` in a directive, anything else on the line stays as is
pub fn rewrite_directive(line: &str, base: &Url) -> String {
    URI_ATTRIBUTE
        .replace_all(line, |caps: &Captures| match rewrite_reference(&caps[1], base) {
            Some(rewritten) => format!("URI=\"{}\"", rewritten),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Rewrites an HLS playlist so every segment, variant and key goes back through the relay.
///
/// Line count and order are preserved. A line that can't be rewritten is emitted untouched
/// instead of failing the playlist.
pub fn rewrite_manifest(text: &str, base: &Url) -> String {
    text.split('\n')
        .map(|line| match ManifestLine::classify(line) {
            ManifestLine::Blank | ManifestLine::EndList => line.to_string(),
            ManifestLine::Directive(_) => rewrite_directive(line, base),
            ManifestLine::Reference(reference) => {
                rewrite_reference(reference, base).unwrap_or_else(|| line.to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://storage.googleapis.com/x/master.m3u8").unwrap()
    }

    #[test]
    fn classifies_lines() {
        assert_eq!(ManifestLine::classify(""), ManifestLine::Blank);
        assert_eq!(ManifestLine::classify("   \r"), ManifestLine::Blank);
        assert_eq!(ManifestLine::classify("#EXT-X-ENDLIST"), ManifestLine::EndList);
        assert_eq!(
            ManifestLine::classify("#EXTINF:4.0,"),
            ManifestLine::Directive("#EXTINF:4.0,")
        );
        assert_eq!(
            ManifestLine::classify("seg0.ts\r"),
            ManifestLine::Reference("seg0.ts")
        );
    }

    #[test]
    fn relative_reference_is_resolved_and_wrapped() {
        assert_eq!(
            rewrite_reference("v1/seg0.ts", &base()).unwrap(),
            "/api/video-proxy?url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fv1%2Fseg0.ts"
        );
    }

    #[test]
    fn absolute_and_rooted_references() {
        assert_eq!(
            rewrite_reference("https://vz-1.b-cdn.net/a.ts", &base()).unwrap(),
            "/api/video-proxy?url=https%3A%2F%2Fvz-1.b-cdn.net%2Fa.ts"
        );
        assert_eq!(
            rewrite_reference("/root/a.ts", &base()).unwrap(),
            "/api/video-proxy?url=https%3A%2F%2Fstorage.googleapis.com%2Froot%2Fa.ts"
        );
    }

    #[test]
    fn query_strings_survive_encoding() {
        assert_eq!(
            rewrite_reference("seg.ts?token=a&b=c", &base()).unwrap(),
            "/api/video-proxy?url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fseg.ts%3Ftoken%3Da%26b%3Dc"
        );
    }

    #[test]
    fn unresolvable_reference_is_none() {
        assert_eq!(rewrite_reference("http://[oops/seg.ts", &base()), None);
    }

    #[test]
    fn directive_uris_are_rewritten() {
        let line = r#"#EXT-X-KEY:METHOD=AES-128,URI="key.bin",IV=0x1"#;
        assert_eq!(
            rewrite_directive(line, &base()),
            r#"#EXT-X-KEY:METHOD=AES-128,URI="/api/video-proxy?url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fkey.bin",IV=0x1"#
        );
    }

    #[test]
    fn directive_without_uri_is_untouched() {
        let line = "#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360";
        assert_eq!(rewrite_directive(line, &base()), line);
    }

    #[test]
    fn every_uri_in_a_directive_is_rewritten() {
        let line = r#"#EXT-X-FOO:URI="a.bin",OTHER-URI="b.bin""#;
        let rewritten = rewrite_directive(line, &base());
        assert!(rewritten.contains("url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fa.bin"));
        assert!(rewritten.contains("url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fb.bin"));
    }

    #[test]
    fn manifest_keeps_shape() {
        let manifest = "#EXTM3U\n#EXTINF:4.0,\nsegment1.ts\n#EXT-X-KEY:URI=\"key.bin\"\n\n#EXT-X-ENDLIST\n";
        let rewritten = rewrite_manifest(manifest, &base());
        let lines: Vec<&str> = rewritten.split('\n').collect();

        assert_eq!(lines.len(), manifest.split('\n').count());
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXTINF:4.0,");
        assert_eq!(
            lines[2],
            "/api/video-proxy?url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fsegment1.ts"
        );
        assert_eq!(
            lines[3],
            "#EXT-X-KEY:URI=\"/api/video-proxy?url=https%3A%2F%2Fstorage.googleapis.com%2Fx%2Fkey.bin\""
        );
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "#EXT-X-ENDLIST");
        assert_eq!(lines[6], "");
    }

    #[test]
    fn bad_line_does_not_spoil_the_playlist() {
        let manifest = "#EXTINF:4.0,\nhttp://[oops/seg.ts\nok.ts";
        let rewritten = rewrite_manifest(manifest, &base());
        let lines: Vec<&str> = rewritten.split('\n').collect();

        assert_eq!(lines[1], "http://[oops/seg.ts");
        assert!(lines[2].starts_with("/api/video-proxy?url="));
    }

    #[test]
    fn detection() {
        let m3u8 = Url::parse("https://whatbox.ca/a/index.M3U8").unwrap();
        let ts = Url::parse("https://whatbox.ca/a/seg.ts").unwrap();

        assert!(is_manifest(None, &m3u8));
        assert!(is_manifest(Some("application/vnd.apple.mpegurl"), &ts));
        assert!(is_manifest(Some("audio/x-mpegURL"), &ts));
        assert!(!is_manifest(Some("video/mp2t"), &ts));
        assert!(!is_manifest(None, &ts));
    }
}
