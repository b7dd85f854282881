//! M3U playlist parsing
//!
//! Turns playlist text into [`Entry`] records. Structural problems never
//! abort parsing: the offending record is skipped and reported as a
//! [`ParseWarning`].

use encoding_rs::{UTF_8, WINDOWS_1252};
use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Attribute, Entry};

/// Attribute carrying the cross-file channel identity
pub const IDENTITY_ATTRIBUTE: &str = "tvg-id";

/// Option lines kept between an EXTINF line and its location
const OPTION_PREFIXES: &[&str] = &["#EXTVLCOPT", "#KODIPROP", "#EXTGRP", "#EXTHTTP"];

/// A skipped or suspicious record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    pub message: String,
}

/// Parser output for one file
#[derive(Debug, Clone, Default)]
pub struct ParsedPlaylist {
    pub entries: Vec<Entry>,
    pub warnings: Vec<ParseWarning>,
}

/// Fields of one `#EXTINF` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtInf {
    pub duration: String,
    pub attributes: Vec<Attribute>,
    pub name: String,
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE_RE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE_RE.get_or_init(|| {
        Regex::new(r#"([^\s="]+)(?:=(?:"([^"]*)"|(\S*)))?|(\S+)"#)
            .expect("Invalid regex pattern")
    })
}

/// Split the attribute part of an EXTINF head into attributes
///
/// Every token is kept: quoted and bare `key=value` pairs as well as lone
/// tokens, so rendering reproduces what was read.
fn parse_attributes(text: &str) -> Vec<Attribute> {
    attribute_regex()
        .captures_iter(text)
        .map(|cap| match (cap.get(1), cap.get(2), cap.get(3), cap.get(4)) {
            (Some(key), Some(value), _, _) => Attribute::quoted(key.as_str(), value.as_str()),
            (Some(key), None, Some(value), _) => Attribute::bare(key.as_str(), value.as_str()),
            (Some(key), None, None, _) => Attribute::flag(key.as_str()),
            _ => Attribute::flag(&cap[0]),
        })
        .collect()
}

/// Parse the body of an `#EXTINF` line
///
/// Returns `None` when the display-name comma is missing. The comma is the
/// first one outside double quotes, so quoted attribute values may contain
/// commas.
pub fn parse_extinf(line: &str) -> Option<ExtInf> {
    let body = line.strip_prefix("#EXTINF:")?;

    let mut in_quotes = false;
    let mut split_at = None;
    for (idx, ch) in body.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                split_at = Some(idx);
                break;
            }
            _ => {}
        }
    }

    let split_at = split_at?;
    let (head, name) = (&body[..split_at], &body[split_at + 1..]);

    let head = head.trim();
    let duration_end = head.find(char::is_whitespace).unwrap_or(head.len());
    let duration = head[..duration_end].to_string();

    let attributes = parse_attributes(&head[duration_end..]);

    Some(ExtInf {
        duration,
        attributes,
        name: name.trim().to_string(),
    })
}

/// Decode raw playlist bytes
///
/// UTF-8 (with or without BOM) is expected. Invalid UTF-8 falls back to
/// Windows-1252; the flag reports whether the fallback was used.
pub fn decode_playlist(bytes: &[u8]) -> (String, bool) {
    let (text, _encoding, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return (text.into_owned(), false);
    }

    let (text, _encoding, _) = WINDOWS_1252.decode(bytes);
    (text.into_owned(), true)
}

struct PendingRecord {
    extinf: ExtInf,
    line: usize,
}

/// Parse playlist text into entries tagged with `source_tag`
pub fn parse_playlist(text: &str, source_tag: &str) -> ParsedPlaylist {
    let mut parsed = ParsedPlaylist::default();
    let mut pending: Option<PendingRecord> = None;
    let mut options: Vec<String> = Vec::new();
    let mut skip_location = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with("#EXTM3U") {
            continue;
        }

        if line.starts_with("#EXTINF") {
            if let Some(prev) = pending.take() {
                parsed.warnings.push(ParseWarning {
                    line: prev.line,
                    message: "EXTINF has no location before the next record".into(),
                });
            }
            options.clear();

            match parse_extinf(line) {
                Some(extinf) => {
                    pending = Some(PendingRecord {
                        extinf,
                        line: line_no,
                    });
                    skip_location = false;
                }
                None => {
                    parsed.warnings.push(ParseWarning {
                        line: line_no,
                        message: "malformed EXTINF line (missing display name)".into(),
                    });
                    skip_location = true;
                }
            }
            continue;
        }

        if line.starts_with('#') {
            if OPTION_PREFIXES.iter().any(|p| line.starts_with(p)) && !skip_location {
                options.push(line.to_string());
            }
            continue;
        }

        if skip_location {
            skip_location = false;
            options.clear();
            continue;
        }

        let entry = match pending.take() {
            Some(record) => {
                let mut entry = Entry {
                    display_name: record.extinf.name,
                    duration: Some(record.extinf.duration),
                    attributes: record.extinf.attributes,
                    options: std::mem::take(&mut options),
                    location: line.to_string(),
                    source_tag: source_tag.to_string(),
                    ..Default::default()
                };
                entry.channel_id = entry
                    .attribute(IDENTITY_ATTRIBUTE)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                entry
            }
            None => Entry {
                options: std::mem::take(&mut options),
                location: line.to_string(),
                source_tag: source_tag.to_string(),
                ..Default::default()
            },
        };

        parsed.entries.push(entry);
    }

    if let Some(prev) = pending {
        parsed.warnings.push(ParseWarning {
            line: prev.line,
            message: "EXTINF at end of file has no location".into(),
        });
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extinf_with_quoted_comma() {
        let extinf = parse_extinf(
            r#"#EXTINF:-1 tvg-id="Geo.pk" tvg-logo="http://x/l.png" group-title="News, Live",Geo News"#,
        )
        .unwrap();

        assert_eq!(extinf.duration, "-1");
        assert_eq!(extinf.name, "Geo News");
        assert_eq!(
            extinf.attributes,
            vec![
                Attribute::quoted("tvg-id", "Geo.pk"),
                Attribute::quoted("tvg-logo", "http://x/l.png"),
                Attribute::quoted("group-title", "News, Live"),
            ]
        );
    }

    #[test]
    fn test_parse_extinf_keeps_unquoted_tokens() {
        let extinf = parse_extinf(
            r#"#EXTINF:-1 tvg-id="A" tvg-shift=2 radio=true catchup group-title="News",Chan"#,
        )
        .unwrap();

        assert_eq!(
            extinf.attributes,
            vec![
                Attribute::quoted("tvg-id", "A"),
                Attribute::bare("tvg-shift", "2"),
                Attribute::bare("radio", "true"),
                Attribute::flag("catchup"),
                Attribute::quoted("group-title", "News"),
            ]
        );
        assert_eq!(extinf.name, "Chan");
    }

    #[test]
    fn test_unquoted_identity_is_read() {
        let parsed = parse_playlist("#EXTINF:-1 tvg-id=Geo.pk,Geo\nhttp://geo/\n", "pk");
        assert_eq!(parsed.entries[0].channel_id.as_deref(), Some("Geo.pk"));
    }

    #[test]
    fn test_parse_extinf_without_attributes() {
        let extinf = parse_extinf("#EXTINF:0,Plain").unwrap();
        assert_eq!(extinf.duration, "0");
        assert!(extinf.attributes.is_empty());
        assert_eq!(extinf.name, "Plain");
    }

    #[test]
    fn test_parse_extinf_missing_comma() {
        assert!(parse_extinf(r#"#EXTINF:-1 tvg-id="a""#).is_none());
    }

    #[test]
    fn test_parse_playlist_records() {
        let text = "#EXTM3U\n\
            #EXTINF:-1 tvg-id=\" A.pk \" group-title=\"News\",Channel A\n\
            #EXTVLCOPT:http-user-agent=VLC\n\
            http://a.example/live.m3u8\n\
            \n\
            #EXTINF:-1 tvg-id=\"\",No Id\n\
            http://b.example/live.m3u8\n\
            http://bare.example/stream\n";

        let parsed = parse_playlist(text, "pk");
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.entries.len(), 3);

        let a = &parsed.entries[0];
        assert_eq!(a.channel_id.as_deref(), Some("A.pk"));
        assert_eq!(a.display_name, "Channel A");
        assert_eq!(a.options, vec!["#EXTVLCOPT:http-user-agent=VLC".to_string()]);
        assert_eq!(a.source_tag, "pk");

        assert_eq!(parsed.entries[1].channel_id, None);

        let bare = &parsed.entries[2];
        assert_eq!(bare.duration, None);
        assert_eq!(bare.location, "http://bare.example/stream");
    }

    #[test]
    fn test_malformed_records_are_skipped_with_warning() {
        let text = "#EXTM3U\n\
            #EXTINF:-1 tvg-id=\"bad\"\n\
            http://skipped.example/\n\
            #EXTINF:-1 tvg-id=\"dangling\",Dangling\n\
            #EXTINF:-1 tvg-id=\"ok\",Ok\n\
            http://ok.example/\n\
            #EXTINF:-1,Trailing\n";

        let parsed = parse_playlist(text, "in");
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].channel_id.as_deref(), Some("ok"));

        let lines: Vec<usize> = parsed.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![2, 4, 7]);
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("#EXTM3U\n".as_bytes());
        let (text, fallback) = decode_playlist(&bytes);
        assert_eq!(text, "#EXTM3U\n");
        assert!(!fallback);
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        let bytes = b"#EXTINF:-1,Caf\xe9\n";
        let (text, fallback) = decode_playlist(bytes);
        assert!(fallback);
        assert!(text.contains("Café"));
    }
}
