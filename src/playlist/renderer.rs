//! M3U playlist rendering

use std::fmt::Write;

use crate::models::{Attribute, AttributeStyle, ResolvedChannel};

/// Playlist header line
pub const HEADER: &str = "#EXTM3U";

/// Build an `#EXTINF` line
pub fn render_extinf(duration: &str, attributes: &[Attribute], name: &str) -> String {
    let mut line = format!("#EXTINF:{duration}");
    for attr in attributes {
        let (key, value) = (&attr.key, &attr.value);
        // Infallible for String
        let _ = match attr.style {
            AttributeStyle::Quoted => write!(line, " {key}=\"{value}\""),
            AttributeStyle::Bare => write!(line, " {key}={value}"),
            AttributeStyle::Flag => write!(line, " {key}"),
        };
    }
    line.push(',');
    line.push_str(name);
    line
}

/// Serialize resolved channels in the given order
///
/// Channels without EXTINF metadata are written as option lines plus the
/// location, the way they were read.
pub fn render_playlist(channels: &[ResolvedChannel]) -> String {
    let mut out = String::with_capacity(64 + channels.len() * 160);
    out.push_str(HEADER);
    out.push('\n');

    for channel in channels {
        if let Some(duration) = &channel.duration {
            out.push_str(&render_extinf(
                duration,
                &channel.attributes,
                &channel.display_name,
            ));
            out.push('\n');
        }
        for option in &channel.options {
            out.push_str(option);
            out.push('\n');
        }
        out.push_str(&channel.winning_location);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::parser::parse_playlist;

    fn channel(name: &str, location: &str) -> ResolvedChannel {
        ResolvedChannel {
            channel_id: Some(format!("{name}.pk")),
            display_name: name.to_string(),
            duration: Some("-1".into()),
            attributes: vec![
                Attribute::quoted("tvg-id", format!("{name}.pk")),
                Attribute::quoted("group-title", "Pakistani News"),
            ],
            options: vec!["#EXTVLCOPT:http-referrer=http://ref/".into()],
            winning_location: location.to_string(),
            source_tag: "pk".into(),
            first_seen_index: 0,
            candidate_count: 1,
        }
    }

    #[test]
    fn test_render_extinf() {
        let line = render_extinf(
            "-1",
            &[
                Attribute::quoted("tvg-id", "a"),
                Attribute::bare("tvg-shift", "2"),
                Attribute::flag("catchup"),
            ],
            "Name",
        );
        assert_eq!(line, r#"#EXTINF:-1 tvg-id="a" tvg-shift=2 catchup,Name"#);
    }

    #[test]
    fn test_render_playlist() {
        let out = render_playlist(&[channel("Geo", "http://geo/live")]);
        assert_eq!(
            out,
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"Geo.pk\" group-title=\"Pakistani News\",Geo\n\
             #EXTVLCOPT:http-referrer=http://ref/\n\
             http://geo/live\n"
        );
    }

    #[test]
    fn test_render_bare_entry() {
        let mut bare = channel("x", "http://bare/");
        bare.duration = None;
        bare.options.clear();
        assert_eq!(render_playlist(&[bare]), "#EXTM3U\nhttp://bare/\n");
    }

    #[test]
    fn test_rendered_output_reparses() {
        let out = render_playlist(&[channel("Geo", "http://geo/live"), channel("Ary", "http://ary/live")]);
        let parsed = parse_playlist(&out, "out");
        assert!(parsed.warnings.is_empty());
        let ids: Vec<_> = parsed
            .entries
            .iter()
            .map(|e| e.channel_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["Geo.pk", "Ary.pk"]);
    }
}
