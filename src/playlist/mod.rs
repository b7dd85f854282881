//! Playlist reading and writing
//!
//! The parser and renderer are format collaborators of the checker engine:
//! the engine only sees [`Entry`](crate::models::Entry) records going in and
//! [`ResolvedChannel`](crate::models::ResolvedChannel) records coming out.

pub mod parser;
pub mod renderer;

pub use parser::{decode_playlist, parse_extinf, parse_playlist, ParseWarning, ParsedPlaylist};
pub use renderer::{render_extinf, render_playlist};

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::models::ResolvedChannel;
use crate::utils::error::PlaylistError;

/// File extensions treated as playlists when scanning a directory
pub const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8"];

/// Source tag for a playlist path (its file stem)
pub fn source_tag_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("unknown"))
}

pub(crate) fn is_playlist(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PLAYLIST_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Resolve an input path to the playlist files it names
///
/// A file is returned as is. A directory yields its `.m3u`/`.m3u8` files
/// sorted by name; finding none is an error.
pub fn discover_playlists(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        return Err(Error::with_source(
            format!("Input path '{}' not found", path.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }

    let mut files = Vec::new();
    for dir_entry in std::fs::read_dir(path)? {
        let file = dir_entry?.path();
        if file.is_file() && is_playlist(&file) {
            files.push(file);
        }
    }

    if files.is_empty() {
        return Err(PlaylistError::NoPlaylists(path.display().to_string()).into());
    }

    files.sort();
    Ok(files)
}

/// Read and parse one playlist file
pub fn read_playlist(path: &Path) -> Result<ParsedPlaylist> {
    let bytes = std::fs::read(path)?;
    let (text, fallback) = decode_playlist(&bytes);
    if fallback {
        tracing::warn!(
            path = %path.display(),
            "Playlist is not valid UTF-8, decoded as Windows-1252"
        );
    }

    Ok(parse_playlist(&text, &source_tag_for(path)))
}

/// Collect every channel identity found under `path` (file or directory)
///
/// A missing path yields an empty set, matching a filter with nothing to
/// exclude.
pub fn collect_identities(path: &Path) -> Result<HashSet<String>> {
    let mut identities = HashSet::new();
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Exclusion path does not exist");
        return Ok(identities);
    }

    let files = match discover_playlists(path) {
        Ok(files) => files,
        Err(Error::Playlist(PlaylistError::NoPlaylists(_))) => return Ok(identities),
        Err(e) => return Err(e),
    };

    for file in files {
        let parsed = read_playlist(&file)?;
        identities.extend(
            parsed
                .entries
                .iter()
                .filter_map(|e| e.identity().map(str::to_string)),
        );
    }

    Ok(identities)
}

/// Render `channels` and write them to `path`
///
/// Content goes to a uniquely named temp file in the target directory and is
/// renamed into place, so a failed run never leaves a partial playlist behind.
pub fn write_playlist(path: &Path, channels: &[ResolvedChannel]) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(render_playlist(channels).as_bytes())?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attribute;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_source_tag() {
        assert_eq!(source_tag_for(Path::new("/x/pk.m3u")), "pk");
        assert_eq!(source_tag_for(Path::new("global.m3u8")), "global");
    }

    #[test]
    fn test_discover_sorted_playlists() {
        let dir = TempDir::new().unwrap();
        write(&dir, "pk.m3u", "#EXTM3U\n");
        write(&dir, "in.M3U8", "#EXTM3U\n");
        write(&dir, "notes.txt", "ignored");

        let files = discover_playlists(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["in.M3U8", "pk.m3u"]);
    }

    #[test]
    fn test_discover_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = discover_playlists(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Playlist(PlaylistError::NoPlaylists(_))));
    }

    #[test]
    fn test_collect_identities() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "existing.m3u",
            "#EXTM3U\n#EXTINF:-1 tvg-id=\"A\",A\nhttp://a/\n#EXTINF:-1,NoId\nhttp://b/\n",
        );

        let ids = collect_identities(dir.path()).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("A"));

        assert!(collect_identities(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_write_playlist_replaces_target() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "out_working.m3u", "stale");
        let sibling = write(&dir, "out_working.tmp", "unrelated");
        let channel = ResolvedChannel {
            channel_id: Some("A".into()),
            display_name: "A".into(),
            duration: Some("-1".into()),
            attributes: vec![Attribute::quoted("tvg-id", "A")],
            options: vec![],
            winning_location: "http://a/".into(),
            source_tag: "pk".into(),
            first_seen_index: 0,
            candidate_count: 1,
        };

        write_playlist(&path, &[channel]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "#EXTM3U\n#EXTINF:-1 tvg-id=\"A\",A\nhttp://a/\n");
        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "unrelated");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
