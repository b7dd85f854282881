use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use playcheck::checker::check_entries;
use playcheck::config::Config;
use playcheck::metrics;
use playcheck::models::{Entry, RunStats};
use playcheck::playlist::{collect_identities, discover_playlists, read_playlist, write_playlist};

/// Arguments of the `check` command after CLI parsing
#[derive(Debug, Clone)]
pub struct CheckParams {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub filter_duplicates: Option<PathBuf>,
    pub metrics_file: Option<PathBuf>,
    pub quiet: bool,
}

/// Default output path for an input file or directory
///
/// `<stem>_working.m3u` next to a file input, `<dirname>_working.m3u` in the
/// working directory for a directory input.
pub fn default_output(input: &Path) -> PathBuf {
    if input.is_dir() {
        let name = input
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| String::from("playlists"));
        return PathBuf::from(format!("{name}_working.m3u"));
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("playlist"));
    input.with_file_name(format!("{stem}_working.m3u"))
}

/// Read every playlist, logging skipped records
pub fn load_entries(files: &[PathBuf]) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for file in files {
        let parsed = read_playlist(file)
            .with_context(|| format!("Failed to read playlist {}", file.display()))?;

        for warning in &parsed.warnings {
            tracing::warn!(
                file = %file.display(),
                line = warning.line,
                "{}",
                warning.message
            );
        }
        tracing::info!(
            file = %file.display(),
            entries = parsed.entries.len(),
            skipped = parsed.warnings.len(),
            "Loaded playlist"
        );
        entries.extend(parsed.entries);
    }
    Ok(entries)
}

pub async fn check(config: Config, params: CheckParams) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let files = discover_playlists(&params.input)
        .with_context(|| format!("Failed to open input {}", params.input.display()))?;
    let output = params
        .output
        .clone()
        .unwrap_or_else(|| default_output(&params.input));

    if !params.quiet {
        println!("Checking {} playlist file(s)", files.len());
        for file in &files {
            println!("  {}", file.display());
        }
    }

    let entries = load_entries(&files)?;

    let excluded = match &params.filter_duplicates {
        Some(path) => {
            let ids = collect_identities(path)
                .with_context(|| format!("Failed to read exclusion list {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                identities = ids.len(),
                "Loaded exclusion list"
            );
            ids
        }
        None => HashSet::new(),
    };

    if params.metrics_file.is_some() {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics unavailable");
        }
    }

    let result = check_entries(&entries, &excluded, &config)
        .await
        .context("Playlist check failed")?;

    write_playlist(&output, &result.channels)
        .with_context(|| format!("Failed to write output {}", output.display()))?;

    if let Some(path) = &params.metrics_file {
        let text = metrics::encode_metrics()
            .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {e}"))?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics {}", path.display()))?;
    }

    if !params.quiet {
        print_summary(files.len(), &result.stats, &output);
    }

    Ok(())
}

fn print_summary(files: usize, stats: &RunStats, output: &Path) {
    println!("\nCheck Summary");
    println!("=============");
    println!("Files processed: {files}");
    println!("Entries read: {}", stats.total_entries);
    println!("Working channels: {}", stats.resolved);
    println!("Failed channels: {}", stats.dropped);
    println!("Total channels: {}", stats.total_groups);
    if stats.excluded > 0 {
        println!("Filtered duplicates: {}", stats.excluded);
    }
    println!("Probe attempts: {}", stats.probes);
    println!("Success rate: {:.1}%", stats.success_rate());
    println!("Elapsed: {:.1}s", stats.elapsed_secs);
    println!("Output: {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_for_file() {
        let out = default_output(Path::new("/data/pk.m3u"));
        assert_eq!(out, PathBuf::from("/data/pk_working.m3u"));
    }

    #[test]
    fn test_default_output_for_directory() {
        let dir = TempDir::new().unwrap();
        let lists = dir.path().join("lists");
        std::fs::create_dir(&lists).unwrap();
        assert_eq!(default_output(&lists), PathBuf::from("lists_working.m3u"));
    }

    #[test]
    fn test_load_entries_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("in.m3u");
        let b = dir.path().join("pk.m3u");
        std::fs::write(&a, "#EXTM3U\n#EXTINF:-1 tvg-id=\"X\",X\nhttp://in/x\n").unwrap();
        std::fs::write(&b, "#EXTM3U\n#EXTINF:-1 tvg-id=\"X\",X\nhttp://pk/x\n").unwrap();

        let entries = load_entries(&[a, b]).unwrap();
        let tags: Vec<&str> = entries.iter().map(|e| e.source_tag.as_str()).collect();
        assert_eq!(tags, vec!["in", "pk"]);
    }
}
