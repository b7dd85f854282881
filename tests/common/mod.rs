//! Common test utilities

#![allow(dead_code)]

use playcheck::config::Config;
use playcheck::utils::retry::RetryConfig;
use std::path::{Path, PathBuf};

/// Config with millisecond backoff for tests
pub fn fast_config(workers: usize, max_retries: u32) -> Config {
    let mut config = Config::default();
    config.checker.workers = workers;
    config.checker.timeout_secs = 5.0;
    config.retry = RetryConfig::with_delays(max_retries, 1, 5);
    config
}

/// One EXTINF record
pub fn record(id: &str, name: &str, group: &str, location: &str) -> String {
    format!("#EXTINF:-1 tvg-id=\"{id}\" group-title=\"{group}\",{name}\n{location}\n")
}

/// Playlist text from records
pub fn playlist(records: &[String]) -> String {
    let mut text = String::from("#EXTM3U\n");
    for r in records {
        text.push_str(r);
    }
    text
}

/// Write a playlist file into `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write playlist fixture");
    path
}
