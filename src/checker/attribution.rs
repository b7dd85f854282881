//! Source attribution of output channels
//!
//! The `group-title` of every output channel carries the display prefix of
//! the source file its winning location came from.

use crate::config::SourcePrefixes;
use crate::models::{Attribute, ResolvedChannel};

pub const GROUP_TITLE: &str = "group-title";

/// Prefix a group title, leaving already-prefixed titles alone
pub fn prefixed_title(title: &str, prefix: &str) -> String {
    if title.is_empty() {
        prefix.to_string()
    } else if title.starts_with(prefix) {
        title.to_string()
    } else {
        format!("{prefix} {title}")
    }
}

/// Rewrite (or append) the `group-title` attribute for `prefix`
pub fn attribute_group_title(attributes: &mut Vec<Attribute>, prefix: &str) {
    match attributes.iter_mut().find(|a| a.key == GROUP_TITLE) {
        Some(title) => {
            let value = prefixed_title(&title.value, prefix);
            title.set_value(value);
        }
        None => attributes.push(Attribute::quoted(GROUP_TITLE, prefix)),
    }
}

/// Attribute a resolved channel to its winning source
///
/// Channels read without EXTINF metadata have nowhere to carry a title and
/// are left unchanged.
pub fn apply_source_prefix(channel: &mut ResolvedChannel, prefixes: &SourcePrefixes) {
    if channel.duration.is_none() {
        return;
    }
    let prefix = prefixes.prefix_for(&channel.source_tag);
    attribute_group_title(&mut channel.attributes, &prefix);
}
