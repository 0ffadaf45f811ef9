//! Snapshot filename patterns
//!
//! Filenames are parsed with strict, anchored patterns. Anything that does
//! not match is skipped by discovery, never reported as an error.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// `<stack>.json` under `preview/`
static PREVIEW_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<stack>[A-Za-z0-9][A-Za-z0-9_-]*)\.json$").expect("valid preview pattern")
});

/// `<stack>-<uuid>.json` under `registered/`
static REGISTERED_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<stack>[A-Za-z0-9][A-Za-z0-9_-]*?)-(?P<event>[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\.json$",
    )
    .expect("valid registered pattern")
});

/// `<resourceId>.json` at the leaf of the cache layout
static CACHE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<resource>[^./\\][^/\\]*)\.json$").expect("valid cache pattern"));

/// A preview snapshot filename
pub fn parse_preview(file_name: &str) -> Option<String> {
    PREVIEW_FILE
        .captures(file_name)
        .map(|caps| caps["stack"].to_string())
}

/// A registered snapshot filename: stack name and event id
pub fn parse_registered(file_name: &str) -> Option<(String, Uuid)> {
    let caps = REGISTERED_FILE.captures(file_name)?;
    let event_id = Uuid::parse_str(&caps["event"]).ok()?;
    Some((caps["stack"].to_string(), event_id))
}

/// A cache layout leaf filename: the resource id
pub fn parse_cache_leaf(file_name: &str) -> Option<String> {
    CACHE_FILE
        .captures(file_name)
        .map(|caps| caps["resource"].to_string())
}
