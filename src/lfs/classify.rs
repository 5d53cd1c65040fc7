//! Recognition of code-hosting media URLs that need LFS resolution.
//!
//! Two address shapes are supported:
//!
//! ```text
//! https://<media_host>/media/<org>/<repo>/<ref>/<path...>
//! https://<site_host>/<org>/<repo>/raw/<ref>/<path...>.(jpg|png)
//! ```

use url::Url;

use crate::config::LfsConfig;

/// Which address shape a media URL used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    /// `media.githubusercontent.com/media/...`
    UserContent,
    /// `github.com/<org>/<repo>/raw/...`
    Raw,
}

/// A media URL decomposed into repository coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsTarget {
    pub source: MediaSource,
    pub org: String,
    pub repo: String,
    pub reference: String,
    pub path: String,
}

impl LfsTarget {
    /// Content type forced onto the resolved binary response.
    pub fn forced_content_type(&self) -> &'static str {
        if self.path.to_ascii_lowercase().ends_with(".jpg") {
            "image/jpeg"
        } else {
            "image/png"
        }
    }
}

/// Classify `url`, returning `None` for anything that is not an LFS media
/// reference. User-content addresses are checked before raw addresses.
pub fn classify(url: &Url, config: &LfsConfig) -> Option<LfsTarget> {
    if url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let segments: Vec<&str> = url.path_segments()?.collect();

    if host == config.media_host.to_ascii_lowercase() {
        return user_content_target(&segments);
    }
    if host == config.site_host.to_ascii_lowercase() {
        return raw_target(&segments);
    }
    None
}

fn user_content_target(segments: &[&str]) -> Option<LfsTarget> {
    let (marker, rest) = segments.split_first()?;
    if *marker != "media" {
        return None;
    }
    target_from(MediaSource::UserContent, rest.get(..3)?, rest.get(3..)?)
}

fn raw_target(segments: &[&str]) -> Option<LfsTarget> {
    if segments.get(2) != Some(&"raw") {
        return None;
    }
    let last = segments.last()?.to_ascii_lowercase();
    if !(last.ends_with(".jpg") || last.ends_with(".png")) {
        return None;
    }
    let coords = [*segments.first()?, *segments.get(1)?, *segments.get(3)?];
    target_from(MediaSource::Raw, &coords, segments.get(4..)?)
}

fn target_from(source: MediaSource, coords: &[&str], path: &[&str]) -> Option<LfsTarget> {
    if coords.len() != 3 || coords.iter().any(|part| part.is_empty()) {
        return None;
    }
    if path.is_empty() || path.iter().all(|part| part.is_empty()) {
        return None;
    }

    Some(LfsTarget {
        source,
        org: coords[0].to_string(),
        repo: coords[1].to_string(),
        reference: coords[2].to_string(),
        path: path.join("/"),
    })
}
