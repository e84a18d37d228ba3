//! Direct video URL resolution from player iframe URLs.
//!
//! The player iframe carries the media file in a percent-encoded `source`
//! parameter and the available renditions in `quality` (e.g. `720p,480p`).
//! Renditions share one file name with a `_<n>p` suffix, so the best one can
//! be addressed without probing.

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Why an iframe URL could not be resolved. Never leaves this module.
#[derive(Debug, Error, PartialEq, Eq)]
enum DecodeError {
    #[error("not an absolute URL")]
    InvalidUrl,
    #[error("missing source parameter")]
    MissingSource,
    #[error("source parameter has a malformed percent escape or is not valid UTF-8")]
    BadEncoding,
}

/// Resolve the highest-quality direct video URL from an iframe `src`.
///
/// Returns `None` for absent, empty or unparseable input and for URLs
/// without a `source` parameter. Never panics.
pub fn extract_video_url(iframe_src: Option<&str>) -> Option<String> {
    let iframe_src = iframe_src.filter(|s| !s.trim().is_empty())?;

    match resolve(iframe_src) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!("Could not resolve video URL from {}: {}", iframe_src, e);
            None
        }
    }
}

fn resolve(iframe_src: &str) -> Result<String, DecodeError> {
    let url = Url::parse(iframe_src).map_err(|_| DecodeError::InvalidUrl)?;

    let mut source = None;
    let mut quality = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "source" if source.is_none() => source = Some(value),
            "quality" if quality.is_none() => quality = Some(value),
            _ => {}
        }
    }

    let source = source
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingSource)?;

    // query_pairs already decoded once; the player double-encodes.
    // urlencoding passes stray `%` through, so reject those up front.
    if has_malformed_escape(&source) {
        return Err(DecodeError::BadEncoding);
    }
    let base = urlencoding::decode(&source)
        .map_err(|_| DecodeError::BadEncoding)?
        .into_owned();

    Ok(match quality.as_deref().and_then(best_quality) {
        Some(q) => with_quality(&base, q),
        None => base,
    })
}

/// True if some `%` is not followed by two hex digits.
fn has_malformed_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(|c| c.is_ascii_hexdigit())
                && bytes.get(i + 2).is_some_and(|c| c.is_ascii_hexdigit()))
    })
}

/// Pick the highest numeric rendition from a `720p,480p,...` list.
pub fn best_quality(list: &str) -> Option<u32> {
    list.split(',').filter_map(parse_quality_token).max()
}

fn parse_quality_token(token: &str) -> Option<u32> {
    let token = token.trim().replacen('p', "", 1);
    let digits: String = token
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|q| *q > 0)
}

/// `.../video.mp4` -> `.../video_720p.mp4`; other URLs are left alone.
fn with_quality(base: &str, quality: u32) -> String {
    match base.strip_suffix(".mp4") {
        Some(stem) => format!("{}_{}p.mp4", stem, quality),
        None => base.to_string(),
    }
}
