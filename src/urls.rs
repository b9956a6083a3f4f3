//! Shape checks and rewrites for site URLs.

use crate::error::{Error, Result};
use url::Url;

pub const SITE_HOST: &str = "www.goodreads.com";
pub const DEFAULT_SHELF: &str = "read";

fn parse(raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))
}

/// Leading numeric id of a path segment such as `71341746` or `71341746-jane`.
fn numeric_id(segment: &str) -> Option<&str> {
    let id = segment.split('-').next()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then_some(id)
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default()
}

/// An http(s) URL on the site's host.
pub fn is_site_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url
                    .host_str()
                    .map(|h| h.eq_ignore_ascii_case(SITE_HOST))
                    .unwrap_or(false)
        }
        Err(_) => false,
    }
}

/// `https://www.goodreads.com/user/show/<id>[-slug]`
pub fn is_profile_url(raw: &str) -> bool {
    if !is_site_url(raw) {
        return false;
    }
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };
    let segments = path_segments(&url);
    url.scheme() == "https"
        && segments.len() == 3
        && segments[0] == "user"
        && segments[1] == "show"
        && numeric_id(segments[2]).is_some()
}

/// Rewrites a profile URL into the listing URL for `shelf`.
pub fn listing_url_from_profile(profile: &str, shelf: &str) -> Result<Url> {
    if !is_profile_url(profile) {
        return Err(Error::InvalidUrl(format!("not a profile URL: {}", profile)));
    }
    let mut url = parse(profile)?;
    let user_id = path_segments(&url)
        .last()
        .and_then(|s| numeric_id(s))
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidUrl(format!("no user id in {}", profile)))?;

    url.set_path(&format!("/review/list/{}", user_id));
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("shelf", shelf);
    Ok(url)
}

/// Checks that `raw` is a review listing: `/review/list/<id>[-slug]`.
pub fn validate_listing_url(raw: &str) -> Result<Url> {
    if !is_site_url(raw) {
        return Err(Error::InvalidUrl(format!("not a {} URL: {}", SITE_HOST, raw)));
    }
    let url = parse(raw)?;
    let segments = path_segments(&url);
    let is_listing = segments.len() == 3
        && segments[0] == "review"
        && segments[1] == "list"
        && numeric_id(segments[2]).is_some();
    if !is_listing {
        return Err(Error::InvalidUrl(format!("not a review listing: {}", raw)));
    }
    Ok(url)
}

/// Accepts either a listing URL or a profile URL (rewritten for `shelf`).
pub fn resolve_target(raw: &str, shelf: &str) -> Result<Url> {
    if is_profile_url(raw) {
        return listing_url_from_profile(raw, shelf);
    }
    validate_listing_url(raw)
}
