//! Typed extraction of routing metadata from message attributes.
//!
//! Producers route a message with three string attributes:
//! - `event`: must be `incident` or `incidents` (case-insensitive)
//! - `url_origin`: absolute `http(s)` URL, or a path under the incident API base
//! - `method`: `post`, `put` or `delete` (case-insensitive)
//!
//! Anything else yields a [`SkipReason`], never a panic.

use std::collections::HashMap;

use relay_common::types::{HttpMethod, MessageAttribute, RoutingDecision, SkipReason};
use url::{ParseError, Url};

pub const EVENT_ATTRIBUTE: &str = "event";
pub const URL_ATTRIBUTE: &str = "url_origin";
pub const METHOD_ATTRIBUTE: &str = "method";

const RECOGNIZED_EVENTS: [&str; 2] = ["incident", "incidents"];
const WEB_SCHEMES: [&str; 2] = ["http", "https"];

pub fn extract_routing(
    attributes: Option<&HashMap<String, MessageAttribute>>,
    base_url: &str,
) -> Result<RoutingDecision, SkipReason> {
    let attributes = attributes.ok_or(SkipReason::MissingAttributes)?;

    let event = string_attribute(attributes, EVENT_ATTRIBUTE).to_lowercase();
    if !RECOGNIZED_EVENTS.contains(&event.as_str()) {
        return Err(SkipReason::UnhandledEvent(event));
    }

    let url = resolve_url(string_attribute(attributes, URL_ATTRIBUTE), base_url)
        .ok_or(SkipReason::MissingUrl)?;

    let raw_method = string_attribute(attributes, METHOD_ATTRIBUTE);
    let method = HttpMethod::parse(raw_method)
        .ok_or_else(|| SkipReason::UnhandledMethod(raw_method.to_lowercase()))?;

    Ok(RoutingDecision { event, url, method })
}

/// Resolve `url_origin` against the incident API base.
///
/// Absolute URLs must be `http(s)://` with a host. Relative references are
/// paths under `base_url` and must stay on its origin. Blank or anything else
/// resolves to nothing.
pub fn resolve_url(url_origin: &str, base_url: &str) -> Option<String> {
    let origin = url_origin.trim();
    if origin.is_empty() {
        return None;
    }

    match Url::parse(origin) {
        Ok(url) => {
            // `https:/host` parses leniently; require the authority marker as written.
            let has_authority = origin
                .get(url.scheme().len()..)
                .is_some_and(|rest| rest.starts_with("://"));
            (WEB_SCHEMES.contains(&url.scheme()) && has_authority).then(|| url.to_string())
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            // Scheme-relative: names another host
            if origin.starts_with("//") {
                return None;
            }
            let base = base_directory(base_url)?;
            let url = base.join(origin.trim_start_matches('/')).ok()?;
            (url.origin() == base.origin()).then(|| url.to_string())
        }
        Err(_) => None,
    }
}

/// The base URL with a trailing slash, so joins land under its path.
fn base_directory(base_url: &str) -> Option<Url> {
    let mut base = Url::parse(base_url.trim()).ok()?;
    if !WEB_SCHEMES.contains(&base.scheme()) {
        return None;
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Some(base)
}

fn string_attribute<'a>(attributes: &'a HashMap<String, MessageAttribute>, name: &str) -> &'a str {
    attributes
        .get(name)
        .and_then(|attr| attr.string_value.as_deref())
        .map(str::trim)
        .unwrap_or("")
}
