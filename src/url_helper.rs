use url::Url;

/// Resolve `reference` against `base` and drop the fragment.
///
/// Returns `None` for anything that does not resolve to a URL.
pub fn normalize(reference: &str, base: &Url) -> Option<Url> {
    let mut url = base.join(reference.trim()).ok()?;
    url.set_fragment(None);
    Some(url)
}

/// Same as [`normalize`] with a textual base.
pub fn normalize_str(reference: &str, base: &str) -> Option<Url> {
    let base = Url::parse(base).ok()?;
    normalize(reference, &base)
}

/// True when scheme, host and port of both URLs match.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => same_origin_url(&a, &b),
        _ => false,
    }
}

pub fn same_origin_url(a: &Url, b: &Url) -> bool {
    // Opaque origins (mailto:, data:, ...) never compare equal.
    let origin = a.origin();
    origin.is_tuple() && origin == b.origin()
}

/// Syntactic check for a crawlable start URL.
pub fn is_valid(url: &str) -> bool {
    parse_start_url(url).is_some()
}

pub(crate) fn parse_start_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    let mut parsed = parsed;
    parsed.set_fragment(None);
    Some(parsed)
}
