//! Redaction helpers for log output.

use url::Url;

/// Render a URL for logs with its path and query hidden.
///
/// Webhook URLs carry their credential in the path, and token endpoints put
/// tenant identifiers there, so only scheme, host and port are kept.
pub fn redact_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown");
    let has_rest = url.path() != "/" || url.query().is_some();

    let mut out = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    if has_rest {
        out.push_str("/***");
    }
    out
}

/// Same as [`redact_url`] for a URL that may not parse.
pub fn redact_url_str(raw: &str) -> String {
    Url::parse(raw)
        .map(|u| redact_url(&u))
        .unwrap_or_else(|_| "<invalid url>".to_string())
}
