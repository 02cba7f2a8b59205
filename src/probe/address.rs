//! Address normalization shared by all checks

use std::net::Ipv4Addr;

use url::{Host, Url};

/// Normalize a user-entered address into a URL
///
/// Addresses without a scheme get `http://` when the host is a bare IPv4
/// address and `https://` otherwise.
pub fn normalize_url(raw: &str) -> Result<Url, url::ParseError> {
    let raw = raw.trim();

    if raw.contains("://") {
        return Url::parse(raw);
    }

    let host = raw.split(['/', ':', '?', '#']).next().unwrap_or_default();
    let scheme = if host.parse::<Ipv4Addr>().is_ok() {
        "http"
    } else {
        "https"
    };

    Url::parse(&format!("{scheme}://{raw}"))
}

/// Host to connect to for socket-level checks, plus whether the scheme is secure
///
/// Falls back to the raw string as a bare hostname when it does not parse.
pub fn socket_host(raw: &str) -> (String, bool) {
    match normalize_url(raw) {
        Ok(url) => {
            let secure = url.scheme() == "https";
            match url.host() {
                Some(Host::Domain(domain)) => (domain.to_string(), secure),
                Some(Host::Ipv4(ip)) => (ip.to_string(), secure),
                Some(Host::Ipv6(ip)) => (ip.to_string(), secure),
                None => (raw.trim().to_string(), secure),
            }
        }
        Err(_) => (raw.trim().to_string(), false),
    }
}

/// Key used to detect duplicate targets
///
/// The address part is the lowercased host, the effective URL port, the path
/// without a trailing slash and the query. `port` is the check's own port.
pub fn identity_key(raw: &str, port: Option<u16>) -> (String, Option<u16>) {
    let address = match normalize_url(raw) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            let path = url.path().trim_end_matches('/');
            let mut key = match url.port_or_known_default() {
                Some(url_port) => format!("{host}:{url_port}{path}"),
                None => format!("{host}{path}"),
            };
            if let Some(query) = url.query() {
                key.push('?');
                key.push_str(query);
            }
            key
        }
        Err(_) => raw.trim().to_ascii_lowercase(),
    };
    (address, port)
}
