//! Target resolution.
//!
//! The inbound path carries the whole destination:
//! `/https%3A%2F%2Fexample.com%2Fresource?x=1` → `https://example.com/resource?x=1`.
//! One leading `/` is dropped, the rest is percent-decoded strictly and
//! parsed as an absolute URL.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ResolveError;

/// Destination derived from a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    url: Url,
    host: String,
}

impl ResolvedTarget {
    /// Absolute target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Host component with a non-default port, e.g. `example.com:8443`.
    /// Used as the outbound `Host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host name without the port.
    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }
}

/// Resolve a raw `path?query` into a target.
pub fn resolve(path_and_query: &str) -> Result<ResolvedTarget, ResolveError> {
    let relative = path_and_query.strip_prefix('/').unwrap_or(path_and_query);
    let decoded = decode_component(relative)?;

    let url = Url::parse(&decoded).map_err(|source| ResolveError::InvalidUrl {
        input: decoded.clone(),
        source,
    })?;

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    Ok(ResolvedTarget { url, host })
}

/// Percent-decode, rejecting stray `%` and non UTF-8 results.
fn decode_component(input: &str) -> Result<String, ResolveError> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ResolveError::MalformedEncoding);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ResolveError::MalformedEncoding)
}
