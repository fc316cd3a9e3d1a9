//! Client origin extraction from proxy headers.
//!
//! Requests reach the application through a CDN and a reverse proxy, so the
//! socket peer is never the client. The apparent origin is read from the
//! proxy headers in priority order.

use crate::application::ports::HeaderSource;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Sentinel returned when no proxy header names the client.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Headers consulted, highest priority first.
pub const ORIGIN_HEADERS: [&str; 3] = ["x-forwarded-for", "cf-connecting-ip", "x-real-ip"];

/// The client's apparent network origin.
///
/// `x-forwarded-for` may carry a chain (`client, proxy1, proxy2`); its first
/// non-empty entry is the client. Falls back to `cf-connecting-ip`, then
/// `x-real-ip`, then [`UNKNOWN_ORIGIN`].
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use tavern_core::infrastructure::headers::client_origin;
///
/// let headers = HashMap::from([(
///     "X-Forwarded-For".to_string(),
///     "203.0.113.4, 10.0.0.1".to_string(),
/// )]);
/// assert_eq!(client_origin(&headers), "203.0.113.4");
/// ```
pub fn client_origin<H>(headers: &H) -> String
where
    H: HeaderSource + ?Sized,
{
    ORIGIN_HEADERS
        .iter()
        .filter_map(|name| headers.header(name))
        .find_map(first_entry)
        .unwrap_or(UNKNOWN_ORIGIN)
        .to_string()
}

fn first_entry(value: &str) -> Option<&str> {
    value
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

impl<S: BuildHasher> HeaderSource for HashMap<String, String, S> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }
}

impl HeaderSource for BTreeMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl<'a> HeaderSource for [(&'a str, &'a str)] {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_wins() {
        let headers: &[(&str, &str)] = &[
            ("x-real-ip", "10.0.0.3"),
            ("cf-connecting-ip", "10.0.0.2"),
            ("x-forwarded-for", "198.51.100.7"),
        ];
        assert_eq!(client_origin(headers), "198.51.100.7");
    }

    #[test]
    fn test_forwarded_for_chain_takes_first() {
        let headers: &[(&str, &str)] = &[("x-forwarded-for", " 198.51.100.7 , 10.0.0.1")];
        assert_eq!(client_origin(headers), "198.51.100.7");
    }

    #[test]
    fn test_cdn_header_second() {
        let headers: &[(&str, &str)] =
            &[("x-real-ip", "10.0.0.3"), ("cf-connecting-ip", "192.0.2.9")];
        assert_eq!(client_origin(headers), "192.0.2.9");
    }

    #[test]
    fn test_reverse_proxy_header_last() {
        let headers = BTreeMap::from([("X-Real-IP".to_string(), "192.0.2.1".to_string())]);
        assert_eq!(client_origin(&headers), "192.0.2.1");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let headers: &[(&str, &str)] =
            &[("x-forwarded-for", " , "), ("x-real-ip", "192.0.2.1")];
        assert_eq!(client_origin(headers), "192.0.2.1");
    }

    #[test]
    fn test_unknown_sentinel() {
        let headers: HashMap<String, String> = HashMap::new();
        assert_eq!(client_origin(&headers), UNKNOWN_ORIGIN);
    }

    #[test]
    fn test_case_insensitive_names() {
        let headers =
            HashMap::from([("CF-Connecting-IP".to_string(), "192.0.2.50".to_string())]);
        assert_eq!(client_origin(&headers), "192.0.2.50");
    }
}
