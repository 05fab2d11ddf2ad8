//! Minimal cookie jar with `document.cookie` semantics
//!
//! Only what the assignment cookies need: name/value pairs scoped to a path
//! with an optional expiry. Domain and flag attributes are rendered into
//! `Set-Cookie` strings but not modelled.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// `None` for session cookies
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    /// A site-wide cookie living for `max_age` from `now`.
    pub fn site_wide(
        name: impl Into<String>,
        value: impl Into<String>,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            expires: Some(now + max_age),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Render as the string assigned to `document.cookie` (or sent in a
    /// `Set-Cookie` header).
    pub fn to_set_cookie(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(expires) = self.expires {
            out.push_str("; Expires=");
            out.push_str(&expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        }
        out.push_str("; SameSite=Lax");
        out
    }
}

/// The cookies of one browser profile, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from a `document.cookie` string such as `"a=1; b=2"`.
    ///
    /// Fragments without `=` are ignored. Parsed cookies are session cookies
    /// on the root path.
    pub fn parse_header(header: &str) -> Self {
        let mut jar = Self::new();
        for fragment in header.split(';') {
            let Some((name, value)) = fragment.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            jar.set(Cookie {
                name: name.to_string(),
                value: value.trim().to_string(),
                path: "/".to_string(),
                expires: None,
            });
        }
        jar
    }

    /// Value of a live cookie.
    pub fn get(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|cookie| !cookie.is_expired(now))
            .map(|cookie| cookie.value.as_str())
    }

    /// Insert or replace a cookie.
    pub fn set(&mut self, cookie: Cookie) {
        self.cookies.insert(cookie.name.clone(), cookie);
    }

    /// Delete one cookie. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.cookies.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Drop expired cookies, returning how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(|_, cookie| !cookie.is_expired(now));
        before - self.cookies.len()
    }

    /// Render live cookies the way `document.cookie` reads them.
    pub fn header(&self, now: DateTime<Utc>) -> String {
        self.cookies
            .values()
            .filter(|cookie| !cookie.is_expired(now))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_document_cookie_string() {
        let jar = CookieJar::parse_header("csrftoken=abc;  abtesting-7-version = variant ;junk");

        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("csrftoken", now()), Some("abc"));
        assert_eq!(jar.get("abtesting-7-version", now()), Some("variant"));
        assert_eq!(jar.get("junk", now()), None);
    }

    #[test]
    fn lookup_is_exact_not_substring() {
        let jar = CookieJar::parse_header("abtesting-17-version=control");
        assert_eq!(jar.get("abtesting-7-version", now()), None);
    }

    #[test]
    fn expired_cookies_are_invisible_and_purgeable() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::site_wide("old", "x", now() - Duration::days(400), Duration::days(365)));
        jar.set(Cookie::site_wide("fresh", "y", now(), Duration::days(365)));

        assert_eq!(jar.get("old", now()), None);
        assert_eq!(jar.header(now()), "fresh=y");
        assert_eq!(jar.purge_expired(now()), 1);
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn set_cookie_string_is_site_wide() {
        let cookie = Cookie::site_wide("abtesting-7-version", "variant", now(), Duration::days(365));
        let rendered = cookie.to_set_cookie();

        assert!(rendered.starts_with("abtesting-7-version=variant; Path=/"));
        assert!(rendered.contains("Expires=Mon, 01 Mar 2027 12:00:00 GMT"));
    }

    #[test]
    fn remove_reports_presence() {
        let mut jar = CookieJar::parse_header("a=1");
        assert!(jar.remove("a"));
        assert!(!jar.remove("a"));
        assert!(jar.is_empty());
    }
}
