//! Session signal source: the cookie jar the extension can read and watch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::api::SESSION_COOKIE;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub domain: String,
    pub value: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn is_session_credential(&self) -> bool {
        is_session_cookie_name(&self.name)
    }

    /// Session cookies without an expiry live until the browser session ends.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

/// Matches the identity provider's session cookie naming convention.
pub fn is_session_cookie_name(name: &str) -> bool {
    name.starts_with(SESSION_COOKIE) || name.contains("clerk")
}

/// True when a cookie set for `cookie_domain` is sent to `host`.
pub fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.');
    if cookie_domain.eq_ignore_ascii_case(host) {
        return true;
    }
    host.len() > cookie_domain.len()
        && host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", cookie_domain.to_ascii_lowercase()))
}

/// A cookie was set or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieChange {
    pub cookie: Cookie,
    pub removed: bool,
}

/// Cookie access as the extension sees it.
///
/// Every subscriber gets each change at most once; a subscriber that falls
/// too far behind observes a lag instead of the missed events.
pub trait CookieStore: Send + Sync {
    fn cookies_for_domain(&self, host: &str) -> Vec<Cookie>;
    fn subscribe(&self) -> broadcast::Receiver<CookieChange>;
}

/// In-process cookie jar.
pub struct MemoryCookieJar {
    cookies: RwLock<Vec<Cookie>>,
    changes: broadcast::Sender<CookieChange>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            cookies: RwLock::new(Vec::new()),
            changes,
        }
    }

    /// Insert or replace a cookie (keyed by name and domain).
    pub fn set(&self, cookie: Cookie) {
        {
            let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
            cookies.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain));
            cookies.push(cookie.clone());
        }
        let _ = self.changes.send(CookieChange {
            cookie,
            removed: false,
        });
    }

    /// Remove a cookie; returns whether it existed.
    pub fn remove(&self, domain: &str, name: &str) -> bool {
        let removed = {
            let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
            let position = cookies
                .iter()
                .position(|c| c.name == name && c.domain == domain);
            position.map(|index| cookies.remove(index))
        };

        match removed {
            Some(cookie) => {
                let _ = self.changes.send(CookieChange {
                    cookie,
                    removed: true,
                });
                true
            }
            None => false,
        }
    }
}

impl CookieStore for MemoryCookieJar {
    fn cookies_for_domain(&self, host: &str) -> Vec<Cookie> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| domain_matches(&c.domain, host))
            .cloned()
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<CookieChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_naming_convention() {
        assert!(is_session_cookie_name("__session"));
        assert!(is_session_cookie_name("__session_abc123"));
        assert!(is_session_cookie_name("__clerk_db_jwt"));
        assert!(!is_session_cookie_name("theme"));
        assert!(!is_session_cookie_name("session"));
    }

    #[test]
    fn domain_matching_handles_leading_dot_and_subdomains() {
        assert!(domain_matches("localhost", "localhost"));
        assert!(domain_matches(".example.com", "example.com"));
        assert!(domain_matches(".example.com", "app.example.com"));
        assert!(!domain_matches("example.com", "badexample.com"));
        assert!(!domain_matches("app.example.com", "example.com"));
    }

    #[test]
    fn expiry_is_checked_against_now() {
        let now = Utc::now();
        let cookie = Cookie::new("__session", "localhost", "tok");
        assert!(cookie.is_live_at(now));
        assert!(
            !cookie
                .clone()
                .expiring_at(now - chrono::Duration::seconds(1))
                .is_live_at(now)
        );
        assert!(
            cookie
                .expiring_at(now + chrono::Duration::seconds(60))
                .is_live_at(now)
        );
    }

    #[test]
    fn set_replaces_and_filters_by_domain() {
        let jar = MemoryCookieJar::new();
        jar.set(Cookie::new("__session", "localhost", "one"));
        jar.set(Cookie::new("__session", "localhost", "two"));
        jar.set(Cookie::new("theme", "example.com", "dark"));

        let local = jar.cookies_for_domain("localhost");
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].value, "two");
    }

    #[tokio::test]
    async fn removal_is_broadcast_once_per_subscriber() {
        let jar = MemoryCookieJar::new();
        jar.set(Cookie::new("__session", "localhost", "tok"));
        let mut rx = jar.subscribe();

        assert!(jar.remove("localhost", "__session"));
        assert!(!jar.remove("localhost", "__session"));

        let change = rx.recv().await.unwrap();
        assert!(change.removed);
        assert_eq!(change.cookie.name, "__session");
        assert!(rx.try_recv().is_err());
    }
}
