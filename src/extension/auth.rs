//! Auth cache and checker, owned exclusively by the message relay.

use super::clock::Clock;
use super::cookies::{CookieChange, CookieStore, domain_matches, is_session_cookie_name};
use crate::api::UserInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl AuthState {
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            user: None,
            last_checked_at: None,
        }
    }

    pub fn authenticated(user: UserInfo, checked_at: DateTime<Utc>) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
            last_checked_at: Some(checked_at),
        }
    }
}

/// Result of asking the identity endpoint who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityOutcome {
    Authenticated(UserInfo),
    /// The endpoint answered 401.
    Unauthenticated,
    /// Network failure or any other non-2xx answer.
    Transient(String),
}

pub trait IdentityClient: Send + Sync {
    fn fetch_user(&self) -> Pin<Box<dyn Future<Output = IdentityOutcome> + Send + '_>>;
}

/// Single-writer holder of the last known [`AuthState`].
#[derive(Debug, Default)]
pub struct AuthCache {
    state: Option<AuthState>,
}

impl AuthCache {
    pub fn new() -> Self {
        Self { state: None }
    }

    pub fn state(&self) -> Option<&AuthState> {
        self.state.as_ref()
    }

    /// Cached state that may be served without a network call.
    pub fn fresh(&self, now: DateTime<Utc>, window: Duration) -> Option<&AuthState> {
        let state = self.state.as_ref()?;
        let checked_at = state.last_checked_at?;
        if !state.authenticated || state.user.is_none() {
            return None;
        }
        let age = now.signed_duration_since(checked_at).to_std().ok()?;
        (age < window).then_some(state)
    }

    /// User from the last successful check, fresh or not.
    pub fn stale_user(&self) -> Option<&UserInfo> {
        self.state
            .as_ref()
            .filter(|s| s.authenticated)
            .and_then(|s| s.user.as_ref())
    }

    /// Overwrite the cache. `last_checked_at` never moves backwards.
    pub fn store(&mut self, mut state: AuthState) -> &AuthState {
        let previous = self.state.as_ref().and_then(|s| s.last_checked_at);
        if let (Some(previous), Some(next)) = (previous, state.last_checked_at)
            && next < previous
        {
            state.last_checked_at = Some(previous);
        }
        self.state.insert(state)
    }

    pub fn clear(&mut self) {
        self.state = None;
    }
}

/// Answers `checkAuth` from the cache or the identity endpoint.
pub struct AuthChecker {
    cache: AuthCache,
    identity: Arc<dyn IdentityClient>,
    cookies: Arc<dyn CookieStore>,
    clock: Arc<dyn Clock>,
    host: String,
    freshness: Duration,
}

impl AuthChecker {
    pub fn new(
        identity: Arc<dyn IdentityClient>,
        cookies: Arc<dyn CookieStore>,
        clock: Arc<dyn Clock>,
        host: impl Into<String>,
        freshness: Duration,
    ) -> Self {
        Self {
            cache: AuthCache::new(),
            identity,
            cookies,
            clock,
            host: host.into(),
            freshness,
        }
    }

    pub fn cache(&self) -> &AuthCache {
        &self.cache
    }

    pub async fn check_auth(&mut self) -> AuthState {
        let now = self.clock.now();
        if let Some(cached) = self.cache.fresh(now, self.freshness) {
            tracing::debug!("using cached auth state");
            return cached.clone();
        }

        let has_session = self.has_valid_session(now);

        match self.identity.fetch_user().await {
            IdentityOutcome::Authenticated(user) => {
                let checked_at = self.clock.now();
                self.cache
                    .store(AuthState::authenticated(user, checked_at))
                    .clone()
            }
            IdentityOutcome::Unauthenticated => {
                tracing::debug!("identity endpoint reports no session");
                self.cache.clear();
                AuthState::unauthenticated()
            }
            IdentityOutcome::Transient(reason) => {
                if has_session && let Some(user) = self.cache.stale_user() {
                    tracing::warn!(%reason, "identity fetch failed; serving stale user");
                    return AuthState {
                        authenticated: true,
                        user: Some(user.clone()),
                        last_checked_at: self.cache.state().and_then(|s| s.last_checked_at),
                    };
                }
                tracing::warn!(%reason, has_session, "identity fetch failed");
                self.cache.clear();
                AuthState::unauthenticated()
            }
        }
    }

    /// Drop cached state when a session cookie for our host disappears.
    pub fn on_cookie_change(&mut self, change: &CookieChange) {
        if change.removed
            && is_session_cookie_name(&change.cookie.name)
            && domain_matches(&change.cookie.domain, &self.host)
        {
            tracing::info!(cookie = %change.cookie.name, "session cookie removed; auth cache cleared");
            self.cache.clear();
        }
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn has_valid_session(&self, now: DateTime<Utc>) -> bool {
        self.cookies
            .cookies_for_domain(&self.host)
            .iter()
            .any(|c| c.is_session_credential() && c.is_live_at(now))
    }
}
