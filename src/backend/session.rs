//! Session token → identity resolution.
//!
//! Session mechanics belong to the identity provider; the backend only needs
//! to turn a presented token into an [`ExternalIdentity`].

use super::store::ExternalIdentity;
use crate::api::SESSION_COOKIE;
use crate::config::IdentityConfig;
use axum::http::{HeaderMap, header};
use std::future::Future;
use std::pin::Pin;

pub trait SessionResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<ExternalIdentity>> + Send + 'a>>;
}

/// Resolves tokens against a fixed table from config.
pub struct StaticSessionResolver {
    sessions: Vec<(String, ExternalIdentity)>,
}

impl StaticSessionResolver {
    pub fn new(sessions: Vec<(String, ExternalIdentity)>) -> Self {
        Self { sessions }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(
            config
                .sessions
                .iter()
                .map(|entry| {
                    (
                        entry.token.clone(),
                        ExternalIdentity {
                            external_id: entry.external_id.clone(),
                            email: entry.email.clone(),
                            first_name: entry.first_name.clone(),
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionResolver for StaticSessionResolver {
    fn resolve<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<ExternalIdentity>> + Send + 'a>> {
        // Compare against every entry so timing does not reveal the match position.
        let mut found = None;
        for (candidate, identity) in &self.sessions {
            if constant_time_eq(candidate, token) && found.is_none() {
                found = Some(identity.clone());
            }
        }
        Box::pin(async move { found })
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn resolver() -> StaticSessionResolver {
        StaticSessionResolver::new(vec![(
            "tok_ada".into(),
            ExternalIdentity {
                external_id: "user_ada".into(),
                email: "ada@example.com".into(),
                first_name: Some("Ada".into()),
            },
        )])
    }

    #[tokio::test]
    async fn resolves_known_tokens_only() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("tok_ada").await.unwrap().external_id,
            "user_ada"
        );
        assert!(resolver.resolve("tok_ad").await.is_none());
        assert!(resolver.resolve("").await.is_none());
    }

    #[test]
    fn token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok_ada"));
        assert_eq!(extract_token(&headers).as_deref(), Some("tok_ada"));
    }

    #[test]
    fn extension_session_cookie_is_accepted() {
        let jar = crate::extension::MemoryCookieJar::new();
        jar.set(crate::extension::Cookie::new(SESSION_COOKIE, "localhost", "tok_ada"));
        let sent = crate::extension::cookies::CookieStore::cookies_for_domain(&jar, "localhost");
        assert!(sent[0].is_session_credential());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", sent[0].name, sent[0].value)).unwrap(),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok_ada"));
    }

    #[test]
    fn token_from_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=tok_ada; __session_x=other"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok_ada"));
    }

    #[test]
    fn missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(header::COOKIE, HeaderValue::from_static("__session="));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn built_from_config() {
        let config: IdentityConfig = toml::from_str(
            r#"
            [[sessions]]
            token = "tok_1"
            external_id = "user_1"
            email = "one@example.com"
            "#,
        )
        .unwrap();
        assert!(!StaticSessionResolver::from_config(&config).is_empty());
    }
}
