//! Authenticate inbound callers against JupyterHub.
//!
//! The service never manages credentials of its own. Callers present the API
//! token the hub issued to them (`Authorization: token <t>`, per hub
//! convention, though `Bearer` is accepted too) and we ask the hub's
//! introspection endpoint who that token belongs to.

use axum::http::{header, HeaderMap};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Same fixed timeout the relay applies to Mattermost calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A newtype wrapper around a caller's hub-issued API token.
#[derive(Clone)]
pub struct HubToken(pub String);

/// The identity the hub reports for a token. Only the name matters to us; it
/// ends up in the message signature.
#[derive(Debug, Deserialize)]
pub struct HubUser {
    pub name: String,
}

/// Sum type for the ways caller authentication can fail.
#[derive(Debug)]
pub enum HubAuthError {
    /// The hub could not be reached at all.
    RequestFailed(reqwest::Error),
    /// The hub rejected the token.
    Unauthorized,
    /// The hub answered with something other than an identity or a
    /// rejection.
    Api(reqwest::StatusCode),
}

impl From<reqwest::Error> for HubAuthError {
    fn from(e: reqwest::Error) -> Self {
        HubAuthError::RequestFailed(e)
    }
}

impl fmt::Display for HubAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            HubAuthError::RequestFailed(e) => format!("Hub API request failed: {:?}", e),
            HubAuthError::Unauthorized => "Hub rejected the supplied token".into(),
            HubAuthError::Api(status) => format!("Hub API returned {}", status),
        };

        write!(f, "{}", x)
    }
}

/// A thin client for the hub's token-introspection endpoint.
pub struct HubAuthClient {
    http: reqwest::Client,
    api_url: String,
}

impl HubAuthClient {
    /// `api_url` is the hub's REST base as the hub injects it, e.g.
    /// `http://127.0.0.1:8081/hub/api`.
    pub fn new(api_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
        }
    }

    /// Resolve a caller token to the hub user it belongs to.
    pub async fn user_for_token(&self, token: &HubToken) -> Result<HubUser, HubAuthError> {
        let res = self
            .http
            .get(format!("{}/user", self.api_url.trim_end_matches('/')))
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::AUTHORIZATION, format!("token {}", token.0))
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            return Ok(res.json().await?);
        }

        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(HubAuthError::Unauthorized)
            }
            _ => Err(HubAuthError::Api(status)),
        }
    }
}

/// Pull the caller's token out of the `Authorization` header. The hub's own
/// clients send `token <t>`; `Bearer <t>` is treated as equivalent. Anything
/// else is unauthenticated.
pub fn token_from_headers(headers: &HeaderMap) -> Option<HubToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(HubToken(token.to_owned()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_from_headers_accepts_hub_scheme() {
        let token = token_from_headers(&headers_with("token abc123")).unwrap();
        assert_eq!(token.0, "abc123");
    }

    #[test]
    fn test_token_from_headers_accepts_bearer_scheme() {
        let token = token_from_headers(&headers_with("Bearer abc123")).unwrap();
        assert_eq!(token.0, "abc123");
    }

    #[test]
    fn test_token_from_headers_rejects_junk() {
        assert!(token_from_headers(&HeaderMap::new()).is_none());
        assert!(token_from_headers(&headers_with("abc123")).is_none());
        assert!(token_from_headers(&headers_with("Basic abc123")).is_none());
        assert!(token_from_headers(&headers_with("token ")).is_none());
    }

    #[tokio::test]
    async fn test_user_for_token() {
        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("GET", "/user")
            .match_header("Authorization", "token abc123")
            .with_body(r#"{"name": "alice", "kind": "user"}"#)
            .create_async()
            .await;

        let client = HubAuthClient::new(srv.url());
        let user = client
            .user_for_token(&HubToken("abc123".into()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(user.name, "alice");
    }

    #[tokio::test]
    async fn test_user_for_token_rejected() {
        let mut srv = mockito::Server::new_async().await;
        let _mock = srv
            .mock("GET", "/user")
            .with_status(403)
            .create_async()
            .await;

        let client = HubAuthClient::new(srv.url());
        let err = client
            .user_for_token(&HubToken("abc123".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, HubAuthError::Unauthorized));
    }
}
