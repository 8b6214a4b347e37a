//! Type definitions and helpers for the Mattermost REST API.

use super::auth::*;
use super::error::MattermostError;
use super::team::TeamName;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Fixed timeout for every call against Mattermost. There is no per-call
/// negotiation; a caller that wants to wait longer has nothing to configure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A thin client over Mattermost's api/v4 surface. Holds a pooled
/// [reqwest::Client] internally; the pool is reused across posts but is not
/// part of any observable contract.
pub struct MattermostClient {
    http: reqwest::Client,
    base_url: String,
    token: MattermostToken,
    pub(crate) team: TeamName,
}

impl MattermostClient {
    /// `base_url` must already carry the API version path, e.g.
    /// `https://chat.example.com/api/v4`. See [has_api_version].
    pub fn new(base_url: String, token: MattermostToken, team: TeamName) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            team,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Create a GET request to any Mattermost API endpoint, handling
    /// authentication and the fixed timeout.
    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::AUTHORIZATION, to_auth_header_val(&self.token))
    }

    /// Create a POST request to any Mattermost API endpoint, handling
    /// authentication and the fixed timeout.
    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::AUTHORIZATION, to_auth_header_val(&self.token))
    }
}

/// Mattermost reports failure through the HTTP status code, with a JSON body
/// describing the problem:
///
/// ```json
/// {
///     "id": "store.sql_channel.get_by_name.missing.app_error",
///     "message": "Unable to find the existing channel.",
///     "status_code": 404
/// }
/// ```
#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Deserialize a successful response, or map a failed one onto
/// [MattermostError]. 401/403 become [MattermostError::Unauthenticated]; any
/// other non-2xx keeps its status and the server's `message` detail.
pub(crate) async fn decode<T: DeserializeOwned>(
    res: reqwest::Response,
) -> Result<T, MattermostError> {
    let res = check(res).await?;
    Ok(res.json().await?)
}

/// Like [decode], for endpoints whose response body we have no use for.
pub(crate) async fn accept(res: reqwest::Response) -> Result<(), MattermostError> {
    check(res).await.map(|_| ())
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, MattermostError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(MattermostError::Unauthenticated(detail))
        }
        _ => Err(MattermostError::Api { status, detail }),
    }
}

/// Whether a URL ends with a versioned REST path (`…/api/v4`). The relay
/// builds endpoint paths on top of this, so a bare server URL is a
/// configuration mistake we want to catch before the first post.
pub fn has_api_version(url: &str) -> bool {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rsplit_once("/api/v") {
        Some((_, version)) => !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> MattermostClient {
        MattermostClient::new(
            base.to_owned(),
            MattermostToken("any".into()),
            TeamName("any".into()),
        )
    }

    #[test]
    fn test_url_joining() {
        assert_eq!(
            client("https://chat.example.com/api/v4").url("/users/me"),
            "https://chat.example.com/api/v4/users/me"
        );
        assert_eq!(
            client("https://chat.example.com/api/v4/").url("users/me"),
            "https://chat.example.com/api/v4/users/me"
        );
    }

    #[test]
    fn test_has_api_version() {
        assert!(has_api_version("https://chat.example.com/api/v4"));
        assert!(has_api_version("https://chat.example.com/api/v4/"));
        assert!(has_api_version("https://chat.example.com/mm/api/v10"));
        assert!(!has_api_version("https://chat.example.com"));
        assert!(!has_api_version("https://chat.example.com/api/"));
        assert!(!has_api_version("https://chat.example.com/api/vnext"));
    }

    #[tokio::test]
    async fn test_decode_success() {
        #[derive(serde::Deserialize)]
        struct Me {
            id: String,
        }

        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("GET", "/users/me")
            .with_body(r#"{"id": "me1"}"#)
            .create_async()
            .await;

        let res = client(&srv.url()).get("/users/me").send().await.unwrap();
        let me: Me = decode(res).await.unwrap();

        mock.assert_async().await;
        assert_eq!(me.id, "me1");
    }

    #[tokio::test]
    async fn test_decode_unauthenticated() {
        let mut srv = mockito::Server::new_async().await;
        let _mock = srv
            .mock("GET", "/users/me")
            .with_status(401)
            .with_body(r#"{"id": "x", "message": "Invalid or expired session", "status_code": 401}"#)
            .create_async()
            .await;

        let res = client(&srv.url()).get("/users/me").send().await.unwrap();
        let err = decode::<serde_json::Value>(res).await.unwrap_err();

        match err {
            MattermostError::Unauthenticated(detail) => {
                assert_eq!(detail, "Invalid or expired session")
            }
            _ => panic!("expected Unauthenticated"),
        }
    }

    #[tokio::test]
    async fn test_decode_api_error_with_unparseable_body() {
        let mut srv = mockito::Server::new_async().await;
        let _mock = srv
            .mock("GET", "/users/me")
            .with_status(500)
            .with_body("not json")
            .create_async()
            .await;

        let res = client(&srv.url()).get("/users/me").send().await.unwrap();
        let err = accept(res).await.unwrap_err();

        match err {
            MattermostError::Api { status, detail } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(detail, "not json");
            }
            _ => panic!("expected Api"),
        }
    }
}
