//! The notebook-side caller: one function that hands a post to the service.
//!
//! Runs inside a user's server, where the hub has already injected
//! `JUPYTERPOST_URL` (via the registrar) and `JPY_API_TOKEN` (the caller's
//! own identity). No Mattermost credentials ever reach this side.

use reqwest::{multipart, StatusCode};
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rendering is delegated to whatever plotting integration the caller uses;
/// the boxed error is whatever that integration reports.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// Anything that can draw itself as a PNG, e.g. a handle to a plotting
/// library's figure object.
pub trait Renderable {
    fn render_png(&self) -> Result<Vec<u8>, RenderError>;
}

/// A post's optional attachment: either PNG bytes as-is, or a figure still
/// to be rendered. Figures are resolved to bytes here at the boundary; the
/// service and the relay core only ever see bytes.
pub enum Attachment {
    Png(Vec<u8>),
    Figure(Box<dyn Renderable + Send + Sync>),
}

impl Attachment {
    /// Normalize to bytes. Empty output is treated as no attachment at all,
    /// matching how an empty upload would behave anyway.
    fn into_png(self) -> Result<Option<Vec<u8>>, PostError> {
        let bytes = match self {
            Attachment::Png(bytes) => bytes,
            Attachment::Figure(figure) => figure.render_png().map_err(PostError::Render)?,
        };

        Ok(if bytes.is_empty() { None } else { Some(bytes) })
    }
}

/// Overrides for callers running outside a configured user server. Inside
/// one, `PostOptions::default()` is all that's needed.
#[derive(Default)]
pub struct PostOptions {
    pub service_url: Option<Url>,
    pub token: Option<String>,
}

/// Sum type for everything that can go wrong on the caller's side of the
/// service.
#[derive(Debug)]
pub enum PostError {
    /// No service URL given and `JUPYTERPOST_URL` is unset.
    MissingServiceUrl,
    /// No API token given and `JPY_API_TOKEN` is unset.
    MissingToken,
    InvalidServiceUrl(url::ParseError),
    Render(RenderError),
    RequestFailed(reqwest::Error),
    /// The service answered with a non-2xx; the body carries the reason the
    /// way the service's own error mapping produced it.
    Rejected { status: StatusCode, body: String },
}

impl From<reqwest::Error> for PostError {
    fn from(e: reqwest::Error) -> Self {
        PostError::RequestFailed(e)
    }
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            PostError::MissingServiceUrl => "No service URL given".into(),
            PostError::MissingToken => "No API token given".into(),
            PostError::InvalidServiceUrl(e) => format!("Invalid service URL: {}", e),
            PostError::Render(e) => format!("Failed to render attachment: {}", e),
            PostError::RequestFailed(e) => format!("Service request failed: {:?}", e),
            PostError::Rejected { status, body } => {
                format!("Service returned {}: {}", status, body)
            }
        };

        write!(f, "{}", x)
    }
}

/// Post a message to Mattermost through the hub-managed service.
///
/// `channel` is a channel name, or `@username` for a direct message. The
/// service URL and API token fall back to the environment the hub injects
/// into user servers when not set in `opts`.
pub async fn post(
    message: &str,
    channel: &str,
    attachment: Option<Attachment>,
    opts: PostOptions,
) -> Result<(), PostError> {
    let service_url = match opts.service_url {
        Some(url) => url,
        None => {
            let raw = env::var("JUPYTERPOST_URL").map_err(|_| PostError::MissingServiceUrl)?;
            Url::parse(&raw).map_err(PostError::InvalidServiceUrl)?
        }
    };
    let token = match opts.token {
        Some(token) => token,
        None => env::var("JPY_API_TOKEN").map_err(|_| PostError::MissingToken)?,
    };

    let png = attachment.map(Attachment::into_png).transpose()?.flatten();

    let mut form = multipart::Form::new()
        .text("message", message.to_owned())
        .text("channel", channel.to_owned());
    if let Some(bytes) = png {
        let part = multipart::Part::bytes(bytes)
            .file_name("upload.png")
            .mime_str("image/png")?;
        form = form.part("file", part);
    }

    let res = reqwest::Client::new()
        .post(service_url)
        .timeout(REQUEST_TIMEOUT)
        .header(reqwest::header::AUTHORIZATION, format!("token {}", token))
        .multipart(form)
        .send()
        .await?;

    let status = res.status();
    if status.is_success() {
        return Ok(());
    }

    let body = res.text().await.unwrap_or_default();
    Err(PostError::Rejected { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn opts(url: &str) -> PostOptions {
        PostOptions {
            service_url: Some(Url::parse(url).unwrap()),
            token: Some("abc123".into()),
        }
    }

    #[tokio::test]
    async fn test_post_message_only() {
        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("POST", "/")
            .match_header("Authorization", "token abc123")
            .match_header(
                "Content-Type",
                Matcher::Regex("^multipart/form-data".into()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"message\"".into()),
                Matcher::Regex("hello".into()),
                Matcher::Regex("name=\"channel\"".into()),
                Matcher::Regex("town-square".into()),
            ]))
            .create_async()
            .await;

        post("hello", "town-square", None, opts(&srv.url()))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_with_rendered_figure() {
        struct FakeFigure;

        impl Renderable for FakeFigure {
            fn render_png(&self) -> Result<Vec<u8>, RenderError> {
                Ok(b"PNGBYTES".to_vec())
            }
        }

        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"file\"".into()),
                Matcher::Regex("filename=\"upload.png\"".into()),
                Matcher::Regex("PNGBYTES".into()),
            ]))
            .create_async()
            .await;

        let attachment = Attachment::Figure(Box::new(FakeFigure));
        post("plot", "town-square", Some(attachment), opts(&srv.url()))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_attachment_is_dropped() {
        let mut srv = mockito::Server::new_async().await;
        let mock = srv
            .mock("POST", "/")
            .match_body(Matcher::Regex("name=\"message\"".into()))
            .create_async()
            .await;

        post("hi", "town-square", Some(Attachment::Png(Vec::new())), opts(&srv.url()))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_carries_service_detail() {
        let mut srv = mockito::Server::new_async().await;
        let _mock = srv
            .mock("POST", "/")
            .with_status(400)
            .with_body("my-channel does not exist or is private")
            .create_async()
            .await;

        let err = post("hi", "my-channel", None, opts(&srv.url()))
            .await
            .unwrap_err();

        match err {
            PostError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "my-channel does not exist or is private");
            }
            _ => panic!("expected Rejected"),
        }
    }

    #[tokio::test]
    async fn test_render_failure() {
        struct BrokenFigure;

        impl Renderable for BrokenFigure {
            fn render_png(&self) -> Result<Vec<u8>, RenderError> {
                Err("backend gone".into())
            }
        }

        let attachment = Attachment::Figure(Box::new(BrokenFigure));
        let err = post("hi", "town-square", Some(attachment), opts("http://unused.invalid"))
            .await
            .unwrap_err();

        assert!(matches!(err, PostError::Render(_)));
    }
}
