//! Server router definition.
//!
//! The following routes are supported, mounted under the hub-assigned
//! service prefix:
//!
//! - GET: `{prefix}/health`
//! - POST: `{prefix}/`

use crate::{
    hub::auth::{token_from_headers, HubAuthClient, HubAuthError},
    mattermost::{
        api::MattermostClient, channel::ChannelTarget, error::MattermostError, post::PostRequest,
    },
};
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        DefaultBodyLimit, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::{self, TraceLayer};
use tracing::{error, Level};

/// Mattermost's own default upload cap; larger bodies are refused before the
/// relay sequence starts.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Dependencies shared by routes across requests.
#[derive(Clone)]
pub struct Deps {
    pub mattermost: Arc<MattermostClient>,
    pub hub: Arc<HubAuthClient>,
    pub bot_signature: String,
}

/// Instantiate a new router with tracing, mounted under `prefix` (the hub's
/// service prefix, `/` when run standalone).
pub fn new(deps: Deps, prefix: &str) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
        .on_response(trace::DefaultOnResponse::new().level(Level::INFO));

    let service = Router::new()
        .route("/", post(msg_handler))
        .layer(trace_layer)
        // Exclude the health check route from tracing.
        .route("/health", get(|| async { StatusCode::OK }))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(deps);

    match prefix.trim_end_matches('/') {
        "" => service,
        prefix => Router::new().nest(prefix, service),
    }
}

/// The fields of one inbound post request.
struct PostForm {
    message: String,
    channel: String,
    file: Option<Vec<u8>>,
}

impl PostForm {
    async fn read(mut multipart: Multipart) -> Result<Self, (StatusCode, String)> {
        let mut message = None;
        let mut channel = None;
        let mut file = None;

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().map(|n| n.to_owned());
            match name.as_deref() {
                Some("message") => message = Some(field.text().await.map_err(bad_form)?),
                Some("channel") => channel = Some(field.text().await.map_err(bad_form)?),
                Some("file") => {
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    // An empty file part is how "no attachment" arrives.
                    if !bytes.is_empty() {
                        file = Some(bytes.to_vec());
                    }
                }
                _ => continue,
            }
        }

        Ok(Self {
            message: message.ok_or_else(|| missing_field("message"))?,
            channel: channel.ok_or_else(|| missing_field("channel"))?,
            file,
        })
    }
}

fn bad_form(e: MultipartError) -> (StatusCode, String) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        format!("Failed to read form body: {}", e),
    )
}

fn missing_field(name: &str) -> (StatusCode, String) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        format!("Failed to read form body: missing field `{}`", name),
    )
}

/// Handler for the POST subroute `/`.
///
/// An `Authorization` header carrying a hub-issued API token must be present;
/// the hub is asked who the token belongs to, and the resulting username is
/// stamped into the relayed message.
///
/// Accepts a [PostForm] in `multipart/form-data` format.
async fn msg_handler(
    State(deps): State<Deps>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, (StatusCode, String)> {
    let token =
        token_from_headers(&headers).ok_or((StatusCode::UNAUTHORIZED, String::new()))?;

    let user = deps.hub.user_for_token(&token).await.map_err(|e| match e {
        HubAuthError::Unauthorized => (StatusCode::UNAUTHORIZED, String::new()),
        e => {
            let es = e.to_string();
            error!(es);
            (StatusCode::INTERNAL_SERVER_ERROR, es)
        }
    })?;

    let multipart = multipart.map_err(|_| {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            String::from("Post requests must have `Content-Type: multipart/form-data`"),
        )
    })?;

    let form = PostForm::read(multipart).await?;

    let target = ChannelTarget::parse(&form.channel).ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        String::from("Field `channel` must not be empty"),
    ))?;

    if form.message.is_empty() && form.file.is_none() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            String::from("No message or attachment given"),
        ));
    }

    let message = format!("*@{} {}*: {}", user.name, deps.bot_signature, form.message);

    deps.mattermost
        .post_message(PostRequest {
            target,
            message,
            attachment: form.file,
        })
        .await
        .map_err(|e| handle_mattermost_err(&e))?;

    Ok(StatusCode::OK)
}

pub fn handle_mattermost_err(e: &MattermostError) -> (StatusCode, String) {
    let code = match e {
        MattermostError::ChannelNotFound(_) => StatusCode::BAD_REQUEST,
        MattermostError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        MattermostError::RequestFailed(_) | MattermostError::Api { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let es = e.to_string();

    error!(es);
    (code, es)
}
