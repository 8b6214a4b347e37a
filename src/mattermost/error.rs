use reqwest::StatusCode;
use std::fmt;

/// Sum type representing every possible unexceptional fail state of the
/// relay. None of these are retried; callers decide what to do next.
#[derive(Debug)]
pub enum MattermostError {
    /// The request never produced a response: connection refused, DNS,
    /// client-side timeout.
    RequestFailed(reqwest::Error),
    /// Mattermost rejected the configured credentials (401/403).
    Unauthenticated(String),
    /// Target resolution came back empty: unknown channel, unknown user, or
    /// a user outside the configured team.
    ChannelNotFound(String),
    /// Any other non-2xx, with the server-provided detail.
    Api { status: StatusCode, detail: String },
}

impl From<reqwest::Error> for MattermostError {
    fn from(e: reqwest::Error) -> Self {
        MattermostError::RequestFailed(e)
    }
}

impl fmt::Display for MattermostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            MattermostError::RequestFailed(e) => {
                format!("Mattermost API request failed: {:?}", e)
            }
            MattermostError::Unauthenticated(detail) => {
                format!("Mattermost rejected the service credentials: {}", detail)
            }
            MattermostError::ChannelNotFound(detail) => detail.clone(),
            MattermostError::Api { status, detail } => {
                format!("Mattermost API returned {}: {}", status, detail)
            }
        };

        write!(f, "{}", x)
    }
}
