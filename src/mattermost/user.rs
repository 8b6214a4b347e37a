//! Look up Mattermost users: the service's own bot identity and the targets
//! of direct messages.

use super::api::*;
use super::error::MattermostError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mattermost usernames as typed by callers, without the leading `@`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Username(pub String);

/// Format without the surrounding newtype wrapper.
impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Users are referred to by their underlying ID everywhere beyond lookup.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserId(pub String);

/// The metadata we care about from any user endpoint.
#[derive(Deserialize)]
struct UserMeta {
    id: UserId,
}

impl MattermostClient {
    /// The bot account's own user id, i.e. whoever the configured token
    /// belongs to. Needed both for joining channels and for opening DMs.
    pub(crate) async fn current_user_id(&self) -> Result<UserId, MattermostError> {
        let res = self.get("/users/me").send().await?;
        let me: UserMeta = decode(res).await?;
        Ok(me.id)
    }

    /// Resolve a username to a user id. An unknown username is a resolution
    /// failure, not a server fault.
    pub(crate) async fn user_id_for(&self, username: &Username) -> Result<UserId, MattermostError> {
        let res = self
            .get(&format!("/users/username/{}", username.0))
            .send()
            .await?;

        match decode::<UserMeta>(res).await {
            Ok(user) => Ok(user.id),
            Err(MattermostError::Api { status, .. }) if status == StatusCode::NOT_FOUND => Err(
                MattermostError::ChannelNotFound(format!("@{} does not exist", username)),
            ),
            Err(e) => Err(e),
        }
    }
}
