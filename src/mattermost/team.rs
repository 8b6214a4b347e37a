//! Interact with the single Mattermost team the service is scoped to.

use super::api::*;
use super::error::MattermostError;
use super::user::{UserId, Username};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

/// The team name as configured at registration time. All channel-name
/// resolution happens within this team.
#[derive(Clone)]
pub struct TeamName(pub String);

/// Format without the surrounding newtype wrapper.
impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize)]
struct TeamMeta {
    id: TeamId,
}

#[derive(Clone, Deserialize)]
pub struct TeamId(pub String);

impl MattermostClient {
    pub(crate) async fn team_id(&self) -> Result<TeamId, MattermostError> {
        let res = self
            .get(&format!("/teams/name/{}", self.team.0))
            .send()
            .await?;
        let team: TeamMeta = decode(res).await?;
        Ok(team.id)
    }

    /// DM targets must be members of the configured team; anyone else is
    /// treated as unresolvable.
    pub(crate) async fn ensure_team_member(
        &self,
        team_id: &TeamId,
        user_id: &UserId,
        username: &Username,
    ) -> Result<(), MattermostError> {
        let res = self
            .get(&format!("/teams/{}/members/{}", team_id.0, user_id.0))
            .send()
            .await?;

        match accept(res).await {
            Err(MattermostError::Api { status, .. }) if status == StatusCode::NOT_FOUND => {
                Err(MattermostError::ChannelNotFound(format!(
                    "@{} is not a member of {}",
                    username, self.team
                )))
            }
            other => other,
        }
    }
}
