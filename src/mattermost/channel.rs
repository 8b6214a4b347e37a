//! Resolve a caller-supplied target to a Mattermost channel id, joining or
//! creating the channel where needed.

use super::api::*;
use super::error::MattermostError;
use super::user::{UserId, Username};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel names as are visible in the Mattermost UI.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChannelName(pub String);

/// Format without the surrounding newtype wrapper.
impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Because channel names can change, channels are referred to by their
/// underlying ID on every call past resolution.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// Where a post should land, parsed from the raw `channel` string a caller
/// supplied. `@name` is a direct message to that user; anything else is a
/// channel name within the configured team.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChannelTarget {
    Named(ChannelName),
    Direct(Username),
}

impl ChannelTarget {
    /// Parse a raw target string. Empty strings (and a bare `@`) do not
    /// name anything and parse to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.strip_prefix('@') {
            Some("") => None,
            Some(username) => Some(ChannelTarget::Direct(Username(username.to_owned()))),
            None if raw.is_empty() => None,
            None => Some(ChannelTarget::Named(ChannelName(raw.to_owned()))),
        }
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::Named(name) => write!(f, "{}", name),
            ChannelTarget::Direct(username) => write!(f, "@{}", username),
        }
    }
}

/// The metadata we care about from any channel endpoint.
#[derive(Deserialize)]
struct ChannelMeta {
    id: ChannelId,
}

/// <https://api.mattermost.com/#tag/channels/operation/AddChannelMember>
#[derive(Serialize)]
struct JoinRequest<'a> {
    user_id: &'a UserId,
}

impl MattermostClient {
    /// Resolve a target to the channel id posts should be created in.
    ///
    /// Direct targets go through user lookup, a team-membership check, and
    /// DM-channel lookup/creation; named targets go through channel-by-name
    /// lookup within the configured team, followed by a join so the bot is
    /// allowed to post. The two paths never overlap.
    pub(crate) async fn resolve_channel(
        &self,
        me: &UserId,
        target: &ChannelTarget,
    ) -> Result<ChannelId, MattermostError> {
        match target {
            ChannelTarget::Direct(username) => {
                let other = self.user_id_for(username).await?;
                let team_id = self.team_id().await?;
                self.ensure_team_member(&team_id, &other, username).await?;
                self.direct_channel(me, &other).await
            }
            ChannelTarget::Named(name) => {
                let channel_id = self.channel_by_name(name).await?;
                self.join_channel(&channel_id, me).await?;
                Ok(channel_id)
            }
        }
    }

    async fn channel_by_name(&self, name: &ChannelName) -> Result<ChannelId, MattermostError> {
        let res = self
            .get(&format!("/teams/name/{}/channels/name/{}", self.team.0, name.0))
            .send()
            .await?;

        match decode::<ChannelMeta>(res).await {
            Ok(channel) => Ok(channel.id),
            Err(MattermostError::Api { status, .. }) if status == StatusCode::NOT_FOUND => {
                Err(MattermostError::ChannelNotFound(format!(
                    "{} does not exist or is private",
                    name
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Look up, or have the server create, the DM channel between the bot
    /// and `other`. The endpoint is idempotent on Mattermost's side.
    async fn direct_channel(
        &self,
        me: &UserId,
        other: &UserId,
    ) -> Result<ChannelId, MattermostError> {
        let res = self
            .post("/channels/direct")
            .json(&[me, other])
            .send()
            .await?;
        let channel: ChannelMeta = decode(res).await?;
        Ok(channel.id)
    }

    /// Join a channel before posting in it. Idempotent on Mattermost's side;
    /// joining a channel the bot is already in succeeds.
    async fn join_channel(
        &self,
        channel_id: &ChannelId,
        me: &UserId,
    ) -> Result<(), MattermostError> {
        let res = self
            .post(&format!("/channels/{}/members", channel_id.0))
            .json(&JoinRequest { user_id: me })
            .send()
            .await?;
        accept(res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;

    #[test]
    fn test_parse_rejects_empty_targets() {
        assert_eq!(ChannelTarget::parse(""), None);
        assert_eq!(ChannelTarget::parse("@"), None);
    }

    #[test]
    fn test_parse_examples() {
        assert_eq!(
            ChannelTarget::parse("town-square"),
            Some(ChannelTarget::Named(ChannelName("town-square".into())))
        );
        assert_eq!(
            ChannelTarget::parse("@alice"),
            Some(ChannelTarget::Direct(Username("alice".into())))
        );
    }

    quickcheck::quickcheck! {
        fn prop_at_prefix_is_always_direct(name: String) -> TestResult {
            if name.is_empty() {
                return TestResult::discard();
            }

            let target = ChannelTarget::parse(&format!("@{}", name));
            TestResult::from_bool(matches!(
                target,
                Some(ChannelTarget::Direct(Username(u))) if u == name
            ))
        }

        fn prop_plain_name_is_never_direct(name: String) -> TestResult {
            if name.is_empty() || name.starts_with('@') {
                return TestResult::discard();
            }

            let target = ChannelTarget::parse(&name);
            TestResult::from_bool(matches!(
                target,
                Some(ChannelTarget::Named(ChannelName(n))) if n == name
            ))
        }
    }
}
