//! The relay process's configuration, read once at startup from the
//! environment the hub (or an operator's `.env`) provides.

use crate::error::ConfigurationError;
use crate::mattermost::api::has_api_version;
use crate::mattermost::auth::MattermostToken;
use crate::mattermost::team::TeamName;
use std::env;
use url::Url;

/// Fallback when `JUPYTERHUB_SERVICE_URL` carries no explicit port.
const DEFAULT_PORT: u16 = 10101;

/// Everything the binary needs before it can serve.
pub struct ServiceEnv {
    pub mattermost_url: String,
    pub mattermost_token: MattermostToken,
    pub mattermost_team: TeamName,
    pub bot_signature: String,
    pub hub_api_url: String,
    pub service_url: Url,
    pub service_prefix: String,
}

impl ServiceEnv {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// The actual construction, parameterized over the variable source so
    /// tests don't have to mutate process-global state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let require = |name: &'static str| -> Result<String, ConfigurationError> {
            match lookup(name) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigurationError::MissingEnv(name)),
            }
        };

        let mattermost_url = require("MATTERMOST_URL")?;
        if !has_api_version(&mattermost_url) {
            return Err(ConfigurationError::InvalidEnv {
                name: "MATTERMOST_URL",
                detail: "must end with the REST API version path, e.g. /api/v4".into(),
            });
        }

        let raw_service_url = require("JUPYTERHUB_SERVICE_URL")?;
        let service_url =
            Url::parse(&raw_service_url).map_err(|e| ConfigurationError::InvalidEnv {
                name: "JUPYTERHUB_SERVICE_URL",
                detail: e.to_string(),
            })?;

        Ok(Self {
            mattermost_url,
            mattermost_token: MattermostToken(require("MATTERMOST_TOKEN")?),
            mattermost_team: TeamName(require("MATTERMOST_TEAM")?),
            bot_signature: lookup("BOT_SIGNATURE")
                .unwrap_or_else(|| "(via jupyterpost)".to_owned()),
            hub_api_url: require("JUPYTERHUB_API_URL")?,
            service_url,
            service_prefix: lookup("JUPYTERHUB_SERVICE_PREFIX").unwrap_or_else(|| "/".to_owned()),
        })
    }

    /// The host and port to bind, from the service URL the hub assigned.
    pub fn bind_target(&self) -> Result<(String, u16), ConfigurationError> {
        let host = self
            .service_url
            .host_str()
            .ok_or(ConfigurationError::InvalidEnv {
                name: "JUPYTERHUB_SERVICE_URL",
                detail: "has no host".into(),
            })?;

        Ok((
            host.to_owned(),
            self.service_url.port().unwrap_or(DEFAULT_PORT),
        ))
    }
}
