//! Register the poster as a hub-managed service.
//!
//! The hub's configuration is modeled as an explicit, serde-friendly value
//! rather than ambient process state: deployments load it, hand it to
//! [configure_hub] by mutable reference, and dump it back out. Registration
//! mutates only the fields it owns — the service list, the role grants, and
//! the spawner environment — and never starts a process itself.

use crate::error::ConfigurationError;
use crate::mattermost::api::has_api_version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The name the service is registered under; also the path segment users
/// reach it by.
pub const SERVICE_NAME: &str = "jupyterpost";

/// The scope that lets a role reach the service through the hub proxy.
fn access_scope() -> String {
    format!("access:services!service={}", SERVICE_NAME)
}

/// What the registrar needs to know. `port` and `bot_signature` have
/// conventional defaults; see [ServiceSettings::new].
pub struct ServiceSettings {
    pub mattermost_token: String,
    pub mattermost_url: String,
    pub mattermost_team: String,
    pub port: u16,
    pub bot_signature: String,
}

impl ServiceSettings {
    pub fn new(
        mattermost_token: impl Into<String>,
        mattermost_url: impl Into<String>,
        mattermost_team: impl Into<String>,
    ) -> Self {
        Self {
            mattermost_token: mattermost_token.into(),
            mattermost_url: mattermost_url.into(),
            mattermost_team: mattermost_team.into(),
            port: 10101,
            bot_signature: "(via jupyterpost)".into(),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let non_empty = [
            ("mattermost_token", &self.mattermost_token),
            ("mattermost_url", &self.mattermost_url),
            ("mattermost_team", &self.mattermost_team),
        ];
        for (name, value) in non_empty {
            if value.is_empty() {
                return Err(ConfigurationError::InvalidSetting {
                    name,
                    detail: "must not be empty".into(),
                });
            }
        }

        if !has_api_version(&self.mattermost_url) {
            return Err(ConfigurationError::InvalidSetting {
                name: "mattermost_url",
                detail: "must end with the REST API version path, e.g. /api/v4".into(),
            });
        }

        Ok(())
    }
}

/// One service entry in the hub's service list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub url: String,
    pub command: Vec<String>,
    pub environment: BTreeMap<String, String>,
}

/// One role in the hub's role list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,
    pub scopes: Vec<String>,
}

/// The hub's default definition for a role, used when a deployment has not
/// customized it. Only the two roles we grant access to are modeled.
fn default_role(name: &str) -> Option<RoleEntry> {
    let scopes: Vec<String> = match name {
        "user" => vec!["self".into()],
        "server" => vec!["users:activity!user".into(), "access:servers!user".into()],
        _ => return None,
    };

    Some(RoleEntry {
        name: name.to_owned(),
        scopes,
    })
}

/// The slice of hub configuration the registrar works against.
#[derive(Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// The public URL the hub proxy listens on; service URLs for users are
    /// derived from it.
    pub bind_url: String,
    pub services: Vec<ServiceEntry>,
    pub load_roles: Vec<RoleEntry>,
    /// Environment variables injected into every user server that starts
    /// after configuration.
    pub spawner_environment: BTreeMap<String, String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            // The hub's own default bind URL.
            bind_url: "http://:8000".into(),
            services: Vec::new(),
            load_roles: Vec::new(),
            spawner_environment: BTreeMap::new(),
        }
    }
}

/// Configure the hub to run the poster as an internal service.
///
/// Upserts one service entry, grants the `user` and `server` roles access to
/// it, and injects `JUPYTERPOST_URL` into the spawner environment so every
/// user server started afterwards can find the service. Idempotent: calling
/// it twice with identical arguments leaves the configuration unchanged.
pub fn configure_hub(
    config: &mut HubConfig,
    settings: &ServiceSettings,
) -> Result<(), ConfigurationError> {
    settings.validate()?;

    let entry = ServiceEntry {
        name: SERVICE_NAME.to_owned(),
        url: format!("http://127.0.0.1:{}", settings.port),
        command: vec![SERVICE_NAME.to_owned()],
        environment: BTreeMap::from([
            ("MATTERMOST_TOKEN".to_owned(), settings.mattermost_token.clone()),
            ("MATTERMOST_URL".to_owned(), settings.mattermost_url.clone()),
            ("MATTERMOST_TEAM".to_owned(), settings.mattermost_team.clone()),
            ("BOT_SIGNATURE".to_owned(), settings.bot_signature.clone()),
        ]),
    };

    match config.services.iter_mut().find(|s| s.name == SERVICE_NAME) {
        Some(existing) => *existing = entry,
        None => config.services.push(entry),
    }

    for role_name in ["user", "server"] {
        grant_access(config, role_name);
    }

    config
        .spawner_environment
        .insert("JUPYTERPOST_URL".to_owned(), service_url(config));

    Ok(())
}

/// Append the access scope to a role, cloning the hub's default definition
/// when the deployment has not loaded one of its own. Never duplicates the
/// scope.
fn grant_access(config: &mut HubConfig, role_name: &str) {
    let scope = access_scope();

    if !config.load_roles.iter().any(|r| r.name == role_name) {
        match default_role(role_name) {
            Some(default) => config.load_roles.push(default),
            None => return,
        }
    }

    if let Some(role) = config.load_roles.iter_mut().find(|r| r.name == role_name) {
        if !role.scopes.contains(&scope) {
            role.scopes.push(scope);
        }
    }
}

/// The URL users reach the service at, routed through the hub proxy.
fn service_url(config: &HubConfig) -> String {
    format!(
        "{}/services/{}",
        config.bind_url.trim_end_matches('/'),
        SERVICE_NAME
    )
}
