//! The `jupyterpost` service binary: the post relay, run by the hub as a
//! managed service.
//!
//! All configuration arrives through the environment — the Mattermost
//! settings the registrar stored on the service entry, plus the connection
//! details the hub itself injects.

use dotenvy::dotenv;
use jupyterpost::config::ServiceEnv;
use jupyterpost::hub::auth::HubAuthClient;
use jupyterpost::mattermost::api::MattermostClient;
use jupyterpost::router::{self, Deps};
use std::process;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Application entrypoint. Initialises tracing, checks for environment
/// variables, binds to the hub-assigned address, and starts the server.
/// Exits non-zero when configuration or binding fails.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let has_dotenv = dotenv().is_ok();
    if !has_dotenv {
        warn!("No .env found");
    }

    let env = match ServiceEnv::from_env() {
        Ok(env) => env,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let bind = match env.bind_target() {
        Ok(bind) => bind,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server_(bind, env).await {
        error!("Failed to start server: {}", e);
        process::exit(1);
    }
}

fn deps(env: &ServiceEnv) -> Deps {
    Deps {
        mattermost: Arc::new(MattermostClient::new(
            env.mattermost_url.clone(),
            env.mattermost_token.clone(),
            env.mattermost_team.clone(),
        )),
        hub: Arc::new(HubAuthClient::new(env.hub_api_url.clone())),
        bot_signature: env.bot_signature.clone(),
    }
}

/// Initialise a server without graceful shutdown.
async fn server_(bind: (String, u16), env: ServiceEnv) -> std::io::Result<()> {
    // Giving a receiver that will never resolve.
    server(bind, env, oneshot::channel::<()>().1).await
}

/// Initialise a server with graceful shutdown via `rx`.
async fn server(
    (host, port): (String, u16),
    env: ServiceEnv,
    rx: oneshot::Receiver<()>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    let app = router::new(deps(&env), &env.service_prefix);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            rx.await.ok();
        })
        .await
}
