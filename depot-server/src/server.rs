//! HTTP server lifecycle: bind, serve, shut down gracefully on SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::config::{Config, ConfigError};
use crate::registry::Registry;
use crate::router::{RepositoryRouter, RouterSettings};

/// How long in-flight requests get to finish after a shutdown signal
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Builds the complete application router from configuration.
///
/// `verbose_override` forces request logging on without changing `config`.
pub fn build_app(config: &Config, verbose_override: bool) -> Result<Router, ConfigError> {
    let registry = Arc::new(Registry::from_config(config)?);
    info!(repositories = registry.len(), "Loaded repositories");
    let settings = RouterSettings::from_config(config, verbose_override);
    Ok(RepositoryRouter::new(registry, settings).into_router())
}

async fn bind(config: &Config) -> Result<TcpListener> {
    let address = config.socket_addr();
    match TcpListener::bind(&address).await {
        Ok(listener) => Ok(listener),
        Err(e) => match config.ipv4_fallback_addr() {
            Some(fallback) => {
                warn!(address = %address, error = %e, "Falling back to IPv4");
                TcpListener::bind(&fallback)
                    .await
                    .with_context(|| format!("failed to bind {fallback}"))
            }
            None => Err(e).with_context(|| format!("failed to bind {address}")),
        },
    }
}

/// Run the depot until a shutdown signal arrives.
///
/// When `save_config_changes` is set, the configuration is written back to
/// `config_path` once the server has stopped, exactly as it was loaded.
pub async fn run_server(
    config: Config,
    config_path: PathBuf,
    verbose_override: bool,
) -> Result<()> {
    let app = build_app(&config, verbose_override).context("invalid configuration")?;

    let listener = bind(&config).await?;
    match listener.local_addr() {
        Ok(address) => info!(address = %address, "Listening"),
        Err(e) => warn!(error = %e, "Listening on an unknown address"),
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    let early_exit = tokio::select! {
        () = shutdown_signal() => None,
        result = &mut server => Some(result),
    };

    match early_exit {
        Some(result) => {
            result
                .context("server task failed")?
                .context("server error")?;
        }
        None => {
            info!("Shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server).await {
                Ok(Ok(Ok(()))) => info!("Shutdown done"),
                Ok(Ok(Err(e))) => error!(error = %e, "Server failed while shutting down"),
                Ok(Err(e)) => error!(error = %e, "Server task failed while shutting down"),
                Err(_) => {
                    warn!(timeout = ?SHUTDOWN_TIMEOUT, "Shutdown timed out");
                    server.abort();
                }
            }
        }
    }

    if config.depot.save_config_changes {
        match config.save(&config_path) {
            Ok(()) => info!(path = %config_path.display(), "Configuration saved"),
            Err(e) => error!(error = %e, "Failed to save configuration"),
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;

    #[test]
    fn test_build_app_rejects_bad_repository_name() {
        let mut config = Config::default();
        config.repositories.insert(
            "a/b".to_string(),
            RepositoryConfig {
                path: "/srv/ab".into(),
                ..Default::default()
            },
        );

        assert!(matches!(
            build_app(&config, false),
            Err(ConfigError::InvalidRepositoryName { .. })
        ));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = Config::from_toml("[depot]\nlisten_address = \"127.0.0.1:0\"\n").unwrap();
        let listener = bind(&config).await.unwrap();
        assert!(listener.local_addr().unwrap().port() > 0);
    }

    #[test]
    fn test_build_app_with_no_repositories() {
        assert!(build_app(&Config::default(), false).is_ok());
    }
}
