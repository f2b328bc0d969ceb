//! Request routing.
//!
//! [`RepositoryRouter`] is built once from the [`Registry`] and owns one
//! [`RepositoryHandler`] per repository name. [`RepositoryRouter::into_router`]
//! turns it into the `axum::Router` handed to the HTTP server.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::listing;
use crate::registry::Registry;
use crate::repository::RepositoryHandler;

/// Which optional endpoints are served, and how chatty the HTTP layer is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterSettings {
    /// Serve `/repository` and allow `/api/v1/list` to list repositories
    pub repository_listing: bool,
    /// Serve `/api/v1/list`
    pub api_enabled: bool,
    /// Log every request and every mapped route
    pub verbose: bool,
}

impl RouterSettings {
    /// `verbose_override` is the `--verbose` flag, which never touches `config`.
    pub fn from_config(config: &Config, verbose_override: bool) -> Self {
        Self {
            repository_listing: config.depot.repository_listing,
            api_enabled: config.depot.api_enabled,
            verbose: config.logging.verbose || verbose_override,
        }
    }
}

/// Owns the name → handler mapping for every configured repository
#[derive(Debug)]
pub struct RepositoryRouter {
    registry: Arc<Registry>,
    handlers: HashMap<String, RepositoryHandler>,
    settings: RouterSettings,
}

impl RepositoryRouter {
    pub fn new(registry: Arc<Registry>, settings: RouterSettings) -> Self {
        let mut handlers = HashMap::with_capacity(registry.len());
        for descriptor in registry.iter() {
            if settings.verbose {
                info!(
                    from = %descriptor.root.display(),
                    to = %descriptor.route(),
                    "Mapped route"
                );
            }
            handlers.insert(
                descriptor.name.clone(),
                RepositoryHandler::new(Arc::clone(descriptor)),
            );
        }

        Self {
            registry,
            handlers,
            settings,
        }
    }

    pub fn handler(&self, name: &str) -> Option<&RepositoryHandler> {
        self.handlers.get(name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> RouterSettings {
        self.settings
    }

    /// Builds the HTTP router. Upload size limits are enforced per repository,
    /// so axum's global body limit is disabled.
    pub fn into_router(self) -> Router {
        let settings = self.settings;

        let mut app = Router::new()
            .route("/repository/{repository}", any(redirect_to_repository))
            .route("/repository/{repository}/", any(dispatch_root))
            .route("/repository/{repository}/{*path}", any(dispatch));

        if settings.repository_listing {
            info!("Repository listing is enabled");
            app = app.route("/repository", get(listing::repository_page));
        }

        if settings.api_enabled {
            info!("API endpoint is enabled");
            app = app.route("/api/v1/list", get(listing::api_list));
        }

        let app = app
            .layer(DefaultBodyLimit::disable())
            .with_state(Arc::new(self));

        if settings.verbose {
            app.layer(TraceLayer::new_for_http())
        } else {
            app
        }
    }

    async fn route(&self, repository: &str, sub_path: &str, request: Request) -> Response {
        match self.handler(repository) {
            Some(handler) => handler.handle(sub_path, request).await,
            None => AppError::NotFound("not found".to_string()).into_response(),
        }
    }
}

async fn dispatch(
    State(router): State<Arc<RepositoryRouter>>,
    Path((repository, path)): Path<(String, String)>,
    request: Request,
) -> Response {
    router.route(&repository, &path, request).await
}

async fn dispatch_root(
    State(router): State<Arc<RepositoryRouter>>,
    Path(repository): Path<String>,
    request: Request,
) -> Response {
    router.route(&repository, "", request).await
}

async fn redirect_to_repository(
    State(router): State<Arc<RepositoryRouter>>,
    Path(repository): Path<String>,
) -> Response {
    match router.handler(&repository) {
        Some(handler) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, handler.descriptor().route())],
        )
            .into_response(),
        None => AppError::NotFound("not found".to_string()).into_response(),
    }
}
