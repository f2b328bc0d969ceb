//! Repository listings: the `/repository` HTML page and `/api/v1/list`.
//!
//! Both only expose repository names and whether each one is public.

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::download::href_escape;
use crate::error::{AppError, AppResult};
use crate::registry::Registry;
use crate::router::RepositoryRouter;

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// One entry of `/api/v1/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub public: bool,
}

/// Summaries of every repository, sorted by name.
pub fn summaries(registry: &Registry) -> Vec<RepositorySummary> {
    registry
        .iter()
        .map(|repo| RepositorySummary {
            name: repo.name.clone(),
            public: repo.is_public(),
        })
        .collect()
}

#[derive(Template)]
#[template(
    source = "<pre>\n{% for repo in repositories %}<a href=\"/repository/{{ repo.href }}/\">{{ repo.name }}/</a>\n{% endfor %}</pre>\n",
    ext = "html"
)]
struct RepositoryIndex {
    repositories: Vec<IndexEntry>,
}

struct IndexEntry {
    name: String,
    href: String,
}

fn render_index(registry: &Registry) -> AppResult<String> {
    let page = RepositoryIndex {
        repositories: registry
            .iter()
            .map(|repo| IndexEntry {
                href: href_escape(&repo.name),
                name: repo.name.clone(),
            })
            .collect(),
    };
    page.render()
        .map_err(|e| AppError::Internal(format!("failed to render repository index: {e}")))
}

/// `GET /repository`
pub async fn repository_page(
    State(router): State<Arc<RepositoryRouter>>,
) -> AppResult<Html<String>> {
    render_index(router.registry()).map(Html)
}

/// `GET /api/v1/list`
pub async fn api_list(State(router): State<Arc<RepositoryRouter>>) -> Response {
    let (status, body) = if router.settings().repository_listing {
        (StatusCode::OK, summaries(router.registry()))
    } else {
        (StatusCode::FORBIDDEN, Vec::new())
    };

    (
        status,
        [
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
        .into_response()
}
