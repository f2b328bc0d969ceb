//! `/repository` and `/api/v1/list`

mod common;

use axum::http::{header, StatusCode};
use common::{standard_repositories, start_depot};
use depot_server::RouterSettings;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, PartialEq, Deserialize)]
struct RepositorySummaryJson {
    name: String,
    public: bool,
}

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

#[tokio::test]
async fn test_repository_page() {
    let depot = start_depot(
        RouterSettings {
            repository_listing: true,
            ..Default::default()
        },
        standard_repositories,
    );

    let response = depot.server.get("/repository").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let html = response.text();
    assert!(html.starts_with("<pre>"));
    let libs = html.find(">libs").unwrap();
    let releases = html.find(">releases").unwrap();
    let snapshots = html.find(">snapshots").unwrap();
    assert!(libs < releases && releases < snapshots);
}

#[tokio::test]
async fn test_repository_page_disabled() {
    let depot = start_depot(RouterSettings::default(), standard_repositories);

    let response = depot.server.get("/repository").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_list() {
    let depot = start_depot(
        RouterSettings {
            repository_listing: true,
            api_enabled: true,
            verbose: false,
        },
        standard_repositories,
    );

    let response = depot.server.get("/api/v1/list").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], NO_CACHE);
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!([
            {"name": "libs", "public": true},
            {"name": "releases", "public": false},
            {"name": "snapshots", "public": false},
        ])
    );
}

#[tokio::test]
async fn test_api_list_without_listing_is_forbidden() {
    let depot = start_depot(
        RouterSettings {
            api_enabled: true,
            ..Default::default()
        },
        standard_repositories,
    );

    let response = depot.server.get("/api/v1/list").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()[header::CACHE_CONTROL], NO_CACHE);
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    assert_eq!(
        response.json::<Vec<serde_json::Value>>(),
        Vec::<serde_json::Value>::new()
    );
}

#[tokio::test]
async fn test_api_disabled() {
    let depot = start_depot(
        RouterSettings {
            repository_listing: true,
            ..Default::default()
        },
        standard_repositories,
    );

    let response = depot.server.get("/api/v1/list").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verbose_router_serves_requests() {
    let depot = start_depot(
        RouterSettings {
            repository_listing: true,
            api_enabled: true,
            verbose: true,
        },
        standard_repositories,
    );
    depot.seed("libs", "a.txt", b"a");

    let response = depot.server.get("/repository/libs/a.txt").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = depot.server.get("/api/v1/list").await;
    assert_eq!(
        response.json::<Vec<RepositorySummaryJson>>()[0],
        RepositorySummaryJson {
            name: "libs".to_string(),
            public: true,
        }
    );
}
