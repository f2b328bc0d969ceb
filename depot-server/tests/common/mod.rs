//! Shared fixtures for the HTTP-level tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_test::TestServer;
use depot_server::{
    BasicCredentials, Registry, RepositoryDescriptor, RepositoryRouter, RouterSettings,
};
use tempfile::TempDir;

/// A running in-memory depot backed by a temporary directory
pub struct TestDepot {
    pub temp_dir: TempDir,
    pub server: TestServer,
}

impl TestDepot {
    /// Document root of repository `name`
    pub fn root(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes a file into a repository before the test runs.
    pub fn seed(&self, repository: &str, path: &str, contents: &[u8]) {
        let target = self.root(repository).join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, contents).unwrap();
    }
}

/// Starts a depot whose repositories are built by `repositories` from the
/// temporary directory. Each repository root is created up front.
pub fn start_depot<F>(settings: RouterSettings, repositories: F) -> TestDepot
where
    F: FnOnce(&Path) -> Vec<RepositoryDescriptor>,
{
    let temp_dir = TempDir::new().unwrap();
    let descriptors = repositories(temp_dir.path());
    for descriptor in &descriptors {
        fs::create_dir_all(&descriptor.root).unwrap();
    }

    let registry = Arc::new(Registry::from_descriptors(descriptors).unwrap());
    let app = RepositoryRouter::new(registry, settings).into_router();
    let server = TestServer::new(app).unwrap();

    TestDepot { temp_dir, server }
}

/// The repositories used across the scenario tests:
///
/// - `libs`: public, read-only
/// - `releases`: read `alice:secret`, deploy `bob:topsecret`, 1024-byte limit
/// - `snapshots`: read `carol:pw`, deployment open to readers
pub fn standard_repositories(base: &Path) -> Vec<RepositoryDescriptor> {
    vec![
        RepositoryDescriptor::new("libs", base.join("libs")),
        RepositoryDescriptor::new("releases", base.join("releases"))
            .with_read_credentials(["alice:secret"])
            .with_deploy(["bob:topsecret"])
            .with_max_artifact_size(1024),
        RepositoryDescriptor::new("snapshots", base.join("snapshots"))
            .with_read_credentials(["carol:pw"])
            .with_deploy(Vec::<String>::new()),
    ]
}

pub fn standard_depot() -> TestDepot {
    start_depot(RouterSettings::default(), standard_repositories)
}

/// `Authorization` header value for `user:password`
pub fn basic(user: &str, password: &str) -> String {
    BasicCredentials::new(user, password).to_header_value()
}
