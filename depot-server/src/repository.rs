//! Per-repository request handling.
//!
//! A [`RepositoryHandler`] owns one repository descriptor and turns a request
//! under `/repository/<name>/` into a download, an upload or a rejection.
//! Permissions are computed once per request by [`authorize`] and then
//! enforced here.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::fs;
use tracing::{debug, info};

use crate::auth::BasicCredentials;
use crate::authz::{authorize, Permissions};
use crate::download;
use crate::error::{AppError, AppResult};
use crate::paths::{is_directory_path, resolve_artifact_path};
use crate::registry::RepositoryDescriptor;
use crate::upload;

fn quote_realm(realm: &str) -> String {
    format!("Basic realm=\"{}\"", realm.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Download and upload handling for a single repository
#[derive(Debug)]
pub struct RepositoryHandler {
    descriptor: Arc<RepositoryDescriptor>,
    read_challenge: String,
    deploy_challenge: String,
}

impl RepositoryHandler {
    pub fn new(descriptor: Arc<RepositoryDescriptor>) -> Self {
        let read_challenge = quote_realm(&format!("Repository {} is protected", descriptor.name));
        let deploy_challenge = quote_realm(&format!(
            "Repository {} deployment is protected",
            descriptor.name
        ));
        Self {
            descriptor,
            read_challenge,
            deploy_challenge,
        }
    }

    pub fn descriptor(&self) -> &RepositoryDescriptor {
        &self.descriptor
    }

    /// Handles a request whose path, relative to the repository route, is `sub_path`.
    pub async fn handle(&self, sub_path: &str, request: Request) -> Response {
        let credentials = BasicCredentials::from_headers(request.headers());
        let permissions = authorize(&self.descriptor, credentials.as_ref());
        debug!(
            repository = %self.descriptor.name,
            user = credentials.as_ref().map(|c| c.username.as_str()),
            can_read = permissions.can_read,
            can_deploy = permissions.can_deploy,
            "Authorized request"
        );

        let method = request.method().clone();
        let result = if method == Method::GET || method == Method::HEAD {
            self.download(permissions, sub_path, request).await
        } else if method == Method::PUT {
            self.upload(permissions, sub_path, request).await
        } else {
            Err(AppError::BadRequest("bad request".to_string()))
        };

        result.unwrap_or_else(IntoResponse::into_response)
    }

    async fn download(
        &self,
        permissions: Permissions,
        sub_path: &str,
        request: Request,
    ) -> AppResult<Response> {
        if !permissions.can_read {
            return Err(AppError::Unauthorized {
                challenge: self.read_challenge.clone(),
            });
        }

        let path = resolve_artifact_path(&self.descriptor.root, sub_path)?;
        download::serve(&path, sub_path, request).await
    }

    async fn upload(
        &self,
        permissions: Permissions,
        sub_path: &str,
        request: Request,
    ) -> AppResult<Response> {
        let repo = &self.descriptor;

        if !repo.deploy_enabled {
            info!(repository = %repo.name, path = %sub_path, "Rejected deployment to read-only repository");
            return Err(AppError::DeployDisabled);
        }

        if !permissions.can_deploy {
            return Err(AppError::Unauthorized {
                challenge: self.deploy_challenge.clone(),
            });
        }

        let target = resolve_artifact_path(&repo.root, sub_path)?;
        if is_directory_path(sub_path)
            || fs::metadata(&target)
                .await
                .is_ok_and(|meta| meta.is_dir())
        {
            return Err(AppError::BadRequest(
                "cannot deploy to a directory".to_string(),
            ));
        }

        let declared_length = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        if declared_length.is_some_and(|length| length > repo.max_artifact_size) {
            return Err(AppError::ArtifactTooLarge {
                limit: repo.max_artifact_size,
            });
        }

        let body = request.into_body().into_data_stream();
        let written = upload::store_artifact(&target, body, repo.max_artifact_size).await?;
        debug!(
            repository = %repo.name,
            path = %target.display(),
            bytes = written,
            "File written on disk"
        );

        Ok((StatusCode::OK, "ok").into_response())
    }
}
