//! Serving artifacts and browsing directories of a readable repository.
//!
//! Files are served through `tower_http`'s `ServeFile`, which takes care of
//! content-type inference, `HEAD`, range and conditional requests. Directories
//! get an `index.html` if one exists, otherwise a plain listing.

use std::path::Path;

use askama::Template;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tokio::fs;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::upload::is_partial_file;

#[derive(Template)]
#[template(
    source = "<pre>\n{% for entry in entries %}<a href=\"{{ entry.href }}\">{{ entry.name }}</a>\n{% endfor %}</pre>\n",
    ext = "html"
)]
struct DirectoryListing {
    entries: Vec<ListingEntry>,
}

struct ListingEntry {
    name: String,
    href: String,
}

/// Percent-encodes everything outside the unreserved set (and `/`) for use in a link.
pub(crate) fn href_escape(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                escaped.push(byte as char)
            }
            _ => escaped.push_str(&format!("%{byte:02X}")),
        }
    }
    escaped
}

/// Serves `path` (already resolved inside the repository root) for a GET or HEAD request.
///
/// `sub_path` is the request path relative to the repository route and only
/// decides between file and directory handling.
pub async fn serve(path: &Path, sub_path: &str, request: Request) -> AppResult<Response> {
    let is_dir = fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    if !is_dir {
        return serve_file(path, request).await;
    }

    if !sub_path.is_empty() && !sub_path.ends_with('/') {
        let location = format!("{}/", request.uri().path());
        let location = HeaderValue::from_str(&location)
            .map_err(|_| AppError::BadRequest("bad request".to_string()))?;
        return Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response());
    }

    let index = path.join("index.html");
    if fs::metadata(&index).await.is_ok_and(|meta| meta.is_file()) {
        return serve_file(&index, request).await;
    }

    list_directory(path).await
}

async fn serve_file(path: &Path, request: Request) -> AppResult<Response> {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => {
            debug!(path = %path.display(), status = %response.status(), "Served file");
            Ok(response.map(Body::new))
        }
        Err(never) => match never {},
    }
}

async fn list_directory(path: &Path) -> AppResult<Response> {
    let internal = |e: std::io::Error| {
        AppError::Internal(format!("failed to list {}: {}", path.display(), e))
    };

    let mut entries = Vec::new();
    let mut dir = fs::read_dir(path).await.map_err(internal)?;
    while let Some(entry) = dir.next_entry().await.map_err(internal)? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if is_partial_file(&name) {
            continue;
        }
        if entry.file_type().await.map_err(internal)?.is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let listing = DirectoryListing {
        entries: entries
            .into_iter()
            .map(|name| ListingEntry {
                href: href_escape(&name),
                name,
            })
            .collect(),
    };

    let body = listing
        .render()
        .map_err(|e| AppError::Internal(format!("failed to render listing: {e}")))?;
    Ok(Html(body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_href_escape() {
        assert_eq!(href_escape("lib-1.0.jar"), "lib-1.0.jar");
        assert_eq!(href_escape("com/"), "com/");
        assert_eq!(href_escape("a b#c?.jar"), "a%20b%23c%3F.jar");
    }

    #[test]
    fn test_listing_escapes_names() {
        let listing = DirectoryListing {
            entries: vec![ListingEntry {
                name: "<script>".to_string(),
                href: href_escape("<script>"),
            }],
        };
        let html = listing.render().unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("href=\"%3Cscript%3E\""));
    }
}
