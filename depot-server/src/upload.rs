//! Size-bounded streaming of artifact bodies to disk.
//!
//! The body is written to a hidden temporary file next to the target and
//! renamed into place once the last byte has been written. A failed upload
//! therefore never leaves a partial artifact behind, and a failed overwrite
//! keeps the previously deployed file intact. Uploads to the same path are not
//! serialized; whichever rename happens last wins.

use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Suffix of in-flight upload files
pub const PARTIAL_SUFFIX: &str = ".part";

/// Ways an upload can fail
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The body grew past the repository's size limit.
    #[error("artifact exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the request body failed, e.g. the client disconnected.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),
}

/// Whether a directory entry is an in-flight upload, i.e. exactly
/// `.<32 hex digits>.part`. Deployed artifacts may use any other name.
pub fn is_partial_file(name: &str) -> bool {
    name.strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(PARTIAL_SUFFIX))
        .is_some_and(|id| id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Fixed-length sibling of `target`, so long artifact names still fit.
fn partial_path(target: &Path) -> PathBuf {
    target.with_file_name(format!(".{}{}", Uuid::new_v4().simple(), PARTIAL_SUFFIX))
}

/// Streams `body` into `target`, creating missing parent directories.
///
/// Returns the number of bytes written. Fails with [`UploadError::TooLarge`]
/// as soon as more than `limit` bytes have been received.
pub async fn store_artifact<S, E>(target: &Path, body: S, limit: u64) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| UploadError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let partial = partial_path(target);
    let result = match write_bounded(&partial, body, limit).await {
        Ok(written) => fs::rename(&partial, target)
            .await
            .map(|()| written)
            .map_err(|source| UploadError::Io {
                path: target.to_path_buf(),
                source,
            }),
        Err(e) => Err(e),
    };

    if result.is_err() {
        discard(&partial).await;
    }
    result
}

async fn write_bounded<S, E>(path: &Path, body: S, limit: u64) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let io_err = |source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(path).await.map_err(io_err)?;
    let mut body = std::pin::pin!(body);
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| UploadError::Body(e.into()))?;
        written += chunk.len() as u64;
        if written > limit {
            return Err(UploadError::TooLarge { limit });
        }
        file.write_all(&chunk).await.map_err(io_err)?;
    }

    file.flush().await.map_err(io_err)?;
    debug!(path = %path.display(), bytes = written, "Upload body received");
    Ok(written)
}

async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial upload"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial upload"),
    }
}
