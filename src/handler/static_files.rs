//! Image file serving
//!
//! Serves stored flag images read-only from the image directory with
//! `ETag` validation and HEAD support.

use std::path::{Path, PathBuf};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use tokio::fs;

use crate::http::{self, cache, mime};
use crate::logger;

/// Per-request inputs for serving a stored file
pub struct FileRequest<'a> {
    /// Path relative to the image route, still percent-encoded
    pub relative_path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Serve a file from `dir`, or 404 when it is missing or outside the directory
pub async fn serve_image(dir: &Path, req: &FileRequest<'_>) -> Response<Full<Bytes>> {
    let Some(file_path) = resolve(dir, req.relative_path) else {
        return http::build_404_response();
    };

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_404_response();
        }
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(req.if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    http::response::build_file_response(Bytes::from(content), content_type, &etag, req.is_head)
}

/// Map a request path onto a regular file inside `dir`
fn resolve(dir: &Path, relative_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(relative_path).decode_utf8().ok()?;
    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let dir_canonical = match dir.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            // No uploads yet
            logger::log_debug(&format!(
                "Image directory '{}' not available: {e}",
                dir.display()
            ));
            return None;
        }
    };

    // File not found is common (404), no need to log at warning level
    let file_canonical = dir.join(relative).canonicalize().ok()?;
    if !file_canonical.starts_with(&dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative_path} -> {}",
            file_canonical.display()
        ));
        return None;
    }

    file_canonical.is_file().then_some(file_canonical)
}
