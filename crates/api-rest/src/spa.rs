//! Single-page app hosting.
//!
//! Built portal assets are served from the dist directory. Any other `GET` is a client-side
//! route: it is answered with `index.html` so the browser app can resolve it.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Static file service for `dist_dir` that falls back to [`spa_fallback`].
pub fn service(dist_dir: Arc<PathBuf>) -> ServeDir<axum::routing::MethodRouter> {
    ServeDir::new(dist_dir.as_ref()).fallback(get(spa_fallback).with_state(dist_dir))
}

async fn spa_fallback(State(dist_dir): State<Arc<PathBuf>>, uri: Uri) -> Response {
    if let Some(location) = space_redirect_target(uri.path()) {
        match HeaderValue::from_bytes(location.as_bytes()) {
            Ok(value) => {
                tracing::debug!(%location, "redirecting encoded path");
                return (StatusCode::FOUND, [(header::LOCATION, value)]).into_response();
            }
            Err(e) => tracing::warn!("cannot redirect to {location:?}: {e}"),
        }
    }

    let index = dist_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!("cannot serve {}: {e}", index.display());
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

/// Decoded form of a path that contains `%20` and is otherwise in canonical encoded form.
///
/// Paths with any other unnecessary or malformed escapes are left alone.
///
/// The redirect target carries a raw space. Browsers re-encode it as `%20` before following the
/// redirect, so a browser request for such a path redirects to itself until the client gives up.
/// Only clients that send the decoded path as-is reach the portal shell.
pub fn space_redirect_target(path: &str) -> Option<String> {
    if !path.contains("%20") {
        return None;
    }
    let decoded = urlencoding::decode(path).ok()?;
    (encode_uri(&decoded) == path).then(|| decoded.into_owned())
}

/// Percent-encode everything outside the URI reserved and unreserved sets.
fn encode_uri(input: &str) -> String {
    const KEEP: &[u8] = b";,/?:@&=+$-_.!~*'()#";
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
