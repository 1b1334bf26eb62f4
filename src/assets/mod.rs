//! Static resolver (Production Mode).
//!
//! # Responsibilities
//! - Serve files from each bundle's root under its mount prefix
//! - Answer unmatched paths with the bundle's entry document, status 200
//! - Pin script and stylesheet MIME types
//!
//! # Design Decisions
//! - `ServeDir` with a `ServeFile` fallback; the fallback never 404s while the
//!   entry document exists
//! - The React tree skips directory indexes so `/app/<dir>` still reaches the
//!   client-side router
//! - The landing tree serves `index.html` inside directories

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Uri},
    response::Response,
};
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::{AssetsConfig, StaticTreeConfig};
use crate::routing::{Bundle, PathPrefixMatcher};

const JAVASCRIPT: HeaderValue = HeaderValue::from_static("application/javascript; charset=utf-8");
const CSS: HeaderValue = HeaderValue::from_static("text/css; charset=utf-8");

/// One bundle of built assets.
#[derive(Debug, Clone)]
pub struct StaticTree {
    bundle: Bundle,
    matcher: PathPrefixMatcher,
    fallback_document: PathBuf,
    service: ServeDir<ServeFile>,
}

impl StaticTree {
    pub fn new(bundle: Bundle, config: &StaticTreeConfig) -> Self {
        let fallback_document = config.root.join(&config.fallback_document);
        let service = ServeDir::new(&config.root)
            .append_index_html_on_directories(bundle == Bundle::Landing)
            .fallback(ServeFile::new(&fallback_document));

        Self {
            bundle,
            matcher: PathPrefixMatcher::new(config.mount_prefix.clone()),
            fallback_document,
            service,
        }
    }

    pub fn bundle(&self) -> Bundle {
        self.bundle
    }

    pub fn fallback_document(&self) -> &Path {
        &self.fallback_document
    }

    /// Serve `request` from this tree. The path is resolved relative to the
    /// mount prefix.
    pub async fn serve(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();
        let relative = self
            .matcher
            .strip(parts.uri.path())
            .map(|p| p.into_owned())
            .unwrap_or_else(|| "/".to_string());
        let rewritten = match parts.uri.query() {
            Some(query) => format!("{}?{}", relative, query),
            None => relative.clone(),
        };
        if let Ok(uri) = rewritten.parse::<Uri>() {
            parts.uri = uri;
        }

        let response = match self
            .service
            .clone()
            .oneshot(Request::from_parts(parts, body))
            .await
        {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let mut response = response.map(Body::new);
        pin_mime_type(&relative, &mut response);
        response
    }
}

/// Override the inferred content type of scripts and stylesheets. The
/// fallback document keeps its HTML type even when requested as `x.js`.
fn pin_mime_type(path: &str, response: &mut Response) {
    if !response.status().is_success() || is_html(response) {
        return;
    }
    if let Some(pinned) = mime_override(path) {
        response.headers_mut().insert(header::CONTENT_TYPE, pinned);
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

fn mime_override(path: &str) -> Option<HeaderValue> {
    let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "js" | "mjs" => Some(JAVASCRIPT),
        "css" => Some(CSS),
        _ => None,
    }
}

/// The React and landing trees.
#[derive(Debug, Clone)]
pub struct StaticTrees {
    pub react: StaticTree,
    pub landing: StaticTree,
}

impl StaticTrees {
    pub fn from_config(config: &AssetsConfig) -> Self {
        let trees = Self {
            react: StaticTree::new(Bundle::React, &config.react),
            landing: StaticTree::new(Bundle::Landing, &config.landing),
        };
        for tree in [&trees.react, &trees.landing] {
            if !tree.fallback_document().is_file() {
                tracing::warn!(
                    bundle = tree.bundle().as_str(),
                    document = %tree.fallback_document().display(),
                    "Fallback document is missing; unmatched paths will return 404"
                );
            }
        }
        trees
    }

    pub fn tree(&self, bundle: Bundle) -> &StaticTree {
        match bundle {
            Bundle::React => &self.react,
            Bundle::Landing => &self.landing,
        }
    }

    pub async fn serve(&self, bundle: Bundle, request: Request<Body>) -> Response {
        self.tree(bundle).serve(request).await
    }
}
