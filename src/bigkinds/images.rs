//! Image URL resolution for BigKinds thumbnails.
//!
//! BigKinds hands out image URLs without a file extension, while its image
//! host only serves them with one. The resolver probes the known extensions
//! with HEAD requests and keeps the first that answers with an image.

use futures::future::join_all;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Extensions tried, in order
pub const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".png", ".jpeg", ".gif", ".webp"];

#[derive(Debug, Clone)]
pub struct ImageResolver {
    http: reqwest::Client,
    host_marker: String,
}

impl ImageResolver {
    #[inline]
    pub fn new(host_marker: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            http,
            host_marker: host_marker.into(),
        })
    }

    /// Resolve a single raw image URL.
    ///
    /// URLs from other hosts, and URLs that already carry an extension, are
    /// returned unchanged.
    #[inline]
    pub async fn resolve(&self, raw_url: &str) -> Option<String> {
        if raw_url.is_empty() {
            return None;
        }

        if !raw_url.contains(&self.host_marker) || has_image_extension(raw_url) {
            return Some(raw_url.to_string());
        }

        for ext in IMAGE_EXTENSIONS {
            let candidate = format!("{}{}", raw_url, ext);
            match self.http.head(&candidate).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    let is_image = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|ct| ct.contains("image"));
                    if is_image {
                        debug!("BigKinds image resolved: {}", candidate);
                        return Some(candidate);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Image probe failed for {}: {}", candidate, e),
            }
        }

        debug!("Failed to resolve BigKinds image: {}", raw_url);
        None
    }

    /// Resolve many URLs concurrently, one result per input in input order
    #[inline]
    pub async fn resolve_batch(&self, raw_urls: &[String]) -> Vec<Option<String>> {
        join_all(raw_urls.iter().map(|url| self.resolve(url))).await
    }
}

#[inline]
pub fn has_image_extension(url: &str) -> bool {
    let lower = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
