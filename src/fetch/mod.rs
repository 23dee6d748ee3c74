//! Share-link fetching.
//!
//! The [`PageFetcher`] trait is the seam between the core (format
//! resolution, classification, emission) and whatever actually pulls bytes
//! off the network. The built-in [`HttpFetcher`] handles direct image URLs
//! and share pages that expose their image through an `og:image` meta tag.

mod http;

pub use http::HttpFetcher;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::outcome::FetchFailure;

/// Raw image bytes pulled from a share link, before metadata extraction.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Content type reported by the server, lowercased, parameters stripped.
    pub content_type: Option<String>,
    /// Suggested file name derived from the image URL and content type.
    pub file_name: String,
    /// Acquisition strategy: `download` for a direct image response,
    /// `og-image` when resolved through a share page's meta tag.
    pub method: &'static str,
}

/// A strategy for turning a share link into image bytes.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short display name for logging (e.g. "http").
    fn name(&self) -> &str;

    /// Fetch the image behind `url`, failing with a classified signal.
    ///
    /// The timeout applies per request; on expiry the failure surfaces as
    /// [`FetchFailure::Timeout`].
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedImage, FetchFailure>;
}

/// Write the fetched bytes into `dir` under the suggested file name and
/// return the canonical path of the saved file.
pub fn save_image(dir: &Path, image: &FetchedImage) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&image.file_name);
    std::fs::write(&path, &image.bytes)?;
    std::fs::canonicalize(path)
}
