use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::{FetchedImage, PageFetcher};
use crate::outcome::FetchFailure;

/// HTTP fetcher for direct image links and og:image share pages.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn get(&self, url: &Url, timeout: Duration) -> Result<Response, FetchFailure> {
        self.client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_failure(e, url, timeout))
    }

    async fn read_image(
        &self,
        response: Response,
        url: &Url,
        method: &'static str,
    ) -> Result<FetchedImage, FetchFailure> {
        let content_type = content_type_of(&response);
        let file_name = file_name_for(url, content_type.as_deref());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Transport {
                message: format!("failed to read response body: {e}"),
            })?;
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
            file_name,
            method,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedImage, FetchFailure> {
        let page_url = Url::parse(url).map_err(|e| FetchFailure::Transport {
            message: format!("invalid URL: {e}"),
        })?;

        let response = self.get(&page_url, timeout).await?;
        let status = response.status();
        check_status(status)?;

        let content_type = content_type_of(&response);
        match content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => {
                log::debug!("Direct image response: {ct}");
                self.read_image(response, &page_url, "download").await
            }
            Some("text/html" | "application/xhtml+xml") => {
                let body = response.text().await.map_err(|e| FetchFailure::Transport {
                    message: format!("failed to read share page: {e}"),
                })?;

                if let Some(image_ref) = meta_image_url(&body) {
                    let image_url =
                        page_url
                            .join(&image_ref)
                            .map_err(|e| FetchFailure::Transport {
                                message: format!("share page has an invalid image URL: {e}"),
                            })?;
                    log::debug!("Following og:image to {image_url}");
                    let response = self.get(&image_url, timeout).await?;
                    check_status(response.status())?;

                    let ct = content_type_of(&response);
                    if !ct.as_deref().is_some_and(|c| c.starts_with("image/")) {
                        return Err(FetchFailure::UnsupportedMedia {
                            content_type: ct.unwrap_or_else(|| "unknown".to_string()),
                        });
                    }
                    return self.read_image(response, &image_url, "og-image").await;
                }

                // No embedded image: decide from the page text whether the
                // link is dead or gated before giving up on the media type.
                if page_says_gone(&body) {
                    return Err(FetchFailure::Gone {
                        status: status.as_u16(),
                    });
                }
                if page_says_sign_in(&body) {
                    return Err(FetchFailure::AuthChallenge {
                        status: status.as_u16(),
                    });
                }
                Err(FetchFailure::UnsupportedMedia {
                    content_type: "text/html".to_string(),
                })
            }
            Some(other) => Err(FetchFailure::UnsupportedMedia {
                content_type: other.to_string(),
            }),
            None => Err(FetchFailure::UnsupportedMedia {
                content_type: "unknown".to_string(),
            }),
        }
    }
}

/// Translate a transport-level reqwest error into a failure signal.
fn request_failure(error: reqwest::Error, url: &Url, timeout: Duration) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout {
            seconds: timeout.as_secs(),
        }
    } else if error.is_connect() {
        FetchFailure::Dns {
            host: url.host_str().unwrap_or_default().to_string(),
        }
    } else {
        FetchFailure::Transport {
            message: error.to_string(),
        }
    }
}

/// Map a resolved HTTP status to a failure signal, if it is one.
fn check_status(status: StatusCode) -> Result<(), FetchFailure> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchFailure::AuthChallenge {
            status: status.as_u16(),
        }),
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(FetchFailure::Gone {
            status: status.as_u16(),
        }),
        s if s.is_success() => Ok(()),
        s => Err(FetchFailure::Transport {
            message: format!("unexpected HTTP status {s}"),
        }),
    }
}

/// Lowercased content type with parameters stripped, e.g. `image/jpeg`.
fn content_type_of(response: &Response) -> Option<String> {
    let value = response.headers().get(reqwest::header::CONTENT_TYPE)?;
    let value = value.to_str().ok()?;
    let media_type = value.split(';').next()?.trim().to_ascii_lowercase();
    if media_type.is_empty() {
        None
    } else {
        Some(media_type)
    }
}

/// Find the image URL a share page advertises via its meta tags.
fn meta_image_url(html: &str) -> Option<String> {
    for property in ["og:image", "og:image:url", "twitter:image"] {
        if let Some(url) = meta_content(html, property) {
            return Some(url);
        }
    }
    None
}

fn meta_content(html: &str, property: &str) -> Option<String> {
    let mut rest = html;
    while let Some(start) = rest.find("<meta") {
        let tag_rest = &rest[start..];
        let end = tag_rest.find('>')?;
        let tag = &tag_rest[..end];
        let name = attr(tag, "property").or_else(|| attr(tag, "name"));
        if name.as_deref() == Some(property) {
            if let Some(content) = attr(tag, "content") {
                if !content.is_empty() {
                    return Some(content);
                }
            }
        }
        rest = &tag_rest[end + 1..];
    }
    None
}

/// Pull a quoted attribute value out of a single tag.
fn attr(tag: &str, name: &str) -> Option<String> {
    let mut search = tag;
    loop {
        let i = search.find(name)?;
        let preceded_ok = i == 0 || search.as_bytes()[i - 1].is_ascii_whitespace();
        let after = &search[i + name.len()..];
        let after_eq = after.trim_start();
        if preceded_ok && after_eq.starts_with('=') {
            let value = after_eq[1..].trim_start();
            let quote = value.chars().next()?;
            if quote == '"' || quote == '\'' {
                let inner = &value[1..];
                let end = inner.find(quote)?;
                return Some(inner[..end].to_string());
            }
            return None;
        }
        search = after;
    }
}

/// Share pages for deleted or expired links say so in the body while still
/// answering 200; treat the well-known phrasings as a not-found signal.
fn page_says_gone(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["link expired", "link has expired", "no longer available", "has been deleted"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn page_says_sign_in(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["sign in to continue", "log in to continue", "authentication required", "please sign in"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Derive a file name from the image URL, borrowing the extension from the
/// content type when the URL does not carry one.
fn file_name_for(url: &Url, content_type: Option<&str>) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back());

    let base: String = segment
        .unwrap_or("image")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let base = if base.trim_matches(['.', '_']).is_empty() {
        "image".to_string()
    } else {
        base
    };

    let has_extension = base
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty() && ext.len() <= 5);
    if has_extension {
        return base;
    }

    let extension = match content_type {
        Some("image/jpeg") => ".jpg",
        Some("image/png") => ".png",
        Some("image/webp") => ".webp",
        Some("image/gif") => ".gif",
        _ => ".img",
    };
    format!("{base}{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeKind;

    // ── status classification ────────────────────────────────────────

    #[test]
    fn auth_statuses_become_auth_challenge() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let failure = check_status(status).unwrap_err();
            assert!(matches!(failure, FetchFailure::AuthChallenge { .. }));
            assert_eq!(OutcomeKind::classify(&failure), OutcomeKind::AuthRequired);
        }
    }

    #[test]
    fn absence_statuses_become_gone() {
        for status in [StatusCode::NOT_FOUND, StatusCode::GONE] {
            let failure = check_status(status).unwrap_err();
            assert!(matches!(failure, FetchFailure::Gone { .. }));
            assert_eq!(OutcomeKind::classify(&failure), OutcomeKind::NotFound);
        }
    }

    #[test]
    fn success_statuses_pass() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(check_status(StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn other_statuses_become_transport_failures() {
        for status in [StatusCode::INTERNAL_SERVER_ERROR, StatusCode::BAD_GATEWAY] {
            let failure = check_status(status).unwrap_err();
            assert!(matches!(failure, FetchFailure::Transport { .. }));
            assert_eq!(OutcomeKind::classify(&failure), OutcomeKind::NetworkError);
        }
    }

    // ── meta tag extraction ──────────────────────────────────────────

    #[test]
    fn finds_og_image() {
        let html = r#"<html><head>
            <meta property="og:title" content="A photo"/>
            <meta property="og:image" content="https://cdn.example/full.jpg"/>
        </head></html>"#;
        assert_eq!(
            meta_image_url(html),
            Some("https://cdn.example/full.jpg".to_string())
        );
    }

    #[test]
    fn falls_back_to_twitter_image() {
        let html = r#"<meta name="twitter:image" content="/thumb.png">"#;
        assert_eq!(meta_image_url(html), Some("/thumb.png".to_string()));
    }

    #[test]
    fn accepts_single_quoted_attributes_in_any_order() {
        let html = r#"<meta content='https://x/a.webp' property='og:image'>"#;
        assert_eq!(meta_image_url(html), Some("https://x/a.webp".to_string()));
    }

    #[test]
    fn ignores_pages_without_image_tags() {
        assert_eq!(meta_image_url("<html><body>hello</body></html>"), None);
        assert_eq!(meta_image_url(""), None);
        assert_eq!(
            meta_image_url(r#"<meta property="og:image" content="">"#),
            None
        );
    }

    #[test]
    fn survives_truncated_tags() {
        assert_eq!(meta_image_url("<meta property=\"og:image\""), None);
    }

    // ── page-content signals ─────────────────────────────────────────

    #[test]
    fn expired_page_text_is_detected() {
        assert!(page_says_gone("<p>This link has expired.</p>"));
        assert!(page_says_gone("Sorry, this item is no longer available"));
        assert!(!page_says_gone("<p>Here is your photo</p>"));
    }

    #[test]
    fn sign_in_page_text_is_detected() {
        assert!(page_says_sign_in("<h1>Please sign in</h1>"));
        assert!(!page_says_sign_in("<h1>Your photo</h1>"));
    }

    // ── file name derivation ─────────────────────────────────────────

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn file_name_from_url_path() {
        let name = file_name_for(&url("https://cdn.example/photos/sunset.jpg"), None);
        assert_eq!(name, "sunset.jpg");
    }

    #[test]
    fn file_name_ignores_query_string() {
        let name = file_name_for(
            &url("https://cdn.example/a/b/pic.png?token=abc&size=large"),
            None,
        );
        assert_eq!(name, "pic.png");
    }

    #[test]
    fn file_name_extension_from_content_type() {
        let name = file_name_for(&url("https://x.example/share/abc123"), Some("image/jpeg"));
        assert_eq!(name, "abc123.jpg");
        let name = file_name_for(&url("https://x.example/share/abc123"), Some("image/webp"));
        assert_eq!(name, "abc123.webp");
    }

    #[test]
    fn file_name_falls_back_for_empty_paths() {
        let name = file_name_for(&url("https://x.example/"), Some("image/png"));
        assert_eq!(name, "image.png");
    }

    #[test]
    fn file_name_sanitizes_odd_characters() {
        let name = file_name_for(&url("https://x.example/we%20ird"), Some("image/png"));
        assert!(!name.contains('%') || !name.contains(' '));
        assert!(name.ends_with(".png"));
    }
}
