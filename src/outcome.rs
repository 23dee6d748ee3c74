//! Fetch failure signals and their classification into stable outcomes.
//!
//! Every way a fetch can go wrong is a [`FetchFailure`] variant, produced by
//! the fetcher from concrete transport or response evidence. The classifier
//! collapses those signals into the small, closed [`OutcomeKind`] set that
//! scripts can branch on — each kind is bound to a fixed exit code and a
//! machine-readable error code that never change.

use thiserror::Error;

/// Raw failure signal from a fetch attempt.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// No share link URL was given on the command line.
    #[error("no share link URL was provided")]
    MissingUrl,

    /// The target page demands sign-in before serving the image.
    #[error("the share link requires sign-in (HTTP {status})")]
    AuthChallenge { status: u16 },

    /// The shared resource is absent, deleted, or expired.
    #[error("the shared resource is gone or expired (HTTP {status})")]
    Gone { status: u16 },

    /// The share link resolved to something that is not an image.
    #[error("the shared resource is not an image ({content_type})")]
    UnsupportedMedia { content_type: String },

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The host could not be resolved or connected to.
    #[error("could not reach host {host:?}")]
    Dns { host: String },

    /// Any other transport-level failure.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// Local filesystem failure while saving the image.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed set of user-facing outcomes, each bound to a fixed exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Missing required input — detected before any network activity.
    UsageError,
    /// The target demands authentication.
    AuthRequired,
    /// The target resource is absent or expired.
    NotFound,
    /// The target resource is a non-image media type.
    UnsupportedType,
    /// Connection, timeout, DNS, or other transport failure.
    NetworkError,
}

impl OutcomeKind {
    /// Every outcome kind, in classification priority order.
    pub const ALL: [OutcomeKind; 5] = [
        OutcomeKind::UsageError,
        OutcomeKind::AuthRequired,
        OutcomeKind::NotFound,
        OutcomeKind::UnsupportedType,
        OutcomeKind::NetworkError,
    ];

    /// Map a raw failure signal to its outcome kind.
    ///
    /// Pure and total: content-state signals (auth, gone, unsupported type)
    /// take precedence by construction — a resolved-but-rejected response is
    /// never a network error — and everything without a more specific
    /// classification falls back to [`OutcomeKind::NetworkError`].
    pub fn classify(failure: &FetchFailure) -> Self {
        match failure {
            FetchFailure::MissingUrl => Self::UsageError,
            FetchFailure::AuthChallenge { .. } => Self::AuthRequired,
            FetchFailure::Gone { .. } => Self::NotFound,
            FetchFailure::UnsupportedMedia { .. } => Self::UnsupportedType,
            FetchFailure::Timeout { .. }
            | FetchFailure::Dns { .. }
            | FetchFailure::Transport { .. }
            | FetchFailure::Io(_) => Self::NetworkError,
        }
    }

    /// Stable machine-readable identifier, used as `error.code` on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Self::UsageError => "usage_error",
            Self::AuthRequired => "auth_required",
            Self::NotFound => "not_found",
            Self::UnsupportedType => "unsupported_type",
            Self::NetworkError => "network_error",
        }
    }

    /// Process exit code. This table is a compatibility surface.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::UsageError => 2,
            Self::AuthRequired => 11,
            Self::NotFound => 12,
            Self::UnsupportedType => 13,
            Self::NetworkError => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_failures() -> Vec<FetchFailure> {
        vec![
            FetchFailure::MissingUrl,
            FetchFailure::AuthChallenge { status: 401 },
            FetchFailure::Gone { status: 404 },
            FetchFailure::UnsupportedMedia {
                content_type: "video/mp4".to_string(),
            },
            FetchFailure::Timeout { seconds: 30 },
            FetchFailure::Dns {
                host: "photos.example".to_string(),
            },
            FetchFailure::Transport {
                message: "connection reset".to_string(),
            },
        ]
    }

    // ── classification ───────────────────────────────────────────────

    #[test]
    fn missing_url_is_usage_error() {
        assert_eq!(
            OutcomeKind::classify(&FetchFailure::MissingUrl),
            OutcomeKind::UsageError
        );
    }

    #[test]
    fn auth_challenge_is_auth_required() {
        for status in [401, 403] {
            assert_eq!(
                OutcomeKind::classify(&FetchFailure::AuthChallenge { status }),
                OutcomeKind::AuthRequired
            );
        }
    }

    #[test]
    fn gone_is_not_found() {
        for status in [404, 410] {
            assert_eq!(
                OutcomeKind::classify(&FetchFailure::Gone { status }),
                OutcomeKind::NotFound
            );
        }
    }

    #[test]
    fn non_image_media_is_unsupported_type() {
        let failure = FetchFailure::UnsupportedMedia {
            content_type: "application/pdf".to_string(),
        };
        assert_eq!(
            OutcomeKind::classify(&failure),
            OutcomeKind::UnsupportedType
        );
    }

    #[test]
    fn transport_signals_default_to_network_error() {
        for failure in [
            FetchFailure::Timeout { seconds: 5 },
            FetchFailure::Dns {
                host: "x".to_string(),
            },
            FetchFailure::Transport {
                message: "reset".to_string(),
            },
            FetchFailure::Io(std::io::Error::other("disk full")),
        ] {
            assert_eq!(OutcomeKind::classify(&failure), OutcomeKind::NetworkError);
        }
    }

    #[test]
    fn classification_is_deterministic() {
        for failure in sample_failures() {
            assert_eq!(
                OutcomeKind::classify(&failure),
                OutcomeKind::classify(&failure)
            );
        }
    }

    // ── bindings ─────────────────────────────────────────────────────

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(OutcomeKind::UsageError.exit_code(), 2);
        assert_eq!(OutcomeKind::NetworkError.exit_code(), 10);
        assert_eq!(OutcomeKind::AuthRequired.exit_code(), 11);
        assert_eq!(OutcomeKind::NotFound.exit_code(), 12);
        assert_eq!(OutcomeKind::UnsupportedType.exit_code(), 13);
    }

    #[test]
    fn wire_codes_match_contract() {
        assert_eq!(OutcomeKind::UsageError.code(), "usage_error");
        assert_eq!(OutcomeKind::NetworkError.code(), "network_error");
        assert_eq!(OutcomeKind::AuthRequired.code(), "auth_required");
        assert_eq!(OutcomeKind::NotFound.code(), "not_found");
        assert_eq!(OutcomeKind::UnsupportedType.code(), "unsupported_type");
    }

    #[test]
    fn exit_codes_are_distinct() {
        for (i, a) in OutcomeKind::ALL.iter().enumerate() {
            for b in &OutcomeKind::ALL[i + 1..] {
                assert_ne!(a.exit_code(), b.exit_code());
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
