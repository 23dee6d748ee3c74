//! Result documents and the stdout emitter.
//!
//! Every invocation ends here: the single [`Outcome`] is rendered in the
//! resolved format and written to stdout — failures included, so downstream
//! tools can parse either case uniformly — and the process exits with the
//! outcome's bound code.

use serde::{Deserialize, Serialize};

use crate::format::Format;
use crate::outcome::OutcomeKind;

/// Successful-fetch payload. `ok` is always `true`.
///
/// Optional fields are omitted from the output entirely when absent,
/// never emitted as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub ok: bool,
    /// Absolute path of the saved image. Opaque to this module.
    pub path: String,
    /// Acquisition strategy reported by the fetcher (e.g. `download`).
    pub method: String,
    /// Byte length of the saved file.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// EXIF capture time, ISO-8601, when the image carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
}

impl MetadataRecord {
    pub fn new(path: String, method: String, size: u64) -> Self {
        Self {
            ok: true,
            path,
            method,
            size,
            dimensions: None,
            captured_at: None,
        }
    }
}

/// Pixel dimensions of the fetched image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Failure payload. `ok` is always `false` and `error.code` is always set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorRecord {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Stable machine-readable identifier from [`OutcomeKind::code`].
    pub code: String,
    /// Human-readable detail, free-form.
    pub message: String,
}

impl ErrorRecord {
    pub fn new(kind: OutcomeKind, message: &str) -> Self {
        Self {
            ok: false,
            error: ErrorDetail {
                code: kind.code().to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// The single result of an invocation.
#[derive(Debug)]
pub enum Outcome {
    Success(MetadataRecord),
    Failure(OutcomeKind, String),
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success(_) => 0,
            Self::Failure(kind, _) => kind.exit_code(),
        }
    }
}

/// Render the outcome's document in the given format.
pub fn render(outcome: &Outcome, format: Format) -> anyhow::Result<String> {
    match outcome {
        Outcome::Success(record) => format.encode(record),
        Outcome::Failure(kind, message) => format.encode(&ErrorRecord::new(*kind, message)),
    }
}

/// Write the rendered document to stdout and return the bound exit code.
pub fn emit(outcome: &Outcome, format: Format) -> anyhow::Result<u8> {
    let document = render(outcome, format)?;
    if document.ends_with('\n') {
        print!("{document}");
    } else {
        println!("{document}");
    }
    Ok(outcome.exit_code())
}
