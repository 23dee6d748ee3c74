//! # giil
//!
//! Fetch an image from a share link, extract its metadata (dimensions and
//! EXIF capture time), and emit a structured result document with a stable
//! exit-code contract.
//!
//! Every invocation produces exactly one document on stdout — success and
//! failure alike — in the resolved output format, so downstream tools can
//! parse either case uniformly or branch on the exit code alone:
//!
//! | Outcome          | `error.code`       | Exit code |
//! |------------------|--------------------|-----------|
//! | success          | —                  | 0 |
//! | usage error      | `usage_error`      | 2 |
//! | network error    | `network_error`    | 10 |
//! | auth required    | `auth_required`    | 11 |
//! | not found        | `not_found`        | 12 |
//! | unsupported type | `unsupported_type` | 13 |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use giil::fetch::{HttpFetcher, PageFetcher};
//! use giil::format::Format;
//! use giil::outcome::OutcomeKind;
//! use giil::report::{self, MetadataRecord, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = HttpFetcher::new();
//!     let outcome = match fetcher
//!         .fetch("https://photos.example/share/abc123", Duration::from_secs(30))
//!         .await
//!     {
//!         Ok(image) => {
//!             let mut record = MetadataRecord::new(
//!                 "/tmp/abc123.jpg".to_string(),
//!                 image.method.to_string(),
//!                 image.bytes.len() as u64,
//!             );
//!             record.dimensions = giil::exif::dimensions(&image.bytes);
//!             record.captured_at = giil::exif::capture_time(&image.bytes);
//!             Outcome::Success(record)
//!         }
//!         Err(signal) => {
//!             Outcome::Failure(OutcomeKind::classify(&signal), signal.to_string())
//!         }
//!     };
//!
//!     let exit_code = report::emit(&outcome, Format::Json)?;
//!     std::process::exit(i32::from(exit_code));
//! }
//! ```
//!
//! ## Output formats
//!
//! The `json` format is verbose and self-describing; the `toon` format is a
//! compact token-oriented rendering that factors the field names of a
//! homogeneous batch into a single header (see [`format::toon`]). The active
//! format is resolved once per run: `--format` beats `GIIL_OUTPUT_FORMAT`
//! beats `TOON_DEFAULT_FORMAT` beats the `json` default, and an invalid
//! value anywhere in that chain is an error rather than a silent fallback.
//!
//! ## Modules
//!
//! - [`format`] — output format resolution, JSON/TOON encoding and decoding
//! - [`outcome`] — failure signals, classification, exit-code bindings
//! - [`report`] — result records and the stdout emitter
//! - [`fetch`] — the [`fetch::PageFetcher`] seam and the HTTP implementation
//! - [`exif`] — capture-time and dimension extraction from image bytes

pub mod exif;
pub mod fetch;
pub mod format;
pub mod outcome;
pub mod report;
