//! Output format selection and encoding.
//!
//! Two formats are supported: `json` (verbose, self-describing) and `toon`
//! (compact, token-oriented — see [`toon`]). The active format is resolved
//! once per invocation from the CLI flag and environment, then every result
//! document goes through the same [`Format::encode`] path.

pub mod toon;

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Primary environment variable for the output format.
pub const ENV_FORMAT: &str = "GIIL_OUTPUT_FORMAT";
/// Legacy environment variable, consulted only when [`ENV_FORMAT`] is unset.
pub const ENV_FORMAT_LEGACY: &str = "TOON_DEFAULT_FORMAT";

/// The serialization format for result documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Verbose JSON — every record carries its own field names.
    Json,
    /// Compact TOON — homogeneous batches share a single field header.
    Toon,
}

impl Format {
    /// Parse a user-supplied format token. Case-insensitive.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toon" => Some(Self::Toon),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toon => "toon",
        }
    }

    /// Encode a value in this format. Does not fail for well-formed records.
    pub fn encode<T: Serialize>(self, value: &T) -> anyhow::Result<String> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Toon => Ok(toon::encode(&serde_json::to_value(value)?)),
        }
    }

    /// Decode a document produced by [`Format::encode`] in the same format.
    pub fn decode(self, text: &str) -> Result<Value, DecodeError> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            Self::Toon => toon::decode(text),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to decode a result document.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON parsing error.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// TOON parsing error, with the offending source line.
    #[error("invalid TOON at line {line}: {message}")]
    Toon { line: usize, message: String },
}

/// Where a format value came from, for precedence and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSource {
    /// The `--format` CLI flag.
    Flag,
    /// The `GIIL_OUTPUT_FORMAT` environment variable.
    Env,
    /// The legacy `TOON_DEFAULT_FORMAT` environment variable.
    LegacyEnv,
}

impl fmt::Display for FormatSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "--format",
            Self::Env => ENV_FORMAT,
            Self::LegacyEnv => ENV_FORMAT_LEGACY,
        })
    }
}

/// A format value was supplied but not recognized.
///
/// Raised instead of falling through to a lower-precedence source, so a typo
/// surfaces immediately rather than silently changing the output format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized output format {value:?} (from {origin}): expected \"json\" or \"toon\"")]
pub struct InvalidFormatError {
    pub value: String,
    pub origin: FormatSource,
}

/// Resolve the active format from the three sources, highest precedence
/// first: CLI flag, then `GIIL_OUTPUT_FORMAT`, then `TOON_DEFAULT_FORMAT`,
/// then the built-in default of [`Format::Json`].
pub fn resolve(
    flag: Option<&str>,
    env: Option<&str>,
    legacy_env: Option<&str>,
) -> Result<Format, InvalidFormatError> {
    let sources = [
        (FormatSource::Flag, flag),
        (FormatSource::Env, env),
        (FormatSource::LegacyEnv, legacy_env),
    ];
    for (origin, value) in sources {
        if let Some(value) = value {
            return Format::parse(value).ok_or_else(|| InvalidFormatError {
                value: value.to_string(),
                origin,
            });
        }
    }
    Ok(Format::Json)
}

/// [`resolve`] over the process environment. Empty variables count as unset,
/// but a present variable that is not valid UTF-8 is an invalid value, not an
/// absent one. Lower tiers are only read once the higher ones are unset, so a
/// valid `--format` still wins before the environment is examined.
pub fn resolve_from_env(flag: Option<&str>) -> Result<Format, InvalidFormatError> {
    if flag.is_some() {
        return resolve(flag, None, None);
    }
    let env = read_env(ENV_FORMAT, FormatSource::Env)?;
    if env.is_some() {
        return resolve(None, env.as_deref(), None);
    }
    let legacy = read_env(ENV_FORMAT_LEGACY, FormatSource::LegacyEnv)?;
    resolve(None, None, legacy.as_deref())
}

fn read_env(name: &str, origin: FormatSource) -> Result<Option<String>, InvalidFormatError> {
    match std::env::var_os(name) {
        Some(raw) => env_text(raw, origin),
        None => Ok(None),
    }
}

fn env_text(
    raw: std::ffi::OsString,
    origin: FormatSource,
) -> Result<Option<String>, InvalidFormatError> {
    match raw.into_string() {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(raw) => Err(InvalidFormatError {
            value: raw.to_string_lossy().into_owned(),
            origin,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── token parsing ────────────────────────────────────────────────

    #[test]
    fn parse_recognized_tokens() {
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("toon"), Some(Format::Toon));
        assert_eq!(Format::parse("JSON"), Some(Format::Json));
        assert_eq!(Format::parse(" Toon "), Some(Format::Toon));
    }

    #[test]
    fn parse_rejects_unknown_tokens() {
        assert_eq!(Format::parse("xml"), None);
        assert_eq!(Format::parse("yaml"), None);
        assert_eq!(Format::parse(""), None);
    }

    // ── precedence ───────────────────────────────────────────────────

    #[test]
    fn flag_wins_over_both_env_vars() {
        let format = resolve(Some("json"), Some("toon"), Some("toon")).unwrap();
        assert_eq!(format, Format::Json);
    }

    #[test]
    fn env_wins_over_legacy_env() {
        let format = resolve(None, Some("json"), Some("toon")).unwrap();
        assert_eq!(format, Format::Json);
    }

    #[test]
    fn legacy_env_applies_when_others_absent() {
        let format = resolve(None, None, Some("toon")).unwrap();
        assert_eq!(format, Format::Toon);
    }

    #[test]
    fn default_is_json() {
        assert_eq!(resolve(None, None, None).unwrap(), Format::Json);
    }

    #[test]
    fn invalid_flag_fails_even_with_valid_env() {
        let error = resolve(Some("xml"), Some("toon"), Some("toon")).unwrap_err();
        assert_eq!(error.origin, FormatSource::Flag);
        assert_eq!(error.value, "xml");
    }

    #[test]
    fn invalid_env_does_not_fall_through() {
        let error = resolve(None, Some("tooon"), Some("json")).unwrap_err();
        assert_eq!(error.origin, FormatSource::Env);
    }

    #[test]
    fn invalid_legacy_env_is_reported() {
        let error = resolve(None, None, Some("csv")).unwrap_err();
        assert_eq!(error.origin, FormatSource::LegacyEnv);
        assert!(error.to_string().contains("TOON_DEFAULT_FORMAT"));
    }

    #[test]
    fn blank_env_values_count_as_unset() {
        let raw = std::ffi::OsString::from("   ");
        assert_eq!(env_text(raw, FormatSource::Env).unwrap(), None);
        let raw = std::ffi::OsString::from("toon");
        assert_eq!(
            env_text(raw, FormatSource::Env).unwrap(),
            Some("toon".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_env_value_is_invalid_not_absent() {
        use std::os::unix::ffi::OsStringExt;
        let raw = std::ffi::OsString::from_vec(vec![b't', 0xff, b'n']);
        let error = env_text(raw, FormatSource::Env).unwrap_err();
        assert_eq!(error.origin, FormatSource::Env);
        assert!(!error.value.is_empty());
    }

    // ── codec dispatch ───────────────────────────────────────────────

    #[test]
    fn json_round_trip() {
        let value = json!({"ok": true, "size": 10, "path": "/a.jpg"});
        let text = Format::Json.encode(&value).unwrap();
        assert_eq!(Format::Json.decode(&text).unwrap(), value);
    }

    #[test]
    fn toon_round_trip() {
        let value = json!({"ok": true, "size": 10, "path": "/a.jpg"});
        let text = Format::Toon.encode(&value).unwrap();
        assert_eq!(Format::Toon.decode(&text).unwrap(), value);
    }

    #[test]
    fn decode_malformed_input_fails_cleanly() {
        assert!(Format::Json.decode("{not json").is_err());
        assert!(Format::Toon.decode("plain\nlines\n").is_err());
    }

    #[test]
    fn toon_batch_is_smaller_than_json_batch() {
        let batch = json!([
            {"ok": true, "path": "/photos/a.jpg", "method": "download", "size": 48211},
            {"ok": true, "path": "/photos/b.jpg", "method": "download", "size": 51977},
        ]);
        let toon = Format::Toon.encode(&batch).unwrap();
        let json = Format::Json.encode(&batch).unwrap();
        assert!(toon.len() < json.len(), "toon {} >= json {}", toon.len(), json.len());
        // Holds against compact JSON as well, not just the pretty form.
        assert!(toon.len() < serde_json::to_string(&batch).unwrap().len());
    }
}
