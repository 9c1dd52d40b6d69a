// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use crate::stream::{Delimiter, FramingMode, PayloadFormat};

use super::defaults::{CONTRACT_VERSION, RESERVED_FIELDS};
use super::error::ConfigError;
use super::raw;
use super::source::ConfigSource;
use super::types::{Config, DecoderConfig};

/// Load and validate decoder config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 fingerprint
/// 3. Parse YAML into raw deserialization types
/// 4. Validate the contract version
/// 5. Resolve keywords and apply defaults for absent keys
/// 6. Validate field conventions
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let fingerprint = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.sse_pump != CONTRACT_VERSION {
        return Err(ConfigError::UnsupportedVersion { found: raw.sse_pump });
    }

    let defaults = DecoderConfig::default();
    let decoder = DecoderConfig {
        framing: parse_framing(raw.framing.as_deref())?,
        delimiter: build_delimiter(raw.delimiter)?,
        comment_prefix: raw.comment_prefix.unwrap_or(defaults.comment_prefix),
        payload_field: raw.payload_field.unwrap_or(defaults.payload_field),
        payload_format: parse_payload_format(raw.payload_format.as_deref())?,
        extra_fields: raw.extra_fields,
        ignored_events: raw.ignored_events.unwrap_or(defaults.ignored_events),
        error_event: raw.error_event.unwrap_or(defaults.error_event),
        done_sentinel: raw.done_sentinel.unwrap_or(defaults.done_sentinel),
        max_frame_bytes: raw.max_frame_bytes.unwrap_or(defaults.max_frame_bytes),
    };

    validate(&decoder)?;

    Ok(Config {
        decoder,
        fingerprint,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn parse_framing(raw: Option<&str>) -> Result<FramingMode, ConfigError> {
    match raw {
        Some("sse") | None => Ok(FramingMode::Sse),
        Some("json_lines") => Ok(FramingMode::JsonLines),
        Some(other) => Err(ConfigError::UnknownKeyword {
            key: "framing",
            value: other.to_string(),
            expected: "sse or json_lines",
        }),
    }
}

fn parse_payload_format(raw: Option<&str>) -> Result<PayloadFormat, ConfigError> {
    match raw {
        Some("json") | None => Ok(PayloadFormat::Json),
        Some("text") => Ok(PayloadFormat::Text),
        Some(other) => Err(ConfigError::UnknownKeyword {
            key: "payload_format",
            value: other.to_string(),
            expected: "json or text",
        }),
    }
}

fn build_delimiter(raw: Option<raw::RawDelimiter>) -> Result<Delimiter, ConfigError> {
    match raw {
        None => Ok(Delimiter::LineBreak),
        Some(raw::RawDelimiter::Keyword(keyword)) => match keyword.as_str() {
            "line_break" => Ok(Delimiter::LineBreak),
            "lf" => Ok(Delimiter::lf()),
            "crlf" => Ok(Delimiter::crlf()),
            other => Err(ConfigError::UnknownKeyword {
                key: "delimiter",
                value: other.to_string(),
                expected: "line_break, lf, crlf or { literal: ... }",
            }),
        },
        Some(raw::RawDelimiter::Literal { literal }) => {
            if literal.is_empty() {
                return Err(ConfigError::Validation(
                    "delimiter literal must not be empty".to_string(),
                ));
            }
            Ok(Delimiter::Literal(literal.into_bytes()))
        }
    }
}

fn validate(config: &DecoderConfig) -> Result<(), ConfigError> {
    if config.comment_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "comment_prefix must not be empty".to_string(),
        ));
    }

    let field = config.payload_field.as_str();
    if field.is_empty() {
        return Err(ConfigError::Validation(
            "payload_field must not be empty".to_string(),
        ));
    }
    if field.contains(':') {
        return Err(ConfigError::Validation(format!(
            "payload_field \"{field}\" must not contain ':'"
        )));
    }
    if RESERVED_FIELDS.contains(&field) {
        return Err(ConfigError::Validation(format!(
            "payload_field \"{field}\" collides with a reserved SSE field"
        )));
    }
    if config.extra_fields.iter().any(|f| f == field) {
        return Err(ConfigError::Validation(format!(
            "payload_field \"{field}\" is also listed in extra_fields"
        )));
    }

    if config.max_frame_bytes == Some(0) {
        return Err(ConfigError::Validation(
            "max_frame_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
