// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Decoder config loader
//
// Loads the deployment's wire conventions (delimiter, comment prefix,
// payload field, event policy) from YAML, validates them, and computes a
// SHA-256 fingerprint of the raw document. Callers log it at load time;
// the decoder itself never sees it.

mod defaults;
mod error;
mod loader;
mod raw;
mod source;
mod types;

pub use defaults::{
    CONTRACT_VERSION, DEFAULT_COMMENT_PREFIX, DEFAULT_DONE_SENTINEL, DEFAULT_ERROR_EVENT,
    DEFAULT_IGNORED_EVENTS, DEFAULT_PAYLOAD_FIELD, RESERVED_FIELDS,
};
pub use error::ConfigError;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, DecoderConfig};
