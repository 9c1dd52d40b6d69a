// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use super::defaults::CONTRACT_VERSION;

/// Why a decoder config could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse decoder YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported contract version \"{found}\", expected \"{CONTRACT_VERSION}\"")]
    UnsupportedVersion { found: String },

    #[error("unknown {key} \"{value}\", expected {expected}")]
    UnknownKeyword {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid decoder config: {0}")]
    Validation(String),
}
