// Raw YAML deserialization types (internal)
//
// Kept apart from `DecoderConfig` so that keyword strings can be
// validated with useful messages, and so `null` can be told apart from
// an absent key (`error_event: null` disables the feature, a missing key
// keeps the default).

use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub sse_pump: String,
    pub framing: Option<String>,
    pub delimiter: Option<RawDelimiter>,
    pub comment_prefix: Option<String>,
    pub payload_field: Option<String>,
    pub payload_format: Option<String>,
    #[serde(default)]
    pub extra_fields: Vec<String>,
    pub ignored_events: Option<Vec<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub error_event: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub done_sentinel: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub max_frame_bytes: Option<Option<usize>>,
}

/// Either a keyword (`line_break`, `lf`, `crlf`) or `{ literal: "..." }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawDelimiter {
    Keyword(String),
    Literal { literal: String },
}

/// Present-but-null becomes `Some(None)`; absent stays `None` via `default`.
fn explicit<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
