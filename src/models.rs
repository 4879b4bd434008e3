use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored mapping, as it appears in the persisted JSON blob:
/// `{ "<shortcode>": { "originalUrl": "...", "expiry": "<RFC 3339>" } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcodeEntry {
    pub original_url: String,
    pub expiry: DateTime<Utc>,
}

/// One submitted form row, still unvalidated. `validity` and `shortcode`
/// keep their raw text because the validator owns the fallback rules.
#[derive(Debug, Clone, Default)]
pub struct ShortenRequest {
    pub url: String,
    pub validity: String,
    pub shortcode: String,
}

/// A committed batch row, echoed back on the results panel.
#[derive(Debug, Clone)]
pub struct ShortenedUrl {
    pub shortcode: String,
    pub original_url: String,
    pub expiry: DateTime<Utc>,
}
