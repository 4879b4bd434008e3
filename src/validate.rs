use chrono::{DateTime, Duration, Utc};
use url::Url;
use uuid::Uuid;

/// Length of codes we generate when the user supplies none.
pub const GENERATED_CODE_LEN: usize = 6;

/// Longest shortcode a user may supply.
pub const MAX_SHORTCODE_LEN: usize = 20;

/// Minutes an entry stays valid when the validity field is blank,
/// unparseable, or zero.
pub const DEFAULT_VALIDITY_MINUTES: i64 = 30;

/// Returns `true` iff `url` parses as a syntactically valid absolute URL.
/// Relative references fail, which is what blocks things like bare
/// "example.com" from entering the map.
pub fn validate_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Generate a shortcode from a random UUIDv4: the first six characters of
/// its hex form. Always lowercase hex, so always alphanumeric.
pub fn generate_shortcode() -> String {
    Uuid::new_v4().simple().to_string()[..GENERATED_CODE_LEN].to_owned()
}

/// Acceptance rule for user-supplied codes: 1 to 20 ASCII alphanumerics.
pub fn valid_shortcode(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_SHORTCODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Compute the absolute expiry for a submission made at `now`.
///
/// The validity field is free text from the form. It is parsed as a whole
/// number of minutes; blank, unparseable, and zero all fall back to the
/// 30-minute default. A value large enough to overflow the timestamp also
/// falls back rather than panicking.
pub fn expiry_from_validity(now: DateTime<Utc>, validity: &str) -> DateTime<Utc> {
    let minutes = validity
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|m| *m != 0)
        .unwrap_or(DEFAULT_VALIDITY_MINUTES);

    Duration::try_minutes(minutes)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or_else(|| now + Duration::minutes(DEFAULT_VALIDITY_MINUTES))
}
