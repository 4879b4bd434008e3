use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::ShortenError,
    models::{ShortcodeEntry, ShortenRequest, ShortenedUrl},
    validate,
};

/// The persisted shape: shortcode to entry, serialized as one JSON object.
pub type UrlMap = HashMap<String, ShortcodeEntry>;

/// Most rows a single submission may carry.
pub const MAX_BATCH_SIZE: usize = 5;

// ── Store ──────────────────────────────────────────────────────────────────

/// Owner of the link map and its on-disk blob.
///
/// Every mutation is read-modify-write of the whole map under one write
/// lock: validate the batch against a copy, rewrite the blob, then swap the
/// copy in. There are no partial updates, and entries are never deleted
/// (expired entries stay in the blob and simply fail resolution).
pub struct UrlStore {
    path: PathBuf,
    map: RwLock<UrlMap>,
}

impl UrlStore {
    /// Open the store at `path`, reading the existing blob if there is one
    /// and starting from an empty map otherwise.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let map = match std::fs::read_to_string(&path) {
            Ok(blob) => serde_json::from_str(&blob)
                .with_context(|| format!("failed to parse link map at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UrlMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read link map at {}", path.display()));
            }
        };

        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    // ── Batch submission ───────────────────────────────────────────────────

    /// Validate and commit a batch of submissions made at `now`.
    ///
    /// Rows are checked in order against the current map plus the rows
    /// already accepted in this batch; the first failure aborts the whole
    /// submission and nothing is committed. On success every entry is
    /// inserted and the blob is rewritten once.
    pub async fn shorten_batch(
        &self,
        requests: Vec<ShortenRequest>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ShortenedUrl>, ShortenError> {
        if requests.is_empty() {
            return Err(ShortenError::EmptyBatch);
        }
        if requests.len() > MAX_BATCH_SIZE {
            return Err(ShortenError::BatchTooLarge(MAX_BATCH_SIZE));
        }

        let mut map = self.map.write().await;

        // Work on a copy so a mid-batch rejection or a failed write leaves
        // the live map untouched.
        let mut next = map.clone();
        let mut results = Vec::with_capacity(requests.len());

        for request in &requests {
            let url = request.url.trim();
            if !validate::validate_url(url) {
                tracing::warn!("invalid URL submitted: {}", url);
                return Err(ShortenError::InvalidUrl(url.to_owned()));
            }

            let shortcode = match request.shortcode.trim() {
                "" => validate::generate_shortcode(),
                custom => custom.to_owned(),
            };
            if !validate::valid_shortcode(&shortcode) {
                tracing::warn!("invalid shortcode input: {}", shortcode);
                return Err(ShortenError::InvalidShortcode(shortcode));
            }

            // `next` already holds the rows accepted earlier in this batch,
            // so intra-batch duplicates fail the same check as stored ones.
            if next.contains_key(&shortcode) {
                tracing::warn!("duplicate shortcode attempted: {}", shortcode);
                return Err(ShortenError::DuplicateShortcode(shortcode));
            }

            let entry = ShortcodeEntry {
                original_url: url.to_owned(),
                expiry: validate::expiry_from_validity(now, &request.validity),
            };

            results.push(ShortenedUrl {
                shortcode: shortcode.clone(),
                original_url: entry.original_url.clone(),
                expiry: entry.expiry,
            });
            next.insert(shortcode, entry);
        }

        self.persist(&next).await?;
        *map = next;

        for result in &results {
            tracing::info!(
                "shortened URL created: {} -> {}",
                result.shortcode,
                result.original_url
            );
        }

        Ok(results)
    }

    // ── Lookup ─────────────────────────────────────────────────────────────

    /// Resolve a shortcode at time `now`.
    ///
    /// Returns the original URL only while the entry's expiry is strictly
    /// in the future. A missing code and an expired one are the same
    /// outcome to the caller.
    pub async fn resolve(&self, shortcode: &str, now: DateTime<Utc>) -> Option<String> {
        let map = self.map.read().await;
        map.get(shortcode)
            .filter(|entry| entry.expiry > now)
            .map(|entry| entry.original_url.clone())
    }

    // ── Persistence ────────────────────────────────────────────────────────

    /// Rewrite the whole blob. Every mutation goes through here.
    async fn persist(&self, map: &UrlMap) -> Result<(), ShortenError> {
        let blob = serde_json::to_string(map)?;
        tokio::fs::write(&self.path, blob).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn request(url: &str, validity: &str, shortcode: &str) -> ShortenRequest {
        ShortenRequest {
            url: url.to_owned(),
            validity: validity.to_owned(),
            shortcode: shortcode.to_owned(),
        }
    }

    fn open_store(dir: &TempDir) -> UrlStore {
        UrlStore::open(dir.path().join("map.json")).unwrap()
    }

    #[tokio::test]
    async fn commits_a_full_batch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        let results = store
            .shorten_batch(
                vec![
                    request("https://example.com", "1", "abc123"),
                    request("https://rust-lang.org", "", "docs"),
                ],
                now,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].shortcode, "abc123");
        assert_eq!(results[0].original_url, "https://example.com");
        assert_eq!(results[0].expiry, now + Duration::minutes(1));
        assert_eq!(results[1].expiry, now + Duration::minutes(30));

        assert_eq!(
            store.resolve("abc123", now).await.as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            store.resolve("docs", now).await.as_deref(),
            Some("https://rust-lang.org")
        );
    }

    #[tokio::test]
    async fn generates_codes_for_rows_without_one() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        let results = store
            .shorten_batch(vec![request("https://example.com", "", "")], now)
            .await
            .unwrap();

        let code = &results[0].shortcode;
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(store.resolve(code, now).await.is_some());
    }

    #[tokio::test]
    async fn invalid_url_aborts_the_whole_batch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        let err = store
            .shorten_batch(
                vec![
                    request("https://example.com", "", "good1"),
                    request("not a url", "", "bad"),
                ],
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenError::InvalidUrl(_)));
        // First row must not have been committed either.
        assert_eq!(store.resolve("good1", now).await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn invalid_shortcode_aborts_the_whole_batch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        let err = store
            .shorten_batch(
                vec![
                    request("https://example.com", "", "ok"),
                    request("https://example.org", "", "not/valid"),
                ],
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenError::InvalidShortcode(_)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn duplicate_within_a_batch_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        let err = store
            .shorten_batch(
                vec![
                    request("https://example.com", "", "twice"),
                    request("https://example.org", "", "twice"),
                ],
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenError::DuplicateShortcode(code) if code == "twice"));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn duplicate_against_stored_entry_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        store
            .shorten_batch(vec![request("https://example.com", "", "taken")], now)
            .await
            .unwrap();

        let err = store
            .shorten_batch(
                vec![
                    request("https://example.net", "", "fresh"),
                    request("https://example.org", "", "taken"),
                ],
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenError::DuplicateShortcode(_)));
        assert_eq!(store.resolve("fresh", now).await, None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn empty_and_oversized_batches_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        let err = store.shorten_batch(Vec::new(), now).await.unwrap_err();
        assert!(matches!(err, ShortenError::EmptyBatch));

        let rows = (0..6)
            .map(|i| request("https://example.com", "", &format!("code{i}")))
            .collect();
        let err = store.shorten_batch(rows, now).await.unwrap_err();
        assert!(matches!(err, ShortenError::BatchTooLarge(5)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn expired_and_unknown_codes_fail_alike() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let now = Utc::now();

        store
            .shorten_batch(vec![request("https://example.com", "1", "abc123")], now)
            .await
            .unwrap();

        // Still valid just before the minute is up, gone right at it
        // (expiry must be strictly in the future).
        assert!(store
            .resolve("abc123", now + Duration::seconds(59))
            .await
            .is_some());
        assert_eq!(store.resolve("abc123", now + Duration::minutes(1)).await, None);
        assert_eq!(store.resolve("abc123", now + Duration::minutes(2)).await, None);
        assert_eq!(store.resolve("zzz999", now).await, None);

        // Expired entries are never removed from the map itself.
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn blob_uses_camel_case_keys_and_rfc3339_expiry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        let store = UrlStore::open(&path).unwrap();
        let now = Utc::now();

        store
            .shorten_batch(vec![request("https://example.com", "1", "abc123")], now)
            .await
            .unwrap();

        let blob = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();

        let entry = &value["abc123"];
        assert_eq!(entry["originalUrl"], "https://example.com");
        let expiry = entry["expiry"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(expiry).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), now + Duration::minutes(1));
    }

    #[tokio::test]
    async fn reopening_reads_the_persisted_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        let now = Utc::now();

        {
            let store = UrlStore::open(&path).unwrap();
            store
                .shorten_batch(vec![request("https://example.com", "60", "keep")], now)
                .await
                .unwrap();
        }

        let reopened = UrlStore::open(&path).unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(
            reopened.resolve("keep", now).await.as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn rejects_a_corrupt_blob() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(UrlStore::open(&path).is_err());
    }
}
