//! Persistent metadata cache
//!
//! Canonical URL -> [`MetadataRecord`], stored as one JSON object. Entries are
//! permanent: a URL that is in the cache is never fetched again, whether the
//! stored record is a success or an error. Refreshing an entry means removing
//! it first. Entries a run does not replace are written back exactly as they
//! were read.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::models::{AppResult, EnrichError, MetadataRecord};
use crate::utils::file_utils::write_json_atomic;

/// A record plus the JSON it is persisted as
#[derive(Debug, Clone, PartialEq)]
struct CacheEntry {
    record: MetadataRecord,
    stored: Value,
}

impl CacheEntry {
    fn from_record(record: MetadataRecord) -> AppResult<Self> {
        let stored = serde_json::to_value(&record)?;
        Ok(Self { record, stored })
    }
}

/// In-memory view of the cache file. Keys are kept sorted so the file diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache file. A missing file is an empty cache; a file that is
    /// not an object of valid records is fatal.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No cache at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(err) => return Err(err.into()),
        };

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            EnrichError::InvalidCache(format!("{} is not valid JSON: {}", path.display(), e))
        })?;

        let cache = Self::from_value(value)?;
        debug!("Loaded {} cache entries from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Validate a parsed cache document.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let object = match value {
            Value::Object(object) => object,
            _ => {
                return Err(EnrichError::InvalidCache(
                    "cache must be a JSON object mapping URL to metadata".to_string(),
                ))
            }
        };

        let mut cache = Self::new();
        for (url, raw) in object {
            if url.is_empty() {
                warn!("Dropping cache entry with an empty URL key");
                continue;
            }
            let record: MetadataRecord = serde_json::from_value(raw.clone()).map_err(|e| {
                EnrichError::InvalidCache(format!("entry '{}': {}", url, e))
            })?;
            cache.entries.insert(url, CacheEntry { record, stored: raw });
        }
        Ok(cache)
    }

    /// Write the cache back, replacing the previous file atomically.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let stored: BTreeMap<&str, &Value> = self
            .entries
            .iter()
            .map(|(url, entry)| (url.as_str(), &entry.stored))
            .collect();
        write_json_atomic(path, &stored)?;
        debug!("Saved {} cache entries to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, url: &str) -> Option<&MetadataRecord> {
        self.entries.get(url).map(|entry| &entry.record)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Store `record` under `url`, replacing any previous record.
    /// The empty key is refused; returns whether the record was stored.
    pub fn put(&mut self, url: &str, record: MetadataRecord) -> bool {
        if url.is_empty() {
            warn!("Refusing to cache metadata under an empty URL");
            return false;
        }
        match CacheEntry::from_record(record) {
            Ok(entry) => {
                self.entries.insert(url.to_string(), entry);
                true
            }
            Err(err) => {
                warn!("Could not encode metadata for {}: {}", url, err);
                false
            }
        }
    }

    /// Remove an entry so a later run fetches it again.
    pub fn invalidate(&mut self, url: &str) -> Option<MetadataRecord> {
        self.entries.remove(url).map(|entry| entry.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataRecord)> {
        self.entries
            .iter()
            .map(|(url, entry)| (url.as_str(), &entry.record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{FetchedMetadata, MetadataSource};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    fn record(title: &str) -> MetadataRecord {
        MetadataRecord::fetched(
            FetchedMetadata {
                title: Some(title.to_string()),
                thumbnail: Some(format!("https://img.example/{}.jpg", title)),
                source: MetadataSource::YoutubeOembed,
            },
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::load(&dir.path().join("video_info.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("video_info.json");

        let mut cache = MetadataCache::new();
        cache.put("https://b.example/2", record("two"));
        cache.put("https://a.example/1", record("one"));
        cache.put(
            "https://c.example/3",
            MetadataRecord::failed("boom", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        );
        cache.save(&path).unwrap();

        let loaded = MetadataCache::load(&path).unwrap();
        assert_eq!(loaded, cache);

        let text = fs::read_to_string(&path).unwrap();
        let a = text.find("https://a.example/1").unwrap();
        let b = text.find("https://b.example/2").unwrap();
        assert!(a < b, "keys should be written in sorted order");
    }

    #[test]
    fn test_non_object_cache_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("video_info.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = MetadataCache::load(&path).unwrap_err();
        assert!(matches!(err, EnrichError::InvalidCache(_)));
    }

    #[test]
    fn test_truncated_cache_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("video_info.json");
        fs::write(&path, "{\"https://a.example/1\": {").unwrap();

        assert!(matches!(
            MetadataCache::load(&path),
            Err(EnrichError::InvalidCache(_))
        ));
    }

    #[test]
    fn test_bad_record_is_fatal() {
        let err = MetadataCache::from_value(json!({
            "https://a.example/1": {"title": "x"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("https://a.example/1"));
    }

    #[test]
    fn test_empty_key_never_stored() {
        let mut cache = MetadataCache::from_value(json!({
            "": {"fetched_at": "2024-01-01T00:00:00Z", "source": "unknown"},
            "https://a.example/1": {"fetched_at": "2024-01-01T00:00:00Z", "source": "unknown"}
        }))
        .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(""));

        assert!(!cache.put("", record("nope")));
        assert!(!cache.contains(""));
    }

    #[test]
    fn test_untouched_entries_written_back_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("video_info.json");
        let hand_checked = json!({
            "title": "t",
            "source": "twitch_og",
            "fetched_at": "2023-01-01T00:00:00+00:00",
            "note": "hand checked"
        });
        let unavailable = json!({"source": "youtube_unavailable", "title": null});
        fs::write(
            &path,
            json!({
                "https://www.twitch.tv/videos/1": hand_checked.clone(),
                "https://www.youtube.com/watch?v=gone": unavailable.clone()
            })
            .to_string(),
        )
        .unwrap();

        let mut cache = MetadataCache::load(&path).unwrap();
        assert_eq!(
            cache.get("https://www.youtube.com/watch?v=gone").unwrap().source,
            Some(MetadataSource::YoutubeUnavailable)
        );
        cache.put("https://a.example/1", record("new"));
        cache.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let saved: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(saved["https://www.twitch.tv/videos/1"], hand_checked);
        assert_eq!(saved["https://www.youtube.com/watch?v=gone"], unavailable);
        assert!(text.contains("2023-01-01T00:00:00+00:00"));

        // Original key order inside an untouched entry is kept too.
        let entry = saved["https://www.twitch.tv/videos/1"].as_object().unwrap();
        let keys: Vec<&String> = entry.keys().collect();
        assert_eq!(keys, vec!["title", "source", "fetched_at", "note"]);
    }

    #[test]
    fn test_put_overwrites_and_invalidate_removes() {
        let mut cache = MetadataCache::new();
        cache.put("https://a.example/1", record("old"));
        cache.put("https://a.example/1", record("new"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("https://a.example/1").unwrap().title_or_empty(), "new");

        assert!(cache.invalidate("https://a.example/1").is_some());
        assert!(cache.get("https://a.example/1").is_none());
    }
}
