//! Bounded, newest-first notification log kept in client-local storage.
//!
//! The cache doubles as the offline store for locally generated
//! notifications and as the fallback data source when the remote fetch
//! fails. Storage problems never reach the caller: unreadable content loads
//! as an empty list, undecodable records are skipped one by one and failed
//! writes are logged.

use crate::storage::KeyValueStore;
use belltower_core::{DEFAULT_CACHE_LIMIT, Notification, decode_notifications};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// 对单条通知的浅合并补丁
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPatch {
    pub read: Option<bool>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl NotificationPatch {
    pub fn read() -> Self {
        Self {
            read: Some(true),
            ..Self::default()
        }
    }

    /// `id`, `type` and `createdAt` are never touched.
    pub fn apply(&self, notification: &mut Notification) {
        if let Some(read) = self.read {
            notification.read = read;
        }
        if let Some(title) = &self.title {
            notification.title = title.clone();
        }
        if let Some(message) = &self.message {
            notification.message = message.clone();
        }
        if let Some(data) = &self.data {
            notification.data = data.clone();
        }
    }
}

#[derive(Clone)]
pub struct NotificationCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    limit: usize,
}

impl NotificationCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            limit: DEFAULT_CACHE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn load(&self) -> Vec<Notification> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read notification cache");
                return Vec::new();
            }
        };

        let values: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(key = %self.key, error = %e, "notification cache is corrupt, ignoring it");
                return Vec::new();
            }
        };
        let (list, dropped) = decode_notifications(values);
        if dropped > 0 {
            warn!(key = %self.key, dropped, "skipped undecodable cached notifications");
        }
        list
    }

    /// Keeps the first `limit` records in the caller's order.
    pub fn save(&self, list: &[Notification]) {
        let kept = &list[..list.len().min(self.limit)];
        let encoded = match serde_json::to_string(kept) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to encode notification cache");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &encoded) {
            warn!(key = %self.key, error = %e, "failed to write notification cache");
        }
    }

    /// Returns whether a record with `id` was found.
    pub fn upsert_field(&self, id: &str, patch: &NotificationPatch) -> bool {
        let mut list = self.load();
        match list.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                patch.apply(notification);
                self.save(&list);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) {
        let mut list = self.load();
        list.retain(|n| n.id != id);
        self.save(&list);
    }

    pub fn mark_all_read(&self) {
        let mut list = self.load();
        for notification in &mut list {
            notification.read = true;
        }
        self.save(&list);
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "failed to clear notification cache");
        }
    }

    pub fn append(&self, notification: Notification) {
        let mut list = self.load();
        list.insert(0, notification);
        self.save(&list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError, StorageResult};
    use belltower_core::NotificationKind;
    use chrono::{Duration, TimeZone, Utc};

    fn record(id: &str, minutes: i64, read: bool) -> Notification {
        Notification {
            id: id.to_string(),
            kind: NotificationKind::System,
            title: format!("title {id}"),
            message: String::new(),
            read,
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
                + Duration::minutes(minutes),
            data: Value::Null,
            is_local: false,
        }
    }

    fn cache() -> (Arc<MemoryStore>, NotificationCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = NotificationCache::new(store.clone(), "notifications");
        (store, cache)
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn test_load_empty() {
        let (_, cache) = cache();
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_corrupt_content_loads_empty() {
        let (store, cache) = cache();
        store.set("notifications", "{not json").unwrap();
        assert!(cache.load().is_empty());

        store.set("notifications", r#"[{"title":"no id"}]"#).unwrap();
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_sparse_record_does_not_drop_the_rest() {
        let (store, cache) = cache();
        store
            .set(
                "notifications",
                r#"[
                    {"id":"local_1","title":"Call Ana","isLocal":true,"createdAt":"2024-01-15T10:00:00Z"},
                    {"id":"7","title":null},
                    {"title":"no id"}
                ]"#,
            )
            .unwrap();

        let loaded = cache.load();
        let ids: Vec<_> = loaded.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["local_1", "7"]);
        assert!(loaded[0].is_local);
        assert!(loaded[1].title.is_empty());
    }

    #[test]
    fn test_unreadable_storage_is_not_an_error() {
        let cache = NotificationCache::new(Arc::new(BrokenStore), "notifications");
        assert!(cache.load().is_empty());
        cache.save(&[record("a", 0, false)]);
        cache.append(record("b", 0, false));
        cache.clear();
    }

    #[test]
    fn test_save_truncates_to_limit_keeping_prefix() {
        let (_, cache) = cache();
        let list: Vec<_> = (0..150).map(|i| record(&i.to_string(), -i, false)).collect();

        cache.save(&list);
        let loaded = cache.load();

        assert_eq!(loaded.len(), 100);
        assert_eq!(loaded[0].id, "0");
        assert_eq!(loaded[99].id, "99");
    }

    #[test]
    fn test_append_prepends_and_respects_limit() {
        let (_, cache) = cache();
        let cache = cache.with_limit(3);
        for id in ["a", "b", "c", "d"] {
            cache.append(record(id, 0, false));
        }

        let ids: Vec<_> = cache.load().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["d", "c", "b"]);
    }

    #[test]
    fn test_upsert_field_merges_patch() {
        let (_, cache) = cache();
        cache.save(&[record("a", 0, false), record("b", 0, false)]);

        assert!(cache.upsert_field("b", &NotificationPatch::read()));
        let loaded = cache.load();
        assert!(!loaded[0].read);
        assert!(loaded[1].read);
        assert_eq!(loaded[1].title, "title b");
    }

    #[test]
    fn test_upsert_field_missing_is_noop() {
        let (_, cache) = cache();
        cache.save(&[record("a", 0, false)]);

        assert!(!cache.upsert_field("zzz", &NotificationPatch::read()));
        assert!(!cache.load()[0].read);
    }

    #[test]
    fn test_remove_and_mark_all_read() {
        let (_, cache) = cache();
        cache.save(&[record("a", 0, false), record("b", 0, false), record("c", 0, true)]);

        cache.remove("b");
        cache.mark_all_read();

        let loaded = cache.load();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|n| n.read));
    }

    #[test]
    fn test_clear_deletes_entry() {
        let (store, cache) = cache();
        cache.save(&[record("a", 0, false)]);
        cache.clear();

        assert_eq!(store.get("notifications").unwrap(), None);
        assert!(cache.load().is_empty());
    }
}
