#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use belltower_client::{
    MemoryStore, NotificationCache, NotificationSource, NotificationStore, RemoteBatch,
};
use belltower_core::{FetchParams, Notification, NotificationKind};
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Scripted remote: serves `remote` (or fails when it is `None`), optionally
/// holding individual fetches behind gates the test releases by hand.
#[derive(Default)]
pub struct FakeSource {
    remote: Mutex<Option<Vec<Notification>>>,
    degraded: AtomicBool,
    acks_fail: AtomicBool,
    gates: Mutex<VecDeque<oneshot::Receiver<Vec<Notification>>>>,
    fetches: AtomicUsize,
    read_all: AtomicUsize,
    pub acked: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn online(list: Vec<Notification>) -> Arc<Self> {
        let source = Self::default();
        *source.remote.lock().unwrap() = Some(list);
        Arc::new(source)
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_remote(&self, list: Option<Vec<Notification>>) {
        *self.remote.lock().unwrap() = list;
    }

    pub fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::SeqCst);
    }

    pub fn set_acks_fail(&self, fail: bool) {
        self.acks_fail.store(fail, Ordering::SeqCst);
    }

    /// The next fetch waits until the returned sender delivers its list.
    pub fn gate(&self) -> oneshot::Sender<Vec<Notification>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn read_all_count(&self) -> usize {
        self.read_all.load(Ordering::SeqCst)
    }

    fn ack(&self) -> Result<()> {
        if self.acks_fail.load(Ordering::SeqCst) {
            Err(anyhow!("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationSource for FakeSource {
    async fn fetch(&self, _params: &FetchParams) -> Result<RemoteBatch> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().pop_front();
        let list = match gate {
            Some(rx) => Some(rx.await.map_err(|_| anyhow!("gate dropped"))?),
            None => self.remote.lock().unwrap().clone(),
        };

        match list {
            Some(notifications) => Ok(RemoteBatch {
                notifications,
                unread_count: None,
                authoritative: !self.degraded.load(Ordering::SeqCst),
            }),
            None => Err(anyhow!("connection refused")),
        }
    }

    async fn acknowledge_read(&self, id: &str) -> Result<()> {
        self.acked.lock().unwrap().push(id.to_string());
        self.ack()
    }

    async fn acknowledge_read_all(&self) -> Result<()> {
        self.read_all.fetch_add(1, Ordering::SeqCst);
        self.ack()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(id.to_string());
        self.ack()
    }
}

pub fn record(id: &str, minutes: i64, read: bool, is_local: bool) -> Notification {
    Notification {
        id: id.to_string(),
        kind: NotificationKind::System,
        title: format!("title {id}"),
        message: format!("message {id}"),
        read,
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap() + Duration::minutes(minutes),
        data: Value::Null,
        is_local,
    }
}

pub fn memory_cache() -> NotificationCache {
    NotificationCache::new(Arc::new(MemoryStore::new()), "notifications")
}

pub fn store_with(source: Arc<FakeSource>, cache: NotificationCache) -> Arc<NotificationStore> {
    Arc::new(NotificationStore::new(source, cache))
}

pub fn ids(list: &[Notification]) -> Vec<String> {
    list.iter().map(|n| n.id.clone()).collect()
}

pub fn assert_unread_consistent(store: &NotificationStore) {
    let snapshot = store.snapshot();
    let derived = snapshot.notifications.iter().filter(|n| !n.read).count();
    assert_eq!(snapshot.unread_count, derived, "unread count drifted from list");
}
