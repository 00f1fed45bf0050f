//! Authoritative in-memory notification state.
//!
//! Consumers read [`StoreSnapshot`]s, either on demand or through a `watch`
//! subscription. Mutations are optimistic: the local change is applied first
//! and the remote acknowledgement is awaited afterwards, its failure reported
//! in the returned [`MutationOutcome`] but never rolled back. The next
//! successful refresh reconciles any divergence.

use crate::cache::{NotificationCache, NotificationPatch};
use crate::reconcile::reconcile;
use crate::remote::NotificationSource;
use belltower_core::{
    FetchParams, MutationOutcome, Notification, NotificationKind, count_unread,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const DEFAULT_NEW_ACTIVITY_WINDOW: Duration = Duration::from_secs(5);

/// 对外暴露的通知状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    /// Raised by a local add, cleared automatically shortly after.
    pub has_new_activity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Server data was reconciled with the cache and applied.
    Remote { count: usize },
    /// Cached or degraded data was applied instead of server data.
    Cached { count: usize, error: Option<String> },
    /// A newer refresh already applied, or the session ended meanwhile.
    Discarded,
    /// No active session.
    Skipped,
}

/// Held across every cache read-modify-write and the state update that
/// goes with it, so concurrent operations never overwrite each other.
#[derive(Debug, Default)]
struct Lifecycle {
    active: bool,
    /// Bumped on every session start and end.
    epoch: u64,
    issued: u64,
    applied: u64,
    /// Sequence of the newest refresh that raised the loading flag.
    loading_seq: u64,
    activity: u64,
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    seq: u64,
    epoch: u64,
}

pub struct NotificationStore {
    remote: Arc<dyn NotificationSource>,
    cache: NotificationCache,
    params: FetchParams,
    new_activity_window: Duration,
    state: Arc<watch::Sender<StoreSnapshot>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotificationStore {
    pub fn new(remote: Arc<dyn NotificationSource>, cache: NotificationCache) -> Self {
        let (state, _) = watch::channel(StoreSnapshot::default());
        Self {
            remote,
            cache,
            params: FetchParams::default(),
            new_activity_window: DEFAULT_NEW_ACTIVITY_WINDOW,
            state: Arc::new(state),
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
        }
    }

    pub fn with_params(mut self, params: FetchParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_new_activity_window(mut self, window: Duration) -> Self {
        self.new_activity_window = window;
        self
    }

    pub fn cache(&self) -> &NotificationCache {
        &self.cache
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.borrow().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count
    }

    pub fn is_active(&self) -> bool {
        lock(&self.lifecycle).active
    }

    /// Marks the session active. An empty list is seeded from the cache so
    /// consumers see something before the first fetch returns.
    pub fn start_session(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.active {
            return;
        }
        lifecycle.active = true;
        lifecycle.epoch += 1;

        let cached = self.cache.load();
        self.state.send_if_modified(|s| {
            if !s.notifications.is_empty() || cached.is_empty() {
                return false;
            }
            s.unread_count = count_unread(&cached);
            s.notifications = cached;
            true
        });
        info!(epoch = lifecycle.epoch, "notification session started");
    }

    /// Marks the session inactive and clears the in-memory state. The cache
    /// is kept for the next session.
    pub fn end_session(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if !lifecycle.active {
            return;
        }
        lifecycle.active = false;
        lifecycle.epoch += 1;
        self.state.send_replace(StoreSnapshot::default());
        info!(epoch = lifecycle.epoch, "notification session ended");
    }

    pub async fn refresh(&self, show_loading: bool) -> RefreshOutcome {
        let ticket = {
            let mut lifecycle = lock(&self.lifecycle);
            if !lifecycle.active {
                return RefreshOutcome::Skipped;
            }
            lifecycle.issued += 1;
            if show_loading {
                lifecycle.loading_seq = lifecycle.issued;
            }
            Ticket {
                seq: lifecycle.issued,
                epoch: lifecycle.epoch,
            }
        };

        self.state.send_modify(|s| {
            if show_loading {
                s.loading = true;
            }
            s.error = None;
        });

        let fetched = self.remote.fetch(&self.params).await;

        let mut lifecycle = lock(&self.lifecycle);
        if !lifecycle.active || lifecycle.epoch != ticket.epoch {
            debug!(seq = ticket.seq, "dropping refresh result from an ended session");
            return RefreshOutcome::Discarded;
        }
        // a newer loading refresh still owns the flag
        let owns_loading = show_loading && ticket.seq >= lifecycle.loading_seq;
        if ticket.seq < lifecycle.applied {
            debug!(
                seq = ticket.seq,
                applied = lifecycle.applied,
                "dropping refresh result older than the one already applied"
            );
            if owns_loading {
                self.state.send_modify(|s| s.loading = false);
            }
            return RefreshOutcome::Discarded;
        }
        lifecycle.applied = ticket.seq;

        let (list, authoritative, error) = match fetched {
            Ok(batch) if batch.authoritative => {
                let merged = reconcile(batch.notifications, &self.cache.load());
                if let Some(reported) = batch.unread_count {
                    let derived = count_unread(&merged);
                    if reported != derived {
                        debug!(reported, derived, "server unread count differs from merged list");
                    }
                }
                (merged, true, None)
            }
            Ok(batch) => (batch.notifications, false, None),
            Err(e) => {
                warn!(error = %e, "failed to fetch notifications, falling back to cache");
                let message = format!("{e:#}");
                (self.cache.load(), false, Some(message))
            }
        };

        if authoritative {
            self.cache.save(&list);
        }

        let count = list.len();
        let unread = count_unread(&list);
        let recorded_error = error.clone();
        self.state.send_modify(|s| {
            s.notifications = list;
            s.unread_count = unread;
            s.error = recorded_error;
            if owns_loading {
                s.loading = false;
            }
        });
        drop(lifecycle);
        debug!(seq = ticket.seq, count, unread, authoritative, "applied refresh");

        if authoritative {
            RefreshOutcome::Remote { count }
        } else {
            RefreshOutcome::Cached { count, error }
        }
    }

    /// 添加一条本地通知
    pub fn add_local(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        data: Value,
    ) -> Notification {
        let notification = Notification::local(kind, title, message, data);

        let activity = {
            let mut lifecycle = lock(&self.lifecycle);
            self.cache.append(notification.clone());
            lifecycle.activity += 1;
            self.state.send_modify(|s| {
                s.notifications.insert(0, notification.clone());
                s.unread_count += 1;
                s.has_new_activity = true;
            });
            lifecycle.activity
        };
        self.schedule_activity_reset(activity);

        debug!(id = %notification.id, kind = %notification.kind, "added local notification");
        notification
    }

    fn schedule_activity_reset(&self, activity: u64) {
        // Outside a runtime the flag simply stays up until the next add.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let lifecycle = Arc::clone(&self.lifecycle);
        let window = self.new_activity_window;
        handle.spawn(async move {
            tokio::time::sleep(window).await;
            let latest = lock(&lifecycle).activity == activity;
            if latest {
                state.send_if_modified(|s| std::mem::replace(&mut s.has_new_activity, false));
            }
        });
    }

    pub async fn mark_read(&self, id: &str) -> MutationOutcome {
        {
            let _guard = lock(&self.lifecycle);
            self.cache.upsert_field(id, &NotificationPatch::read());
            self.state.send_if_modified(|s| {
                match s.notifications.iter_mut().find(|n| n.id == id) {
                    Some(n) if !n.read => {
                        n.read = true;
                        s.unread_count = s.unread_count.saturating_sub(1);
                        true
                    }
                    _ => false,
                }
            });
        }

        match self.remote.acknowledge_read(id).await {
            Ok(()) => MutationOutcome::confirmed(),
            Err(e) => {
                warn!(id, error = %e, "read acknowledgement failed, kept local change");
                MutationOutcome::soft_failure(format!("{e:#}"))
            }
        }
    }

    pub async fn mark_all_read(&self) -> MutationOutcome {
        {
            let _guard = lock(&self.lifecycle);
            self.cache.mark_all_read();
            self.state.send_if_modified(|s| {
                let changed = s.notifications.iter().any(|n| !n.read) || s.unread_count != 0;
                for n in &mut s.notifications {
                    n.read = true;
                }
                s.unread_count = 0;
                changed
            });
        }

        match self.remote.acknowledge_read_all().await {
            Ok(()) => MutationOutcome::confirmed(),
            Err(e) => {
                warn!(error = %e, "read-all acknowledgement failed, kept local change");
                MutationOutcome::soft_failure(format!("{e:#}"))
            }
        }
    }

    pub async fn remove(&self, id: &str) -> MutationOutcome {
        {
            let _guard = lock(&self.lifecycle);
            self.cache.remove(id);
            self.state.send_if_modified(|s| {
                let was_unread = s.notifications.iter().any(|n| n.id == id && !n.read);
                let before = s.notifications.len();
                s.notifications.retain(|n| n.id != id);
                if was_unread {
                    s.unread_count = s.unread_count.saturating_sub(1);
                }
                before != s.notifications.len()
            });
        }

        match self.remote.delete(id).await {
            Ok(()) => MutationOutcome::confirmed(),
            Err(e) => {
                warn!(id, error = %e, "remote delete failed, kept local removal");
                MutationOutcome::soft_failure(format!("{e:#}"))
            }
        }
    }

    /// Local only: the server has no bulk delete.
    pub fn clear_all(&self) -> MutationOutcome {
        let _guard = lock(&self.lifecycle);
        self.cache.clear();
        self.state.send_modify(|s| {
            s.notifications.clear();
            s.unread_count = 0;
        });
        MutationOutcome::confirmed()
    }

    pub fn by_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.state
            .borrow()
            .notifications
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.state
            .borrow()
            .notifications
            .iter()
            .filter(|n| n.is_unread())
            .cloned()
            .collect()
    }

    pub fn has_unread(&self) -> bool {
        self.state.borrow().unread_count > 0
    }
}
