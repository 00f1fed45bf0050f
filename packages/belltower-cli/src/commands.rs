use anyhow::{Context, Result};
use belltower_client::{
    NotificationStore, RefreshOutcome, SessionMonitor, SessionState, StoreSnapshot,
    format_notification, group_by_date, spawn_polling,
};
use belltower_core::{MutationOutcome, Notification, NotificationKind};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn print_list(notifications: &[Notification]) {
    let now = Utc::now();
    for (i, notification) in notifications.iter().enumerate() {
        println!("  {}", format_notification(notification, now));
        if i < notifications.len() - 1 {
            println!();
        }
    }
}

fn report_refresh(outcome: &RefreshOutcome) {
    if let RefreshOutcome::Cached {
        error: Some(error), ..
    } = outcome
    {
        eprintln!("⚠️  Server unreachable, showing cached notifications: {}", error);
    }
}

fn report_mutation(action: &str, outcome: MutationOutcome) {
    match outcome.error {
        None => println!("✅ {}", action),
        Some(error) => {
            println!("✅ {} (local only)", action);
            eprintln!("⚠️  Server sync failed: {}", error);
        }
    }
}

pub async fn list(store: &NotificationStore, unread_only: bool, kind: Option<String>) {
    store.start_session();
    let outcome = store.refresh(true).await;
    report_refresh(&outcome);

    let mut notifications = if unread_only {
        store.unread()
    } else {
        store.notifications()
    };
    if let Some(kind) = kind {
        let kind = NotificationKind::from(kind);
        notifications.retain(|n| n.kind == kind);
    }

    println!(
        "📬 Notifications ({} shown, {} unread):",
        notifications.len(),
        store.unread_count()
    );
    print_list(&notifications);
}

pub async fn groups(store: &NotificationStore) {
    store.start_session();
    report_refresh(&store.refresh(true).await);

    let groups = group_by_date(&store.notifications(), Utc::now());
    let labeled = groups.labeled();
    if labeled.is_empty() {
        println!("📭 No notifications");
    }
    for (label, notifications) in labeled {
        println!("📅 {} ({}):", label, notifications.len());
        print_list(notifications);
        println!();
    }
}

pub async fn mark_read(store: &NotificationStore, id: &str) {
    store.start_session();
    let outcome = store.mark_read(id).await;
    report_mutation(&format!("Marked {} as read", id), outcome);
}

pub async fn mark_all_read(store: &NotificationStore) {
    store.start_session();
    let outcome = store.mark_all_read().await;
    report_mutation("Marked all notifications as read", outcome);
}

pub async fn remove(store: &NotificationStore, id: &str) {
    store.start_session();
    let outcome = store.remove(id).await;
    report_mutation(&format!("Removed {}", id), outcome);
}

pub fn clear(store: &NotificationStore) {
    store.start_session();
    let outcome = store.clear_all();
    report_mutation("Cleared local notifications", outcome);
}

pub fn add(
    store: &NotificationStore,
    kind: Option<String>,
    title: &str,
    message: &str,
    data: Option<String>,
) -> Result<()> {
    let data = match data {
        Some(text) => serde_json::from_str(&text).context("invalid --data JSON")?,
        None => Value::Object(Default::default()),
    };
    let kind = kind.map(NotificationKind::from).unwrap_or_default();

    store.start_session();
    let notification = store.add_local(kind, title, message, data);
    println!("✅ Added local notification:");
    println!("  {}", format_notification(&notification, Utc::now()));
    Ok(())
}

/// 持续轮询直到 Ctrl+C
pub async fn watch_notifications(store: Arc<NotificationStore>, period: Duration) -> Result<()> {
    watch_until(store, period, tokio::signal::ctrl_c()).await
}

/// Polls and prints changes until `shutdown` resolves, then ends the session
/// and waits for the poller to finish.
pub async fn watch_until<F>(store: Arc<NotificationStore>, period: Duration, shutdown: F) -> Result<()>
where
    F: Future,
{
    let (session_tx, session_rx) = watch::channel(SessionState::active());
    let poller = spawn_polling(store.clone(), SessionMonitor::single(session_rx), period);
    let mut updates = store.subscribe();
    let mut shown: Option<(Vec<String>, usize)> = None;

    println!(
        "🎧 Polling notifications every {}s, press Ctrl+C to stop",
        period.as_secs()
    );

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot: StoreSnapshot = updates.borrow_and_update().clone();
                if snapshot.loading {
                    continue;
                }
                let current = (
                    snapshot.notifications.iter().map(|n| n.id.clone()).collect::<Vec<_>>(),
                    snapshot.unread_count,
                );
                if shown.as_ref() == Some(&current) {
                    continue;
                }
                if let Some(error) = &snapshot.error {
                    eprintln!("⚠️  Server unreachable, showing cached notifications: {}", error);
                }
                println!("🔔 {} notifications, {} unread", current.0.len(), current.1);
                print_list(&snapshot.notifications);
                shown = Some(current);
            }
            _ = &mut shutdown => {
                println!("🔌 Stopping");
                session_tx.send_replace(SessionState::inactive());
                break;
            }
        }
    }

    drop(session_tx);
    poller.await.context("polling task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use belltower_client::{MemoryStore, NotificationCache};
    use belltower_sdk::NotificationsClient;
    use tokio::sync::oneshot;

    fn offline_store() -> Arc<NotificationStore> {
        let cache = NotificationCache::new(Arc::new(MemoryStore::new()), "notifications");
        let client = NotificationsClient::new("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(1));
        Arc::new(NotificationStore::new(Arc::new(client), cache))
    }

    #[tokio::test]
    async fn test_watch_ends_session_on_shutdown() {
        let store = offline_store();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        stop_tx.send(()).unwrap();

        watch_until(store.clone(), Duration::from_secs(30), stop_rx)
            .await
            .unwrap();

        assert!(!store.is_active());
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_watch_keeps_running_until_shutdown() {
        let store = offline_store();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let watcher = tokio::spawn(watch_until(store.clone(), Duration::from_secs(30), stop_rx));
        while !store.is_active() {
            tokio::task::yield_now().await;
        }
        assert!(!watcher.is_finished());

        stop_tx.send(()).unwrap();
        watcher.await.unwrap().unwrap();
        assert!(!store.is_active());
    }
}
