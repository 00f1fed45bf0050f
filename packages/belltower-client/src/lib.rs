pub mod cache;
pub mod poller;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod storage;
pub mod store;
pub mod triggers;

pub use cache::{NotificationCache, NotificationPatch};
pub use poller::{DEFAULT_POLL_INTERVAL, run_polling, spawn_polling};
pub use reconcile::reconcile;
pub use remote::{NotificationSource, RemoteBatch};
pub use session::{SessionMonitor, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{NotificationStore, RefreshOutcome, StoreSnapshot};
pub use triggers::{AppointmentEvent, ClientEvent, Triggers};

use belltower_core::Notification;
use chrono::{DateTime, Duration, Utc};

/// 按日期分组的通知
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateGroups {
    pub today: Vec<Notification>,
    pub yesterday: Vec<Notification>,
    pub this_week: Vec<Notification>,
    pub older: Vec<Notification>,
}

impl DateGroups {
    /// Non-empty groups in display order with their labels.
    pub fn labeled(&self) -> Vec<(&'static str, &[Notification])> {
        [
            ("Today", self.today.as_slice()),
            ("Yesterday", self.yesterday.as_slice()),
            ("This week", self.this_week.as_slice()),
            ("Older", self.older.as_slice()),
        ]
        .into_iter()
        .filter(|(_, group)| !group.is_empty())
        .collect()
    }
}

fn is_yesterday(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.date_naive()
        .pred_opt()
        .is_some_and(|yesterday| ts.date_naive() == yesterday)
}

/// Anything less than a full day old counts as today, then calendar
/// yesterday, then the rest of the last seven days.
pub fn group_by_date(notifications: &[Notification], now: DateTime<Utc>) -> DateGroups {
    let mut groups = DateGroups::default();
    for notification in notifications {
        let ts = notification.created_at;
        let days = (now - ts).num_days();
        let target = if days <= 0 {
            &mut groups.today
        } else if is_yesterday(ts, now) {
            &mut groups.yesterday
        } else if days < 7 {
            &mut groups.this_week
        } else {
            &mut groups.older
        };
        target.push(notification.clone());
    }
    groups
}

/// 相对时间显示，例如 "5 min ago"、"yesterday"
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - ts;
    if elapsed < Duration::minutes(1) {
        return "just now".to_string();
    }
    if elapsed < Duration::hours(1) {
        return format!("{} min ago", elapsed.num_minutes());
    }
    if elapsed < Duration::days(1) {
        return format!("{}h ago", elapsed.num_hours());
    }
    if is_yesterday(ts, now) {
        return "yesterday".to_string();
    }
    if elapsed < Duration::days(7) {
        return format!("{} days ago", elapsed.num_days());
    }
    ts.format("%Y-%m-%d").to_string()
}

/// 格式化通知显示
pub fn format_notification(notification: &Notification, now: DateTime<Utc>) -> String {
    let marker = if notification.read { " " } else { "*" };
    let origin = if notification.is_local { " (local)" } else { "" };
    format!(
        "{} [{}] {} - {}{}\n   {} · {}",
        marker,
        notification.kind,
        notification.title,
        notification.message,
        origin,
        notification.id,
        format_relative_time(notification.created_at, now)
    )
}
