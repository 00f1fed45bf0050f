use anyhow::{Context, Result};
use async_trait::async_trait;
use belltower_core::{FetchParams, Notification};
use belltower_sdk::NotificationsClient;

/// 一次远程拉取的结果
#[derive(Debug, Clone, Default)]
pub struct RemoteBatch {
    pub notifications: Vec<Notification>,
    pub unread_count: Option<usize>,
    /// `false` for degraded responses that did not come from the server
    /// itself; those are shown as-is and never reconciled or persisted.
    pub authoritative: bool,
}

/// Where server notifications come from.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Result<RemoteBatch>;
    async fn acknowledge_read(&self, id: &str) -> Result<()>;
    async fn acknowledge_read_all(&self) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl NotificationSource for NotificationsClient {
    async fn fetch(&self, params: &FetchParams) -> Result<RemoteBatch> {
        let page = self
            .get_notifications(params)
            .await
            .context("failed to fetch notifications")?;
        Ok(RemoteBatch {
            notifications: page.notifications,
            unread_count: Some(page.unread_count),
            authoritative: true,
        })
    }

    async fn acknowledge_read(&self, id: &str) -> Result<()> {
        self.mark_read(id)
            .await
            .with_context(|| format!("failed to mark notification {id} as read"))
    }

    async fn acknowledge_read_all(&self) -> Result<()> {
        self.mark_all_read()
            .await
            .context("failed to mark all notifications as read")
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_notification(id)
            .await
            .with_context(|| format!("failed to delete notification {id}"))
    }
}
