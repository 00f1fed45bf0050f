use crate::error::*;
use belltower_core::{FetchParams, NotificationPage};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Thin client over the notifications REST endpoints.
#[derive(Clone)]
pub struct NotificationsClient {
    client: Client,
    pub base_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
}

impl NotificationsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{base_url}/api/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> SdkResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| SdkError::CannotBeBase(self.base_url.clone()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.timeout(self.timeout);
        // 添加Authorization头如果有token
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SdkResult<Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SdkError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    pub async fn get_notifications(&self, params: &FetchParams) -> SdkResult<NotificationPage> {
        let url = self.endpoint(&["notifications"])?;
        debug!(%url, ?params, "fetching notifications");
        let response = self.send(self.client.get(url).query(params)).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn mark_read(&self, id: &str) -> SdkResult<()> {
        let url = self.endpoint(&["notifications", id, "read"])?;
        debug!(%url, "marking notification as read");
        self.send(self.client.put(url)).await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> SdkResult<()> {
        let url = self.endpoint(&["notifications", "read-all"])?;
        debug!(%url, "marking all notifications as read");
        self.send(self.client.put(url)).await?;
        Ok(())
    }

    pub async fn delete_notification(&self, id: &str) -> SdkResult<()> {
        let url = self.endpoint(&["notifications", id])?;
        debug!(%url, "deleting notification");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
