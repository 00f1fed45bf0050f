use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod decode;
pub mod kind;

pub use decode::decode_notifications;
pub use kind::{Appearance, Icon, NotificationAction, NotificationKind, Tone, appearance};

/// 本地生成通知的 id 前缀
pub const LOCAL_ID_PREFIX: &str = "local_";

/// 本地缓存保留的最大通知数
pub const DEFAULT_CACHE_LIMIT: usize = 100;

/// 通知项数据结构
///
/// Optional fields default on decode so that partially filled records coming
/// from the server or an old cache still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "decode::string_or_number")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "decode::null_as_default")]
    pub kind: NotificationKind,
    #[serde(default, deserialize_with = "decode::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "decode::null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "decode::null_as_default")]
    pub read: bool,
    #[serde(
        alias = "created_at",
        default = "decode::unknown_timestamp",
        deserialize_with = "decode::lenient_timestamp"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, alias = "is_local", deserialize_with = "decode::null_as_default")]
    pub is_local: bool,
}

impl Notification {
    /// 创建一条本地通知（未同步到服务器）
    pub fn local(kind: NotificationKind, title: &str, message: &str, data: Value) -> Self {
        Self {
            id: new_local_id(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
            data,
            is_local: true,
        }
    }

    pub fn is_unread(&self) -> bool {
        !self.read
    }

    pub fn action(&self) -> Option<NotificationAction> {
        NotificationAction::from_data(&self.data)
    }

    pub fn appearance(&self) -> Appearance {
        appearance(self.kind, self.action())
    }
}

/// `local_<毫秒时间戳>_<随机后缀>`
pub fn new_local_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}",
        LOCAL_ID_PREFIX,
        Utc::now().timestamp_millis(),
        &suffix[..9]
    )
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

pub fn count_unread(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.is_unread()).count()
}

/// 通知列表查询参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub unread_only: bool,
}

/// 服务器返回的通知分页
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPage {
    /// Records that fail to decode are dropped individually.
    #[serde(default, deserialize_with = "decode::lenient_list")]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub unread_count: usize,
}

/// 变更操作的结果
///
/// `success == false` is a soft failure: the local change has already been
/// applied, only the remote side did not confirm it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationOutcome {
    pub fn confirmed() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn soft_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_url: String,
    pub timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub new_activity_seconds: u64,
    pub cache_limit: usize,
    pub storage_key: String,
    pub token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            timeout_seconds: 30,
            poll_interval_seconds: 30,
            new_activity_seconds: 5,
            cache_limit: DEFAULT_CACHE_LIMIT,
            storage_key: "belltower_notifications".to_string(),
            token: None,
        }
    }
}
