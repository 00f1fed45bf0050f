use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// 通知类型
///
/// 未知的类型字符串统一降级为 `System`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NotificationKind {
    Appointment,
    Client,
    Reminder,
    #[default]
    System,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::Appointment,
        NotificationKind::Client,
        NotificationKind::Reminder,
        NotificationKind::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Appointment => "appointment",
            NotificationKind::Client => "client",
            NotificationKind::Reminder => "reminder",
            NotificationKind::System => "system",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "appointment" => NotificationKind::Appointment,
            "client" => NotificationKind::Client,
            "reminder" => NotificationKind::Reminder,
            _ => NotificationKind::System,
        })
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 附加数据中 `action` 字段的取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    New,
    Pending,
    Completed,
    Cancelled,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::New => "new",
            NotificationAction::Pending => "pending",
            NotificationAction::Completed => "completed",
            NotificationAction::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(NotificationAction::New),
            "pending" => Some(NotificationAction::Pending),
            "completed" => Some(NotificationAction::Completed),
            "cancelled" => Some(NotificationAction::Cancelled),
            _ => None,
        }
    }

    /// Reads `data.action`. Anything that is not a known action string yields `None`.
    pub fn from_data(data: &Value) -> Option<Self> {
        data.get("action").and_then(Value::as_str).and_then(Self::parse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Calendar,
    Clock,
    CheckCircle,
    XCircle,
    UserPlus,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Blue,
    Yellow,
    Emerald,
    Red,
    Green,
    Amber,
    Gray,
}

/// 通知的展示描述（图标、色调、标题）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Appearance {
    pub icon: Icon,
    pub tone: Tone,
    pub title: &'static str,
}

/// Appointment notifications are refined by their action; every other kind
/// has a single appearance.
pub fn appearance(kind: NotificationKind, action: Option<NotificationAction>) -> Appearance {
    match kind {
        NotificationKind::Appointment => match action {
            Some(NotificationAction::Pending) => Appearance {
                icon: Icon::Clock,
                tone: Tone::Yellow,
                title: "Pending Appointment",
            },
            Some(NotificationAction::Completed) => Appearance {
                icon: Icon::CheckCircle,
                tone: Tone::Emerald,
                title: "Appointment Completed",
            },
            Some(NotificationAction::Cancelled) => Appearance {
                icon: Icon::XCircle,
                tone: Tone::Red,
                title: "Appointment Cancelled",
            },
            Some(NotificationAction::New) | None => Appearance {
                icon: Icon::Calendar,
                tone: Tone::Blue,
                title: "New Appointment",
            },
        },
        NotificationKind::Client => Appearance {
            icon: Icon::UserPlus,
            tone: Tone::Green,
            title: "New Client",
        },
        NotificationKind::Reminder => Appearance {
            icon: Icon::Clock,
            tone: Tone::Amber,
            title: "Reminder",
        },
        NotificationKind::System => Appearance {
            icon: Icon::Info,
            tone: Tone::Gray,
            title: "System",
        },
    }
}
