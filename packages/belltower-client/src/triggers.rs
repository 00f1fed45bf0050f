//! Local notifications raised by scheduling events.

use crate::store::NotificationStore;
use belltower_core::{Notification, NotificationAction, NotificationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 预约事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentEvent {
    #[serde(alias = "clientName", skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(alias = "serviceName", skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(alias = "start_time", alias = "startTime", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppointmentEvent {
    fn client(&self) -> &str {
        self.client_name.as_deref().unwrap_or("Client")
    }

    fn service(&self) -> &str {
        self.service_name.as_deref().unwrap_or("Service")
    }
}

/// 新客户事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientEvent {
    #[serde(alias = "client_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn format_event_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.format("%d/%m at %H:%M").to_string(),
        None => "an unscheduled time".to_string(),
    }
}

/// The event itself becomes the notification's `data`, tagged with `action`.
fn payload<T: Serialize>(event: &T, action: NotificationAction) -> Value {
    let mut data = match serde_json::to_value(event) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    data.insert("action".to_string(), Value::from(action.as_str()));
    Value::Object(data)
}

pub struct Triggers<'a> {
    store: &'a NotificationStore,
}

impl<'a> Triggers<'a> {
    pub fn new(store: &'a NotificationStore) -> Self {
        Self { store }
    }

    pub fn notify_new_appointment(&self, event: &AppointmentEvent) -> Notification {
        let message = format!(
            "New appointment from {} for {} on {}",
            event.client(),
            event.service(),
            format_event_date(event.date)
        );
        self.store.add_local(
            NotificationKind::Appointment,
            "New Appointment",
            &message,
            payload(event, NotificationAction::New),
        )
    }

    pub fn notify_new_client(&self, event: &ClientEvent) -> Notification {
        let name = event.name.as_deref().unwrap_or("Client");
        let message = format!("New client registered: {name}");
        self.store.add_local(
            NotificationKind::Client,
            "New Client",
            &message,
            payload(event, NotificationAction::New),
        )
    }

    pub fn notify_pending_appointment(&self, event: &AppointmentEvent) -> Notification {
        let message = format!(
            "Appointment awaiting confirmation: {} - {}",
            event.client(),
            event.service()
        );
        self.store.add_local(
            NotificationKind::Appointment,
            "Pending Appointment",
            &message,
            payload(event, NotificationAction::Pending),
        )
    }

    pub fn notify_appointment_completed(&self, event: &AppointmentEvent) -> Notification {
        let message = format!("Appointment for {} was completed", event.client());
        self.store.add_local(
            NotificationKind::Appointment,
            "Appointment Completed",
            &message,
            payload(event, NotificationAction::Completed),
        )
    }

    pub fn notify_appointment_cancelled(&self, event: &AppointmentEvent) -> Notification {
        let message = format!("Appointment for {} was cancelled", event.client());
        self.store.add_local(
            NotificationKind::Appointment,
            "Appointment Cancelled",
            &message,
            payload(event, NotificationAction::Cancelled),
        )
    }
}
