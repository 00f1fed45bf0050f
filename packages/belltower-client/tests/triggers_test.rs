mod common;

use belltower_client::{AppointmentEvent, ClientEvent, Triggers};
use belltower_core::{NotificationAction, NotificationKind, is_local_id};
use chrono::{TimeZone, Utc};
use common::*;
use serde_json::json;

fn haircut() -> AppointmentEvent {
    AppointmentEvent {
        client_name: Some("Ana".to_string()),
        service_name: Some("Haircut".to_string()),
        date: Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_new_appointment_trigger() {
    let cache = memory_cache();
    let store = store_with(FakeSource::offline(), cache.clone());
    let mut event = haircut();
    event.extra.insert("id".to_string(), json!("apt-1"));

    let created = Triggers::new(&store).notify_new_appointment(&event);

    assert_eq!(created.kind, NotificationKind::Appointment);
    assert_eq!(created.title, "New Appointment");
    assert_eq!(created.message, "New appointment from Ana for Haircut on 05/03 at 14:30");
    assert!(created.is_local);
    assert!(is_local_id(&created.id));
    assert_eq!(created.action(), Some(NotificationAction::New));
    assert_eq!(created.data["id"], "apt-1");
    assert_eq!(created.data["client_name"], "Ana");

    assert_eq!(ids(&store.notifications()), vec![created.id.clone()]);
    assert_eq!(ids(&cache.load()), vec![created.id]);
    assert_eq!(store.unread_count(), 1);
}

#[tokio::test]
async fn test_appointment_lifecycle_triggers() {
    let store = store_with(FakeSource::offline(), memory_cache());
    let triggers = Triggers::new(&store);
    let event = haircut();

    let pending = triggers.notify_pending_appointment(&event);
    assert_eq!(pending.message, "Appointment awaiting confirmation: Ana - Haircut");
    assert_eq!(pending.action(), Some(NotificationAction::Pending));
    assert_eq!(pending.appearance().title, "Pending Appointment");

    let completed = triggers.notify_appointment_completed(&event);
    assert_eq!(completed.message, "Appointment for Ana was completed");
    assert_eq!(completed.action(), Some(NotificationAction::Completed));

    let cancelled = triggers.notify_appointment_cancelled(&event);
    assert_eq!(cancelled.message, "Appointment for Ana was cancelled");
    assert_eq!(cancelled.action(), Some(NotificationAction::Cancelled));

    assert_eq!(store.unread_count(), 3);
    assert_eq!(store.notifications()[0].id, cancelled.id);
}

#[tokio::test]
async fn test_trigger_defaults_for_missing_fields() {
    let store = store_with(FakeSource::offline(), memory_cache());
    let triggers = Triggers::new(&store);

    let appointment = triggers.notify_new_appointment(&AppointmentEvent::default());
    assert_eq!(
        appointment.message,
        "New appointment from Client for Service on an unscheduled time"
    );

    let client = triggers.notify_new_client(&ClientEvent::default());
    assert_eq!(client.kind, NotificationKind::Client);
    assert_eq!(client.message, "New client registered: Client");
    assert_eq!(client.data, json!({ "action": "new" }));
}

#[tokio::test]
async fn test_client_event_from_json() {
    let store = store_with(FakeSource::offline(), memory_cache());
    let event: ClientEvent =
        serde_json::from_value(json!({ "client_name": "Bia", "phone": "555-0100" })).unwrap();

    let created = Triggers::new(&store).notify_new_client(&event);

    assert_eq!(created.message, "New client registered: Bia");
    assert_eq!(created.data["phone"], "555-0100");
    assert_eq!(created.data["action"], "new");
}
