use belltower_core::Notification;
use std::collections::HashSet;

/// Merges a server-authored list with the persisted cache.
///
/// Every remote record is kept. A persisted record survives only if it is
/// local (`is_local`) and the server does not already carry its id, so the
/// remote copy wins any collision. The result is newest first.
pub fn reconcile(remote: Vec<Notification>, persisted: &[Notification]) -> Vec<Notification> {
    let remote_ids: HashSet<&str> = remote.iter().map(|n| n.id.as_str()).collect();
    let local_only: Vec<Notification> = persisted
        .iter()
        .filter(|n| n.is_local && !remote_ids.contains(n.id.as_str()))
        .cloned()
        .collect();

    let mut merged = remote;
    merged.extend(local_only);
    sort_newest_first(&mut merged);
    merged
}

/// Stable: records with equal timestamps keep their relative order.
pub fn sort_newest_first(list: &mut [Notification]) {
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
