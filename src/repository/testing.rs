//! Fixtures shared by the unit tests.

use crate::models::operator::OperatorRecord;
use crate::repository::MemoryStore;

pub const PASSWORD: &str = "correct horse";

pub fn password_hash(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

/// An active, unrestricted operator with no bound device whose password is
/// [`PASSWORD`].
pub fn operator_record(id: i64, username: &str) -> OperatorRecord {
    OperatorRecord {
        id,
        name: username.to_string(),
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        phone: format!("0800{id:04}"),
        is_active: true,
        is_limited_event_access: false,
        is_limited_classes_access: false,
        device_id: None,
        device_access_token: None,
        password: password_hash(PASSWORD),
        role_id: Some(1),
        role_name: Some("scanner".to_string()),
    }
}

/// Operator 1 ("alice") is assigned the VIP and Regular classes of one event;
/// operator 2 ("bob") has no assignments. Tickets: TCK-1, TCK-2 (VIP) and
/// TCK-3 (Regular), plus TCK-9 in a class nobody is assigned to.
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_operator(operator_record(1, "alice")).await;
    store.add_operator(operator_record(2, "bob")).await;

    let event = store.add_event("Jakarta Expo").await;
    let vip_class = store.add_class(event, "VIP").await;
    let regular_class = store.add_class(event, "Regular").await;
    let closed_class = store.add_class(event, "Backstage").await;

    let holder = store
        .add_user("Budi", Some("budi@example.com"), Some("0811"))
        .await;
    let invoice = store.add_transaction(holder, "INV-1").await;
    store.add_ticket(invoice, vip_class, "TCK-1").await;
    store.add_ticket(invoice, vip_class, "TCK-2").await;
    store.add_ticket(invoice, regular_class, "TCK-3").await;
    store.add_ticket(invoice, closed_class, "TCK-9").await;

    store.assign_class(1, regular_class).await;
    store.assign_class(1, vip_class).await;

    store
}
