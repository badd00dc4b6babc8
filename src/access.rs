use std::collections::BTreeMap;

use crate::models::operator::{AccessEvent, AccessGrantRow, AccessPolicy, EventClass, OperatorRecord};
use crate::repository::OperatorRepository;

/// Resolves the access policy carried in an operator's profile. Grants are
/// only read when the operator is flagged as limited.
pub async fn resolve_access(
    operators: &dyn OperatorRepository,
    operator: &OperatorRecord,
) -> Result<AccessPolicy, sqlx::Error> {
    if !operator.is_limited_event_access {
        return Ok(AccessPolicy::Unrestricted);
    }

    let rows = operators.access_grants(operator.id).await?;
    tracing::debug!(
        operator_id = operator.id,
        rows = rows.len(),
        "Resolved access grants"
    );
    Ok(AccessPolicy::Limited(group_grants(rows)))
}

/// Folds joined grant rows into one entry per event. Classes are deduplicated
/// by id; an event without class grants keeps an empty class list.
pub fn group_grants(rows: Vec<AccessGrantRow>) -> Vec<AccessEvent> {
    let mut events: BTreeMap<i64, (String, BTreeMap<i64, String>)> = BTreeMap::new();

    for row in rows {
        let (_, classes) = events
            .entry(row.event_id)
            .or_insert_with(|| (row.event_name, BTreeMap::new()));

        if let Some(class_id) = row.class_id {
            classes
                .entry(class_id)
                .or_insert_with(|| row.class_name.unwrap_or_default());
        }
    }

    events
        .into_iter()
        .map(|(id, (name, classes))| AccessEvent {
            id,
            name,
            classes: classes
                .into_iter()
                .map(|(id, name)| EventClass { id, name })
                .collect(),
        })
        .collect()
}
