use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::event::Event;
use crate::models::sync::attend_time_format;
use crate::models::user::User;

/// Flat row of the pull query, before nesting.
#[derive(Debug, Clone, FromRow)]
pub struct AssignedTicketRow {
    pub id: i64,
    pub invoice_code: String,
    pub ticket_code: String,
    pub attend_status: bool,
    pub attend_time: Option<NaiveDateTime>,
    pub event_id: i64,
    pub event_name: String,
    pub class_id: i64,
    pub class_name: String,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketClass {
    pub id: i64,
    pub name: String,
    pub event: Event,
}

/// Ticket as delivered to a scanner on pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRecord {
    pub id: i64,
    pub invoice_code: String,
    pub ticket_code: String,
    pub attend_status: bool,
    #[serde(with = "attend_time_format")]
    pub attend_time: Option<NaiveDateTime>,
    pub user: User,
    pub class: TicketClass,
}

impl From<AssignedTicketRow> for TicketRecord {
    fn from(row: AssignedTicketRow) -> Self {
        Self {
            id: row.id,
            invoice_code: row.invoice_code,
            ticket_code: row.ticket_code,
            attend_status: row.attend_status,
            attend_time: row.attend_time,
            user: User {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
                phone: row.user_phone,
            },
            class: TicketClass {
                id: row.class_id,
                name: row.class_name,
                event: Event {
                    id: row.event_id,
                    name: row.event_name,
                },
            },
        }
    }
}
