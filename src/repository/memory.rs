//! In-process store with the same observable behaviour as [`super::PgStore`].
//! Backs the unit tests without a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::FromRow;
use tokio::sync::Mutex;

use crate::models::event::Event;
use crate::models::operator::{AccessGrantRow, NewOperator, OperatorRecord};
use crate::models::sync::AttendanceUpdate;
use crate::models::ticket::AssignedTicketRow;
use crate::models::user::User;
use crate::repository::{AttendanceRepository, CommitOutcome, OperatorRepository};

/// One `transaction_details` row as stored.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TicketDetail {
    pub id: i64,
    pub transaction_id: i64,
    pub class_id: i64,
    pub ticket_code: String,
    pub attend_status: bool,
    pub attend_time: Option<NaiveDateTime>,
    pub attend_operator_id: Option<i64>,
    pub latest_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Class {
    id: i64,
    event_id: i64,
    name: String,
}

#[derive(Debug, Clone)]
struct Transaction {
    id: i64,
    user_id: i64,
    invoice_code: String,
}

#[derive(Debug, Clone, Copy)]
struct Assignment {
    id: i64,
    operator_id: i64,
    class_id: i64,
}

#[derive(Default)]
struct State {
    next_id: i64,
    operators: Vec<OperatorRecord>,
    users: Vec<User>,
    events: Vec<Event>,
    classes: Vec<Class>,
    transactions: Vec<Transaction>,
    tickets: Vec<TicketDetail>,
    assignments: Vec<Assignment>,
    event_grants: Vec<(i64, i64)>,
    class_grants: Vec<(i64, i64)>,
    last_sync_at: Option<DateTime<Utc>>,
    fail_writes: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Like a database clock, never hands out the same instant twice.
    fn sync_clock(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_sync_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_sync_at = Some(now);
        now
    }

    fn check_writable(&self) -> Result<(), sqlx::Error> {
        if self.fail_writes {
            return Err(sqlx::Error::Protocol("memory store is read-only".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, to exercise persistence errors.
    pub async fn set_fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    pub async fn add_operator(&self, operator: OperatorRecord) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(operator.id);
        state.operators.push(operator);
    }

    pub async fn add_user(&self, name: &str, email: Option<&str>, phone: Option<&str>) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.users.push(User {
            id,
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
        });
        id
    }

    pub async fn add_event(&self, name: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.events.push(Event {
            id,
            name: name.to_string(),
        });
        id
    }

    pub async fn add_class(&self, event_id: i64, name: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.classes.push(Class {
            id,
            event_id,
            name: name.to_string(),
        });
        id
    }

    pub async fn add_transaction(&self, user_id: i64, invoice_code: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.transactions.push(Transaction {
            id,
            user_id,
            invoice_code: invoice_code.to_string(),
        });
        id
    }

    pub async fn add_ticket(&self, transaction_id: i64, class_id: i64, ticket_code: &str) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.tickets.push(TicketDetail {
            id,
            transaction_id,
            class_id,
            ticket_code: ticket_code.to_string(),
            attend_status: false,
            attend_time: None,
            attend_operator_id: None,
            latest_sync_at: None,
        });
        id
    }

    pub async fn assign_class(&self, operator_id: i64, class_id: i64) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.assignments.push(Assignment {
            id,
            operator_id,
            class_id,
        });
        id
    }

    pub async fn grant_event(&self, operator_id: i64, event_id: i64) {
        self.state
            .lock()
            .await
            .event_grants
            .push((operator_id, event_id));
    }

    pub async fn grant_class(&self, operator_id: i64, class_id: i64) {
        self.state
            .lock()
            .await
            .class_grants
            .push((operator_id, class_id));
    }

    pub async fn ticket(&self, ticket_code: &str) -> Option<TicketDetail> {
        let state = self.state.lock().await;
        state
            .tickets
            .iter()
            .find(|t| t.ticket_code == ticket_code)
            .cloned()
    }

    pub async fn tickets(&self) -> Vec<TicketDetail> {
        self.state.lock().await.tickets.clone()
    }

    pub async fn operator(&self, id: i64) -> Option<OperatorRecord> {
        let state = self.state.lock().await;
        state.operators.iter().find(|o| o.id == id).cloned()
    }
}

#[async_trait]
impl OperatorRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<OperatorRecord>, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state
            .operators
            .iter()
            .find(|o| o.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<OperatorRecord>, sqlx::Error> {
        Ok(self.operator(id).await)
    }

    async fn access_grants(&self, operator_id: i64) -> Result<Vec<AccessGrantRow>, sqlx::Error> {
        let state = self.state.lock().await;
        let mut rows = Vec::new();

        for (_, event_id) in state.event_grants.iter().filter(|(o, _)| *o == operator_id) {
            let Some(event) = state.events.iter().find(|e| e.id == *event_id) else {
                continue;
            };

            let mut granted: Vec<&Class> = state
                .class_grants
                .iter()
                .filter(|(o, _)| *o == operator_id)
                .filter_map(|(_, class_id)| state.classes.iter().find(|c| c.id == *class_id))
                .filter(|c| c.event_id == event.id)
                .collect();
            granted.sort_by_key(|c| c.id);

            if granted.is_empty() {
                rows.push(AccessGrantRow {
                    event_id: event.id,
                    event_name: event.name.clone(),
                    class_id: None,
                    class_name: None,
                });
            }
            for class in granted {
                rows.push(AccessGrantRow {
                    event_id: event.id,
                    event_name: event.name.clone(),
                    class_id: Some(class.id),
                    class_name: Some(class.name.clone()),
                });
            }
        }

        rows.sort_by_key(|r| (r.event_id, r.class_id));
        Ok(rows)
    }

    async fn bind_device(
        &self,
        operator_id: i64,
        device_id: &str,
        access_token: &str,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let operator = state
            .operators
            .iter_mut()
            .find(|o| o.id == operator_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        operator.device_id = Some(device_id.to_string());
        operator.device_access_token = Some(access_token.to_string());
        Ok(())
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: Option<&str>,
        phone: &str,
    ) -> Result<bool, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state.operators.iter().any(|o| {
            o.username == username
                || o.phone == phone
                || (email.is_some() && o.email.as_deref() == email)
        }))
    }

    async fn insert(&self, operator: &NewOperator) -> Result<i64, sqlx::Error> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let id = state.next_id();
        state.operators.push(OperatorRecord {
            id,
            name: operator.name.clone(),
            username: operator.username.clone(),
            email: operator.email.clone(),
            phone: operator.phone.clone(),
            is_active: true,
            is_limited_event_access: false,
            is_limited_classes_access: false,
            device_id: None,
            device_access_token: None,
            password: operator.password_hash.clone(),
            role_id: None,
            role_name: None,
        });
        Ok(id)
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn operator_exists(&self, operator_id: i64) -> Result<bool, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state.operators.iter().any(|o| o.id == operator_id))
    }

    async fn assigned_tickets(
        &self,
        operator_id: i64,
    ) -> Result<Vec<AssignedTicketRow>, sqlx::Error> {
        let state = self.state.lock().await;

        let mut assignments: Vec<Assignment> = state
            .assignments
            .iter()
            .filter(|a| a.operator_id == operator_id)
            .copied()
            .collect();
        assignments.sort_by_key(|a| a.id);

        let mut rows = Vec::new();
        for assignment in assignments {
            let mut tickets: Vec<&TicketDetail> = state
                .tickets
                .iter()
                .filter(|t| t.class_id == assignment.class_id)
                .collect();
            tickets.sort_by_key(|t| t.id);

            for ticket in tickets {
                let joined = state
                    .transactions
                    .iter()
                    .find(|t| t.id == ticket.transaction_id)
                    .and_then(|tx| {
                        let user = state.users.iter().find(|u| u.id == tx.user_id)?;
                        let class = state.classes.iter().find(|c| c.id == ticket.class_id)?;
                        let event = state.events.iter().find(|e| e.id == class.event_id)?;
                        Some((tx, user, class, event))
                    });
                let Some((tx, user, class, event)) = joined else {
                    continue;
                };

                rows.push(AssignedTicketRow {
                    id: ticket.id,
                    invoice_code: tx.invoice_code.clone(),
                    ticket_code: ticket.ticket_code.clone(),
                    attend_status: ticket.attend_status,
                    attend_time: ticket.attend_time,
                    event_id: event.id,
                    event_name: event.name.clone(),
                    class_id: class.id,
                    class_name: class.name.clone(),
                    user_id: user.id,
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                    user_phone: user.phone.clone(),
                });
            }
        }
        Ok(rows)
    }

    async fn commit_attendance(
        &self,
        operator_id: i64,
        updates: &[AttendanceUpdate],
    ) -> Result<CommitOutcome, sqlx::Error> {
        let mut state = self.state.lock().await;

        // Distinct stored tickets matched, as the SQL existence check counts them
        let found = state
            .tickets
            .iter()
            .filter(|t| updates.iter().any(|u| u.ticket_code == t.ticket_code))
            .count();
        if found < updates.len() {
            return Ok(CommitOutcome::UnknownCodes {
                missing: updates.len() - found,
            });
        }

        state.check_writable()?;

        let synced_at = state.sync_clock();
        let mut rows = 0;
        for ticket in state.tickets.iter_mut() {
            if let Some(update) = updates.iter().find(|u| u.ticket_code == ticket.ticket_code) {
                ticket.attend_status = true;
                ticket.attend_time = Some(update.attend_time);
                ticket.attend_operator_id = Some(operator_id);
                ticket.latest_sync_at = Some(synced_at);
                rows += 1;
            }
        }

        Ok(CommitOutcome::Applied { rows })
    }
}
