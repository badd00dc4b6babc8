use async_trait::async_trait;

use crate::models::operator::{AccessGrantRow, NewOperator, OperatorRecord};
use crate::models::sync::AttendanceUpdate;
use crate::models::ticket::AssignedTicketRow;

pub mod postgres;

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub mod testing;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of committing a batch of attendance marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied { rows: u64 },
    /// Some codes do not exist; nothing was written.
    UnknownCodes { missing: usize },
}

#[async_trait]
pub trait OperatorRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<OperatorRecord>, sqlx::Error>;

    async fn find_by_id(&self, id: i64) -> Result<Option<OperatorRecord>, sqlx::Error>;

    /// Event grants joined with the class grants that belong to each event.
    async fn access_grants(&self, operator_id: i64) -> Result<Vec<AccessGrantRow>, sqlx::Error>;

    /// Overwrites the operator's device binding. Fails with
    /// [`sqlx::Error::RowNotFound`] when the operator is gone.
    async fn bind_device(
        &self,
        operator_id: i64,
        device_id: &str,
        access_token: &str,
    ) -> Result<(), sqlx::Error>;

    async fn identity_taken(
        &self,
        username: &str,
        email: Option<&str>,
        phone: &str,
    ) -> Result<bool, sqlx::Error>;

    async fn insert(&self, operator: &NewOperator) -> Result<i64, sqlx::Error>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn operator_exists(&self, operator_id: i64) -> Result<bool, sqlx::Error>;

    /// Tickets reachable through the operator's class assignments, ordered by
    /// assignment id then ticket id.
    async fn assigned_tickets(&self, operator_id: i64)
        -> Result<Vec<AssignedTicketRow>, sqlx::Error>;

    /// Checks that every code exists and marks them all attended, as one unit.
    /// Existence is counted in distinct stored tickets, so a batch that repeats
    /// a code comes back as [`CommitOutcome::UnknownCodes`].
    async fn commit_attendance(
        &self,
        operator_id: i64,
        updates: &[AttendanceUpdate],
    ) -> Result<CommitOutcome, sqlx::Error>;
}
