//! Attendance sync between scanner devices and the ticket ledger.
//!
//! Pull hands a device the full snapshot of tickets reachable through its
//! operator's class assignments. Push takes a batch of marks made offline and
//! commits all of them or none: timestamps are parsed first, then existence of
//! every code is checked and the rows are updated in a single transaction.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::sync::{parse_attend_time, AttendanceUpdate, SyncEntry};
use crate::models::ticket::TicketRecord;
use crate::repository::{AttendanceRepository, CommitOutcome};
use crate::utils::error::AppError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("operator {0} not found")]
    OperatorNotFound(i64),

    #[error("batch is empty")]
    EmptyBatch,

    #[error("attend_time {value:?} of ticket {ticket_code} is not YYYY-MM-DD HH:MM:SS")]
    InvalidTimestampFormat { ticket_code: String, value: String },

    #[error("{missing} ticket code(s) do not exist")]
    UnknownTicketCode { missing: usize },

    #[error("{context}")]
    Persistence {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::OperatorNotFound(_) => AppError::NotFound("Operator not found".to_string()),
            SyncError::EmptyBatch => {
                AppError::BadRequest("Invoice codes cannot be empty".to_string())
            }
            SyncError::InvalidTimestampFormat { .. } => {
                AppError::BadRequest("Invalid time format for attend_time".to_string())
            }
            SyncError::UnknownTicketCode { .. } => {
                AppError::BadRequest("One or more invoice codes do not exist".to_string())
            }
            SyncError::Persistence { context, source } => AppError::database(context, source),
        }
    }
}

/// Result of an accepted push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSummary {
    pub entries: usize,
    pub rows: u64,
}

#[derive(Clone)]
pub struct SyncEngine {
    attendance: Arc<dyn AttendanceRepository>,
}

impl SyncEngine {
    pub fn new(attendance: Arc<dyn AttendanceRepository>) -> Self {
        Self { attendance }
    }

    pub async fn pull(&self, operator_id: i64) -> Result<Vec<TicketRecord>, SyncError> {
        let exists = self
            .attendance
            .operator_exists(operator_id)
            .await
            .map_err(|source| SyncError::Persistence {
                context: "Failed to get data",
                source,
            })?;
        if !exists {
            debug!(operator_id, "Pull for unknown operator");
            return Err(SyncError::OperatorNotFound(operator_id));
        }

        let rows = self
            .attendance
            .assigned_tickets(operator_id)
            .await
            .map_err(|source| SyncError::Persistence {
                context: "Failed to get data",
                source,
            })?;

        debug!(operator_id, tickets = rows.len(), "Pulled attendance snapshot");
        Ok(rows.into_iter().map(TicketRecord::from).collect())
    }

    pub async fn push(
        &self,
        operator_id: i64,
        entries: Vec<SyncEntry>,
    ) -> Result<PushSummary, SyncError> {
        let received = entries.len();
        let updates = prepare_batch(entries)?;

        let outcome = self
            .attendance
            .commit_attendance(operator_id, &updates)
            .await
            .map_err(|source| SyncError::Persistence {
                context: "Failed to update attendance status",
                source,
            })?;

        match outcome {
            CommitOutcome::Applied { rows } => {
                info!(operator_id, entries = received, rows, "Attendance batch committed");
                Ok(PushSummary {
                    entries: received,
                    rows,
                })
            }
            CommitOutcome::UnknownCodes { missing } => {
                debug!(operator_id, missing, "Attendance batch rejected");
                Err(SyncError::UnknownTicketCode { missing })
            }
        }
    }
}

/// Validates a raw batch into updates, in order. Codes are not deduplicated:
/// a repeated code fails the existence check, since it matches one stored
/// ticket but occupies two batch slots.
pub fn prepare_batch(entries: Vec<SyncEntry>) -> Result<Vec<AttendanceUpdate>, SyncError> {
    if entries.is_empty() {
        return Err(SyncError::EmptyBatch);
    }

    entries
        .into_iter()
        .map(|entry| match parse_attend_time(&entry.attend_time) {
            Some(attend_time) => Ok(AttendanceUpdate {
                ticket_code: entry.ticket_code,
                attend_time,
            }),
            None => Err(SyncError::InvalidTimestampFormat {
                ticket_code: entry.ticket_code,
                value: entry.attend_time,
            }),
        })
        .collect()
}
