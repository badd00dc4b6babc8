use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Ticket holder, the purchaser of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}
