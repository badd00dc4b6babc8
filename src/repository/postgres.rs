use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::models::operator::{AccessGrantRow, NewOperator, OperatorRecord};
use crate::models::sync::AttendanceUpdate;
use crate::models::ticket::AssignedTicketRow;
use crate::repository::{AttendanceRepository, CommitOutcome, OperatorRepository};

const OPERATOR_COLUMNS: &str = r#"
    SELECT
        o.id,
        o.name,
        o.username,
        o.email,
        o.phone,
        o.is_active,
        o.is_limited_event_access,
        o.is_limited_classes_access,
        o.device_id,
        o.device_access_token,
        o.password,
        r.id AS role_id,
        r.name AS role_name
    FROM operators o
    LEFT JOIN operator_roles r ON r.id = o.role_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperatorRepository for PgStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<OperatorRecord>, sqlx::Error> {
        let query = format!("{OPERATOR_COLUMNS} WHERE o.username = $1");
        sqlx::query_as::<_, OperatorRecord>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<OperatorRecord>, sqlx::Error> {
        let query = format!("{OPERATOR_COLUMNS} WHERE o.id = $1");
        sqlx::query_as::<_, OperatorRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn access_grants(&self, operator_id: i64) -> Result<Vec<AccessGrantRow>, sqlx::Error> {
        sqlx::query_as::<_, AccessGrantRow>(
            r#"
            SELECT
                eg.event_id,
                e.name AS event_name,
                c.id AS class_id,
                c.name AS class_name
            FROM operator_event_grants eg
            JOIN events e ON e.id = eg.event_id
            LEFT JOIN (
                operator_class_grants cg
                JOIN classes c ON c.id = cg.class_id
            ) ON cg.operator_id = eg.operator_id
                AND c.event_id = eg.event_id
                AND cg.deleted_at IS NULL
            WHERE eg.operator_id = $1
                AND eg.deleted_at IS NULL
            ORDER BY eg.event_id, c.id
            "#,
        )
        .bind(operator_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn bind_device(
        &self,
        operator_id: i64,
        device_id: &str,
        access_token: &str,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE operators
            SET
                device_id = $1,
                device_access_token = $2,
                updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(device_id)
        .bind(access_token)
        .bind(operator_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: Option<&str>,
        phone: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM operators
                WHERE username = $1 OR email = $2 OR phone = $3
            )
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
    }

    async fn insert(&self, operator: &NewOperator) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO operators (name, username, email, phone, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&operator.name)
        .bind(&operator.username)
        .bind(&operator.email)
        .bind(&operator.phone)
        .bind(&operator.password_hash)
        .fetch_one(&self.pool)
        .await
    }
}

#[async_trait]
impl AttendanceRepository for PgStore {
    async fn operator_exists(&self, operator_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM operators WHERE id = $1)")
            .bind(operator_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn assigned_tickets(
        &self,
        operator_id: i64,
    ) -> Result<Vec<AssignedTicketRow>, sqlx::Error> {
        sqlx::query_as::<_, AssignedTicketRow>(
            r#"
            SELECT
                td.id,
                t.invoice_code,
                td.ticket_code,
                td.attend_status,
                td.attend_time,
                e.id AS event_id,
                e.name AS event_name,
                c.id AS class_id,
                c.name AS class_name,
                u.id AS user_id,
                u.name AS user_name,
                u.email AS user_email,
                u.phone AS user_phone
            FROM operator_classes oc
            JOIN transaction_details td ON td.class_id = oc.class_id
            JOIN transactions t ON t.id = td.transaction_id
            JOIN users u ON u.id = t.user_id
            JOIN classes c ON c.id = td.class_id
            JOIN events e ON e.id = c.event_id
            WHERE oc.operator_id = $1
            ORDER BY oc.id ASC, td.id ASC
            "#,
        )
        .bind(operator_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn commit_attendance(
        &self,
        operator_id: i64,
        updates: &[AttendanceUpdate],
    ) -> Result<CommitOutcome, sqlx::Error> {
        let codes: Vec<String> = updates.iter().map(|u| u.ticket_code.clone()).collect();
        let times: Vec<NaiveDateTime> = updates.iter().map(|u| u.attend_time).collect();

        let mut tx = self.pool.begin().await?;

        // Row locks keep the matched tickets stable until the update below
        let found: Vec<String> = sqlx::query_scalar::<_, String>(
            r#"
            SELECT ticket_code
            FROM transaction_details
            WHERE ticket_code = ANY($1)
            FOR UPDATE
            "#,
        )
        .bind(&codes)
        .fetch_all(&mut *tx)
        .await?;

        // ticket_code is unique, so a repeated code in the batch is one short here
        if found.len() < codes.len() {
            tx.rollback().await?;
            return Ok(CommitOutcome::UnknownCodes {
                missing: codes.len() - found.len(),
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE transaction_details AS td
            SET
                attend_status = TRUE,
                attend_time = v.attend_time,
                attend_operator_id = $3,
                latest_sync_at = now()
            FROM UNNEST($1::text[], $2::timestamp[]) AS v(ticket_code, attend_time)
            WHERE td.ticket_code = v.ticket_code
            "#,
        )
        .bind(&codes)
        .bind(&times)
        .bind(operator_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Applied {
            rows: result.rows_affected(),
        })
    }
}
