use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::{Cents, Operation, OperationId, OperationStatus, Receiver};

use super::MIGRATION_001_INITIAL;

const OPERATION_COLUMNS: &str =
    "id, receiver_id, gross_cents, fee_cents, net_cents, status, created_at";

/// Repository for persisting and querying receivers and operations.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(database_url, config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open a transaction. Reads and writes issued through the returned
    /// handle become visible to others only on `commit`; dropping it
    /// without committing rolls everything back.
    pub async fn begin(&self) -> Result<LedgerTx> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(LedgerTx { tx })
    }

    // ========================
    // Receiver operations
    // ========================

    /// Register a receiver. Receivers are provisioned outside the operation
    /// flow; this exists for seeding and fixtures.
    pub async fn save_receiver(&self, receiver: &Receiver) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO receivers (id, balance_cents, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&receiver.id)
        .bind(receiver.balance_cents)
        .bind(receiver.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save receiver")?;
        Ok(())
    }

    /// Get a receiver by ID.
    pub async fn find_receiver(&self, id: &str) -> Result<Option<Receiver>> {
        let row = sqlx::query(
            r#"
            SELECT id, balance_cents, created_at
            FROM receivers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch receiver")?;

        row.as_ref().map(row_to_receiver).transpose()
    }

    // ========================
    // Operation operations
    // ========================

    /// Save a new operation and return the stored row.
    pub async fn insert_operation(&self, operation: &Operation) -> Result<Operation> {
        let sql = format!(
            r#"
            INSERT INTO operations ({OPERATION_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {OPERATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(operation.id.to_string())
            .bind(&operation.receiver_id)
            .bind(operation.gross_cents)
            .bind(operation.fee_cents)
            .bind(operation.net_cents)
            .bind(operation.status.as_str())
            .bind(operation.created_at.to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .context("Failed to save operation")?;

        row_to_operation(&row)
    }

    /// Get an operation by ID.
    pub async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch operation")?;

        row.as_ref().map(row_to_operation).transpose()
    }
}

/// A scoped ledger transaction.
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerTx {
    /// Get an operation by ID as seen by this transaction.
    pub async fn find_operation(&mut self, id: OperationId) -> Result<Option<Operation>> {
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch operation")?;

        row.as_ref().map(row_to_operation).transpose()
    }

    /// Compare-and-set the status of an operation.
    ///
    /// Returns the updated row, or `None` when the operation is missing or
    /// not currently in `expected`. The write takes the database write lock,
    /// so concurrent callers serialize here.
    pub async fn set_operation_status(
        &mut self,
        id: OperationId,
        expected: OperationStatus,
        status: OperationStatus,
    ) -> Result<Option<Operation>> {
        let sql = format!(
            r#"
            UPDATE operations
            SET status = ?
            WHERE id = ? AND status = ?
            RETURNING {OPERATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(id.to_string())
            .bind(expected.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to update operation status")?;

        row.as_ref().map(row_to_operation).transpose()
    }

    /// Add `amount` to a receiver's balance.
    ///
    /// Fails if the receiver is missing or if the new balance would not fit
    /// in an i64; the row is left untouched in both cases.
    pub async fn increment_receiver_balance(&mut self, id: &str, amount: Cents) -> Result<()> {
        if amount < 0 {
            bail!("Refusing to credit negative amount {} to receiver {}", amount, id);
        }

        let result = sqlx::query(
            r#"
            UPDATE receivers
            SET balance_cents = balance_cents + ?
            WHERE id = ? AND balance_cents <= 9223372036854775807 - ?
            "#,
        )
        .bind(amount)
        .bind(id)
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .context("Failed to credit receiver balance")?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM receivers WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch receiver")?
            .is_some();

        if exists {
            bail!("Balance overflow crediting {} to receiver {}", amount, id);
        }
        bail!("Receiver {} disappeared while crediting balance", id);
    }

    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit transaction")
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .context("Failed to roll back transaction")
    }
}

fn row_to_receiver(row: &SqliteRow) -> Result<Receiver> {
    let created_at_str: String = row.try_get("created_at").context("Invalid receiver row")?;

    Ok(Receiver {
        id: row.try_get("id").context("Invalid receiver ID")?,
        balance_cents: row
            .try_get("balance_cents")
            .context("Invalid receiver balance")?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_operation(row: &SqliteRow) -> Result<Operation> {
    let id_str: String = row.try_get("id").context("Invalid operation ID")?;
    let status_str: String = row.try_get("status").context("Invalid operation status")?;
    let created_at_str: String = row.try_get("created_at").context("Invalid operation row")?;

    Ok(Operation {
        id: Uuid::parse_str(&id_str).context("Invalid operation ID")?,
        receiver_id: row.try_get("receiver_id").context("Invalid receiver ID")?,
        gross_cents: row.try_get("gross_cents").context("Invalid gross value")?,
        fee_cents: row.try_get("fee_cents").context("Invalid fee")?,
        net_cents: row.try_get("net_cents").context("Invalid net value")?,
        status: OperationStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid operation status: {}", status_str))?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid created_at timestamp")?
        .with_timezone(&Utc))
}
