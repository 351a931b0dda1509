use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    FeeRate, Operation, OperationId, OperationStatus, Receiver, decimal_to_cents, format_cents,
};
use crate::storage::Repository;

use super::AppError;

/// Application service for the anticipation lifecycle.
/// This is the primary interface for any client (CLI, HTTP, tests).
#[derive(Clone)]
pub struct OperationService {
    repo: Repository,
    fee_rate: FeeRate,
}

impl OperationService {
    /// Create a new service over the given repository.
    pub fn new(repo: Repository, fee_rate: FeeRate) -> Self {
        Self { repo, fee_rate }
    }

    /// Initialize a new database (creating it if needed) and connect to it.
    pub async fn init(config: &LedgerConfig) -> Result<Self, AppError> {
        let repo = Repository::init(&config.create_url(), &config.store).await?;
        Ok(Self::new(repo, config.fee_rate))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, AppError> {
        let repo = Repository::connect(&config.connect_url(), &config.store).await?;
        Ok(Self::new(repo, config.fee_rate))
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Get a receiver, including its current balance.
    pub async fn get_receiver(&self, id: &str) -> Result<Receiver, AppError> {
        self.repo
            .find_receiver(id)
            .await?
            .ok_or_else(|| AppError::ReceiverNotFound(id.to_string()))
    }

    /// Create a pending operation for a receiver.
    ///
    /// Input is validated before touching the store. No balance moves until
    /// the operation is confirmed.
    pub async fn create_operation(
        &self,
        receiver_id: &str,
        gross_value: Decimal,
    ) -> Result<Operation, AppError> {
        if receiver_id.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "receiver_id must not be empty".to_string(),
            ));
        }
        if gross_value <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "gross_value must be a positive number".to_string(),
            ));
        }
        let gross_cents =
            decimal_to_cents(gross_value).map_err(|e| AppError::InvalidInput(e.to_string()))?;

        if self.repo.find_receiver(receiver_id).await?.is_none() {
            return Err(AppError::ReceiverNotFound(receiver_id.to_string()));
        }

        let split = self.fee_rate.split(gross_cents);
        let operation = Operation::new(receiver_id.to_string(), gross_cents, split);
        let operation = self.repo.insert_operation(&operation).await?;

        info!(
            operation_id = %operation.id,
            receiver_id = %operation.receiver_id,
            gross = %format_cents(operation.gross_cents),
            fee = %format_cents(operation.fee_cents),
            net = %format_cents(operation.net_cents),
            "operation created, awaiting confirmation"
        );
        Ok(operation)
    }

    /// Get an operation by ID.
    pub async fn get_operation(&self, id: OperationId) -> Result<Operation, AppError> {
        debug!(operation_id = %id, "fetching operation");
        self.repo
            .find_operation(id)
            .await?
            .ok_or_else(|| AppError::OperationNotFound(id.to_string()))
    }

    /// Confirm a pending operation and credit its net value to the receiver.
    ///
    /// The status change and the credit commit together or not at all.
    /// A second confirmation is rejected with `AlreadyConfirmed`.
    ///
    /// The spawned task is always awaited here, so it is not background work:
    /// it only keeps the transaction alive until commit or rollback when the
    /// caller stops waiting.
    pub async fn confirm_operation(&self, id: OperationId) -> Result<Operation, AppError> {
        let repo = self.repo.clone();
        let handle = tokio::spawn(async move { confirm_in_transaction(&repo, id).await });

        let credited = match handle.await {
            Ok(result) => result?,
            Err(e) => {
                error!(operation_id = %id, error = %e, "confirmation task failed");
                return Err(AppError::Store(anyhow::anyhow!(
                    "Confirmation task for operation {} failed: {}",
                    id,
                    e
                )));
            }
        };

        info!(
            operation_id = %id,
            receiver_id = %credited.receiver_id,
            net = %format_cents(credited.net_cents),
            "operation confirmed, receiver credited"
        );

        self.repo.find_operation(id).await?.ok_or_else(|| {
            AppError::Store(anyhow::anyhow!(
                "Operation {} vanished after confirmation",
                id
            ))
        })
    }
}

async fn confirm_in_transaction(repo: &Repository, id: OperationId) -> Result<Operation, AppError> {
    let mut tx = repo.begin().await?;

    // Status write first: it takes the write lock, so the check below and
    // the credit are serialized against any concurrent confirmation.
    let claimed = tx
        .set_operation_status(id, OperationStatus::Pending, OperationStatus::Confirmed)
        .await?;

    let operation = match claimed {
        Some(operation) => operation,
        None => {
            let existing = tx.find_operation(id).await?;
            tx.rollback().await?;
            return Err(match existing {
                Some(op) if op.is_confirmed() => {
                    warn!(operation_id = %id, "rejected repeated confirmation");
                    AppError::AlreadyConfirmed(id.to_string())
                }
                Some(op) => AppError::Store(anyhow::anyhow!(
                    "Operation {} in unexpected status {}",
                    id,
                    op.status
                )),
                None => AppError::OperationNotFound(id.to_string()),
            });
        }
    };

    tx.increment_receiver_balance(&operation.receiver_id, operation.net_cents)
        .await?;
    tx.commit().await?;

    Ok(operation)
}
