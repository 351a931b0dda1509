// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::str::FromStr;

use anticipo::application::OperationService;
use anticipo::config::LedgerConfig;
use anticipo::domain::{Cents, FeeRate, Receiver};
use anyhow::Result;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(OperationService, TempDir)> {
    test_service_with_rate(FeeRate::default()).await
}

/// Helper to create a test service with a specific fee rate
pub async fn test_service_with_rate(fee_rate: FeeRate) -> Result<(OperationService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let config = LedgerConfig::new(db_path.to_str().unwrap()).with_fee_rate(fee_rate);
    let service = OperationService::init(&config).await?;
    Ok((service, temp_dir))
}

/// Register a receiver directly in the store
pub async fn seed_receiver(service: &OperationService, id: &str, balance: Cents) -> Result<()> {
    let receiver = Receiver::new(id).with_balance(balance);
    service.repository().save_receiver(&receiver).await
}

/// Current balance of a receiver, in cents
pub async fn balance_of(service: &OperationService, id: &str) -> Result<Cents> {
    Ok(service.get_receiver(id).await?.balance_cents)
}

/// Helper to build a decimal from a literal string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}
