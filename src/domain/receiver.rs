use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

pub type ReceiverId = String;

/// The party credited when an operation is confirmed.
/// Receivers are registered outside the operation flow; the ledger only
/// reads them and adjusts their balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub id: ReceiverId,
    pub balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Receiver {
    pub fn new(id: impl Into<ReceiverId>) -> Self {
        Self {
            id: id.into(),
            balance_cents: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_balance(mut self, balance_cents: Cents) -> Self {
        self.balance_cents = balance_cents;
        self
    }
}
