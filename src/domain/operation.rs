use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, FeeSplit, ReceiverId};

pub type OperationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Created, waiting for confirmation. No balance has moved yet.
    Pending,
    /// Net value credited to the receiver. Terminal.
    Confirmed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Confirmed => "confirmed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OperationStatus::Pending),
            "confirmed" => Some(OperationStatus::Confirmed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Confirmed)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An anticipation: a gross amount owed to a receiver, discounted by a fee.
/// Amounts are fixed at creation; only `status` ever changes, and only once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub receiver_id: ReceiverId,
    /// Amount owed before the fee (always positive)
    pub gross_cents: Cents,
    pub fee_cents: Cents,
    /// Amount credited on confirmation
    pub net_cents: Cents,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    /// Create a pending operation for an already validated gross amount.
    pub fn new(receiver_id: ReceiverId, gross_cents: Cents, split: FeeSplit) -> Self {
        assert!(gross_cents > 0, "Operation gross value must be positive");
        debug_assert_eq!(split.fee + split.net, gross_cents);
        Self {
            id: Uuid::new_v4(),
            receiver_id,
            gross_cents,
            fee_cents: split.fee,
            net_cents: split.net,
            status: OperationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status.is_terminal()
    }
}
