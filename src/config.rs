use std::time::Duration;

use crate::domain::FeeRate;

/// Connection settings for the ledger database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub max_connections: u32,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// How long a caller waits for a pooled connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Process-wide configuration, fixed at startup and injected into the service.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Database file path
    pub database: String,
    pub fee_rate: FeeRate,
    pub store: StoreConfig,
}

impl LedgerConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            fee_rate: FeeRate::default(),
            store: StoreConfig::default(),
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: FeeRate) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Connection URL that creates the database file if missing.
    pub fn create_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database)
    }

    /// Connection URL for an existing database.
    pub fn connect_url(&self) -> String {
        format!("sqlite:{}", self.database)
    }
}
