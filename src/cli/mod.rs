use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::OperationService;
use crate::config::{LedgerConfig, StoreConfig};
use crate::domain::{FeeRate, Operation, Receiver, decimal_to_cents, format_cents, parse_amount};
use crate::logging::init_logging;

/// Anticipo - Receivables Anticipation Ledger
#[derive(Parser)]
#[command(name = "anticipo")]
#[command(about = "Record anticipation operations and credit receivers on confirmation")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "ANTICIPO_DATABASE", default_value = "anticipo.db")]
    pub database: String,

    /// Fee withheld from every gross value (e.g., "0.03" for 3%)
    #[arg(long, env = "ANTICIPO_FEE_RATE", default_value_t = FeeRate::default())]
    pub fee_rate: FeeRate,

    /// Maximum pooled database connections
    #[arg(long, env = "ANTICIPO_MAX_CONNECTIONS", default_value = "5")]
    pub max_connections: u32,

    /// Milliseconds a statement waits on a locked database before failing
    #[arg(long, env = "ANTICIPO_BUSY_TIMEOUT_MS", default_value = "5000")]
    pub busy_timeout_ms: u64,

    /// Milliseconds to wait for a pooled connection before failing
    #[arg(long, env = "ANTICIPO_ACQUIRE_TIMEOUT_MS", default_value = "10000")]
    pub acquire_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the operations HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "ANTICIPO_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },

    /// Receiver management commands
    #[command(subcommand)]
    Receiver(ReceiverCommands),

    /// Create a pending operation
    Create {
        /// Gross value (e.g., "100.00" or "100")
        gross: String,

        /// Receiver ID
        #[arg(short, long)]
        receiver: String,
    },

    /// Show an operation
    Show {
        /// Operation ID
        id: String,
    },

    /// Confirm an operation and credit its receiver
    Confirm {
        /// Operation ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ReceiverCommands {
    /// Register a receiver
    Add {
        /// Receiver ID (must be unique)
        id: String,

        /// Opening balance
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// Show a receiver and its balance
    Show {
        /// Receiver ID
        id: String,
    },
}

impl Cli {
    pub fn config(&self) -> LedgerConfig {
        let store = StoreConfig {
            max_connections: self.max_connections,
            busy_timeout: std::time::Duration::from_millis(self.busy_timeout_ms),
            acquire_timeout: std::time::Duration::from_millis(self.acquire_timeout_ms),
        };
        LedgerConfig::new(&self.database)
            .with_fee_rate(self.fee_rate)
            .with_store(store)
    }

    pub async fn run(self) -> Result<()> {
        init_logging(self.verbose, self.log_json);
        let config = self.config();

        match self.command {
            Commands::Init => {
                OperationService::init(&config).await?;
                println!("Database initialized: {}", config.database);
            }

            Commands::Serve { bind } => {
                let service = OperationService::init(&config).await?;
                crate::http::serve(service, bind).await?;
            }

            Commands::Receiver(receiver_cmd) => {
                let service = OperationService::connect(&config).await?;
                run_receiver_command(&service, receiver_cmd).await?;
            }

            Commands::Create { gross, receiver } => {
                let service = OperationService::connect(&config).await?;
                let gross_value =
                    parse_amount(&gross).context("Invalid amount format. Use '100.00' or '100'")?;

                let operation = service.create_operation(&receiver, gross_value).await?;
                println!("Created operation {} (awaiting confirmation)", operation.id);
                print_operation(&operation);
            }

            Commands::Show { id } => {
                let service = OperationService::connect(&config).await?;
                let operation_id =
                    Uuid::parse_str(&id).context("Invalid operation ID format (expected UUID)")?;

                let operation = service.get_operation(operation_id).await?;
                print_operation(&operation);
            }

            Commands::Confirm { id } => {
                let service = OperationService::connect(&config).await?;
                let operation_id =
                    Uuid::parse_str(&id).context("Invalid operation ID format (expected UUID)")?;

                let operation = service.confirm_operation(operation_id).await?;
                println!(
                    "Confirmed operation {}: credited {} to {}",
                    operation.id,
                    format_cents(operation.net_cents),
                    operation.receiver_id
                );
            }
        }

        Ok(())
    }
}

async fn run_receiver_command(service: &OperationService, cmd: ReceiverCommands) -> Result<()> {
    match cmd {
        ReceiverCommands::Add { id, balance } => {
            let balance_cents = parse_amount(&balance)
                .ok()
                .and_then(|d| decimal_to_cents(d).ok())
                .context("Invalid balance format. Use '50.00' or '50'")?;

            let receiver = Receiver::new(id).with_balance(balance_cents);
            service.repository().save_receiver(&receiver).await?;
            println!(
                "Registered receiver {} (balance {})",
                receiver.id,
                format_cents(receiver.balance_cents)
            );
        }

        ReceiverCommands::Show { id } => {
            let receiver = service.get_receiver(&id).await?;
            println!("Receiver:   {}", receiver.id);
            println!("Balance:    {}", format_cents(receiver.balance_cents));
            println!("Registered: {}", receiver.created_at.format("%Y-%m-%d %H:%M"));
        }
    }
    Ok(())
}

fn print_operation(operation: &Operation) {
    println!("ID:        {}", operation.id);
    println!("Receiver:  {}", operation.receiver_id);
    println!("Gross:     {}", format_cents(operation.gross_cents));
    println!("Fee:       {}", format_cents(operation.fee_cents));
    println!("Net:       {}", format_cents(operation.net_cents));
    println!("Status:    {}", operation.status);
    println!(
        "Created:   {}",
        operation.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}
