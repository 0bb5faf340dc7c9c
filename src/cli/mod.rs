use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{AppError, CounterMetrics, MetricsSink, ServiceConfig, WalletService};
use crate::domain::{
    format_cents, parse_cents, Caller, Currency, Transaction, TransactionStatus, Wallet,
};

/// Custodia - Customer Wallet Ledger
#[derive(Parser)]
#[command(name = "custodia")]
#[command(about = "A multi-currency customer wallet ledger with a pending-approval workflow")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "custodia.db")]
    pub database: String,

    /// Amount above which transactions require manual settlement
    #[arg(long, default_value = "1000.00", global = true)]
    pub pending_threshold: String,

    /// Act as a back-office employee
    #[arg(long, global = true)]
    pub as_employee: bool,

    /// Act as the customer with this id
    #[arg(long, global = true, conflicts_with = "as_employee")]
    pub as_customer: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Load sample customers, wallets, and transactions
    Seed,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Wallet management commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Deposit funds into a wallet
    Deposit {
        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Wallet id
        #[arg(long)]
        wallet: String,

        /// Source of funds: an IBAN or a payment reference
        #[arg(long)]
        source: String,
    },

    /// Withdraw funds from a wallet
    Withdraw {
        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        /// Wallet id
        #[arg(long)]
        wallet: String,

        /// Destination of funds: an IBAN or a payment reference
        #[arg(long)]
        destination: String,
    },

    /// List a wallet's transactions, newest first
    Transactions {
        /// Wallet id
        wallet: String,

        /// Show only the pending settlement queue, oldest first
        #[arg(long)]
        pending: bool,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Approve or deny a pending transaction (employees only)
    Settle {
        /// Transaction id
        transaction: String,

        /// Decision: APPROVED or DENIED
        decision: String,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer (employees only)
    Add {
        /// First name
        name: String,

        /// Surname
        surname: String,

        /// National identity number (unique)
        #[arg(long)]
        national_id: String,
    },

    /// List all customers (employees only)
    List,
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create a new wallet for a customer (employees only)
    Create {
        /// Wallet name
        name: String,

        /// Owning customer id
        #[arg(long)]
        customer: String,

        /// Currency code: TRY, USD, EUR
        #[arg(short, long, default_value = "TRY")]
        currency: String,

        /// Disable payment (shopping) withdrawals
        #[arg(long)]
        disable_shopping: bool,

        /// Disable IBAN withdrawals
        #[arg(long)]
        disable_withdraw: bool,
    },

    /// List a customer's wallets
    List {
        /// Customer id
        #[arg(long)]
        customer: String,

        /// Filter by currency
        #[arg(long)]
        currency: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show a single wallet
    Show {
        /// Wallet id
        id: String,

        /// Owning customer id
        #[arg(long)]
        customer: String,
    },
}

impl Cli {
    /// Resolve the caller identity from the global flags. Commands that
    /// mutate or read customer data require one.
    fn caller(&self) -> Result<Caller> {
        if self.as_employee {
            return Ok(Caller::employee());
        }
        if let Some(customer) = &self.as_customer {
            let customer_id = Uuid::parse_str(customer)
                .context("Invalid customer id format (expected UUID)")?;
            return Ok(Caller::customer(customer_id));
        }
        bail!("Specify a caller: --as-employee or --as-customer <id>");
    }

    fn config(&self) -> Result<ServiceConfig> {
        let pending_threshold = parse_cents(&self.pending_threshold)
            .context("Invalid pending threshold. Use '1000.00' or '1000'")?;
        if pending_threshold <= 0 {
            bail!("Pending threshold must be positive");
        }
        Ok(ServiceConfig { pending_threshold })
    }

    async fn connect(&self, metrics: &Arc<CounterMetrics>) -> Result<WalletService> {
        let service = WalletService::connect(&self.database, self.config()?).await?;
        Ok(service.with_metrics(Arc::clone(metrics) as Arc<dyn MetricsSink>))
    }

    pub async fn run(self) -> Result<()> {
        let metrics = Arc::new(CounterMetrics::new());

        match &self.command {
            Commands::Init => {
                WalletService::init(&self.database, self.config()?).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Seed => {
                let service = self.connect(&metrics).await?;
                if service.seed_demo_data().await? {
                    println!("Sample data loaded");
                } else {
                    println!("Sample data already present, nothing to do");
                }
            }

            Commands::Customer(customer_cmd) => {
                let service = self.connect(&metrics).await?;
                let caller = self.caller()?;
                run_customer_command(&service, &caller, customer_cmd).await?;
            }

            Commands::Wallet(wallet_cmd) => {
                let service = self.connect(&metrics).await?;
                let caller = self.caller()?;
                run_wallet_command(&service, &caller, wallet_cmd).await?;
            }

            Commands::Deposit {
                amount,
                wallet,
                source,
            } => {
                let service = self.connect(&metrics).await?;
                let caller = self.caller()?;
                let wallet_id = parse_wallet_id(wallet)?;
                let amount_cents =
                    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;

                guard_wallet(&service, &caller, wallet_id).await?;
                let transaction = service.deposit(wallet_id, amount_cents, source).await?;

                println!(
                    "Deposit of {} recorded with status {} ({})",
                    format_cents(transaction.amount_cents),
                    transaction.status,
                    transaction.id
                );
            }

            Commands::Withdraw {
                amount,
                wallet,
                destination,
            } => {
                let service = self.connect(&metrics).await?;
                let caller = self.caller()?;
                let wallet_id = parse_wallet_id(wallet)?;
                let amount_cents =
                    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;

                guard_wallet(&service, &caller, wallet_id).await?;
                let transaction = service.withdraw(wallet_id, amount_cents, destination).await?;

                println!(
                    "Withdrawal of {} recorded with status {} ({})",
                    format_cents(transaction.amount_cents),
                    transaction.status,
                    transaction.id
                );
            }

            Commands::Transactions {
                wallet,
                pending,
                format,
            } => {
                let service = self.connect(&metrics).await?;
                let caller = self.caller()?;
                let wallet_id = parse_wallet_id(wallet)?;

                guard_wallet(&service, &caller, wallet_id).await?;
                let transactions = if *pending {
                    service.list_pending_transactions(wallet_id).await?
                } else {
                    service.list_transactions(wallet_id).await?
                };
                print_transactions(&transactions, format)?;
            }

            Commands::Settle {
                transaction,
                decision,
            } => {
                let service = self.connect(&metrics).await?;
                let caller = self.caller()?;
                if !caller.is_employee() {
                    return Err(AppError::AccessDenied.into());
                }

                let transaction_id = Uuid::parse_str(transaction)
                    .context("Invalid transaction id format (expected UUID)")?;
                let decision = TransactionStatus::from_str(decision)
                    .ok_or_else(|| AppError::InvalidDecision(decision.clone()))?;

                let settled = service.settle_transaction(transaction_id, decision).await?;
                println!(
                    "Transaction {} settled as {}",
                    settled.id, settled.status
                );
            }
        }

        if self.verbose {
            let snapshot = metrics.snapshot();
            eprintln!(
                "[metrics] deposits={} withdraws={} approved={} pending={}",
                snapshot.deposits, snapshot.withdraws, snapshot.approved, snapshot.pending
            );
        }

        Ok(())
    }
}

async fn run_customer_command(
    service: &WalletService,
    caller: &Caller,
    command: &CustomerCommands,
) -> Result<()> {
    // Customer records are back-office data.
    if !caller.is_employee() {
        return Err(AppError::AccessDenied.into());
    }

    match command {
        CustomerCommands::Add {
            name,
            surname,
            national_id,
        } => {
            let customer = service
                .create_customer(name.clone(), surname.clone(), national_id.clone())
                .await?;
            println!("Created customer {} ({})", customer.full_name(), customer.id);
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers");
                return Ok(());
            }
            for customer in customers {
                println!(
                    "{}  {}  {}",
                    customer.id,
                    customer.full_name(),
                    customer.national_id
                );
            }
        }
    }

    Ok(())
}

async fn run_wallet_command(
    service: &WalletService,
    caller: &Caller,
    command: &WalletCommands,
) -> Result<()> {
    match command {
        WalletCommands::Create {
            name,
            customer,
            currency,
            disable_shopping,
            disable_withdraw,
        } => {
            if !caller.is_employee() {
                return Err(AppError::AccessDenied.into());
            }

            let customer_id = Uuid::parse_str(customer)
                .context("Invalid customer id format (expected UUID)")?;
            let currency = parse_currency(currency)?;

            let wallet = service
                .create_wallet(
                    customer_id,
                    name.clone(),
                    currency,
                    !disable_shopping,
                    !disable_withdraw,
                )
                .await?;
            println!("Created wallet {} ({})", wallet.name, wallet.id);
        }

        WalletCommands::List {
            customer,
            currency,
            format,
        } => {
            let customer_id = Uuid::parse_str(customer)
                .context("Invalid customer id format (expected UUID)")?;
            if !service.is_account_owner(caller, customer_id) {
                return Err(AppError::AccessDenied.into());
            }

            let currency = currency.as_deref().map(parse_currency).transpose()?;
            let wallets = service.list_wallets(customer_id, currency).await?;
            print_wallets(&wallets, format)?;
        }

        WalletCommands::Show { id, customer } => {
            let wallet_id = parse_wallet_id(id)?;
            let customer_id = Uuid::parse_str(customer)
                .context("Invalid customer id format (expected UUID)")?;
            if !service.is_account_owner(caller, customer_id) {
                return Err(AppError::AccessDenied.into());
            }

            let wallet = service.get_wallet(wallet_id, customer_id).await?;
            println!("Wallet:          {} ({})", wallet.name, wallet.id);
            println!("Currency:        {}", wallet.currency);
            println!("Balance:         {}", format_cents(wallet.balance_cents));
            println!(
                "Usable balance:  {}",
                format_cents(wallet.usable_balance_cents)
            );
            println!(
                "Shopping: {}  Withdraw: {}",
                if wallet.active_for_shopping { "on" } else { "off" },
                if wallet.active_for_withdraw { "on" } else { "off" }
            );
        }
    }

    Ok(())
}

/// Ownership gate applied before every wallet-scoped operation.
async fn guard_wallet(service: &WalletService, caller: &Caller, wallet_id: Uuid) -> Result<()> {
    if !service.is_wallet_owner(caller, wallet_id).await? {
        return Err(AppError::AccessDenied.into());
    }
    Ok(())
}

fn parse_wallet_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid wallet id format (expected UUID)")
}

fn parse_currency(code: &str) -> Result<Currency> {
    Currency::from_str(code)
        .with_context(|| format!("Unknown currency '{}'. Use TRY, USD, or EUR", code))
}

fn print_wallets(wallets: &[Wallet], format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(wallets)?),
        _ => {
            if wallets.is_empty() {
                println!("No wallets");
                return Ok(());
            }
            for wallet in wallets {
                println!(
                    "{}  {}  {}  balance {}  usable {}",
                    wallet.id,
                    wallet.name,
                    wallet.currency,
                    format_cents(wallet.balance_cents),
                    format_cents(wallet.usable_balance_cents)
                );
            }
        }
    }
    Ok(())
}

fn print_transactions(transactions: &[Transaction], format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(transactions)?),
        _ => {
            if transactions.is_empty() {
                println!("No transactions");
                return Ok(());
            }
            for txn in transactions {
                println!(
                    "{}  {}  {:8}  {}  {} ({})",
                    txn.created_at.format("%Y-%m-%d %H:%M"),
                    txn.id,
                    txn.kind.as_str(),
                    format_cents(txn.amount_cents),
                    txn.status,
                    txn.counterparty
                );
            }
        }
    }
    Ok(())
}
