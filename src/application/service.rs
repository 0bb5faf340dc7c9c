use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use crate::domain::{
    format_cents, Caller, Cents, CounterpartyKind, Currency, Customer, CustomerId, Transaction,
    TransactionId, TransactionKind, TransactionStatus, Wallet, WalletId,
};
use crate::storage::Repository;

use super::{AppError, LedgerEvent, MetricsSink, NoopMetrics};

/// Startup configuration for the ledger. Read once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Amounts strictly above this threshold are written as PENDING and
    /// require manual settlement.
    pub pending_threshold: Cents,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pending_threshold: 1000_00,
        }
    }
}

/// Application service providing the wallet ledger operations.
/// This is the primary interface for any client (CLI, API, etc.).
///
/// The service performs no authorization itself; callers gate mutating
/// operations through [`WalletService::is_wallet_owner`] /
/// [`WalletService::is_account_owner`] first.
pub struct WalletService {
    repo: Repository,
    config: ServiceConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl WalletService {
    /// Create a new service over the given repository.
    pub fn new(repo: Repository, config: ServiceConfig) -> Self {
        Self {
            repo,
            config,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Replace the metrics sink (events are dropped by default).
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: ServiceConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: ServiceConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, config))
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a new customer. National ids are unique.
    pub async fn create_customer(
        &self,
        name: String,
        surname: String,
        national_id: String,
    ) -> Result<Customer, AppError> {
        if self
            .repo
            .get_customer_by_national_id(&national_id)
            .await?
            .is_some()
        {
            return Err(AppError::CustomerAlreadyExists(national_id));
        }

        let customer = Customer::new(name, surname, national_id);
        self.repo.save_customer(&customer).await?;
        Ok(customer)
    }

    pub async fn get_customer(&self, customer_id: CustomerId) -> Result<Customer, AppError> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound(customer_id))
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.repo.list_customers().await?)
    }

    // ========================
    // Wallet operations
    // ========================

    /// Create a new wallet for a customer, with zero balances.
    pub async fn create_wallet(
        &self,
        customer_id: CustomerId,
        name: String,
        currency: Currency,
        active_for_shopping: bool,
        active_for_withdraw: bool,
    ) -> Result<Wallet, AppError> {
        info!(customer = %customer_id, %currency, "creating wallet");

        let customer = self.get_customer(customer_id).await?;

        let wallet = Wallet::new(customer.id, name, currency)
            .with_capabilities(active_for_shopping, active_for_withdraw);
        self.repo.save_wallet(&wallet).await?;
        Ok(wallet)
    }

    /// List a customer's wallets, optionally filtered by currency.
    pub async fn list_wallets(
        &self,
        customer_id: CustomerId,
        currency: Option<Currency>,
    ) -> Result<Vec<Wallet>, AppError> {
        Ok(self
            .repo
            .list_wallets_for_customer(customer_id, currency)
            .await?)
    }

    /// Get a wallet by id, scoped to its owning customer. The scoped lookup
    /// doubles as an ownership check: a mismatched pair reads as not found.
    pub async fn get_wallet(
        &self,
        wallet_id: WalletId,
        customer_id: CustomerId,
    ) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet_for_customer(wallet_id, customer_id)
            .await?
            .ok_or(AppError::WalletNotFound(wallet_id))
    }

    // ========================
    // Ledger engine
    // ========================

    /// Deposit funds into a wallet.
    ///
    /// The total balance is credited immediately; the usable balance only
    /// when the deposit is auto-approved. A pending deposit becomes usable
    /// at settlement. Deposits are never blocked by capability flags.
    pub async fn deposit(
        &self,
        wallet_id: WalletId,
        amount_cents: Cents,
        source: &str,
    ) -> Result<Transaction, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(format_cents(amount_cents)));
        }

        info!(wallet = %wallet_id, amount = %format_cents(amount_cents), "processing deposit");
        self.metrics.record(LedgerEvent::DepositRequested);

        let _guard = self.lock_wallet(wallet_id).await?;
        let mut tx = self.repo.begin().await?;

        let mut wallet = Repository::get_wallet_in(&mut tx, wallet_id)
            .await?
            .ok_or(AppError::WalletNotFound(wallet_id))?;

        let status = self.initial_status(amount_cents);
        self.record_initial_status(status);

        let transaction = Transaction::new(
            wallet_id,
            TransactionKind::Deposit,
            amount_cents,
            source,
            status,
        );
        Repository::insert_transaction(&mut tx, &transaction).await?;

        wallet.balance_cents += amount_cents;
        if status == TransactionStatus::Approved {
            wallet.usable_balance_cents += amount_cents;
        }
        Repository::update_wallet_balances(&mut tx, &wallet).await?;

        tx.commit().await.context("Failed to commit deposit")?;

        info!(transaction = %transaction.id, %status, "deposit processed");
        Ok(transaction)
    }

    /// Withdraw funds from a wallet.
    ///
    /// The usable balance is debited immediately (reserving the funds against
    /// concurrent withdrawals); the total balance only once the withdrawal is
    /// approved. The destination's classification picks which capability flag
    /// gates the operation.
    pub async fn withdraw(
        &self,
        wallet_id: WalletId,
        amount_cents: Cents,
        destination: &str,
    ) -> Result<Transaction, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(format_cents(amount_cents)));
        }

        info!(wallet = %wallet_id, amount = %format_cents(amount_cents), "processing withdraw");
        self.metrics.record(LedgerEvent::WithdrawRequested);

        let _guard = self.lock_wallet(wallet_id).await?;
        let mut tx = self.repo.begin().await?;

        let mut wallet = Repository::get_wallet_in(&mut tx, wallet_id)
            .await?
            .ok_or(AppError::WalletNotFound(wallet_id))?;

        match CounterpartyKind::classify(destination) {
            CounterpartyKind::Payment if !wallet.active_for_shopping => {
                return Err(AppError::WalletNotActive("shopping"));
            }
            CounterpartyKind::Iban if !wallet.active_for_withdraw => {
                return Err(AppError::WalletNotActive("withdraw"));
            }
            _ => {}
        }

        if wallet.usable_balance_cents < amount_cents {
            return Err(AppError::InsufficientBalance {
                requested: amount_cents,
                available: wallet.usable_balance_cents,
            });
        }

        let status = self.initial_status(amount_cents);
        self.record_initial_status(status);

        let transaction = Transaction::new(
            wallet_id,
            TransactionKind::Withdraw,
            amount_cents,
            destination,
            status,
        );
        Repository::insert_transaction(&mut tx, &transaction).await?;

        wallet.usable_balance_cents -= amount_cents;
        if status == TransactionStatus::Approved {
            wallet.balance_cents -= amount_cents;
        }
        Repository::update_wallet_balances(&mut tx, &wallet).await?;

        tx.commit().await.context("Failed to commit withdraw")?;

        info!(transaction = %transaction.id, %status, "withdraw processed");
        Ok(transaction)
    }

    // ========================
    // Approval resolver
    // ========================

    /// Move a pending transaction to a terminal state and reconcile the
    /// owning wallet.
    ///
    /// Reconciliation reverses exactly the pending-side effect the engine
    /// applied at creation and, on approval, applies the deferred one:
    /// an approved deposit releases its amount into the usable balance, a
    /// denied deposit backs it out of the total; an approved withdrawal
    /// debits the total, a denied one releases the reservation.
    pub async fn settle_transaction(
        &self,
        transaction_id: TransactionId,
        decision: TransactionStatus,
    ) -> Result<Transaction, AppError> {
        let approved = match decision {
            TransactionStatus::Approved => true,
            TransactionStatus::Denied => false,
            other => return Err(AppError::InvalidDecision(other.to_string())),
        };

        info!(transaction = %transaction_id, %decision, "processing settlement");

        // Resolve the owning wallet so its lock can be taken; the pending
        // check is repeated under the lock.
        let probe = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        let _guard = self.lock_wallet(probe.wallet_id).await?;
        let mut tx = self.repo.begin().await?;

        let mut transaction = Repository::get_transaction_in(&mut tx, transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        if !transaction.is_pending() {
            return Err(AppError::InvalidState);
        }

        let mut wallet = Repository::get_wallet_in(&mut tx, transaction.wallet_id)
            .await?
            .ok_or(AppError::WalletNotFound(transaction.wallet_id))?;

        transaction.status = decision;
        transaction.updated_at = Utc::now();
        Repository::update_transaction_settlement(&mut tx, &transaction).await?;

        match transaction.kind {
            TransactionKind::Deposit if approved => {
                wallet.usable_balance_cents += transaction.amount_cents;
            }
            TransactionKind::Deposit => {
                wallet.balance_cents -= transaction.amount_cents;
            }
            TransactionKind::Withdraw if approved => {
                wallet.balance_cents -= transaction.amount_cents;
            }
            TransactionKind::Withdraw => {
                wallet.usable_balance_cents += transaction.amount_cents;
            }
        }
        Repository::update_wallet_balances(&mut tx, &wallet).await?;

        tx.commit().await.context("Failed to commit settlement")?;

        info!(transaction = %transaction.id, %decision, "settlement processed");
        Ok(transaction)
    }

    // ========================
    // Transaction queries
    // ========================

    /// List a wallet's transactions, newest first.
    pub async fn list_transactions(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions_for_wallet(wallet_id).await?)
    }

    /// List a wallet's pending transactions, oldest first: the queue an
    /// employee works through when settling.
    pub async fn list_pending_transactions(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_pending_for_wallet(wallet_id).await?)
    }

    pub async fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))
    }

    // ========================
    // Access guard
    // ========================

    /// Whether the caller may act on customer-scoped data. Pure check.
    pub fn is_account_owner(&self, caller: &Caller, customer_id: CustomerId) -> bool {
        caller.can_access_customer(customer_id)
    }

    /// Whether the caller may act on the given wallet. Employees always may;
    /// customers only when the wallet belongs to their customer record.
    pub async fn is_wallet_owner(
        &self,
        caller: &Caller,
        wallet_id: WalletId,
    ) -> Result<bool, AppError> {
        if caller.is_employee() {
            return Ok(true);
        }
        let Some(customer_id) = caller.customer_id else {
            return Ok(false);
        };
        Ok(self
            .repo
            .get_wallet_for_customer(wallet_id, customer_id)
            .await?
            .is_some())
    }

    // ========================
    // Demo data
    // ========================

    /// Load sample customers, wallets, and transaction history into an empty
    /// database. Returns false (and loads nothing) if customers already exist.
    pub async fn seed_demo_data(&self) -> Result<bool, AppError> {
        if self.repo.count_customers().await? > 0 {
            info!("sample data already exists, skipping load");
            return Ok(false);
        }

        let ahmet = self
            .create_customer("Ahmet".into(), "Yilmaz".into(), "12345678901".into())
            .await?;
        let fatma = self
            .create_customer("Fatma".into(), "Demir".into(), "12345678902".into())
            .await?;
        let mehmet = self
            .create_customer("Mehmet".into(), "Kaya".into(), "12345678903".into())
            .await?;

        let main_wallet = Wallet::new(ahmet.id, "Main Wallet".into(), Currency::Try)
            .with_opening_balance(5000_00);
        let usd_wallet = Wallet::new(ahmet.id, "USD Wallet".into(), Currency::Usd)
            .with_capabilities(true, false)
            .with_opening_balance(1000_00);
        let savings = Wallet::new(fatma.id, "Savings Wallet".into(), Currency::Try)
            .with_capabilities(false, true)
            .with_opening_balance(3000_00);
        let euro_wallet = Wallet::new(fatma.id, "Euro Wallet".into(), Currency::Eur)
            .with_opening_balance(500_00);
        let daily = Wallet::new(mehmet.id, "Daily Wallet".into(), Currency::Try)
            .with_opening_balance(2000_00);

        for wallet in [&main_wallet, &usd_wallet, &savings, &euro_wallet, &daily] {
            self.repo.save_wallet(wallet).await?;
        }

        let history = [
            (
                &main_wallet,
                500_00,
                TransactionKind::Deposit,
                "TR123456789012345678901234",
                TransactionStatus::Approved,
            ),
            (
                &main_wallet,
                1500_00,
                TransactionKind::Deposit,
                "TR987654321098765432109876",
                TransactionStatus::Pending,
            ),
            (
                &main_wallet,
                200_00,
                TransactionKind::Withdraw,
                "PAY123456",
                TransactionStatus::Approved,
            ),
            (
                &usd_wallet,
                300_00,
                TransactionKind::Deposit,
                "PAY789012",
                TransactionStatus::Approved,
            ),
            (
                &usd_wallet,
                1200_00,
                TransactionKind::Deposit,
                "US123456789012345678901234",
                TransactionStatus::Pending,
            ),
            (
                &savings,
                800_00,
                TransactionKind::Deposit,
                "TR555666777888999000111222",
                TransactionStatus::Approved,
            ),
            (
                &savings,
                400_00,
                TransactionKind::Withdraw,
                "PAY345678",
                TransactionStatus::Approved,
            ),
            (
                &euro_wallet,
                200_00,
                TransactionKind::Deposit,
                "DE123456789012345678901234",
                TransactionStatus::Approved,
            ),
            (
                &euro_wallet,
                1100_00,
                TransactionKind::Deposit,
                "PAY901234",
                TransactionStatus::Pending,
            ),
            (
                &daily,
                2000_00,
                TransactionKind::Deposit,
                "PAY789123",
                TransactionStatus::Pending,
            ),
            (
                &daily,
                150_00,
                TransactionKind::Withdraw,
                "TR111222333444555666777888",
                TransactionStatus::Approved,
            ),
        ];
        for (wallet, amount, kind, counterparty, status) in history {
            let txn = Transaction::new(wallet.id, kind, amount, counterparty, status);
            self.repo.save_transaction(&txn).await?;
        }

        info!("sample data loaded");
        Ok(true)
    }

    // ========================
    // Internals
    // ========================

    fn initial_status(&self, amount_cents: Cents) -> TransactionStatus {
        if amount_cents > self.config.pending_threshold {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Approved
        }
    }

    fn record_initial_status(&self, status: TransactionStatus) {
        let event = if status == TransactionStatus::Approved {
            LedgerEvent::TransactionApproved
        } else {
            LedgerEvent::TransactionPending
        };
        self.metrics.record(event);
    }

    async fn lock_wallet(
        &self,
        wallet_id: WalletId,
    ) -> Result<tokio::sync::OwnedMutexGuard<()>, AppError> {
        self.repo
            .lock_wallet(wallet_id)
            .await
            .ok_or(AppError::WalletBusy(wallet_id))
    }
}
