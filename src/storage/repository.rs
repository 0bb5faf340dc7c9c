use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction as SqlTransaction};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::domain::{
    CounterpartyKind, Currency, Customer, CustomerId, Transaction, TransactionId, TransactionKind,
    TransactionStatus, Wallet, WalletId,
};

use super::{WalletLocks, MIGRATION_001_INITIAL};

/// Bounded wait for a wallet's exclusive lock.
const WALLET_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository for persisting and querying customers, wallets, and
/// transactions. Owns the per-wallet lock registry: callers that mutate
/// balances take the lock first, then run the whole unit of work inside
/// one database transaction obtained from [`Repository::begin`].
pub struct Repository {
    pool: SqlitePool,
    locks: WalletLocks,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: WalletLocks::new(WALLET_LOCK_TIMEOUT),
        }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
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
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Begin a database transaction for one atomic unit of work.
    pub async fn begin(&self) -> Result<SqlTransaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    /// Acquire the exclusive lock for one wallet. None means the bounded
    /// wait was exceeded.
    pub async fn lock_wallet(&self, wallet_id: WalletId) -> Option<OwnedMutexGuard<()>> {
        self.locks.acquire(wallet_id).await
    }

    // ========================
    // Customer operations
    // ========================

    /// Save a new customer to the database.
    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, surname, national_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.surname)
        .bind(&customer.national_id)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, surname, national_id, created_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a customer by national id.
    pub async fn get_customer_by_national_id(&self, national_id: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, surname, national_id, created_at
            FROM customers
            WHERE national_id = ?
            "#,
        )
        .bind(national_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by national id")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    /// List all customers.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, name, surname, national_id, created_at FROM customers ORDER BY surname, name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Count customers (used to decide whether to load sample data).
    pub async fn count_customers(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM customers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count customers")?;
        Ok(row.get("count"))
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            name: row.get("name"),
            surname: row.get("surname"),
            national_id: row.get("national_id"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Wallet operations
    // ========================

    /// Save a new wallet to the database.
    pub async fn save_wallet(&self, wallet: &Wallet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, customer_id, wallet_name, currency, active_for_shopping, active_for_withdraw, balance_cents, usable_balance_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id.to_string())
        .bind(wallet.customer_id.to_string())
        .bind(&wallet.name)
        .bind(wallet.currency.as_str())
        .bind(wallet.active_for_shopping)
        .bind(wallet.active_for_withdraw)
        .bind(wallet.balance_cents)
        .bind(wallet.usable_balance_cents)
        .bind(wallet.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save wallet")?;
        Ok(())
    }

    /// Get a wallet by ID, scoped to its owning customer.
    pub async fn get_wallet_for_customer(
        &self,
        wallet_id: WalletId,
        customer_id: CustomerId,
    ) -> Result<Option<Wallet>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, wallet_name, currency, active_for_shopping, active_for_withdraw, balance_cents, usable_balance_cents, created_at
            FROM wallets
            WHERE id = ? AND customer_id = ?
            "#,
        )
        .bind(wallet_id.to_string())
        .bind(customer_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet for customer")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_wallet(&row)?)),
            None => Ok(None),
        }
    }

    /// List a customer's wallets, optionally filtered by currency.
    pub async fn list_wallets_for_customer(
        &self,
        customer_id: CustomerId,
        currency: Option<Currency>,
    ) -> Result<Vec<Wallet>> {
        let rows = match currency {
            Some(currency) => sqlx::query(
                r#"
                SELECT id, customer_id, wallet_name, currency, active_for_shopping, active_for_withdraw, balance_cents, usable_balance_cents, created_at
                FROM wallets
                WHERE customer_id = ? AND currency = ?
                ORDER BY wallet_name
                "#,
            )
            .bind(customer_id.to_string())
            .bind(currency.as_str())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                r#"
                SELECT id, customer_id, wallet_name, currency, active_for_shopping, active_for_withdraw, balance_cents, usable_balance_cents, created_at
                FROM wallets
                WHERE customer_id = ?
                ORDER BY wallet_name
                "#,
            )
            .bind(customer_id.to_string())
            .fetch_all(&self.pool)
            .await,
        }
        .context("Failed to list wallets")?;

        rows.iter().map(Self::row_to_wallet).collect()
    }

    /// Get a wallet within an open unit of work. Balance mutations go
    /// through this so the read and the write share one transaction.
    pub async fn get_wallet_in(
        conn: &mut SqliteConnection,
        id: WalletId,
    ) -> Result<Option<Wallet>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, wallet_name, currency, active_for_shopping, active_for_withdraw, balance_cents, usable_balance_cents, created_at
            FROM wallets
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch wallet")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_wallet(&row)?)),
            None => Ok(None),
        }
    }

    /// Persist a wallet's balance pair within an open unit of work.
    pub async fn update_wallet_balances(
        conn: &mut SqliteConnection,
        wallet: &Wallet,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = ?, usable_balance_cents = ?
            WHERE id = ?
            "#,
        )
        .bind(wallet.balance_cents)
        .bind(wallet.usable_balance_cents)
        .bind(wallet.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update wallet balances")?;
        Ok(())
    }

    fn row_to_wallet(row: &sqlx::sqlite::SqliteRow) -> Result<Wallet> {
        let id_str: String = row.get("id");
        let customer_id_str: String = row.get("customer_id");
        let currency_str: String = row.get("currency");
        let created_at_str: String = row.get("created_at");

        Ok(Wallet {
            id: Uuid::parse_str(&id_str).context("Invalid wallet ID")?,
            customer_id: Uuid::parse_str(&customer_id_str).context("Invalid customer ID")?,
            name: row.get("wallet_name"),
            currency: Currency::from_str(&currency_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid currency: {}", currency_str))?,
            active_for_shopping: row.get::<i32, _>("active_for_shopping") != 0,
            active_for_withdraw: row.get::<i32, _>("active_for_withdraw") != 0,
            balance_cents: row.get("balance_cents"),
            usable_balance_cents: row.get("usable_balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Save a new transaction outside a unit of work (seeding, tooling).
    pub async fn save_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        Self::insert_transaction(&mut conn, transaction).await
    }

    /// Insert a transaction within an open unit of work.
    pub async fn insert_transaction(
        conn: &mut SqliteConnection,
        transaction: &Transaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, wallet_id, amount_cents, kind, counterparty, counterparty_kind, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.wallet_id.to_string())
        .bind(transaction.amount_cents)
        .bind(transaction.kind.as_str())
        .bind(&transaction.counterparty)
        .bind(transaction.counterparty_kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at.to_rfc3339())
        .bind(transaction.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Persist a settlement: status and updated_at only, nothing else about
    /// a transaction ever changes.
    pub async fn update_transaction_settlement(
        conn: &mut SqliteConnection,
        transaction: &Transaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(transaction.status.as_str())
        .bind(transaction.updated_at.to_rfc3339())
        .bind(transaction.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update transaction status")?;
        Ok(())
    }

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        Self::get_transaction_in(&mut conn, id).await
    }

    /// Get a transaction within an open unit of work.
    pub async fn get_transaction_in(
        conn: &mut SqliteConnection,
        id: TransactionId,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, wallet_id, amount_cents, kind, counterparty, counterparty_kind, status, created_at, updated_at
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List a wallet's transactions, newest first.
    pub async fn list_transactions_for_wallet(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, wallet_id, amount_cents, kind, counterparty, counterparty_kind, status, created_at, updated_at
            FROM transactions
            WHERE wallet_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(wallet_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List a wallet's pending transactions, oldest first (settlement queue).
    pub async fn list_pending_for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, wallet_id, amount_cents, kind, counterparty, counterparty_kind, status, created_at, updated_at
            FROM transactions
            WHERE wallet_id = ? AND status = 'PENDING'
            ORDER BY created_at
            "#,
        )
        .bind(wallet_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pending transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let wallet_id_str: String = row.get("wallet_id");
        let kind_str: String = row.get("kind");
        let counterparty_kind_str: String = row.get("counterparty_kind");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            wallet_id: Uuid::parse_str(&wallet_id_str).context("Invalid wallet ID")?,
            amount_cents: row.get("amount_cents"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            counterparty: row.get("counterparty"),
            counterparty_kind: CounterpartyKind::from_str(&counterparty_kind_str).ok_or_else(
                || anyhow::anyhow!("Invalid counterparty kind: {}", counterparty_kind_str),
            )?,
            status: TransactionStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
