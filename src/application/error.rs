use thiserror::Error;

use crate::domain::{format_cents, Cents, CustomerId, TransactionId, WalletId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Customer already exists with national id: {0}")]
    CustomerAlreadyExists(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error(
        "Insufficient balance. Requested: {}, Available: {}",
        format_cents(*.requested),
        format_cents(*.available)
    )]
    InsufficientBalance { requested: Cents, available: Cents },

    #[error("Wallet is not active for {0}")]
    WalletNotActive(&'static str),

    #[error("Only pending transactions can be approved or denied")]
    InvalidState,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid decision: {0}. Only APPROVED or DENIED allowed")]
    InvalidDecision(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Wallet is busy, retry the operation")]
    WalletBusy(WalletId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
