use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, WalletId};

pub type TransactionId = Uuid;

/// Direction of a balance-affecting operation. The stored amount is always
/// positive; the kind carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DEPOSIT" => Some(TransactionKind::Deposit),
            "WITHDRAW" => Some(TransactionKind::Withdraw),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status. Transitions are one-way: PENDING may become APPROVED
/// or DENIED; both of those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Denied,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Denied => "DENIED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(TransactionStatus::Pending),
            "APPROVED" => Some(TransactionStatus::Approved),
            "DENIED" => Some(TransactionStatus::Denied),
            _ => None,
        }
    }

    /// A settlement decision must be one of the terminal states.
    pub fn is_settlement_decision(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Approved | TransactionStatus::Denied
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of the transaction's counterparty identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterpartyKind {
    Iban,
    Payment,
}

impl CounterpartyKind {
    /// Structural heuristic, not IBAN validation: identifiers that start
    /// with "TR" (case-insensitive) and run longer than 20 characters are
    /// treated as IBANs, everything else as payment references.
    pub fn classify(party: &str) -> Self {
        if party.chars().count() > 20 && party.to_uppercase().starts_with("TR") {
            CounterpartyKind::Iban
        } else {
            CounterpartyKind::Payment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CounterpartyKind::Iban => "IBAN",
            CounterpartyKind::Payment => "PAYMENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IBAN" => Some(CounterpartyKind::Iban),
            "PAYMENT" => Some(CounterpartyKind::Payment),
            _ => None,
        }
    }
}

impl std::fmt::Display for CounterpartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded balance-affecting operation on one wallet. Immutable after
/// creation except for the status/updated_at pair, which the approval
/// resolver moves to a terminal state exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    /// Amount in cents (always positive; sign implied by `kind`)
    pub amount_cents: Cents,
    pub kind: TransactionKind,
    /// Counterparty identifier: an IBAN string or a payment reference.
    pub counterparty: String,
    /// Derived from `counterparty`, never caller-supplied.
    pub counterparty_kind: CounterpartyKind,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        wallet_id: WalletId,
        kind: TransactionKind,
        amount_cents: Cents,
        counterparty: impl Into<String>,
        status: TransactionStatus,
    ) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        let counterparty = counterparty.into();
        let counterparty_kind = CounterpartyKind::classify(&counterparty);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            amount_cents,
            kind,
            counterparty,
            counterparty_kind,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}
