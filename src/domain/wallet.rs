use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Currency, CustomerId};

pub type WalletId = Uuid;

/// A per-customer, per-currency account holding two balances.
///
/// `balance_cents` is the total: it includes pending deposits (provisionally
/// credited) and the still-counted portion of pending withdrawals.
/// `usable_balance_cents` is what new withdrawals may draw on: pending
/// deposits are excluded until settled, pending withdrawals reserve their
/// amount immediately. The two converge once every pending transaction on
/// the wallet resolves; no fixed relation holds in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub customer_id: CustomerId,
    pub name: String,
    pub currency: Currency,
    /// Whether payment (shopping) withdrawals are permitted.
    pub active_for_shopping: bool,
    /// Whether IBAN withdrawals are permitted.
    pub active_for_withdraw: bool,
    pub balance_cents: Cents,
    pub usable_balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet with zero balances and both capabilities enabled.
    pub fn new(customer_id: CustomerId, name: String, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            name,
            currency,
            active_for_shopping: true,
            active_for_withdraw: true,
            balance_cents: 0,
            usable_balance_cents: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_capabilities(mut self, shopping: bool, withdraw: bool) -> Self {
        self.active_for_shopping = shopping;
        self.active_for_withdraw = withdraw;
        self
    }

    /// Seed an opening balance. Opening funds are settled, so both balances
    /// start equal.
    pub fn with_opening_balance(mut self, amount_cents: Cents) -> Self {
        assert!(amount_cents >= 0, "Opening balance cannot be negative");
        self.balance_cents = amount_cents;
        self.usable_balance_cents = amount_cents;
        self
    }
}
