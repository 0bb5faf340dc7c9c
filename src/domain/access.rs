use serde::{Deserialize, Serialize};

use super::CustomerId;

/// Resolved role of a caller. Authentication happens elsewhere; the ledger
/// only ever sees the resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Back-office staff: may act on any customer's wallets.
    Employee,
    /// End user: may act only on wallets of their own customer record.
    Customer,
}

/// Caller identity as supplied by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub role: Role,
    /// Present for customer callers; employees carry no customer id.
    pub customer_id: Option<CustomerId>,
}

impl Caller {
    pub fn employee() -> Self {
        Self {
            role: Role::Employee,
            customer_id: None,
        }
    }

    pub fn customer(customer_id: CustomerId) -> Self {
        Self {
            role: Role::Customer,
            customer_id: Some(customer_id),
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Ownership predicate for customer-scoped data: employees see
    /// everything, customers only their own record. Pure, no storage access.
    pub fn can_access_customer(&self, target: CustomerId) -> bool {
        if self.is_employee() {
            return true;
        }
        self.customer_id == Some(target)
    }
}
