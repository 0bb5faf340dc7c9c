use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;

/// A customer owns zero or more wallets. Ownership is assigned at wallet
/// creation and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub surname: String,
    /// National identity number, unique per customer.
    pub national_id: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: String, surname: String, national_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            surname,
            national_id,
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
