mod access;
mod currency;
mod customer;
mod money;
mod transaction;
mod wallet;

pub use access::*;
pub use currency::*;
pub use customer::*;
pub use money::*;
pub use transaction::*;
pub use wallet::*;
