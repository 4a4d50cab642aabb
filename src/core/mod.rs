pub mod account;
pub mod error;
pub mod ledger;
pub mod otp;
pub mod secret;

pub use account::{Account, AccountNumber, Amount, KeyField};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{AccountNumberSource, Ledger, ProfileUpdate, RandomNumbers};
pub use otp::{generate_otp, verify_otp, Otp};
