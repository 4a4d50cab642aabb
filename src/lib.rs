mod core;
pub mod backend;
pub mod config;

pub use crate::core::{Account, AccountNumber, Amount, KeyField, Ledger, LedgerError, LedgerResult, ProfileUpdate};
pub use crate::core::{AccountNumberSource, RandomNumbers, Otp, generate_otp, verify_otp};
pub use crate::core::{account, ledger, otp};
pub use crate::config::LedgerConfig;
