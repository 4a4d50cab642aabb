use thiserror::Error;

use crate::backend::BackendError;
use crate::core::account::{Amount, KeyField, UserName};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Occurs when a registration or profile update would give
    /// two accounts the same username, email or phone.
    #[error("{field} already exists: {value}")]
    DuplicateKey {
        field: KeyField,
        value: String
    },
    /// Occurs when no account matches a lookup credential.
    #[error("no such account: {0}")]
    NotFound(String),
    /// Occurs when a supplied secret or one-time code does not match.
    #[error("authentication failed")]
    Authentication,
    /// Occurs when an amount is negative, or zero where a positive
    /// amount is required.
    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount
    },
    #[error("recipient account not found: {0}")]
    RecipientNotFound(UserName),
    #[error("cannot transfer from {0} to itself")]
    SelfTransfer(UserName),
    /// Every freshly drawn account number collided with an existing one.
    /// The number space is too crowded for the configured attempt cap.
    #[error("no unique account number after {attempts} attempts")]
    AccountNumberExhausted {
        attempts: usize
    },
    #[error("failed to hash secret: {0}")]
    Credential(String),
    #[error(transparent)]
    Persistence(#[from] BackendError)
}

pub type LedgerResult<T> = Result<T, LedgerError>;
