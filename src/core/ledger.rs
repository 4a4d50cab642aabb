use std::collections::HashSet;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use crate::backend::{Accounts, BackendError, SnapshotStore};
use crate::core::account::{Account, AccountNumber, Amount, KeyField};
use crate::core::error::{LedgerError, LedgerResult};
use crate::core::secret::SecretHash;

/// Supplies candidate account numbers. Candidates may collide; the ledger retries.
pub trait AccountNumberSource: Send {
    fn next_number(&mut self) -> AccountNumber;
}

impl<F> AccountNumberSource for F
where
    F: FnMut() -> AccountNumber + Send
{
    fn next_number(&mut self) -> AccountNumber {
        self()
    }
}

#[derive(Debug, Default)]
pub struct RandomNumbers;

impl AccountNumberSource for RandomNumbers {
    fn next_number(&mut self) -> AccountNumber {
        AccountNumber::random(&mut rand::thread_rng())
    }
}

/// Editable parts of an account. The username never changes.
#[derive(Clone, PartialEq, Debug)]
pub enum ProfileUpdate {
    Secret(String),
    Email(String),
    Phone(String)
}

/// In-memory authoritative account set, persisted in full after every mutation.
///
/// Mutations hold the write guard from validation until the snapshot is
/// written. A failed write rolls the change back before the guard is released.
pub struct Ledger<S: SnapshotStore> {
    accounts: RwLock<Accounts>,
    numbers: Mutex<Box<dyn AccountNumberSource>>,
    number_attempts: usize,
    store: S
}

impl<S: SnapshotStore> Ledger<S> {
    pub const DEFAULT_NUMBER_ATTEMPTS: usize = 16;

    /// Restores the ledger from `store`. A snapshot that cannot be read or
    /// breaks an invariant is set aside and replaced by an empty ledger.
    pub fn open(store: S) -> Ledger<S> {
        let accounts = match store.load().and_then(|accounts| {
            Ledger::<S>::check_snapshot(&accounts)?;
            Ok(accounts)
        }) {
            Ok(accounts) => accounts,
            Err(err) => {
                log::warn!("could not restore snapshot, starting with an empty ledger: {}", err);
                match store.set_aside() {
                    Ok(Some(path)) => log::warn!("unreadable snapshot kept at {}", path.display()),
                    Ok(None) => (),
                    Err(err) => log::error!("could not set the unreadable snapshot aside, \
                        the next save replaces it: {}", err)
                }
                Accounts::new()
            }
        };

        Ledger {
            accounts: RwLock::new(accounts),
            numbers: Mutex::new(Box::new(RandomNumbers)),
            number_attempts: Self::DEFAULT_NUMBER_ATTEMPTS,
            store
        }
    }

    pub fn with_number_source(mut self, source: impl AccountNumberSource + 'static) -> Ledger<S> {
        self.numbers = Mutex::new(Box::new(source));
        self
    }

    pub fn with_number_attempts(mut self, attempts: usize) -> Ledger<S> {
        self.number_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn register(&self, username: &str, email: &str, phone: &str, secret: &str,
                    initial_balance: Amount) -> LedgerResult<Account> {
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(initial_balance));
        }
        let secret = SecretHash::hash(secret)?;

        let mut accounts = self.write();
        Ledger::<S>::check_unique(&accounts, None, KeyField::Username, username)?;
        Ledger::<S>::check_unique(&accounts, None, KeyField::Email, email)?;
        Ledger::<S>::check_unique(&accounts, None, KeyField::Phone, phone)?;
        let account_number = self.fresh_account_number(&accounts)?;

        let account = Account::new(username, email, phone, secret, account_number, initial_balance);
        accounts.insert(username.to_owned(), account.clone());
        self.commit(&mut accounts, |accounts| { accounts.remove(username); })?;

        log::info!("registered {} as account {}", username, account.account_number());
        return Ok(account);
    }

    /// Matches usernames first, then emails, then phone numbers.
    pub fn find_by_any_key(&self, credential: &str) -> LedgerResult<Account> {
        let accounts = self.read();
        if let Some(account) = accounts.get(credential) {
            return Ok(account.clone());
        }
        [KeyField::Email, KeyField::Phone].iter()
            .find_map(|field| accounts.values().find(|account| account.key(*field) == credential))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(credential.to_owned()))
    }

    /// Checks `supplied` against the ledger's current secret for the account,
    /// not against the copy passed in. Deleted accounts never authenticate.
    pub fn authenticate(&self, account: &Account, supplied: &str) -> bool {
        let secret = self.read().get(account.username()).map(|current| current.secret().clone());
        match secret {
            Some(secret) => secret.verify(supplied),
            None => false
        }
    }

    /// Lookup by any key followed by authentication.
    pub fn login(&self, credential: &str, supplied: &str) -> LedgerResult<Account> {
        let account = self.find_by_any_key(credential)?;
        if !self.authenticate(&account, supplied) {
            log::info!("failed login for {}", account.username());
            return Err(LedgerError::Authentication);
        }
        return Ok(account);
    }

    /// Overwrites the secret of an account whose owner was verified out of band.
    pub fn reset_secret(&self, account: &Account, new_secret: &str) -> LedgerResult<()> {
        let secret = SecretHash::hash(new_secret)?;
        let username = account.username();

        let mut accounts = self.write();
        let current = accounts.get_mut(username)
            .ok_or_else(|| LedgerError::NotFound(username.to_owned()))?;
        let previous = current.secret().clone();
        current.set_secret(secret);
        self.commit(&mut accounts, |accounts| {
            if let Some(current) = accounts.get_mut(username) {
                current.set_secret(previous);
            }
        })?;

        log::info!("secret reset for {}", username);
        return Ok(());
    }

    /// Email and phone changes must stay unique across all other accounts.
    pub fn update_profile(&self, account: &Account, update: ProfileUpdate) -> LedgerResult<()> {
        let (field, value) = match update {
            ProfileUpdate::Secret(secret) => return self.reset_secret(account, &secret),
            ProfileUpdate::Email(email) => (KeyField::Email, email),
            ProfileUpdate::Phone(phone) => (KeyField::Phone, phone)
        };
        let username = account.username();

        let mut accounts = self.write();
        let previous = accounts.get(username)
            .ok_or_else(|| LedgerError::NotFound(username.to_owned()))?
            .key(field).to_owned();
        Ledger::<S>::check_unique(&accounts, Some(username), field, &value)?;

        Ledger::<S>::set_key(&mut accounts, username, field, &value);
        self.commit(&mut accounts, |accounts| {
            Ledger::<S>::set_key(accounts, username, field, &previous);
        })?;

        log::info!("updated {} of {}", field, username);
        return Ok(());
    }

    /// Moves `amount` from `sender` to `recipient` and returns the sender's new balance.
    pub fn transfer(&self, sender: &str, recipient: &str, amount: Amount) -> LedgerResult<Amount> {
        let mut accounts = self.write();
        let available = accounts.get(sender)
            .ok_or_else(|| LedgerError::NotFound(sender.to_owned()))?
            .balance();
        let recipient_before = accounts.get(recipient)
            .ok_or_else(|| LedgerError::RecipientNotFound(recipient.to_owned()))?
            .balance();
        if sender == recipient {
            return Err(LedgerError::SelfTransfer(sender.to_owned()));
        }
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if amount > available {
            return Err(LedgerError::InsufficientFunds { requested: amount, available });
        }

        let sender_after = Ledger::<S>::exact(available.checked_sub(amount), available, amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        let recipient_after = Ledger::<S>::exact(recipient_before.checked_add(amount), recipient_before, amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;

        Ledger::<S>::set_balance(&mut accounts, sender, sender_after);
        Ledger::<S>::set_balance(&mut accounts, recipient, recipient_after);
        self.commit(&mut accounts, |accounts| {
            Ledger::<S>::set_balance(accounts, sender, available);
            Ledger::<S>::set_balance(accounts, recipient, recipient_before);
        })?;

        log::info!("transferred {} from {} to {}", amount, sender, recipient);
        return Ok(sender_after);
    }

    /// Removes the account. Confirmation is the caller's job.
    pub fn delete(&self, username: &str) -> LedgerResult<()> {
        let mut accounts = self.write();
        let removed = accounts.remove(username)
            .ok_or_else(|| LedgerError::NotFound(username.to_owned()))?;
        self.commit(&mut accounts, |accounts| {
            accounts.insert(username.to_owned(), removed);
        })?;

        log::info!("deleted account of {}", username);
        return Ok(());
    }

    /// Copies of all accounts, ordered by username.
    pub fn accounts(&self) -> Vec<Account> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Accounts> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Accounts> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persists the mutated set, undoing the mutation if the write fails.
    fn commit(&self, accounts: &mut Accounts, undo: impl FnOnce(&mut Accounts)) -> LedgerResult<()> {
        if let Err(err) = self.store.save(accounts) {
            undo(accounts);
            log::error!("snapshot write failed, change rolled back: {}", err);
            return Err(err.into());
        }
        return Ok(());
    }

    fn check_unique(accounts: &Accounts, except: Option<&str>, field: KeyField, value: &str) -> LedgerResult<()> {
        let taken = accounts.values()
            .filter(|account| Some(account.username()) != except)
            .any(|account| account.key(field) == value);
        if taken {
            return Err(LedgerError::DuplicateKey { field, value: value.to_owned() });
        }
        return Ok(());
    }

    fn fresh_account_number(&self, accounts: &Accounts) -> LedgerResult<AccountNumber> {
        let taken: HashSet<&AccountNumber> = accounts.values()
            .map(|account| account.account_number())
            .collect();
        let mut numbers = self.numbers.lock().unwrap_or_else(PoisonError::into_inner);

        for attempt in 1..=self.number_attempts {
            let candidate = numbers.next_number();
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
            log::debug!("account number {} already taken (attempt {})", candidate, attempt);
        }
        return Err(LedgerError::AccountNumberExhausted { attempts: self.number_attempts });
    }

    /// Decimal arithmetic rescales instead of failing once a result needs more
    /// than 28 significant digits. A result with fewer decimal places than its
    /// operands was rounded.
    fn exact(result: Option<Amount>, lhs: Amount, rhs: Amount) -> Option<Amount> {
        result.filter(|value| value.scale() >= lhs.scale().max(rhs.scale()))
    }

    fn set_key(accounts: &mut Accounts, username: &str, field: KeyField, value: &str) {
        if let Some(account) = accounts.get_mut(username) {
            match field {
                KeyField::Email => account.set_email(value),
                KeyField::Phone => account.set_phone(value),
                KeyField::Username => {}
            }
        }
    }

    fn set_balance(accounts: &mut Accounts, username: &str, balance: Amount) {
        if let Some(account) = accounts.get_mut(username) {
            account.set_balance(balance);
        }
    }

    fn check_snapshot(accounts: &Accounts) -> Result<(), BackendError> {
        let mut emails = HashSet::new();
        let mut phones = HashSet::new();
        let mut numbers = HashSet::new();

        for (key, account) in accounts {
            let problem = if key != account.username() {
                Some(format!("entry {:?} holds account {:?}", key, account.username()))
            } else if !emails.insert(account.email()) {
                Some(format!("duplicate email {:?}", account.email()))
            } else if !phones.insert(account.phone()) {
                Some(format!("duplicate phone {:?}", account.phone()))
            } else if !numbers.insert(account.account_number()) {
                Some(format!("duplicate account number {}", account.account_number()))
            } else if account.balance() < Decimal::ZERO {
                Some(format!("negative balance for {:?}", account.username()))
            } else {
                None
            };
            if let Some(problem) = problem {
                return Err(BackendError::Inconsistent(problem));
            }
        }
        return Ok(());
    }
}
