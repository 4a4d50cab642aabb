use std::fmt;
use std::str::FromStr;

use colored::Colorize;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Serialize, Deserialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::core::secret::SecretHash;

pub type Amount = Decimal;
pub type UserName = String;

/// Identifying keys of an account. Each one is unique across the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyField {
    Username,
    Email,
    Phone
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone"
        };
        write!(f, "{}", name)
    }
}

/// 13 digit account number: the fixed "1208" prefix followed by 9 digits.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub const PREFIX: &'static str = "1208";
    pub const SUFFIX_DIGITS: usize = 9;

    /// Draws a fresh number with independently uniform suffix digits.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> AccountNumber {
        let mut number = String::with_capacity(Self::PREFIX.len() + Self::SUFFIX_DIGITS);
        number.push_str(Self::PREFIX);
        for _ in 0..Self::SUFFIX_DIGITS {
            number.push(char::from(b'0' + rng.gen_range(0..10u8)));
        }
        AccountNumber(number)
    }

    pub fn from_suffix(suffix: u32) -> Option<AccountNumber> {
        if suffix > 999_999_999 {
            return None;
        }
        Some(AccountNumber(format!("{}{:09}", Self::PREFIX, suffix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == Self::PREFIX.len() + Self::SUFFIX_DIGITS
            && s.starts_with(Self::PREFIX)
            && s.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(format!("malformed account number: {:?}", s));
        }
        return Ok(AccountNumber(s.to_owned()));
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> String {
        number.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single ledger account. Only the ledger hands these out, and only as copies.
#[serde_as]
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Account {
    username: UserName,
    email: String,
    phone: String,
    secret: SecretHash,
    account_number: AccountNumber,
    #[serde_as(as = "DisplayFromStr")]
    balance: Amount
}

impl Account {
    pub(crate) fn new(username: &str, email: &str, phone: &str, secret: SecretHash,
                      account_number: AccountNumber, balance: Amount) -> Account {
        Account {
            username: username.to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            secret,
            account_number,
            balance
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn account_number(&self) -> &AccountNumber {
        &self.account_number
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Value of the given identifying key.
    pub fn key(&self, field: KeyField) -> &str {
        match field {
            KeyField::Username => &self.username,
            KeyField::Email => &self.email,
            KeyField::Phone => &self.phone
        }
    }

    pub(crate) fn secret(&self) -> &SecretHash {
        &self.secret
    }

    pub(crate) fn set_secret(&mut self, secret: SecretHash) {
        self.secret = secret;
    }

    pub(crate) fn set_email(&mut self, email: &str) {
        self.email = email.to_owned();
    }

    pub(crate) fn set_phone(&mut self, phone: &str) {
        self.phone = phone.to_owned();
    }

    pub(crate) fn set_balance(&mut self, balance: Amount) {
        self.balance = balance;
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, ", "Account Number:".bold(), self.account_number)?;
        write!(f, "{} {}, ", "Username:".bold(), self.username)?;
        write!(f, "{} {}, ", "Email:".bold(), self.email)?;
        write!(f, "{} {}, ", "Phone:".bold(), self.phone)?;
        write!(f, "{} {}", "Balance:".bold(), self.balance)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    #[test]
    fn random_number_has_prefix_and_nine_digits() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let number = AccountNumber::random(&mut rng);
            assert_eq!(number.as_str().len(), 13);
            assert!(number.as_str().starts_with("1208"));
            assert!(number.as_str().bytes().all(|b| b.is_ascii_digit()));
            assert!(number.as_str().parse::<AccountNumber>().is_ok());
        }
    }

    #[test]
    fn random_number_is_driven_by_rng() {
        let mut first = StdRng::seed_from_u64(7);
        let mut second = StdRng::seed_from_u64(7);
        assert_eq!(AccountNumber::random(&mut first), AccountNumber::random(&mut second));
    }

    #[rstest]
    #[case(0, "1208000000000")]
    #[case(999_999_999, "1208999999999")]
    #[case(42, "1208000000042")]
    fn from_suffix_pads_to_nine_digits(#[case] suffix: u32, #[case] expected: &str) {
        assert_eq!(AccountNumber::from_suffix(suffix).unwrap().as_str(), expected);
    }

    #[test]
    fn from_suffix_rejects_ten_digits() {
        assert!(AccountNumber::from_suffix(1_000_000_000).is_none());
    }

    #[rstest]
    #[case("")]
    #[case("1208")]
    #[case("120800000000")]
    #[case("12080000000000")]
    #[case("1209000000000")]
    #[case("12080000000a0")]
    fn parse_rejects_malformed(#[case] raw: &str) {
        assert!(raw.parse::<AccountNumber>().is_err());
    }

    #[test]
    fn can_print() {
        colored::control::set_override(false);
        let account = Account::new("alice", "a@x.com", "555-0001",
            SecretHash::from_phc("$argon2id$placeholder"),
            AccountNumber::from_suffix(1).unwrap(), Decimal::new(10050, 2));

        assert_eq!(account.to_string(),
            "Account Number: 1208000000001, Username: alice, Email: a@x.com, Phone: 555-0001, Balance: 100.50");
    }

    #[test]
    fn key_lookup_matches_fields() {
        let account = Account::new("alice", "a@x.com", "555-0001",
            SecretHash::from_phc("x"), AccountNumber::from_suffix(1).unwrap(), Decimal::ZERO);
        assert_eq!(account.key(KeyField::Username), "alice");
        assert_eq!(account.key(KeyField::Email), "a@x.com");
        assert_eq!(account.key(KeyField::Phone), "555-0001");
    }
}
