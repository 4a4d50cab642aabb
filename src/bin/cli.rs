use bankledger::{Account, Amount, Ledger, LedgerConfig, LedgerError, ProfileUpdate,
    backend::JsonStore, generate_otp, verify_otp};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use anyhow::Context;
use colored::Colorize;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[clap(version, about, propagate_version = true)]
struct Cli {
    /// TOML configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Path to the account snapshot, overrides the configuration file
    #[clap(short, long, env = "BANKLEDGER_SNAPSHOT", value_parser)]
    snapshot: Option<PathBuf>,

    /// Action to perform
    #[clap(subcommand)]
    action: Subcommands,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Open a new account
    Register(Register),
    /// Log in and display account details
    Show(Login),
    /// Change the secret, email or phone of an account
    Update(Update),
    /// Move money to another account
    Transfer(Transfer),
    /// Close an account
    Delete(Delete),
    /// Set a new secret after confirming a one-time code
    ResetSecret(ResetSecret),
    /// List all accounts with their balances
    List
}

#[derive(Args, Debug)]
struct Login {
    /// Username, email or phone number
    #[clap(value_parser)]
    credential: String,

    #[clap(long, env = "BANKLEDGER_SECRET", hide_env_values = true, value_parser)]
    secret: String
}

impl Login {
    fn login(&self, ledger: &Ledger<JsonStore>) -> anyhow::Result<Account> {
        let account = ledger.login(&self.credential, &self.secret)?;
        println!("Welcome, {}", account.username().bold());
        return Ok(account);
    }
}

#[derive(Args, Debug)]
struct Register {
    #[clap(short='u', long, value_parser)]
    username: String,

    #[clap(short='e', long, value_parser)]
    email: String,

    #[clap(short='p', long, value_parser)]
    phone: String,

    #[clap(long, env = "BANKLEDGER_SECRET", hide_env_values = true, value_parser)]
    secret: String,

    /// Opening balance
    #[clap(short='b', long, value_parser, default_value = "0")]
    balance: Amount
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Field {
    Secret,
    Email,
    Phone
}

#[derive(Args, Debug)]
struct Update {
    #[clap(flatten)]
    login: Login,

    #[clap(value_enum)]
    field: Field,

    #[clap(value_parser)]
    value: String
}

impl Update {
    fn update(&self, ledger: &Ledger<JsonStore>) -> anyhow::Result<()> {
        let account = self.login.login(ledger)?;
        let update = match self.field {
            Field::Secret => ProfileUpdate::Secret(self.value.clone()),
            Field::Email => ProfileUpdate::Email(self.value.clone()),
            Field::Phone => ProfileUpdate::Phone(self.value.clone())
        };
        ledger.update_profile(&account, update)?;
        println!("{}", "Account updated".green());
        return Ok(());
    }
}

#[derive(Args, Debug)]
struct Transfer {
    #[clap(flatten)]
    login: Login,

    /// Username of the recipient
    #[clap(short='t', long, value_parser)]
    to: String,

    #[clap(short='a', long, value_parser)]
    amount: Amount
}

impl Transfer {
    fn transfer(&self, ledger: &Ledger<JsonStore>) -> anyhow::Result<()> {
        let sender = self.login.login(ledger)?;
        let balance = ledger.transfer(sender.username(), &self.to, self.amount)?;
        println!("Transfer successful, new balance: {}", balance.to_string().green());
        return Ok(());
    }
}

#[derive(Args, Debug)]
struct Delete {
    #[clap(flatten)]
    login: Login,

    /// Skip the confirmation prompt
    #[clap(long)]
    yes: bool
}

impl Delete {
    fn delete(&self, ledger: &Ledger<JsonStore>) -> anyhow::Result<()> {
        let account = self.login.login(ledger)?;
        if !self.yes {
            let answer = prompt("Are you sure you want to delete your account? (yes/no): ")?;
            if !answer.eq_ignore_ascii_case("yes") {
                println!("Account deletion canceled");
                return Ok(());
            }
        }
        ledger.delete(account.username())?;
        println!("{}", "Account deleted".green());
        return Ok(());
    }
}

#[derive(Args, Debug)]
struct ResetSecret {
    /// Username, email or phone number
    #[clap(value_parser)]
    credential: String,

    #[clap(long, value_parser)]
    new_secret: String
}

impl ResetSecret {
    fn reset(&self, ledger: &Ledger<JsonStore>) -> anyhow::Result<()> {
        let account = ledger.find_by_any_key(&self.credential)?;

        // Stands in for delivery over a separate channel.
        let otp = generate_otp();
        println!("{} {}", "OTP:".bold(), otp.to_string().yellow());

        let supplied = prompt("Enter OTP: ")?;
        if !verify_otp(&otp, &supplied) {
            return Err(LedgerError::Authentication).context("invalid one-time code");
        }
        ledger.reset_secret(&account, &self.new_secret)?;
        println!("{}", "Secret reset".green());
        return Ok(());
    }
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)
        .with_context(|| "failed to read from stdin")?;
    return Ok(line.trim().to_owned());
}

fn print_accounts(ledger: &Ledger<JsonStore>) {
    for account in ledger.accounts() {
        let balance = if account.balance().is_zero() {
            account.balance().to_string().normal()
        } else {
            account.balance().to_string().green()
        };
        println!("{} {}: {}", account.account_number(), account.username(), balance);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).compact().init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => LedgerConfig::read(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => LedgerConfig::default()
    };
    if let Some(snapshot) = args.snapshot {
        config.snapshot_path = snapshot;
    }
    let ledger = config.open_ledger();

    match args.action {
        Subcommands::Register(register) => {
            let account = ledger.register(&register.username, &register.email,
                &register.phone, &register.secret, register.balance)?;
            println!("Registration successful, your account number is {}",
                account.account_number().to_string().bold());
        },
        Subcommands::Show(login) => {
            let account = login.login(&ledger)?;
            println!("{}", account);
        },
        Subcommands::Update(update) => update.update(&ledger)?,
        Subcommands::Transfer(transfer) => transfer.transfer(&ledger)?,
        Subcommands::Delete(delete) => delete.delete(&ledger)?,
        Subcommands::ResetSecret(reset) => reset.reset(&ledger)?,
        Subcommands::List => print_accounts(&ledger)
    }
    return Ok(());
}
