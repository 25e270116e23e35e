use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;

use cashpoint::cash::format_breakdown;
use cashpoint::{Atm, AtmConfig};

#[derive(Parser, Debug)]
#[clap(version, about, propagate_version = true)]
struct Cli {
    /// Path to the machine configuration file (built-in defaults when omitted)
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Action to perform
    #[clap(subcommand)]
    action: Subcommands,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Open a new account
    Register(Register),
    /// Withdraw cash as notes
    Withdraw(Withdraw),
    /// Pay into an account
    Deposit(Deposit),
    /// Move funds between two accounts
    Transfer(Transfer),
    /// Show an account balance
    Balance(Balance),
    /// Activate or deactivate an account
    SetActive(SetActive),
    /// Load notes into the machine
    AddCash(AddCash),
    /// Show note stock and total cash
    Inventory,
    /// Show recent activity reports
    Reports(Reports),
}

#[derive(Args, Debug)]
struct Register {
    /// New account number
    #[clap(value_parser)]
    number: String,

    /// Owner display name
    #[clap(short, long, value_parser)]
    owner: String,

    /// 4-digit PIN
    #[clap(short, long, value_parser)]
    pin: String,

    /// Opening deposit
    #[clap(short, long, value_parser, default_value_t = Decimal::ZERO)]
    amount: Decimal,
}

#[derive(Args, Debug)]
struct Withdraw {
    /// Account number
    #[clap(value_parser)]
    number: String,

    /// Amount to withdraw, must be dispensable as whole notes
    #[clap(short, long, value_parser)]
    amount: u64,
}

#[derive(Args, Debug)]
struct Deposit {
    /// Account number
    #[clap(value_parser)]
    number: String,

    /// Amount to deposit
    #[clap(short, long, value_parser)]
    amount: Decimal,
}

#[derive(Args, Debug)]
struct Transfer {
    /// Account number sending the funds
    #[clap(short = 'f', long, value_parser)]
    from: String,

    /// Account number receiving the funds
    #[clap(short = 't', long, value_parser)]
    to: String,

    #[clap(short, long, value_parser)]
    amount: Decimal,
}

#[derive(Args, Debug)]
struct Balance {
    /// Account number
    #[clap(value_parser)]
    number: String,
}

#[derive(Args, Debug)]
struct SetActive {
    /// Account number
    #[clap(value_parser)]
    number: String,

    /// Deactivate instead of activating
    #[clap(short, long)]
    deactivate: bool,
}

#[derive(Args, Debug)]
struct AddCash {
    /// Note denomination, must be in the configured set
    #[clap(value_parser)]
    denom: u64,

    /// Number of notes to load
    #[clap(value_parser)]
    count: u64,

    /// Admin name recorded in the report log
    #[clap(short = 'n', long, value_parser, default_value_t = String::from("admin"))]
    admin: String,
}

#[derive(Args, Debug)]
struct Reports {
    /// How many of the latest entries to show
    #[clap(short, long, value_parser, default_value_t = 20)]
    limit: usize,
}

fn fmt_balance(balance: Decimal) -> colored::ColoredString {
    let text = balance.to_string();
    if balance > Decimal::ZERO {
        text.green()
    } else {
        text.normal()
    }
}

fn print_inventory(atm: &Atm) {
    for (denom, count) in atm.stock() {
        let row = format!("{:>6}: {} notes", denom, count);
        if count == 0 {
            println!("{}", row.bright_red());
        } else {
            println!("{}", row);
        }
    }
    println!("{}: {}", "Total".bold(), atm.total_cash());
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => AtmConfig::read(path)?,
        None => AtmConfig::default(),
    };
    let mut atm = Atm::open(config.open_store())?;

    match args.action {
        Subcommands::Register(register) => {
            let account = atm.register(
                &register.number,
                &register.owner,
                &register.pin,
                register.amount,
            )?;
            println!("Opened account {}", account);
        }
        Subcommands::Withdraw(withdraw) => {
            let outcome = atm.withdraw(&withdraw.number, withdraw.amount)?;
            println!(
                "{} withdrawn. Notes: {}. New balance: {}",
                withdraw.amount,
                format_breakdown(&outcome.notes),
                fmt_balance(outcome.new_balance)
            );
        }
        Subcommands::Deposit(deposit) => {
            let new_balance = atm.deposit(&deposit.number, deposit.amount)?;
            println!(
                "{} deposited. New balance: {}",
                deposit.amount,
                fmt_balance(new_balance)
            );
        }
        Subcommands::Transfer(transfer) => {
            let outcome = atm.transfer(&transfer.from, &transfer.to, transfer.amount)?;
            println!(
                "{} transferred. Sender balance: {}. Receiver balance: {}",
                transfer.amount,
                fmt_balance(outcome.sender_balance),
                fmt_balance(outcome.receiver_balance)
            );
        }
        Subcommands::Balance(balance) => {
            let current = atm.balance_inquiry(&balance.number)?;
            println!("Current balance: {}", fmt_balance(current));
        }
        Subcommands::SetActive(set_active) => {
            let account = atm.set_active(&set_active.number, !set_active.deactivate)?;
            let state = if account.is_active() {
                "active".green()
            } else {
                "deactivated".bright_red()
            };
            println!("Account {} is now {}", account, state);
        }
        Subcommands::AddCash(add_cash) => {
            let total = atm.add_cash(&add_cash.admin, add_cash.denom, add_cash.count)?;
            println!(
                "Added {} x {} notes. Total cash now: {}",
                add_cash.count, add_cash.denom, total
            );
        }
        Subcommands::Inventory => {
            print_inventory(&atm);
        }
        Subcommands::Reports(reports) => {
            for report in atm.recent_reports(reports.limit) {
                println!("{}", report);
            }
        }
    }

    Ok(())
}
