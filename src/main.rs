use anyhow::{bail, Context, Result};
use bankapp::config::StoreConfig;
use bankapp::logging::init_logging;
use bankapp::{write_history_csv, Bank, BankError, Registration};
use clap::{Parser, Subcommand};

/// Admin tool for the bank database
#[derive(Parser, Debug)]
#[command(name = "bankapp", version, about = "Bank administration CLI")]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database file and schema
    Init,
    /// Register a new account (balance starts at 0)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        dob: String,
        #[arg(long)]
        gender: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "BANK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Deposit into an account
    Deposit { username: String, amount: String },
    /// Withdraw from an account
    Withdraw { username: String, amount: String },
    /// Show an account's balance
    Balance { username: String },
    /// Show an account's ledger, most recent first
    History {
        username: String,
        /// Write CSV to stdout instead of a table
        #[arg(long)]
        csv: bool,
    },
    /// Check balance == deposits - withdrawals (one account or all)
    Verify { username: Option<String> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.store.log_level, cli.store.log_format);

    let bank = Bank::open(&cli.store.db, cli.store.store_options())
        .with_context(|| format!("failed to open database {}", cli.store.db.display()))?;

    match cli.command {
        Command::Init => {
            println!("✓ Database ready at {}", cli.store.db.display());
        }
        Command::Register {
            name,
            dob,
            gender,
            username,
            password,
        } => {
            let form = Registration::new(&name, &dob, &gender, &username, &password);
            let account = bank.register(&form)?;
            println!("✓ Registered {} (id {})", account.username, account.id);
        }
        Command::Deposit { username, amount } => {
            let receipt = bank.deposit(&username, amount.as_str())?;
            println!(
                "✓ Deposited {} → balance {} (ref {})",
                receipt.entry.amount, receipt.balance, receipt.entry.reference
            );
        }
        Command::Withdraw { username, amount } => match bank.withdraw(&username, amount.as_str()) {
            Ok(receipt) => println!(
                "✓ Withdrew {} → balance {} (ref {})",
                receipt.entry.amount, receipt.balance, receipt.entry.reference
            ),
            Err(BankError::InsufficientFunds) => {
                let account = bank.account(&username)?;
                bail!("insufficient funds: balance is {}", account.balance);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Balance { username } => {
            let account = bank.account(&username)?;
            println!("{}: {}", account.username, account.balance);
        }
        Command::History { username, csv } => {
            let entries = bank.history(&username)?;
            if csv {
                write_history_csv(std::io::stdout().lock(), &entries)?;
            } else if entries.is_empty() {
                println!("No transactions for {}", username);
            } else {
                println!("{:<25} {:<12} {:>14}", "Date", "Type", "Amount");
                for entry in &entries {
                    println!(
                        "{:<25} {:<12} {:>14}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.kind,
                        entry.amount.to_string()
                    );
                }
            }
        }
        Command::Verify { username } => {
            let usernames = match username {
                Some(u) => vec![u],
                None => bank.accounts()?.into_iter().map(|a| a.username).collect(),
            };

            let mut mismatches = 0;
            for username in &usernames {
                let check = bank.verify_ledger(username)?;
                if check.is_consistent() {
                    println!("✓ {}: {} ({} entries)", check.username, check.balance, check.entries);
                } else {
                    mismatches += 1;
                    println!(
                        "✗ {}: balance {} but ledger says {}",
                        check.username, check.balance, check.ledger_total
                    );
                }
            }

            if mismatches > 0 {
                bail!("{} of {} accounts do not match their ledger", mismatches, usernames.len());
            }
        }
    }

    Ok(())
}
