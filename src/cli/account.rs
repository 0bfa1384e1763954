//! Account CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::display::format_account_list;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountType, Money};
use crate::services::LedgerService;
use crate::storage::Storage;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Add {
        /// Account name
        name: String,
        /// Starting balance (e.g. "1000.00" or "-250")
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        balance: String,
        /// Account type (budgeted, unbudgeted)
        #[arg(short = 't', long = "type", default_value = "budgeted")]
        account_type: String,
    },
    /// Close an account that has no transactions
    #[command(alias = "close")]
    Delete {
        /// Account name
        name: String,
    },
    /// List accounts with balances
    List,
    /// Set the current balance, e.g. to match a statement; the starting
    /// balance absorbs the difference
    SetBalance {
        /// Account name
        name: String,
        /// New balance
        #[arg(allow_hyphen_values = true)]
        balance: String,
    },
}

/// Handle an account command
pub fn handle_account_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AccountCommands,
) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);
    let symbol = settings.currency_symbol.as_str();

    match cmd {
        AccountCommands::Add {
            name,
            balance,
            account_type,
        } => {
            let account_type = AccountType::parse(&account_type).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "Invalid account type: '{}'. Valid types: budgeted, unbudgeted",
                    account_type
                ))
            })?;
            let starting_balance = Money::parse(&balance)?;

            let account = ledger.open_account(&name, starting_balance, account_type)?;
            println!("Created account: {}", account.name);
            println!("  Type: {}", account.account_type);
            println!(
                "  Starting Balance: {}",
                account.starting_balance.format_with_symbol(symbol)
            );
        }

        AccountCommands::Delete { name } => {
            let account = ledger.close_account(&name)?;
            println!("Deleted account: {}", account.name);
        }

        AccountCommands::List => {
            let accounts = storage.accounts.get_all()?;
            print!("{}", format_account_list(&accounts, symbol));
        }

        AccountCommands::SetBalance { name, balance } => {
            let balance = Money::parse(&balance)?;
            let account = ledger.set_account_balance(&name, balance)?;
            println!(
                "Balance of {} set to {}",
                account.name,
                account.cached_balance.format_with_symbol(symbol)
            );
        }
    }

    Ok(())
}
