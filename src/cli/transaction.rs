//! Transaction CLI commands

use std::path::PathBuf;

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_transaction_register, format_transaction_row};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{parse_date, Money, MonthCode, NewTransaction};
use crate::services::{ColumnMapping, ImportService, LedgerService};
use crate::storage::Storage;

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a transaction
    Add {
        /// Account name
        account: String,
        /// Amount (negative for outflow)
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Payee name
        #[arg(short, long, default_value = "")]
        payee: String,
        /// Category; omit to count the amount as to be budgeted
        #[arg(short, long)]
        category: Option<String>,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Delete a transaction and reverse its effects
    Delete {
        /// Transaction ID, or a unique prefix of it
        id: String,
    },
    /// List transactions
    List {
        /// Only this account
        #[arg(short, long)]
        account: Option<String>,
        /// Only this month (YYYYMM)
        #[arg(short, long)]
        month: Option<MonthCode>,
        /// Show at most this many, newest last
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Move a transaction to another category
    Recategorize {
        /// Transaction ID, or a unique prefix of it
        id: String,
        /// New category
        category: Option<String>,
        /// Move the amount to the to-be-budgeted pool instead
        #[arg(long, conflicts_with = "category")]
        clear: bool,
    },
    /// Import transactions from a CSV file
    Import {
        /// Path to the CSV file
        file: PathBuf,
        /// Target account
        #[arg(short, long)]
        account: String,
        /// Date column (0-based)
        #[arg(long, default_value_t = 0)]
        date_column: usize,
        /// Amount column (0-based)
        #[arg(long, default_value_t = 1)]
        amount_column: usize,
        /// Payee column (0-based)
        #[arg(long, default_value_t = 2)]
        payee_column: usize,
        /// Category column (0-based)
        #[arg(long)]
        category_column: Option<usize>,
        /// Note column (0-based)
        #[arg(long)]
        note_column: Option<usize>,
        /// Date format (strftime), defaults to the configured one
        #[arg(long)]
        date_format: Option<String>,
        /// The file has no header row
        #[arg(long)]
        no_header: bool,
        /// Field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// Negate every amount
        #[arg(long)]
        invert: bool,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    cmd: TransactionCommands,
) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);
    let symbol = settings.currency_symbol.as_str();

    match cmd {
        TransactionCommands::Add {
            account,
            amount,
            payee,
            category,
            date,
            note,
        } => {
            let date = match date {
                Some(raw) => parse_date(&raw).ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "Invalid date: '{}'. Use YYYY-MM-DD",
                        raw
                    ))
                })?,
                None => chrono::Local::now().date_naive(),
            };

            let mut input = NewTransaction::new(account, Money::parse(&amount)?, date, payee);
            if let Some(category) = category {
                input = input.category(category);
            }
            if let Some(note) = note {
                input = input.note(note);
            }

            let txn = ledger.add_transaction(input)?;
            println!("Recorded transaction:");
            println!("{}", format_transaction_row(&txn, symbol));
        }

        TransactionCommands::Delete { id } => {
            let id = storage.transactions.resolve_id(&id)?;
            let txn = ledger.delete_transaction(id)?;
            println!("Deleted transaction {}", txn.id);
        }

        TransactionCommands::List {
            account,
            month,
            limit,
        } => {
            let mut transactions = match month {
                Some(month) => storage.transactions.list_for_month(month)?,
                None => storage.transactions.list()?,
            };
            if let Some(account) = account {
                transactions.retain(|t| t.account.eq_ignore_ascii_case(account.trim()));
            }
            if let Some(limit) = limit {
                let skip = transactions.len().saturating_sub(limit);
                transactions.drain(..skip);
            }
            print!("{}", format_transaction_register(&transactions, symbol));
        }

        TransactionCommands::Recategorize {
            id,
            category,
            clear,
        } => {
            if category.is_none() && !clear {
                return Err(LedgerError::Validation(
                    "Give a category, or --clear to move the amount to the pool".into(),
                ));
            }
            let id = storage.transactions.resolve_id(&id)?;
            let txn = ledger.recategorize_transaction(id, category)?;
            println!("{}", format_transaction_row(&txn, symbol));
        }

        TransactionCommands::Import {
            file,
            account,
            date_column,
            amount_column,
            payee_column,
            category_column,
            note_column,
            date_format,
            no_header,
            delimiter,
            invert,
        } => {
            let mapping = ColumnMapping {
                date_column,
                amount_column,
                payee_column: Some(payee_column),
                category_column,
                note_column,
                date_format: date_format.unwrap_or_else(|| settings.import_date_format.clone()),
                has_header: !no_header,
                delimiter,
                invert_amounts: invert,
            };

            let report = ImportService::new(storage).import_file(&file, &account, &mapping)?;
            println!(
                "Imported {} transaction(s) into {}",
                report.imported.len(),
                account
            );
            if !report.folded_rows.is_empty() {
                println!(
                    "Rows with unknown categories counted as to be budgeted: {:?}",
                    report.folded_rows
                );
            }
            for (row, err) in &report.failed_rows {
                println!("  row {}: {}", row, err);
            }
        }
    }

    Ok(())
}
