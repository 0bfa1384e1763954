//! Month CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::display::format_month_summary;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CopyMode, MonthCode};
use crate::services::LedgerService;
use crate::storage::Storage;

/// Month subcommands
#[derive(Subcommand)]
pub enum MonthCommands {
    /// Create an empty month
    Add {
        /// Month key (YYYYMM)
        month: MonthCode,
    },
    /// Delete a month; its transactions move to the to-be-budgeted pool
    Delete {
        /// Month key (YYYYMM)
        month: MonthCode,
    },
    /// Copy groups, categories and budgeted amounts to another month
    Copy {
        /// Source month (YYYYMM)
        from: MonthCode,
        /// Destination month (YYYYMM)
        to: MonthCode,
        /// merge or replace (defaults to the configured copy mode)
        #[arg(short, long)]
        mode: Option<String>,
    },
    /// Show budgeted, activity and available per category
    Show {
        /// Month key (YYYYMM), defaults to the current month
        month: Option<MonthCode>,
    },
}

/// Handle a month command
pub fn handle_month_command(
    storage: &Storage,
    settings: &Settings,
    cmd: MonthCommands,
) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);

    match cmd {
        MonthCommands::Add { month } => {
            ledger.add_month(month)?;
            println!("Created month {}", month);
        }

        MonthCommands::Delete { month } => {
            let orphaned = ledger.delete_month(month)?;
            println!("Deleted month {}", month);
            if !orphaned.is_empty() {
                println!(
                    "{} transaction(s) moved to the to-be-budgeted pool",
                    orphaned.len()
                );
            }
        }

        MonthCommands::Copy { from, to, mode } => {
            let mode = match mode {
                Some(raw) => CopyMode::parse(&raw).ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "Invalid copy mode: '{}'. Valid modes: merge, replace",
                        raw
                    ))
                })?,
                None => settings.copy_mode,
            };

            let orphaned = ledger.copy_month(from, to, mode)?;
            println!("Copied {} to {} ({:?})", from, to, mode);
            if !orphaned.is_empty() {
                println!(
                    "{} transaction(s) moved to the to-be-budgeted pool",
                    orphaned.len()
                );
            }
        }

        MonthCommands::Show { month } => {
            let month = month.unwrap_or_else(MonthCode::current);
            let summary = ledger.month_summary(month)?;
            print!(
                "{}",
                format_month_summary(&summary, &settings.currency_symbol)
            );
        }
    }

    Ok(())
}
