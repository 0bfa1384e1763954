//! Group and category CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::error::LedgerResult;
use crate::models::{Money, MonthCode};
use crate::services::LedgerService;
use crate::storage::Storage;

/// Group subcommands
#[derive(Subcommand)]
pub enum GroupCommands {
    /// Add a group to a month
    Add {
        /// Month key (YYYYMM)
        month: MonthCode,
        /// Group name
        name: String,
    },
    /// Delete a group and its categories
    Delete {
        month: MonthCode,
        name: String,
    },
}

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category to a group
    Add {
        /// Month key (YYYYMM)
        month: MonthCode,
        /// Group the category belongs to
        group: String,
        /// Category name, unique within the month
        name: String,
    },
    /// Delete a category; its transactions move to the to-be-budgeted pool
    Delete {
        month: MonthCode,
        name: String,
    },
    /// Set the budgeted amount without touching the to-be-budgeted pool
    Budget {
        month: MonthCode,
        name: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Set the budgeted amount, taking the difference from the pool
    Assign {
        month: MonthCode,
        name: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
}

pub fn handle_group_command(storage: &Storage, cmd: GroupCommands) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);

    match cmd {
        GroupCommands::Add { month, name } => {
            ledger.add_group(month, &name)?;
            println!("Created group {} in {}", name, month);
        }
        GroupCommands::Delete { month, name } => {
            let orphaned = ledger.delete_group(month, &name)?;
            println!("Deleted group {} from {}", name, month);
            report_orphans(orphaned.len());
        }
    }

    Ok(())
}

pub fn handle_category_command(
    storage: &Storage,
    settings: &Settings,
    cmd: CategoryCommands,
) -> LedgerResult<()> {
    let ledger = LedgerService::new(storage);
    let symbol = settings.currency_symbol.as_str();

    match cmd {
        CategoryCommands::Add { month, group, name } => {
            ledger.add_category(month, &group, &name)?;
            println!("Created category {} in {}/{}", name, month, group);
        }
        CategoryCommands::Delete { month, name } => {
            let orphaned = ledger.delete_category(month, &name)?;
            println!("Deleted category {} from {}", name, month);
            report_orphans(orphaned.len());
        }
        CategoryCommands::Budget {
            month,
            name,
            amount,
        } => {
            let category = ledger.set_budgeted(month, &name, Money::parse(&amount)?)?;
            println!(
                "Budgeted {} for {} in {}",
                category.budgeted.format_with_symbol(symbol),
                name,
                month
            );
        }
        CategoryCommands::Assign {
            month,
            name,
            amount,
        } => {
            let category = ledger.assign_budget(month, &name, Money::parse(&amount)?)?;
            println!(
                "Assigned {} to {} in {}",
                category.budgeted.format_with_symbol(symbol),
                name,
                month
            );
            println!(
                "To be budgeted: {}",
                storage.budget.to_be_budgeted()?.format_with_symbol(symbol)
            );
        }
    }

    Ok(())
}

fn report_orphans(count: usize) {
    if count > 0 {
        println!("{} transaction(s) moved to the to-be-budgeted pool", count);
    }
}
