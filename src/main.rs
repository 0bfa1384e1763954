use anyhow::Result;
use clap::{Parser, Subcommand};

use envelope_ledger::cli::{
    handle_account_command, handle_category_command, handle_group_command, handle_month_command,
    handle_transaction_command, AccountCommands, CategoryCommands, GroupCommands, MonthCommands,
    TransactionCommands,
};
use envelope_ledger::config::{LedgerPaths, Settings};
use envelope_ledger::logging::init_tracing;
use envelope_ledger::services::LedgerService;
use envelope_ledger::storage::Storage;

#[derive(Parser)]
#[command(
    name = "envelope-ledger",
    author = "Kaylee Beyene",
    version,
    about = "Envelope budgeting with a consistent ledger",
    long_about = "envelope-ledger assigns money to categories month by month and keeps \
                  category activity, account balances and the transaction log in \
                  agreement with each other."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and default settings
    Init,

    /// Show current configuration and paths
    Config,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Month management commands
    #[command(subcommand)]
    Month(MonthCommands),

    /// Category group commands
    #[command(subcommand)]
    Group(GroupCommands),

    /// Category commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Transaction commands
    #[command(subcommand, alias = "transaction")]
    Txn(TransactionCommands),

    /// Re-derive category activity and account balances from the log
    Rebuild,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings.log_level);

    let storage = Storage::open(&paths)?;
    let report = storage.load_all()?;
    for (document, err) in &report.issues {
        eprintln!(
            "warning: {} document ignored: {} (the file is renamed to {}.json.invalid on the next save)",
            document, err, document
        );
    }

    match cli.command {
        Some(Commands::Init) => {
            settings.save(&paths)?;
            storage.save_all()?;
            println!("Initialized ledger at: {}", paths.base_dir().display());
            println!();
            println!("Next steps:");
            println!("  envelope-ledger account add Checking --balance 1000");
            println!("  envelope-ledger month add 202401");
            println!("  envelope-ledger group add 202401 Wants");
            println!("  envelope-ledger category add 202401 Wants Dining");
        }
        Some(Commands::Config) => {
            println!("envelope-ledger configuration");
            println!("=============================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Data directory: {}", paths.data_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Initialized:    {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Currency symbol:    {}", settings.currency_symbol);
            println!("  Log level:          {}", settings.log_level);
            println!("  Copy mode:          {:?}", settings.copy_mode);
            println!("  Import date format: {}", settings.import_date_format);
        }
        Some(Commands::Account(cmd)) => handle_account_command(&storage, &settings, cmd)?,
        Some(Commands::Month(cmd)) => handle_month_command(&storage, &settings, cmd)?,
        Some(Commands::Group(cmd)) => handle_group_command(&storage, cmd)?,
        Some(Commands::Category(cmd)) => handle_category_command(&storage, &settings, cmd)?,
        Some(Commands::Txn(cmd)) => handle_transaction_command(&storage, &settings, cmd)?,
        Some(Commands::Rebuild) => {
            let report = LedgerService::new(&storage).rebuild()?;
            println!("Rebuild complete");
            println!("  Categories corrected: {}", report.categories_corrected);
            println!("  Accounts corrected:   {}", report.accounts_corrected);
            if report.dangling_categories > 0 {
                println!(
                    "  Transactions naming a missing category: {}",
                    report.dangling_categories
                );
            }
        }
        None => {
            println!("envelope-ledger - envelope budgeting");
            println!();
            println!("Run 'envelope-ledger --help' for usage information.");
        }
    }

    Ok(())
}
