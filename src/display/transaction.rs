//! Transaction display formatting

use crate::models::Transaction;

/// Format one register row
pub fn format_transaction_row(txn: &Transaction, symbol: &str) -> String {
    let payee = if txn.payee.is_empty() {
        "(no payee)"
    } else {
        txn.payee.as_str()
    };

    format!(
        "{:<12} {} {:<14} {:<20} {:<16} {:>12}",
        txn.id.to_string(),
        txn.date.format("%Y-%m-%d"),
        truncate(&txn.account, 14),
        truncate(payee, 20),
        truncate(txn.category.as_deref().unwrap_or("(to be budgeted)"), 16),
        txn.activity.format_with_symbol(symbol),
    )
}

/// Format transactions as a register
pub fn format_transaction_register(transactions: &[Transaction], symbol: &str) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12} {:<10} {:<14} {:<20} {:<16} {:>12}\n",
        "ID", "Date", "Account", "Payee", "Category", "Amount"
    ));
    output.push_str(&"-".repeat(89));
    output.push('\n');

    for txn in transactions {
        output.push_str(&format_transaction_row(txn, symbol));
        output.push('\n');
    }

    output
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
