//! Month budget display formatting

use crate::services::ledger::MonthSummary;

/// Format a month summary as a group/category table
pub fn format_month_summary(summary: &MonthSummary, symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Budget for {}\n", summary.month));
    output.push_str(&format!(
        "To be budgeted: {}\n\n",
        summary.to_be_budgeted.format_with_symbol(symbol)
    ));

    if summary.categories.is_empty() {
        output.push_str("No categories in this month.\n");
        return output;
    }

    let name_width = summary
        .categories
        .iter()
        .map(|c| c.name.len() + 2)
        .chain(summary.categories.iter().map(|c| c.group.len()))
        .max()
        .unwrap_or(8)
        .max(8);

    output.push_str(&format!(
        "{:<name_width$}  {:>12}  {:>12}  {:>12}\n",
        "Category",
        "Budgeted",
        "Activity",
        "Available",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:->12}  {:->12}  {:->12}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    let mut current_group: Option<&str> = None;
    for row in &summary.categories {
        if current_group != Some(row.group.as_str()) {
            output.push_str(&format!("{}\n", row.group));
            current_group = Some(row.group.as_str());
        }
        output.push_str(&format!(
            "  {:<width$}  {:>12}  {:>12}  {:>12}\n",
            row.name,
            row.budgeted.format_with_symbol(symbol),
            row.activity.format_with_symbol(symbol),
            row.available.format_with_symbol(symbol),
            width = name_width - 2,
        ));
    }

    output.push_str(&format!(
        "{:-<name_width$}  {:->12}  {:->12}  {:->12}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:<name_width$}  {:>12}  {:>12}  {:>12}\n",
        "TOTAL",
        summary.total_budgeted.format_with_symbol(symbol),
        summary.total_activity.format_with_symbol(symbol),
        summary.total_available.format_with_symbol(symbol),
        name_width = name_width,
    ));

    output
}
