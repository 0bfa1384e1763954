//! CSV import
//!
//! Turns rows of a bank export into [`NewTransaction`]s for one account and
//! records them through [`LedgerService::bulk_add_transactions`]. A row that
//! cannot be parsed is reported and skipped; it does not stop the import.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{parse_date, Money, NewTransaction, Transaction};
use crate::services::ledger::LedgerService;
use crate::storage::Storage;

/// Which CSV column holds what
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub date_column: usize,
    pub amount_column: usize,
    pub payee_column: Option<usize>,
    pub category_column: Option<usize>,
    pub note_column: Option<usize>,
    /// strftime format tried before the ISO fallbacks
    pub date_format: String,
    pub has_header: bool,
    pub delimiter: char,
    /// Some banks export purchases as positive numbers
    pub invert_amounts: bool,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: 0,
            amount_column: 1,
            payee_column: Some(2),
            category_column: None,
            note_column: None,
            date_format: "%Y-%m-%d".to_string(),
            has_header: true,
            delimiter: ',',
            invert_amounts: false,
        }
    }
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_category_column(mut self, column: usize) -> Self {
        self.category_column = Some(column);
        self
    }

    pub fn with_note_column(mut self, column: usize) -> Self {
        self.note_column = Some(column);
        self
    }

    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert_amounts = invert;
        self
    }
}

/// Result of an import; rows are numbered from 1, header excluded
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<Transaction>,
    /// Rows recorded without their unknown category
    pub folded_rows: Vec<usize>,
    /// Rows that were not recorded, with the reason
    pub failed_rows: Vec<(usize, LedgerError)>,
}

/// Service for CSV import
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Import a CSV file into `account`
    pub fn import_file(
        &self,
        path: &Path,
        account: &str,
        mapping: &ColumnMapping,
    ) -> LedgerResult<ImportReport> {
        let file = std::fs::File::open(path).map_err(|e| {
            LedgerError::Import(format!("Failed to open {}: {}", path.display(), e))
        })?;
        self.import_reader(file, account, mapping)
    }

    /// Import CSV data from any reader into `account`
    pub fn import_reader<R: Read>(
        &self,
        reader: R,
        account: &str,
        mapping: &ColumnMapping,
    ) -> LedgerResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut rows = Vec::new();
        let mut entries = Vec::new();

        for (row, parsed) in parse_csv(reader, account, mapping)? {
            match parsed {
                Ok(entry) => {
                    rows.push(row);
                    entries.push(entry);
                }
                Err(err) => {
                    debug!(row, error = %err, "Skipping unparseable row");
                    report.failed_rows.push((row, err));
                }
            }
        }

        let outcome = LedgerService::new(self.storage).bulk_add_transactions(entries)?;
        report.imported = outcome.added;
        report.folded_rows = outcome.folded.into_iter().map(|i| rows[i]).collect();
        report
            .failed_rows
            .extend(outcome.failed.into_iter().map(|(i, err)| (rows[i], err)));
        report.failed_rows.sort_by_key(|(row, _)| *row);

        info!(
            account,
            imported = report.imported.len(),
            folded = report.folded_rows.len(),
            failed = report.failed_rows.len(),
            "CSV import finished"
        );
        Ok(report)
    }
}

/// Parse every data row; the outer error is only for an unusable mapping
pub fn parse_csv<R: Read>(
    reader: R,
    account: &str,
    mapping: &ColumnMapping,
) -> LedgerResult<Vec<(usize, LedgerResult<NewTransaction>)>> {
    if !mapping.delimiter.is_ascii() {
        return Err(LedgerError::Import(format!(
            "Delimiter '{}' is not a single-byte character",
            mapping.delimiter
        )));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(mapping.has_header)
        .delimiter(mapping.delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        let parsed = record
            .map_err(|e| LedgerError::Import(format!("row {}: {}", row, e)))
            .and_then(|record| parse_record(&record, row, account, mapping));
        rows.push((row, parsed));
    }
    Ok(rows)
}

fn parse_record(
    record: &StringRecord,
    row: usize,
    account: &str,
    mapping: &ColumnMapping,
) -> LedgerResult<NewTransaction> {
    let cell = |column: usize, what: &str| {
        record
            .get(column)
            .ok_or_else(|| LedgerError::Import(format!("row {}: missing {} column", row, what)))
    };
    let optional = |column: Option<usize>| {
        column
            .and_then(|c| record.get(c))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let date_text = cell(mapping.date_column, "date")?;
    let date = parse_row_date(date_text, &mapping.date_format).ok_or_else(|| {
        LedgerError::Import(format!("row {}: could not parse date '{}'", row, date_text))
    })?;

    let amount = parse_amount(cell(mapping.amount_column, "amount")?)?;
    let amount = if mapping.invert_amounts { -amount } else { amount };

    let payee = optional(mapping.payee_column).unwrap_or_default();

    let mut entry = NewTransaction::new(account, amount, date, payee);
    if let Some(category) = optional(mapping.category_column) {
        entry = entry.category(category);
    }
    if let Some(note) = optional(mapping.note_column) {
        entry = entry.note(note);
    }
    Ok(entry)
}

fn parse_row_date(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, format)
        .ok()
        .or_else(|| parse_date(text))
}

/// Like [`Money::parse`], plus the accounting form `(12.34)` for negatives
fn parse_amount(text: &str) -> LedgerResult<Money> {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => Money::parse(inner)
            .map(|m| -m)
            .map_err(|_| LedgerError::InvalidAmount(text.to_string())),
        None => Money::parse(trimmed),
    }
}
