//! Structural validation of persisted documents
//!
//! Every document read back from persistence passes through one of these
//! checks before a store trusts it. The checks fail closed: any mismatch at
//! any depth rejects the whole document. Any JSON number passes as an
//! amount. The `check_*` twins used at load time go one step further:
//! amounts are stored as integer cents, so a fractional number is refused
//! with `InvalidAmount` rather than silently rounded.

use serde_json::{Map, Number, Value};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{parse_date, AccountType, MonthCode};

/// Check a `budget` document: month key → group → category → amounts
pub fn validate_total_budget(json: &Value) -> bool {
    let Some(months) = json.as_object() else {
        return false;
    };
    months.iter().all(|(key, month)| {
        MonthCode::parse_key(key).is_ok()
            && all_entries(month, |group| all_entries(group, is_budget_category))
    })
}

/// Check a `transactions` document
pub fn validate_transactions(json: &Value) -> bool {
    json.as_array()
        .map(|items| items.iter().all(is_transaction))
        .unwrap_or(false)
}

/// Check an `accounts` document
pub fn validate_accounts(json: &Value) -> bool {
    json.as_array()
        .map(|items| items.iter().all(is_account))
        .unwrap_or(false)
}

/// Check a `toBeBudgeted` document
pub fn validate_to_be_budgeted(json: &Value) -> bool {
    is_amount(json)
}

pub fn check_total_budget(json: &Value) -> LedgerResult<()> {
    check("budget", json, validate_total_budget(json))
}

pub fn check_transactions(json: &Value) -> LedgerResult<()> {
    check("transactions", json, validate_transactions(json))
}

pub fn check_accounts(json: &Value) -> LedgerResult<()> {
    check("accounts", json, validate_accounts(json))
}

pub fn check_to_be_budgeted(json: &Value) -> LedgerResult<()> {
    check("toBeBudgeted", json, validate_to_be_budgeted(json))
}

fn check(document: &str, json: &Value, valid: bool) -> LedgerResult<()> {
    if !valid {
        return Err(LedgerError::InvalidShape(format!(
            "document '{}' does not match its schema",
            document
        )));
    }
    match non_integer_amount(json) {
        Some(number) => Err(LedgerError::InvalidAmount(format!(
            "document '{}' holds {}, amounts must be whole cents",
            document, number
        ))),
        None => Ok(()),
    }
}

/// First number anywhere in the document that is not an `i64`
fn non_integer_amount(value: &Value) -> Option<&Number> {
    match value {
        Value::Number(number) if !number.is_i64() => Some(number),
        Value::Array(items) => items.iter().find_map(non_integer_amount),
        Value::Object(fields) => fields.values().find_map(non_integer_amount),
        _ => None,
    }
}

fn all_entries(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    value
        .as_object()
        .map(|map| map.values().all(pred))
        .unwrap_or(false)
}

fn is_amount(value: &Value) -> bool {
    value.is_number()
}

fn is_budget_category(value: &Value) -> bool {
    value
        .as_object()
        .map(|fields| {
            fields.get("budgeted").is_some_and(is_amount)
                && fields.get("activity").is_some_and(is_amount)
        })
        .unwrap_or(false)
}

fn is_optional_string(fields: &Map<String, Value>, key: &str) -> bool {
    matches!(fields.get(key), None | Some(Value::Null) | Some(Value::String(_)))
}

fn is_required_string(fields: &Map<String, Value>, key: &str) -> bool {
    matches!(fields.get(key), Some(Value::String(_)))
}

fn is_transaction(value: &Value) -> bool {
    let Some(fields) = value.as_object() else {
        return false;
    };
    is_required_string(fields, "account")
        && is_required_string(fields, "payee")
        && fields
            .get("date")
            .and_then(Value::as_str)
            .and_then(parse_date)
            .is_some_and(|date| MonthCode::from_date(date).is_ok())
        && fields.get("activity").is_some_and(is_amount)
        && is_optional_string(fields, "category")
        && is_optional_string(fields, "note")
        && match fields.get("id") {
            None => true,
            Some(Value::String(id)) => id.parse::<uuid::Uuid>().is_ok(),
            Some(_) => false,
        }
}

fn is_account(value: &Value) -> bool {
    let Some(fields) = value.as_object() else {
        return false;
    };
    is_required_string(fields, "name")
        && fields.get("cached_balance").is_some_and(is_amount)
        && fields.get("starting_balance").map_or(true, is_amount)
        && match fields.get("type") {
            None => true,
            Some(Value::String(kind)) => AccountType::parse(kind).is_some(),
            Some(_) => false,
        }
        && match fields.get("id") {
            None => true,
            Some(Value::String(id)) => id.parse::<uuid::Uuid>().is_ok(),
            Some(_) => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_budget_is_valid() {
        assert!(validate_total_budget(&json!({})));
    }

    #[test]
    fn test_well_formed_budget() {
        let doc = json!({
            "202401": {
                "Wants": {
                    "Dining": {"budgeted": 10000, "activity": -2000}
                },
                "Empty Group": {}
            },
            "202402": {}
        });
        assert!(validate_total_budget(&doc));
        assert!(check_total_budget(&doc).is_ok());
    }

    #[test]
    fn test_budget_non_numeric_leaf_rejected() {
        let bad_budgeted = json!({"202401": {"Wants": {"Dining": {"budgeted": "100", "activity": 0}}}});
        let bad_activity = json!({"202401": {"Wants": {"Dining": {"budgeted": 100, "activity": null}}}});
        let missing = json!({"202401": {"Wants": {"Dining": {"budgeted": 100}}}});
        assert!(!validate_total_budget(&bad_budgeted));
        assert!(!validate_total_budget(&bad_activity));
        assert!(!validate_total_budget(&missing));
    }

    #[test]
    fn test_budget_shape_mismatch_at_each_level() {
        assert!(!validate_total_budget(&json!([])));
        assert!(!validate_total_budget(&json!({"202401": []})));
        assert!(!validate_total_budget(&json!({"202401": {"Wants": 5}})));
        assert!(!validate_total_budget(&json!({"202401": {"Wants": {"Dining": 5}}})));
        assert!(!validate_total_budget(&json!({"2024-01": {}})));
        assert!(!validate_total_budget(&json!({"202413": {}})));

        let err = check_total_budget(&json!(null)).unwrap_err();
        assert!(err.is_invalid_shape());
    }

    #[test]
    fn test_transactions_valid() {
        let doc = json!([
            {"account": "Checking", "payee": "Cafe", "date": "2024-01-15", "activity": -3000, "category": "Dining"},
            {"account": "Checking", "payee": "Employer", "date": "2024-01-31T09:00:00Z", "activity": 250000, "category": null, "note": "salary"},
            {"id": "550e8400-e29b-41d4-a716-446655440000", "account": "Cash", "payee": "Market", "date": "2024-02-01", "activity": -100}
        ]);
        assert!(validate_transactions(&doc));
        assert!(validate_transactions(&json!([])));
    }

    #[test]
    fn test_transactions_invalid() {
        let cases = [
            json!({}),
            json!([{"payee": "Cafe", "date": "2024-01-15", "activity": -3000}]),
            json!([{"account": "A", "payee": 3, "date": "2024-01-15", "activity": -3000}]),
            json!([{"account": "A", "payee": "Cafe", "date": "yesterday", "activity": -3000}]),
            json!([{"account": "A", "payee": "Cafe", "date": "0999-01-15", "activity": -3000}]),
            json!([{"account": "A", "payee": "Cafe", "date": "2024-01-15", "activity": "-30"}]),
            json!([{"account": "A", "payee": "Cafe", "date": "2024-01-15", "activity": -30, "category": 7}]),
            json!([{"account": "A", "payee": "Cafe", "date": "2024-01-15", "activity": -30, "id": "nope"}]),
        ];
        for case in cases {
            assert!(!validate_transactions(&case), "should reject {}", case);
        }
    }

    #[test]
    fn test_accounts() {
        assert!(validate_accounts(&json!([
            {"name": "Checking", "cached_balance": 50000, "starting_balance": 50000, "type": "budgeted"},
            {"name": "Cash", "cached_balance": 0}
        ])));
        assert!(!validate_accounts(&json!([{"name": "Checking"}])));
        assert!(!validate_accounts(&json!([{"name": "Checking", "cached_balance": 0, "type": "savings"}])));
        assert!(!validate_accounts(&json!({"name": "Checking"})));
    }

    #[test]
    fn test_to_be_budgeted() {
        assert!(validate_to_be_budgeted(&json!(1500)));
        assert!(validate_to_be_budgeted(&json!(-20)));
        assert!(!validate_to_be_budgeted(&json!("1500")));
        assert!(validate_to_be_budgeted(&json!(15.5)));
    }

    #[test]
    fn test_fractional_amounts_are_numeric() {
        let doc = json!({"202401": {"G": {"C": {"budgeted": 100.5, "activity": -20.25}}}});
        assert!(validate_total_budget(&doc));

        let err = check_total_budget(&doc).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert!(err.to_string().contains("100.5"));

        let txns = json!([{"account": "A", "payee": "Cafe", "date": "2024-01-15", "activity": -30.5}]);
        assert!(validate_transactions(&txns));
        assert!(matches!(
            check_transactions(&txns),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(check_to_be_budgeted(&json!(-400)).is_ok());
    }
}
