use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

const BIN_NAME: &str = "envelope-ledger";

fn ledger(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(BIN_NAME).expect("binary exists");
    cmd.env("ENVELOPE_LEDGER_DATA_DIR", dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(dir: &TempDir, args: &[&str]) {
    ledger(dir).args(args).assert().success();
}

/// January with Wants/Dining budgeted at 100.00 and a Checking account
fn setup() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    run(&dir, &["init"]);
    run(&dir, &["account", "add", "Checking", "--balance", "500"]);
    run(&dir, &["month", "add", "202401"]);
    run(&dir, &["group", "add", "202401", "Wants"]);
    run(&dir, &["category", "add", "202401", "Wants", "Dining"]);
    run(&dir, &["category", "budget", "202401", "Dining", "100"]);
    dir
}

#[test]
fn init_creates_data_files() {
    let dir = TempDir::new().unwrap();
    ledger(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Initialized ledger"));

    assert!(dir.path().join("config.json").exists());
    for doc in ["accounts", "budget", "toBeBudgeted", "transactions"] {
        assert!(dir.path().join("data").join(format!("{}.json", doc)).exists());
    }
}

#[test]
fn config_shows_paths() {
    let dir = TempDir::new().unwrap();
    ledger(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(contains("Data directory").and(contains("Copy mode")));
}

#[test]
fn transaction_updates_budget_and_balance() {
    let dir = setup();
    run(
        &dir,
        &["txn", "add", "Checking", "-30", "--payee", "Cafe", "--category", "Dining", "--date", "2024-01-15"],
    );

    ledger(&dir)
        .args(["month", "show", "202401"])
        .assert()
        .success()
        .stdout(contains("Dining").and(contains("-$30.00")).and(contains("$70.00")));

    ledger(&dir)
        .args(["account", "list"])
        .assert()
        .success()
        .stdout(contains("$470.00"));
}

#[test]
fn unknown_category_is_rejected() {
    let dir = setup();
    ledger(&dir)
        .args(["txn", "add", "Checking", "-5", "--category", "Travel", "--date", "2024-01-02"])
        .assert()
        .failure()
        .stderr(contains("Category not found: 202401/Travel"));

    ledger(&dir)
        .args(["txn", "list"])
        .assert()
        .success()
        .stdout(contains("No transactions found."));
}

#[test]
fn delete_by_displayed_id_reverses_transaction() {
    let dir = setup();
    let output = ledger(&dir)
        .args(["txn", "add", "Checking", "-12.50", "--category", "Dining", "--date", "2024-01-10"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let id = stdout
        .lines()
        .nth(1)
        .and_then(|row| row.split_whitespace().next())
        .unwrap()
        .to_string();
    assert!(id.starts_with("txn-"));

    ledger(&dir)
        .args(["txn", "delete", &id])
        .assert()
        .success()
        .stdout(contains("Deleted transaction"));

    ledger(&dir)
        .args(["account", "list"])
        .assert()
        .success()
        .stdout(contains("$500.00"));
}

#[test]
fn uncategorized_income_is_to_be_budgeted() {
    let dir = setup();
    run(&dir, &["txn", "add", "Checking", "2500", "--payee", "Employer", "--date", "2024-01-31"]);

    ledger(&dir)
        .args(["month", "show", "202401"])
        .assert()
        .success()
        .stdout(contains("To be budgeted: $3000.00"));
}

#[test]
fn csv_import_reports_bad_rows() {
    let dir = setup();
    let csv = dir.path().join("bank.csv");
    std::fs::write(
        &csv,
        "Date,Amount,Payee,Category\n2024-01-03,-8.00,Cafe,Dining\nsoon,-1.00,Cafe,Dining\n",
    )
    .unwrap();

    ledger(&dir)
        .args(["txn", "import"])
        .arg(&csv)
        .args(["--account", "Checking", "--category-column", "3"])
        .assert()
        .success()
        .stdout(contains("Imported 1 transaction(s)").and(contains("row 2")));
}

#[test]
fn malformed_document_is_reported_not_fatal() {
    let dir = setup();
    let transactions = dir.path().join("data").join("transactions.json");
    std::fs::write(&transactions, "{\"oops\": 1}").unwrap();

    ledger(&dir)
        .args(["account", "list"])
        .assert()
        .success()
        .stderr(contains("transactions document ignored"))
        .stdout(contains("Checking"));

    // The next save keeps the original under another name
    run(&dir, &["account", "add", "Savings"]);
    let kept = dir.path().join("data").join("transactions.json.invalid");
    assert_eq!(std::fs::read_to_string(kept).unwrap(), "{\"oops\": 1}");

    ledger(&dir)
        .args(["account", "list"])
        .assert()
        .success()
        .stderr(contains("ignored").not());
}

#[test]
fn set_balance_is_kept_by_rebuild() {
    let dir = setup();
    run(&dir, &["txn", "add", "Checking", "-10", "--date", "2024-01-05"]);
    run(&dir, &["account", "set-balance", "Checking", "700"]);

    ledger(&dir)
        .arg("rebuild")
        .assert()
        .success()
        .stdout(contains("Accounts corrected:   0"));

    ledger(&dir)
        .args(["account", "list"])
        .assert()
        .success()
        .stdout(contains("$700.00"));
}

#[test]
fn rebuild_reports_corrections() {
    let dir = setup();
    let path = dir.path().join("data").join("accounts.json");
    let mut accounts: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    accounts[0]["cached_balance"] = serde_json::json!(1);
    std::fs::write(&path, accounts.to_string()).unwrap();

    ledger(&dir)
        .arg("rebuild")
        .assert()
        .success()
        .stdout(contains("Accounts corrected:   1"));
}
