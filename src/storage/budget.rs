//! Budget store
//!
//! Holds the month → group → category hierarchy together with the
//! to-be-budgeted pool. Months are only created by `add_month` or
//! `copy_month`; reads never create anything. Group and category names are
//! trimmed on every call, so `" Dining "` and `"Dining"` are the same name.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    BudgetCategory, BudgetGroup, CopyMode, Money, MonthCode, MonthlyBudget, TotalBudget,
};
use crate::validate::{check_to_be_budgeted, check_total_budget};

#[derive(Debug, Default)]
struct BudgetState {
    months: TotalBudget,
    to_be_budgeted: Money,
}

impl BudgetState {
    fn month(&self, month: MonthCode) -> LedgerResult<&MonthlyBudget> {
        self.months
            .get(&month.to_key())
            .ok_or_else(|| LedgerError::month_not_found(month.to_key()))
    }

    fn month_mut(&mut self, month: MonthCode) -> LedgerResult<&mut MonthlyBudget> {
        self.months
            .get_mut(&month.to_key())
            .ok_or_else(|| LedgerError::month_not_found(month.to_key()))
    }

    fn category_mut(
        &mut self,
        month: MonthCode,
        category: &str,
    ) -> LedgerResult<&mut BudgetCategory> {
        let category = category.trim();
        self.month_mut(month)?
            .category_mut(category)
            .ok_or_else(|| LedgerError::category_not_found(qualified(month, category)))
    }
}

/// `202401/Dining` style identifier used in errors
fn qualified(month: MonthCode, name: &str) -> String {
    format!("{}/{}", month, name)
}

fn checked_name(kind: &str, name: &str) -> LedgerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation(format!("{} name cannot be empty", kind)));
    }
    Ok(name.to_string())
}

/// Repository for the monthly budget hierarchy and the unassigned pool
#[derive(Debug, Default)]
pub struct BudgetRepository {
    state: RwLock<BudgetState>,
    #[cfg(test)]
    pub(crate) faults: super::FaultSwitch,
}

impl BudgetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, BudgetState>> {
        self.state
            .read()
            .map_err(|e| LedgerError::poisoned("budget read", e))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, BudgetState>> {
        self.state
            .write()
            .map_err(|e| LedgerError::poisoned("budget write", e))
    }

    // Persistence

    /// Replace the hierarchy with a persisted `budget` document
    ///
    /// A malformed document leaves no months behind and returns `InvalidShape`.
    pub fn load_budget_value(&self, doc: Option<Value>) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.months.clear();

        let Some(doc) = doc else {
            return Ok(());
        };
        check_total_budget(&doc)?;

        let months: TotalBudget = serde_json::from_value(doc)
            .map_err(|e| LedgerError::InvalidShape(format!("budget: {}", e)))?;
        for (key, month) in &months {
            let mut seen = std::collections::HashSet::new();
            for (_, name, _) in month.categories() {
                if !seen.insert(name) {
                    return Err(LedgerError::InvalidShape(format!(
                        "budget: category '{}' appears in more than one group of {}",
                        name, key
                    )));
                }
            }
        }

        state.months = months;
        Ok(())
    }

    /// Replace the pool with a persisted `toBeBudgeted` document
    pub fn load_to_be_budgeted_value(&self, doc: Option<Value>) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.to_be_budgeted = Money::zero();

        let Some(doc) = doc else {
            return Ok(());
        };
        check_to_be_budgeted(&doc)?;
        state.to_be_budgeted = serde_json::from_value(doc)
            .map_err(|e| LedgerError::InvalidShape(format!("toBeBudgeted: {}", e)))?;
        Ok(())
    }

    pub fn budget_value(&self) -> LedgerResult<Value> {
        Ok(serde_json::to_value(&self.read()?.months)?)
    }

    pub fn to_be_budgeted_value(&self) -> LedgerResult<Value> {
        Ok(serde_json::to_value(self.read()?.to_be_budgeted)?)
    }

    // Months

    pub fn add_month(&self, month: MonthCode) -> LedgerResult<()> {
        let mut state = self.write()?;
        let key = month.to_key();
        if state.months.contains_key(&key) {
            return Err(LedgerError::month_exists(key));
        }
        state.months.insert(key, MonthlyBudget::default());
        Ok(())
    }

    pub fn delete_month(&self, month: MonthCode) -> LedgerResult<MonthlyBudget> {
        let mut state = self.write()?;
        state
            .months
            .remove(&month.to_key())
            .ok_or_else(|| LedgerError::month_not_found(month.to_key()))
    }

    /// Copy the group/category structure and budgeted amounts of one month
    /// into another
    ///
    /// Every copied category starts with zero activity. The destination is
    /// created when missing; see [`CopyMode`] for what happens to content it
    /// already has. A category that sits in a different group of the
    /// destination is moved to the source's group.
    pub fn copy_month(&self, from: MonthCode, to: MonthCode, mode: CopyMode) -> LedgerResult<()> {
        if from == to {
            return Err(LedgerError::Validation(format!(
                "Cannot copy month {} onto itself",
                from
            )));
        }

        let mut state = self.write()?;
        let source = state
            .months
            .get(&from.to_key())
            .cloned()
            .ok_or_else(|| LedgerError::month_not_found(from.to_key()))?;

        let dest = state.months.entry(to.to_key()).or_default();
        if mode == CopyMode::Replace {
            dest.groups.clear();
        }

        for (group_name, group) in source.groups {
            dest.groups.entry(group_name.clone()).or_default();
            for (category_name, category) in group.categories {
                for (other_name, other) in dest.groups.iter_mut() {
                    if *other_name != group_name {
                        other.categories.remove(&category_name);
                    }
                }
                if let Some(target) = dest.groups.get_mut(&group_name) {
                    target
                        .categories
                        .insert(category_name, BudgetCategory::new(category.budgeted));
                }
            }
        }

        Ok(())
    }

    // Groups and categories

    pub fn add_group(&self, month: MonthCode, group: &str) -> LedgerResult<()> {
        let group = checked_name("Group", group)?;
        let mut state = self.write()?;
        let budget = state.month_mut(month)?;
        if budget.groups.contains_key(&group) {
            return Err(LedgerError::group_exists(qualified(month, &group)));
        }
        budget.groups.insert(group, BudgetGroup::default());
        Ok(())
    }

    /// Add an empty category to a group
    ///
    /// Fails if the name is used by any group of the month.
    pub fn add_category(&self, month: MonthCode, group: &str, category: &str) -> LedgerResult<()> {
        let category = checked_name("Category", category)?;
        let group = group.trim();
        let mut state = self.write()?;
        let budget = state.month_mut(month)?;
        if !budget.groups.contains_key(group) {
            return Err(LedgerError::group_not_found(qualified(month, group)));
        }
        if budget.has_category(&category) {
            return Err(LedgerError::category_exists(qualified(month, &category)));
        }
        if let Some(target) = budget.groups.get_mut(group) {
            target
                .categories
                .insert(category, BudgetCategory::default());
        }
        Ok(())
    }

    /// Remove a group together with all of its categories
    pub fn delete_group(&self, month: MonthCode, group: &str) -> LedgerResult<BudgetGroup> {
        let group = group.trim();
        let mut state = self.write()?;
        state
            .month_mut(month)?
            .groups
            .remove(group)
            .ok_or_else(|| LedgerError::group_not_found(qualified(month, group)))
    }

    /// Remove a category from whichever group holds it
    pub fn delete_category(&self, month: MonthCode, category: &str) -> LedgerResult<BudgetCategory> {
        let category = category.trim();
        let mut state = self.write()?;
        let not_found = || LedgerError::category_not_found(qualified(month, category));
        let budget = state.months.get_mut(&month.to_key()).ok_or_else(not_found)?;

        let mut removed = None;
        for group in budget.groups.values_mut() {
            if let Some(cat) = group.categories.remove(category) {
                removed.get_or_insert(cat);
            }
        }
        removed.ok_or_else(not_found)
    }

    pub fn edit_budgeted_amount(
        &self,
        month: MonthCode,
        category: &str,
        amount: Money,
    ) -> LedgerResult<BudgetCategory> {
        let mut state = self.write()?;
        let cat = state.category_mut(month, category)?;
        cat.budgeted = amount;
        Ok(*cat)
    }

    pub fn set_activity_amount(
        &self,
        month: MonthCode,
        category: &str,
        amount: Money,
    ) -> LedgerResult<BudgetCategory> {
        self.update_activity_amount(month, category, |_| amount)
    }

    /// Adjust a category's activity with a function of its current value,
    /// under a single write lock
    pub fn update_activity_amount<F>(
        &self,
        month: MonthCode,
        category: &str,
        update: F,
    ) -> LedgerResult<BudgetCategory>
    where
        F: FnOnce(Money) -> Money,
    {
        #[cfg(test)]
        self.faults.check("category activity")?;

        let mut state = self.write()?;
        let cat = state.category_mut(month, category)?;
        cat.activity = update(cat.activity);
        Ok(*cat)
    }

    // Pool

    pub fn set_to_be_budgeted(&self, amount: Money) -> LedgerResult<Money> {
        self.update_to_be_budgeted(|_| amount)
    }

    pub fn update_to_be_budgeted<F>(&self, update: F) -> LedgerResult<Money>
    where
        F: FnOnce(Money) -> Money,
    {
        #[cfg(test)]
        self.faults.check("to-be-budgeted")?;

        let mut state = self.write()?;
        state.to_be_budgeted = update(state.to_be_budgeted);
        Ok(state.to_be_budgeted)
    }

    pub fn to_be_budgeted(&self) -> LedgerResult<Money> {
        Ok(self.read()?.to_be_budgeted)
    }

    // Reads

    pub fn month(&self, month: MonthCode) -> LedgerResult<Option<MonthlyBudget>> {
        Ok(self.read()?.month(month).ok().cloned())
    }

    pub fn has_month(&self, month: MonthCode) -> LedgerResult<bool> {
        Ok(self.read()?.months.contains_key(&month.to_key()))
    }

    /// All months that have a budget, oldest first
    pub fn months(&self) -> LedgerResult<Vec<MonthCode>> {
        let state = self.read()?;
        Ok(state
            .months
            .keys()
            .filter_map(|key| MonthCode::parse_key(key).ok())
            .collect())
    }

    pub fn category(&self, month: MonthCode, category: &str) -> LedgerResult<Option<BudgetCategory>> {
        let state = self.read()?;
        Ok(state
            .month(month)
            .ok()
            .and_then(|budget| budget.category(category.trim()).copied()))
    }

    pub fn has_category(&self, month: MonthCode, category: &str) -> LedgerResult<bool> {
        Ok(self.category(month, category)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jan() -> MonthCode {
        MonthCode::parse_key("202401").unwrap()
    }

    fn feb() -> MonthCode {
        MonthCode::parse_key("202402").unwrap()
    }

    /// January with Wants/Dining {100.00, -20.00} and Bills/Rent {1500.00, 0}
    fn seeded() -> BudgetRepository {
        let repo = BudgetRepository::new();
        repo.add_month(jan()).unwrap();
        repo.add_group(jan(), "Wants").unwrap();
        repo.add_group(jan(), "Bills").unwrap();
        repo.add_category(jan(), "Wants", "Dining").unwrap();
        repo.add_category(jan(), "Bills", "Rent").unwrap();
        repo.edit_budgeted_amount(jan(), "Dining", Money::from_cents(10000))
            .unwrap();
        repo.set_activity_amount(jan(), "Dining", Money::from_cents(-2000))
            .unwrap();
        repo.edit_budgeted_amount(jan(), "Rent", Money::from_cents(150000))
            .unwrap();
        repo
    }

    #[test]
    fn test_add_month_twice_fails() {
        let repo = BudgetRepository::new();
        repo.add_month(jan()).unwrap();
        let err = repo.add_month(jan()).unwrap_err();
        assert!(err.is_already_exists_for("Month"));
    }

    #[test]
    fn test_reads_do_not_create_months() {
        let repo = BudgetRepository::new();
        assert!(repo.month(jan()).unwrap().is_none());
        assert!(repo.category(jan(), "Dining").unwrap().is_none());
        assert!(repo.months().unwrap().is_empty());
    }

    #[test]
    fn test_add_group_errors() {
        let repo = seeded();
        assert!(repo
            .add_group(feb(), "Wants")
            .unwrap_err()
            .is_not_found_for("Month"));
        assert!(repo
            .add_group(jan(), "Wants")
            .unwrap_err()
            .is_already_exists_for("Group"));
    }

    #[test]
    fn test_add_category_errors() {
        let repo = seeded();
        assert!(repo
            .add_category(feb(), "Wants", "Coffee")
            .unwrap_err()
            .is_not_found_for("Month"));
        assert!(repo
            .add_category(jan(), "Fun", "Coffee")
            .unwrap_err()
            .is_not_found_for("Group"));
        assert!(repo
            .add_category(jan(), "Wants", "Dining")
            .unwrap_err()
            .is_already_exists_for("Category"));
    }

    #[test]
    fn test_category_name_unique_across_groups() {
        let repo = seeded();
        let err = repo.add_category(jan(), "Bills", "Dining").unwrap_err();
        assert!(err.is_already_exists_for("Category"));
        assert_eq!(err.to_string(), "Category already exists: 202401/Dining");
    }

    #[test]
    fn test_delete_group_removes_its_categories() {
        let repo = seeded();
        let removed = repo.delete_group(jan(), "Wants").unwrap();
        assert!(removed.categories.contains_key("Dining"));
        assert!(!repo.has_category(jan(), "Dining").unwrap());
        assert!(repo.has_category(jan(), "Rent").unwrap());

        assert!(repo
            .delete_group(jan(), "Wants")
            .unwrap_err()
            .is_not_found_for("Group"));
        assert!(repo
            .delete_group(feb(), "Wants")
            .unwrap_err()
            .is_not_found_for("Month"));
    }

    #[test]
    fn test_delete_category() {
        let repo = seeded();
        let removed = repo.delete_category(jan(), "Dining").unwrap();
        assert_eq!(removed.budgeted.cents(), 10000);
        assert!(!repo.has_category(jan(), "Dining").unwrap());

        assert!(repo
            .delete_category(jan(), "Dining")
            .unwrap_err()
            .is_not_found_for("Category"));
        assert!(repo
            .delete_category(feb(), "Dining")
            .unwrap_err()
            .is_not_found_for("Category"));
    }

    #[test]
    fn test_names_are_trimmed_on_every_call() {
        let repo = BudgetRepository::new();
        repo.add_month(jan()).unwrap();
        repo.add_group(jan(), " Wants ").unwrap();
        repo.add_category(jan(), " Wants ", " Dining ").unwrap();

        assert!(repo.has_category(jan(), "Dining").unwrap());
        assert!(repo.has_category(jan(), " Dining ").unwrap());
        repo.edit_budgeted_amount(jan(), " Dining ", Money::from_cents(500))
            .unwrap();
        let cat = repo
            .update_activity_amount(jan(), "Dining ", |a| a + Money::from_cents(-100))
            .unwrap();
        assert_eq!(cat.available().cents(), 400);

        repo.delete_category(jan(), " Dining ").unwrap();
        assert!(!repo.has_category(jan(), "Dining").unwrap());
        repo.delete_group(jan(), " Wants ").unwrap();
        assert!(repo.month(jan()).unwrap().unwrap().groups.is_empty());
    }

    #[test]
    fn test_edit_and_activity_errors() {
        let repo = seeded();
        assert!(repo
            .edit_budgeted_amount(feb(), "Dining", Money::zero())
            .unwrap_err()
            .is_not_found_for("Month"));
        assert!(repo
            .edit_budgeted_amount(jan(), "Travel", Money::zero())
            .unwrap_err()
            .is_not_found_for("Category"));
        assert!(repo
            .update_activity_amount(jan(), "Travel", |a| a)
            .unwrap_err()
            .is_not_found_for("Category"));
    }

    #[test]
    fn test_update_activity_is_relative() {
        let repo = seeded();
        let cat = repo
            .update_activity_amount(jan(), "Dining", |a| a + Money::from_cents(-3000))
            .unwrap();
        assert_eq!(cat.activity.cents(), -5000);
        assert_eq!(cat.budgeted.cents(), 10000);
        assert_eq!(cat.available().cents(), 5000);
    }

    #[test]
    fn test_copy_month_into_new_month() {
        let repo = seeded();
        repo.copy_month(jan(), feb(), CopyMode::Merge).unwrap();

        let source = repo.month(jan()).unwrap().unwrap();
        let copy = repo.month(feb()).unwrap().unwrap();
        for (group, name, cat) in source.categories() {
            assert_eq!(copy.group_of(name), Some(group));
            let copied = copy.category(name).unwrap();
            assert_eq!(copied.budgeted, cat.budgeted);
            assert_eq!(copied.activity, Money::zero());
        }
        // Source untouched
        assert_eq!(
            repo.category(jan(), "Dining").unwrap().unwrap().activity.cents(),
            -2000
        );
    }

    #[test]
    fn test_copy_month_merge_keeps_destination_extras() {
        let repo = seeded();
        repo.add_month(feb()).unwrap();
        repo.add_group(feb(), "Wants").unwrap();
        repo.add_group(feb(), "Travel").unwrap();
        repo.add_category(feb(), "Wants", "Hobbies").unwrap();
        repo.add_category(feb(), "Travel", "Dining").unwrap();
        repo.set_activity_amount(feb(), "Dining", Money::from_cents(-700))
            .unwrap();
        repo.set_activity_amount(feb(), "Hobbies", Money::from_cents(-900))
            .unwrap();

        repo.copy_month(jan(), feb(), CopyMode::Merge).unwrap();
        let copy = repo.month(feb()).unwrap().unwrap();

        // Overlapping category moved to the source's group, overwritten
        assert_eq!(copy.group_of("Dining"), Some("Wants"));
        assert_eq!(copy.category("Dining").unwrap().budgeted.cents(), 10000);
        assert_eq!(copy.category("Dining").unwrap().activity.cents(), 0);
        // Destination-only content untouched
        assert_eq!(copy.category("Hobbies").unwrap().activity.cents(), -900);
        assert!(copy.groups.contains_key("Travel"));
        assert!(copy.groups["Travel"].categories.is_empty());
        assert!(copy.has_category("Rent"));
    }

    #[test]
    fn test_copy_month_replace_discards_destination() {
        let repo = seeded();
        repo.add_month(feb()).unwrap();
        repo.add_group(feb(), "Travel").unwrap();
        repo.add_category(feb(), "Travel", "Flights").unwrap();

        repo.copy_month(jan(), feb(), CopyMode::Replace).unwrap();
        let copy = repo.month(feb()).unwrap().unwrap();

        assert!(!copy.groups.contains_key("Travel"));
        assert!(!copy.has_category("Flights"));
        assert_eq!(copy.categories().count(), 2);
    }

    #[test]
    fn test_copy_month_missing_source() {
        let repo = BudgetRepository::new();
        let err = repo.copy_month(jan(), feb(), CopyMode::Merge).unwrap_err();
        assert!(err.is_not_found_for("Month"));
        assert!(!repo.has_month(feb()).unwrap());
    }

    #[test]
    fn test_to_be_budgeted_pool() {
        let repo = BudgetRepository::new();
        assert_eq!(repo.to_be_budgeted().unwrap(), Money::zero());
        repo.set_to_be_budgeted(Money::from_cents(1000)).unwrap();
        let after = repo
            .update_to_be_budgeted(|p| p - Money::from_cents(250))
            .unwrap();
        assert_eq!(after.cents(), 750);
    }

    #[test]
    fn test_value_round_trip() {
        let repo = seeded();
        repo.set_to_be_budgeted(Money::from_cents(4200)).unwrap();

        let budget = repo.budget_value().unwrap();
        assert_eq!(budget["202401"]["Wants"]["Dining"]["activity"], -2000);

        let reloaded = BudgetRepository::new();
        reloaded.load_budget_value(Some(budget)).unwrap();
        reloaded
            .load_to_be_budgeted_value(Some(repo.to_be_budgeted_value().unwrap()))
            .unwrap();
        assert_eq!(reloaded.month(jan()).unwrap(), repo.month(jan()).unwrap());
        assert_eq!(reloaded.to_be_budgeted().unwrap().cents(), 4200);
    }

    #[test]
    fn test_malformed_documents_reset_store() {
        let repo = seeded();
        repo.set_to_be_budgeted(Money::from_cents(10)).unwrap();

        let err = repo
            .load_budget_value(Some(json!({"202401": {"Wants": {"Dining": {"budgeted": "x", "activity": 0}}}})))
            .unwrap_err();
        assert!(err.is_invalid_shape());
        assert!(repo.months().unwrap().is_empty());

        let err = repo
            .load_to_be_budgeted_value(Some(json!("ten")))
            .unwrap_err();
        assert!(err.is_invalid_shape());
        assert_eq!(repo.to_be_budgeted().unwrap(), Money::zero());
    }

    #[test]
    fn test_duplicate_category_in_document_rejected() {
        let repo = BudgetRepository::new();
        let doc = json!({
            "202401": {
                "Wants": {"Dining": {"budgeted": 0, "activity": 0}},
                "Needs": {"Dining": {"budgeted": 0, "activity": 0}}
            }
        });
        assert!(repo.load_budget_value(Some(doc)).unwrap_err().is_invalid_shape());
        assert!(repo.months().unwrap().is_empty());
    }
}
