//! Budget hierarchy model
//!
//! A month's budget is a map of group name to group, and each group maps
//! category name to its `budgeted`/`activity` pair. Category names are
//! unique across the whole month, not only within their group, so lookups
//! by category name search every group.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::money::Money;

/// Planned allocation and recorded activity for one category in one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    /// Amount assigned to this category for the month
    pub budgeted: Money,
    /// Running signed sum of transactions attributed to this category
    pub activity: Money,
}

impl BudgetCategory {
    pub fn new(budgeted: Money) -> Self {
        Self {
            budgeted,
            activity: Money::zero(),
        }
    }

    /// Money left in the envelope
    pub fn available(&self) -> Money {
        self.budgeted + self.activity
    }
}

/// Categories belonging to one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetGroup {
    pub categories: BTreeMap<String, BudgetCategory>,
}

/// All groups of one month
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlyBudget {
    pub groups: BTreeMap<String, BudgetGroup>,
}

/// Month key to monthly budget, as persisted in the `budget` document
pub type TotalBudget = BTreeMap<String, MonthlyBudget>;

impl MonthlyBudget {
    /// Name of the group holding a category
    pub fn group_of(&self, category: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, group)| group.categories.contains_key(category))
            .map(|(name, _)| name.as_str())
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.group_of(category).is_some()
    }

    pub fn category(&self, category: &str) -> Option<&BudgetCategory> {
        self.groups
            .values()
            .find_map(|group| group.categories.get(category))
    }

    pub fn category_mut(&mut self, category: &str) -> Option<&mut BudgetCategory> {
        self.groups
            .values_mut()
            .find_map(|group| group.categories.get_mut(category))
    }

    /// Iterate `(group, category, amounts)` over the whole month
    pub fn categories(&self) -> impl Iterator<Item = (&str, &str, &BudgetCategory)> {
        self.groups.iter().flat_map(|(group_name, group)| {
            group
                .categories
                .iter()
                .map(move |(name, cat)| (group_name.as_str(), name.as_str(), cat))
        })
    }

    pub fn total_budgeted(&self) -> Money {
        self.categories().map(|(_, _, c)| c.budgeted).sum()
    }

    pub fn total_activity(&self) -> Money {
        self.categories().map(|(_, _, c)| c.activity).sum()
    }
}

/// How `copy_month` treats a destination month that already has content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Keep destination groups and categories the source does not mention;
    /// overwrite the overlapping ones
    #[default]
    Merge,
    /// Discard the destination month's structure before copying
    Replace,
}

impl CopyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "merge" => Some(Self::Merge),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_month() -> MonthlyBudget {
        let mut month = MonthlyBudget::default();
        let mut wants = BudgetGroup::default();
        wants.categories.insert(
            "Dining".into(),
            BudgetCategory {
                budgeted: Money::from_cents(10000),
                activity: Money::from_cents(-2000),
            },
        );
        let mut bills = BudgetGroup::default();
        bills
            .categories
            .insert("Rent".into(), BudgetCategory::new(Money::from_cents(150000)));
        month.groups.insert("Wants".into(), wants);
        month.groups.insert("Bills".into(), bills);
        month
    }

    #[test]
    fn test_lookup_across_groups() {
        let month = sample_month();
        assert_eq!(month.group_of("Dining"), Some("Wants"));
        assert_eq!(month.group_of("Rent"), Some("Bills"));
        assert!(month.category("Groceries").is_none());
        assert_eq!(month.category("Dining").unwrap().available().cents(), 8000);
    }

    #[test]
    fn test_totals() {
        let month = sample_month();
        assert_eq!(month.total_budgeted().cents(), 160000);
        assert_eq!(month.total_activity().cents(), -2000);
        assert_eq!(month.categories().count(), 2);
    }

    #[test]
    fn test_json_shape_is_nested_maps() {
        let json = serde_json::to_value(sample_month()).unwrap();
        assert_eq!(json["Wants"]["Dining"]["budgeted"], 10000);
        assert_eq!(json["Wants"]["Dining"]["activity"], -2000);
    }

    #[test]
    fn test_copy_mode_parse() {
        assert_eq!(CopyMode::parse("Merge"), Some(CopyMode::Merge));
        assert_eq!(CopyMode::parse("replace"), Some(CopyMode::Replace));
        assert_eq!(CopyMode::parse("other"), None);
        assert_eq!(CopyMode::default(), CopyMode::Merge);
    }
}
