//! Client-side aggregation of journal lists.
//!
//! These are pure functions of their inputs. They work on whatever journals
//! the caller holds (often a subset of the server's data), so their results
//! are never assumed to match the server-computed summary.

use std::collections::HashMap;

use api_types::{Amount, EntryType, category::Category, journal::Journal};

use crate::filters::TypeFilter;

pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";
pub const DEFAULT_COLOR: &str = "#666";
pub const INCOME_ICON: &str = "💰";
pub const EXPENSE_ICON: &str = "💸";

fn default_icon(kind: EntryType) -> &'static str {
    match kind {
        EntryType::Income => INCOME_ICON,
        EntryType::Expense => EXPENSE_ICON,
    }
}

/// Bucket a journal lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Category(i64),
    /// Journals without a known category, split by their own type.
    Uncategorized(EntryType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryTotal {
    pub key: GroupKey,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub total: Amount,
    pub count: usize,
    /// Share of the grand total, in percent. `0.0` when the grand total is zero.
    pub percentage: f64,
    /// Type of the first journal seen in the group.
    pub kind: EntryType,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryBreakdown {
    /// Groups by descending total; equal totals keep first-seen order.
    pub groups: Vec<CategoryTotal>,
    pub grand_total: Amount,
}

/// Groups journals by category.
pub fn aggregate_by_category(
    journals: &[Journal],
    categories: &[Category],
    filter: TypeFilter,
) -> CategoryBreakdown {
    let by_id: HashMap<i64, &Category> = categories
        .iter()
        .map(|category| (category.id, category))
        .collect();

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<CategoryTotal> = Vec::new();

    for journal in journals.iter().filter(|journal| filter.matches(journal.kind)) {
        let category = journal
            .category_id
            .and_then(|id| by_id.get(&id).copied());
        let key = match category {
            Some(category) => GroupKey::Category(category.id),
            None => GroupKey::Uncategorized(journal.kind),
        };

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(new_group(key, category, journal.kind));
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += journal.amount;
        group.count += 1;
    }

    // `sort_by` is stable, so ties keep insertion order.
    groups.sort_by(|a, b| b.total.cmp(&a.total));

    let grand_total: Amount = groups.iter().map(|group| group.total).sum();
    for group in &mut groups {
        group.percentage = percentage(group.total, grand_total);
    }

    CategoryBreakdown {
        groups,
        grand_total,
    }
}

fn new_group(key: GroupKey, category: Option<&Category>, kind: EntryType) -> CategoryTotal {
    let (label, icon, color) = match category {
        Some(category) => (
            category.name.clone(),
            non_empty(&category.icon).unwrap_or(default_icon(kind)).to_string(),
            non_empty(&category.color).unwrap_or(DEFAULT_COLOR).to_string(),
        ),
        None => (
            UNCATEGORIZED_LABEL.to_string(),
            default_icon(kind).to_string(),
            DEFAULT_COLOR.to_string(),
        ),
    };
    CategoryTotal {
        key,
        label,
        icon,
        color,
        total: Amount::ZERO,
        count: 0,
        percentage: 0.0,
        kind,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// `part` as a percentage of `whole`, `0.0` for an empty whole.
pub fn percentage(part: Amount, whole: Amount) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    part.cents() as f64 / whole.cents() as f64 * 100.0
}

/// One slice of the expense pie chart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySlice {
    pub category_id: i64,
    pub name: String,
    pub value: Amount,
    pub color: String,
    pub icon: String,
}

/// Expense categories (in list order) with the sum of their journals.
/// Categories with nothing spent are left out.
pub fn expense_by_category(journals: &[Journal], categories: &[Category]) -> Vec<CategorySlice> {
    categories
        .iter()
        .filter(|category| category.kind == EntryType::Expense)
        .map(|category| CategorySlice {
            category_id: category.id,
            name: category.name.clone(),
            value: journals
                .iter()
                .filter(|journal| journal.category_id == Some(category.id))
                .map(|journal| journal.amount)
                .sum(),
            color: non_empty(&category.color)
                .unwrap_or(DEFAULT_COLOR)
                .to_string(),
            icon: category.icon.clone(),
        })
        .filter(|slice| slice.value > Amount::ZERO)
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JournalTotals {
    pub income: Amount,
    pub expense: Amount,
    pub net: Amount,
    pub count: usize,
}

pub fn totals(journals: &[Journal]) -> JournalTotals {
    let mut totals = JournalTotals::default();
    for journal in journals {
        match journal.kind {
            EntryType::Income => totals.income += journal.amount,
            EntryType::Expense => totals.expense += journal.amount,
        }
        totals.count += 1;
    }
    totals.net = totals.income - totals.expense;
    totals
}
