//! Presentation aggregates over an already-fetched transaction list.
//!
//! Everything here is pure: an empty slice gives zero totals and empty
//! series, never an error. Amounts are summed in a single currency.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Kind, Transaction, UNCATEGORIZED};
use crate::period::DateRange;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income_cents: i64,
    pub expense_cents: i64,
    pub balance_cents: i64,
}

impl Totals {
    fn add(&mut self, transaction: &Transaction) {
        match transaction.kind {
            Kind::Income => {
                self.income_cents = self.income_cents.saturating_add(transaction.amount_cents)
            }
            Kind::Expense => {
                self.expense_cents = self.expense_cents.saturating_add(transaction.amount_cents)
            }
        }
        self.balance_cents = self.income_cents.saturating_sub(self.expense_cents);
    }
}

pub fn totals<'a, I>(transactions: I) -> Totals
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut out = Totals::default();
    for transaction in transactions {
        out.add(transaction);
    }
    out
}

/// Totals for the calendar month containing `reference`.
pub fn monthly_totals(transactions: &[Transaction], reference: NaiveDate) -> Totals {
    let month = DateRange::month_of(reference);
    totals(transactions.iter().filter(|t| month.contains(t.occurred_on)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub amount_cents: i64,
}

/// Expense sums per category name, in the order categories were first seen.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    entries: Vec<CategoryTotal>,
}

impl CategoryBreakdown {
    pub fn total_cents(&self) -> i64 {
        self.entries
            .iter()
            .fold(0, |sum, entry| sum.saturating_add(entry.amount_cents))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.entries.iter()
    }

    fn add(&mut self, name: &str, amount_cents: i64) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.amount_cents = entry.amount_cents.saturating_add(amount_cents),
            None => self.entries.push(CategoryTotal {
                name: name.to_string(),
                amount_cents,
            }),
        }
    }
}

pub fn category_expense_breakdown<'a, I>(transactions: I) -> CategoryBreakdown
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut out = CategoryBreakdown::default();
    for transaction in transactions {
        if transaction.kind == Kind::Expense {
            let name = transaction.category_name.as_deref().unwrap_or(UNCATEGORIZED);
            out.add(name, transaction.amount_cents);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrder {
    /// Months appear in the order the input first mentions them. With a
    /// date-descending input this is newest month first.
    #[default]
    FirstSeen,
    Chronological,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthPoint {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub income_cents: i64,
    pub expense_cents: i64,
}

pub fn monthly_series(transactions: &[Transaction], order: SeriesOrder) -> Vec<MonthPoint> {
    let mut out: Vec<MonthPoint> = Vec::new();
    for transaction in transactions {
        let year = transaction.occurred_on.year();
        let month = transaction.occurred_on.month();
        let index = match out.iter().position(|p| p.year == year && p.month == month) {
            Some(index) => index,
            None => {
                out.push(MonthPoint {
                    label: format!("{month:02}/{year}"),
                    year,
                    month,
                    income_cents: 0,
                    expense_cents: 0,
                });
                out.len() - 1
            }
        };
        let point = &mut out[index];
        match transaction.kind {
            Kind::Income => {
                point.income_cents = point.income_cents.saturating_add(transaction.amount_cents)
            }
            Kind::Expense => {
                point.expense_cents = point.expense_cents.saturating_add(transaction.amount_cents)
            }
        }
    }
    if order == SeriesOrder::Chronological {
        out.sort_by_key(|p| (p.year, p.month));
    }
    out
}

/// The first `n` transactions of a newest-first list, oldest first.
pub fn recent_window(transactions: &[Transaction], n: usize) -> Vec<&Transaction> {
    let mut window: Vec<&Transaction> = transactions.iter().take(n).collect();
    window.reverse();
    window
}

pub fn recent_series(transactions: &[Transaction], n: usize) -> Vec<i64> {
    recent_window(transactions, n)
        .into_iter()
        .map(Transaction::signed_cents)
        .collect()
}

pub fn share_percent(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as i64
}
