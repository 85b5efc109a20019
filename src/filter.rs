use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Kind, Transaction};

/// Ledger filter: every set constraint must hold, unset ones always pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerFilter {
    pub kind: Option<Kind>,
    pub category_id: Option<i64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn param(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "all")
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    param(value).and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

impl LedgerFilter {
    /// Reads the ledger query string. `all`, blanks and values that do not
    /// parse leave the constraint unset.
    pub fn from_params(
        kind: Option<&str>,
        category: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Self {
        LedgerFilter {
            kind: param(kind).and_then(|value| value.parse().ok()),
            category_id: param(category).and_then(|value| value.parse().ok()),
            start: parse_date(start),
            end: parse_date(end),
        }
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_some() || self.category_id.is_some() || self.start.is_some() || self.end.is_some()
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if transaction.kind != kind {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if transaction.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(start) = self.start {
            if transaction.occurred_on < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if transaction.occurred_on > end {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        transactions.iter().filter(|t| self.matches(t)).collect()
    }

    /// Query string reproducing this filter, e.g. for the export link.
    pub fn query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(kind) = self.kind {
            pairs.push(format!("kind={}", kind.as_str()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(format!("category={category_id}"));
        }
        if let Some(start) = self.start {
            pairs.push(format!("start={}", start.format("%Y-%m-%d")));
        }
        if let Some(end) = self.end {
            pairs.push(format!("end={}", end.format("%Y-%m-%d")));
        }
        pairs.join("&")
    }
}
