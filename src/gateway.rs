//! The data contract the screens consume.
//!
//! A `Gateway` is always scoped to one signed-in user: it never returns or
//! touches rows that belong to someone else.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    Category, CategoryInput, Kind, Profile, ProfileUpdate, Transaction, TransactionInput,
};
use crate::period::DateRange;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("record {0} not found")]
    NotFound(i64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub kind: Option<Kind>,
    pub category_id: Option<i64>,
    pub order: SortOrder,
}

impl TransactionQuery {
    /// Every transaction, newest first.
    pub fn ledger() -> Self {
        TransactionQuery {
            start: None,
            end: None,
            kind: None,
            category_id: None,
            order: SortOrder::Descending,
        }
    }

    /// Transactions inside `range`, oldest first.
    pub fn window(range: DateRange) -> Self {
        TransactionQuery {
            start: Some(range.start),
            end: Some(range.end),
            order: SortOrder::Ascending,
            ..TransactionQuery::ledger()
        }
    }
}

pub trait Gateway {
    fn list_categories(&self) -> Result<Vec<Category>, GatewayError>;
    fn get_category(&self, id: i64) -> Result<Category, GatewayError>;
    fn insert_category(&self, input: &CategoryInput) -> Result<Category, GatewayError>;
    fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category, GatewayError>;
    fn delete_category(&self, id: i64) -> Result<(), GatewayError>;

    fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, GatewayError>;
    fn get_transaction(&self, id: i64) -> Result<Transaction, GatewayError>;
    fn insert_transaction(&self, input: &TransactionInput) -> Result<Transaction, GatewayError>;
    fn update_transaction(
        &self,
        id: i64,
        input: &TransactionInput,
    ) -> Result<Transaction, GatewayError>;
    fn delete_transaction(&self, id: i64) -> Result<(), GatewayError>;

    fn profile(&self) -> Result<Profile, GatewayError>;
    fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, GatewayError>;
}
