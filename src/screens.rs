//! Fetch, derive and mutate for the four signed-in screens.
//!
//! Reads never fail the page: a gateway error is logged and the screen is
//! derived from an empty list instead. Writes are validated here and then
//! passed to the gateway once, with no retry.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{self, share_percent, CategoryBreakdown, Totals};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::filter::LedgerFilter;
use crate::gateway::{Gateway, GatewayError, TransactionQuery};
use crate::models::{
    Category, CategoryInput, Kind, Profile, ProfileUpdate, Status, Transaction, TransactionInput,
};
use crate::money::{format_money, Currency};
use crate::period::{DateRange, ReportPeriod};

const LATEST_ROWS: usize = 5;

fn or_empty<T>(what: &str, result: Result<Vec<T>, GatewayError>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        log::warn!("failed to load {what}: {err}");
        Vec::new()
    })
}

fn currency_of(gateway: &dyn Gateway, fallback: Currency) -> Currency {
    match gateway.profile() {
        Ok(profile) => profile.currency,
        Err(err) => {
            log::warn!("failed to load profile, using {}: {err}", fallback.code());
            fallback
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub iso_date: String,
    pub description: String,
    pub category: String,
    pub color: String,
    pub amount: String,
    pub kind: Kind,
    pub kind_label: &'static str,
    pub status: Status,
    pub status_label: &'static str,
}

impl TransactionRow {
    fn new(transaction: &Transaction, currency: Currency) -> Self {
        TransactionRow {
            id: transaction.id,
            date: transaction.occurred_on.format("%d/%m/%Y").to_string(),
            iso_date: transaction.occurred_on.format("%Y-%m-%d").to_string(),
            description: transaction.description.clone(),
            category: transaction.category_label().to_string(),
            color: transaction.category_color_or_default().to_string(),
            amount: currency.format(transaction.amount_cents),
            kind: transaction.kind,
            kind_label: transaction.kind.label(),
            status: transaction.status,
            status_label: transaction.status.label(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub kind: Kind,
    pub kind_label: &'static str,
    pub color: String,
    pub icon: String,
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        CategoryRow {
            id: category.id,
            name: category.name.clone(),
            kind: category.kind,
            kind_label: category.kind.label(),
            color: category.color.clone(),
            icon: category.icon.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlowPoint {
    pub label: String,
    pub amount: String,
    pub positive: bool,
    pub width: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub month: String,
    pub month_label: String,
    pub income: String,
    pub expense: String,
    pub balance: String,
    pub balance_negative: bool,
    pub transaction_count: usize,
    pub income_share: i64,
    pub expense_share: i64,
    pub cash_flow: Vec<FlowPoint>,
    pub latest: Vec<TransactionRow>,
}

pub fn dashboard(gateway: &dyn Gateway, reference: NaiveDate, config: &AppConfig) -> DashboardView {
    let transactions = or_empty(
        "transactions",
        gateway.list_transactions(&TransactionQuery::ledger()),
    );
    let currency = currency_of(gateway, config.default_currency);
    let totals = aggregate::monthly_totals(&transactions, reference);
    let moved = totals.income_cents.saturating_add(totals.expense_cents);

    let window = aggregate::recent_window(&transactions, config.recent_points);
    let series = aggregate::recent_series(&transactions, config.recent_points);
    let widest = series.iter().map(|cents| cents.abs()).max().unwrap_or(0);
    let cash_flow = window
        .iter()
        .zip(&series)
        .map(|(t, &cents)| FlowPoint {
            label: t.occurred_on.format("%d/%m").to_string(),
            amount: currency.format(cents),
            positive: cents >= 0,
            width: share_percent(cents.abs(), widest),
        })
        .collect();

    DashboardView {
        month: reference.format("%Y-%m").to_string(),
        month_label: reference.format("%m/%Y").to_string(),
        income: currency.format(totals.income_cents),
        expense: currency.format(totals.expense_cents),
        balance: currency.format(totals.balance_cents),
        balance_negative: totals.balance_cents < 0,
        transaction_count: transactions.len(),
        income_share: share_percent(totals.income_cents, moved),
        expense_share: share_percent(totals.expense_cents, moved),
        cash_flow,
        latest: transactions
            .iter()
            .take(LATEST_ROWS)
            .map(|t| TransactionRow::new(t, currency))
            .collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct FilterEcho {
    pub kind: String,
    pub category: String,
    pub start: String,
    pub end: String,
}

impl From<&LedgerFilter> for FilterEcho {
    fn from(filter: &LedgerFilter) -> Self {
        let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        FilterEcho {
            kind: filter.kind.map_or("all", Kind::as_str).to_string(),
            category: filter
                .category_id
                .map_or_else(|| "all".to_string(), |id| id.to_string()),
            start: date(filter.start),
            end: date(filter.end),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerView {
    pub transactions: Vec<TransactionRow>,
    pub total_count: usize,
    pub categories: Vec<CategoryRow>,
    pub filter: FilterEcho,
    pub filtered: bool,
    pub export_query: String,
}

fn ledger_rows(gateway: &dyn Gateway, filter: &LedgerFilter) -> Vec<Transaction> {
    let all = or_empty(
        "transactions",
        gateway.list_transactions(&TransactionQuery::ledger()),
    );
    log::debug!("ledger filter {filter:?} over {} rows", all.len());
    all
}

/// Transactions the ledger shows under `filter`, newest first.
pub fn ledger_transactions(gateway: &dyn Gateway, filter: &LedgerFilter) -> Vec<Transaction> {
    let all = ledger_rows(gateway, filter);
    filter.apply(&all).into_iter().cloned().collect()
}

pub fn ledger(gateway: &dyn Gateway, filter: &LedgerFilter, config: &AppConfig) -> LedgerView {
    let all = ledger_rows(gateway, filter);
    let categories = or_empty("categories", gateway.list_categories());
    let currency = currency_of(gateway, config.default_currency);
    LedgerView {
        transactions: filter
            .apply(&all)
            .into_iter()
            .map(|t| TransactionRow::new(t, currency))
            .collect(),
        total_count: all.len(),
        categories: categories.iter().map(CategoryRow::from).collect(),
        filter: FilterEcho::from(filter),
        filtered: filter.is_active(),
        export_query: filter.query_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionFormView {
    pub id: i64,
    pub description: String,
    pub amount: String,
    pub date: String,
    pub kind: Kind,
    pub status: Status,
    pub category_id: Option<i64>,
    pub categories: Vec<CategoryRow>,
}

pub fn edit_transaction(gateway: &dyn Gateway, id: i64) -> Result<TransactionFormView, GatewayError> {
    let transaction = gateway.get_transaction(id)?;
    let categories = or_empty("categories", gateway.list_categories());
    Ok(TransactionFormView {
        id: transaction.id,
        description: transaction.description,
        amount: format_money(transaction.amount_cents),
        date: transaction.occurred_on.format("%Y-%m-%d").to_string(),
        kind: transaction.kind,
        status: transaction.status,
        category_id: transaction.category_id,
        categories: categories.iter().map(CategoryRow::from).collect(),
    })
}

pub fn save_transaction(
    gateway: &dyn Gateway,
    id: Option<i64>,
    mut input: TransactionInput,
    enforce_category_kind: bool,
) -> Result<Transaction, AppError> {
    input.description = input.description.trim().to_string();
    if input.description.is_empty() {
        return Err(AppError::validation("Informe uma descrição"));
    }
    let Some(category_id) = input.category_id else {
        return Err(AppError::validation("Selecione uma categoria"));
    };
    let category = match gateway.get_category(category_id) {
        Ok(category) => category,
        Err(GatewayError::NotFound(_)) => {
            return Err(AppError::validation("Categoria não encontrada"));
        }
        Err(err) => return Err(err.into()),
    };
    if enforce_category_kind && category.kind != input.kind {
        return Err(AppError::validation(format!(
            "A categoria {} é do tipo {}",
            category.name,
            category.kind.label()
        )));
    }
    let saved = match id {
        Some(id) => gateway.update_transaction(id, &input)?,
        None => gateway.insert_transaction(&input)?,
    };
    Ok(saved)
}

pub fn delete_transaction(gateway: &dyn Gateway, id: i64) -> Result<(), AppError> {
    gateway.delete_transaction(id)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PeriodOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct BreakdownRow {
    pub name: String,
    pub amount: String,
    pub share: i64,
}

#[derive(Debug, Serialize)]
pub struct MonthRow {
    pub label: String,
    pub income: String,
    pub expense: String,
    pub net: String,
    pub income_width: i64,
    pub expense_width: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub periods: Vec<PeriodOption>,
    pub start: String,
    pub end: String,
    pub range_label: String,
    pub income: String,
    pub expense: String,
    pub balance: String,
    pub balance_negative: bool,
    pub categories: Vec<BreakdownRow>,
    pub months: Vec<MonthRow>,
}

/// What both the reports screen and its export are derived from.
pub struct ReportData {
    pub transactions: Vec<Transaction>,
    pub totals: Totals,
    pub breakdown: CategoryBreakdown,
    pub currency: Currency,
}

pub fn load_report(gateway: &dyn Gateway, range: DateRange, config: &AppConfig) -> ReportData {
    let transactions = or_empty(
        "transactions",
        gateway.list_transactions(&TransactionQuery::window(range)),
    );
    ReportData {
        totals: aggregate::totals(&transactions),
        breakdown: aggregate::category_expense_breakdown(&transactions),
        currency: currency_of(gateway, config.default_currency),
        transactions,
    }
}

/// Resolves the report window: explicit bounds win over the preset.
pub fn report_range(
    period: ReportPeriod,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> DateRange {
    let preset = period.range(today);
    DateRange::new(start.unwrap_or(preset.start), end.unwrap_or(preset.end))
}

pub fn reports(
    gateway: &dyn Gateway,
    period: ReportPeriod,
    range: DateRange,
    config: &AppConfig,
) -> ReportView {
    let data = load_report(gateway, range, config);
    let currency = data.currency;
    let series = aggregate::monthly_series(&data.transactions, config.series_order);
    let widest = series
        .iter()
        .map(|p| p.income_cents.max(p.expense_cents))
        .max()
        .unwrap_or(0);
    let expense_total = data.breakdown.total_cents();

    ReportView {
        periods: ReportPeriod::ALL
            .iter()
            .map(|p| PeriodOption {
                value: p.value(),
                label: p.label(),
                selected: *p == period,
            })
            .collect(),
        start: range.start.format("%Y-%m-%d").to_string(),
        end: range.end.format("%Y-%m-%d").to_string(),
        range_label: format!(
            "{} a {}",
            range.start.format("%d/%m/%Y"),
            range.end.format("%d/%m/%Y")
        ),
        income: currency.format(data.totals.income_cents),
        expense: currency.format(data.totals.expense_cents),
        balance: currency.format(data.totals.balance_cents),
        balance_negative: data.totals.balance_cents < 0,
        categories: data
            .breakdown
            .iter()
            .map(|entry| BreakdownRow {
                name: entry.name.clone(),
                amount: currency.format(entry.amount_cents),
                share: share_percent(entry.amount_cents, expense_total),
            })
            .collect(),
        months: series
            .iter()
            .map(|p| MonthRow {
                label: p.label.clone(),
                income: currency.format(p.income_cents),
                expense: currency.format(p.expense_cents),
                net: currency.format(p.income_cents - p.expense_cents),
                income_width: share_percent(p.income_cents, widest),
                expense_width: share_percent(p.expense_cents, widest),
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct CurrencyOption {
    pub code: &'static str,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub full_name: String,
    pub email: String,
    pub currencies: Vec<CurrencyOption>,
    pub categories: Vec<CategoryRow>,
}

pub fn settings(gateway: &dyn Gateway, fallback_email: &str, config: &AppConfig) -> SettingsView {
    let profile = gateway.profile().unwrap_or_else(|err| {
        log::warn!("failed to load profile: {err}");
        Profile {
            id: 0,
            full_name: String::new(),
            email: fallback_email.to_string(),
            currency: config.default_currency,
        }
    });
    let categories = or_empty("categories", gateway.list_categories());
    SettingsView {
        full_name: profile.full_name,
        email: profile.email,
        currencies: Currency::ALL
            .iter()
            .map(|c| CurrencyOption {
                code: c.code(),
                label: format!("{} ({})", c.name(), c.code()),
                selected: *c == profile.currency,
            })
            .collect(),
        categories: categories.iter().map(CategoryRow::from).collect(),
    }
}

pub fn update_profile(gateway: &dyn Gateway, mut update: ProfileUpdate) -> Result<Profile, AppError> {
    update.full_name = update.full_name.trim().to_string();
    Ok(gateway.update_profile(&update)?)
}

pub fn edit_category(gateway: &dyn Gateway, id: i64) -> Result<CategoryRow, GatewayError> {
    gateway.get_category(id).map(|category| CategoryRow::from(&category))
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn save_category(
    gateway: &dyn Gateway,
    id: Option<i64>,
    mut input: CategoryInput,
) -> Result<Category, AppError> {
    input.name = input.name.trim().to_string();
    input.icon = input.icon.trim().to_string();
    input.color = input.color.trim().to_string();
    if input.name.is_empty() {
        return Err(AppError::validation("Informe o nome da categoria"));
    }
    if !is_hex_color(&input.color) {
        return Err(AppError::validation("Cor inválida"));
    }
    let saved = match id {
        Some(id) => gateway.update_category(id, &input)?,
        None => gateway.insert_category(&input)?,
    };
    Ok(saved)
}

pub fn delete_category(gateway: &dyn Gateway, id: i64) -> Result<(), AppError> {
    gateway.delete_category(id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::gateway::SortOrder;

    /// In-memory gateway. `failing` makes every call report a request error.
    #[derive(Default)]
    struct StubGateway {
        categories: RefCell<Vec<Category>>,
        transactions: RefCell<Vec<Transaction>>,
        currency: Cell<Currency>,
        next_id: Cell<i64>,
        failing: bool,
    }

    impl StubGateway {
        fn failing() -> Self {
            StubGateway {
                failing: true,
                ..StubGateway::default()
            }
        }

        fn check(&self) -> Result<(), GatewayError> {
            if self.failing {
                Err(GatewayError::Database(rusqlite::Error::InvalidQuery))
            } else {
                Ok(())
            }
        }

        fn id(&self) -> i64 {
            self.next_id.set(self.next_id.get() + 1);
            self.next_id.get()
        }

        fn joined(&self, id: i64, input: &TransactionInput) -> Transaction {
            let category = input
                .category_id
                .and_then(|cid| self.categories.borrow().iter().find(|c| c.id == cid).cloned());
            Transaction {
                id,
                description: input.description.clone(),
                amount_cents: input.amount_cents,
                occurred_on: input.occurred_on,
                kind: input.kind,
                status: input.status,
                category_id: input.category_id,
                category_name: category.as_ref().map(|c| c.name.clone()),
                category_color: category.map(|c| c.color),
            }
        }
    }

    impl Gateway for StubGateway {
        fn list_categories(&self) -> Result<Vec<Category>, GatewayError> {
            self.check()?;
            Ok(self.categories.borrow().clone())
        }

        fn get_category(&self, id: i64) -> Result<Category, GatewayError> {
            self.check()?;
            self.categories
                .borrow()
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or(GatewayError::NotFound(id))
        }

        fn insert_category(&self, input: &CategoryInput) -> Result<Category, GatewayError> {
            self.check()?;
            let category = Category {
                id: self.id(),
                name: input.name.clone(),
                kind: input.kind,
                color: input.color.clone(),
                icon: input.icon.clone(),
            };
            self.categories.borrow_mut().push(category.clone());
            Ok(category)
        }

        fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category, GatewayError> {
            self.delete_category(id)?;
            let category = Category {
                id,
                name: input.name.clone(),
                kind: input.kind,
                color: input.color.clone(),
                icon: input.icon.clone(),
            };
            self.categories.borrow_mut().push(category.clone());
            Ok(category)
        }

        fn delete_category(&self, id: i64) -> Result<(), GatewayError> {
            self.check()?;
            let mut categories = self.categories.borrow_mut();
            let before = categories.len();
            categories.retain(|c| c.id != id);
            if categories.len() == before {
                return Err(GatewayError::NotFound(id));
            }
            Ok(())
        }

        fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, GatewayError> {
            self.check()?;
            let mut out: Vec<Transaction> = self
                .transactions
                .borrow()
                .iter()
                .filter(|t| query.start.is_none_or(|s| t.occurred_on >= s))
                .filter(|t| query.end.is_none_or(|e| t.occurred_on <= e))
                .filter(|t| query.kind.is_none_or(|k| t.kind == k))
                .filter(|t| query.category_id.is_none_or(|c| t.category_id == Some(c)))
                .cloned()
                .collect();
            out.sort_by_key(|t| (t.occurred_on, t.id));
            if query.order == SortOrder::Descending {
                out.reverse();
            }
            Ok(out)
        }

        fn get_transaction(&self, id: i64) -> Result<Transaction, GatewayError> {
            self.check()?;
            self.transactions
                .borrow()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or(GatewayError::NotFound(id))
        }

        fn insert_transaction(&self, input: &TransactionInput) -> Result<Transaction, GatewayError> {
            self.check()?;
            let transaction = self.joined(self.id(), input);
            self.transactions.borrow_mut().push(transaction.clone());
            Ok(transaction)
        }

        fn update_transaction(&self, id: i64, input: &TransactionInput) -> Result<Transaction, GatewayError> {
            self.delete_transaction(id)?;
            let transaction = self.joined(id, input);
            self.transactions.borrow_mut().push(transaction.clone());
            Ok(transaction)
        }

        fn delete_transaction(&self, id: i64) -> Result<(), GatewayError> {
            self.check()?;
            let mut transactions = self.transactions.borrow_mut();
            let before = transactions.len();
            transactions.retain(|t| t.id != id);
            if transactions.len() == before {
                return Err(GatewayError::NotFound(id));
            }
            Ok(())
        }

        fn profile(&self) -> Result<Profile, GatewayError> {
            self.check()?;
            Ok(Profile {
                id: 1,
                full_name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                currency: self.currency.get(),
            })
        }

        fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, GatewayError> {
            self.check()?;
            self.currency.set(update.currency);
            Ok(Profile {
                full_name: update.full_name.clone(),
                ..self.profile()?
            })
        }
    }

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn category(gateway: &StubGateway, name: &str, kind: Kind) -> Category {
        gateway
            .insert_category(&CategoryInput {
                name: name.to_string(),
                kind,
                color: "#EF4444".to_string(),
                icon: String::new(),
            })
            .unwrap()
    }

    fn input(description: &str, day: &str, kind: Kind, cents: i64, category_id: i64) -> TransactionInput {
        TransactionInput {
            description: description.to_string(),
            amount_cents: cents,
            occurred_on: date(day),
            kind,
            status: Status::Completed,
            category_id: Some(category_id),
        }
    }

    fn seeded() -> StubGateway {
        let gateway = StubGateway::default();
        let food = category(&gateway, "Mercado", Kind::Expense);
        let job = category(&gateway, "Salário", Kind::Income);
        let config = AppConfig::default();
        for (name, day, kind, cents, cat) in [
            ("feira", "2024-01-05", Kind::Expense, 10_000, food.id),
            ("salário", "2024-02-01", Kind::Income, 500_000, job.id),
            ("padaria", "2024-02-10", Kind::Expense, 2_500, food.id),
        ] {
            save_transaction(&gateway, None, input(name, day, kind, cents, cat), config.enforce_category_kind)
                .unwrap();
        }
        gateway
    }

    #[test]
    fn dashboard_reports_the_reference_month() {
        let gateway = seeded();
        let view = dashboard(&gateway, date("2024-02-20"), &AppConfig::default());
        assert_eq!(view.income, "R$ 5.000,00");
        assert_eq!(view.expense, "R$ 25,00");
        assert_eq!(view.balance, "R$ 4.975,00");
        assert_eq!(view.transaction_count, 3);
        assert_eq!(view.month, "2024-02");
        assert_eq!(view.latest[0].description, "padaria");
    }

    #[test]
    fn dashboard_cash_flow_runs_oldest_to_newest() {
        let gateway = seeded();
        let config = AppConfig {
            recent_points: 2,
            ..AppConfig::default()
        };
        let view = dashboard(&gateway, date("2024-02-20"), &config);
        let labels: Vec<&str> = view.cash_flow.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["01/02", "10/02"]);
        assert!(view.cash_flow[0].positive);
        assert_eq!(view.cash_flow[1].amount, "-R$ 25,00");
        assert_eq!(view.cash_flow[0].width, 100);
    }

    #[test]
    fn failed_reads_render_an_empty_screen() {
        let gateway = StubGateway::failing();
        let config = AppConfig::default();
        let view = dashboard(&gateway, date("2024-02-20"), &config);
        assert_eq!(view.transaction_count, 0);
        assert_eq!(view.balance, "R$ 0,00");
        let ledger_view = ledger(&gateway, &LedgerFilter::default(), &config);
        assert!(ledger_view.transactions.is_empty());
        let settings_view = settings(&gateway, "fallback@example.com", &config);
        assert_eq!(settings_view.email, "fallback@example.com");
    }

    #[test]
    fn ledger_applies_the_filter_in_memory() {
        let gateway = seeded();
        let filter = LedgerFilter {
            kind: Some(Kind::Expense),
            start: Some(date("2024-02-01")),
            ..LedgerFilter::default()
        };
        let view = ledger(&gateway, &filter, &AppConfig::default());
        assert_eq!(view.total_count, 3);
        assert_eq!(view.transactions.len(), 1);
        assert_eq!(view.transactions[0].description, "padaria");
        assert!(view.filtered);
        assert_eq!(view.filter.kind, "expense");
        assert_eq!(view.export_query, "kind=expense&start=2024-02-01");
        let exported: Vec<i64> = ledger_transactions(&gateway, &filter).iter().map(|t| t.id).collect();
        let shown: Vec<i64> = view.transactions.iter().map(|row| row.id).collect();
        assert_eq!(exported, shown);
    }

    #[test]
    fn kind_must_match_category_when_enforced() {
        let gateway = seeded();
        let food = gateway.list_categories().unwrap()[0].clone();
        let wrong = input("estorno", "2024-02-11", Kind::Income, 100, food.id);
        let err = save_transaction(&gateway, None, wrong.clone(), true).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(save_transaction(&gateway, None, wrong, false).is_ok());
    }

    #[test]
    fn transaction_writes_are_validated() {
        let gateway = seeded();
        let food = gateway.list_categories().unwrap()[0].clone();
        let blank = input("   ", "2024-02-11", Kind::Expense, 100, food.id);
        assert!(matches!(save_transaction(&gateway, None, blank, true), Err(AppError::Validation(_))));

        let mut orphan = input("x", "2024-02-11", Kind::Expense, 100, food.id);
        orphan.category_id = None;
        assert!(matches!(save_transaction(&gateway, None, orphan, true), Err(AppError::Validation(_))));

        let missing = input("x", "2024-02-11", Kind::Expense, 100, 9_999);
        assert!(matches!(save_transaction(&gateway, None, missing, true), Err(AppError::Validation(_))));

        let saved = save_transaction(
            &gateway,
            None,
            input("  café  ", "2024-02-11", Kind::Expense, 100, food.id),
            true,
        )
        .unwrap();
        assert_eq!(saved.description, "café");
    }

    #[test]
    fn delete_then_relist_drops_the_record() {
        let gateway = seeded();
        let victim = gateway.list_transactions(&TransactionQuery::ledger()).unwrap()[0].id;
        delete_transaction(&gateway, victim).unwrap();
        let view = ledger(&gateway, &LedgerFilter::default(), &AppConfig::default());
        assert!(view.transactions.iter().all(|row| row.id != victim));
        assert_eq!(view.transactions.len(), 2);
    }

    #[test]
    fn edit_prefills_the_stored_values() {
        let gateway = seeded();
        let first = gateway.list_transactions(&TransactionQuery::ledger()).unwrap()[0].clone();
        let form = edit_transaction(&gateway, first.id).unwrap();
        assert_eq!(form.amount, "25.00");
        assert_eq!(form.date, "2024-02-10");
        assert_eq!(form.categories.len(), 2);
        assert!(matches!(edit_transaction(&gateway, 777), Err(GatewayError::NotFound(777))));
    }

    #[test]
    fn reports_cover_the_window_only() {
        let gateway = seeded();
        let range = DateRange::month_of(date("2024-02-15"));
        let view = reports(&gateway, ReportPeriod::Month, range, &AppConfig::default());
        assert_eq!(view.income, "R$ 5.000,00");
        assert_eq!(view.expense, "R$ 25,00");
        assert_eq!(view.categories.len(), 1);
        assert_eq!(view.categories[0].share, 100);
        assert_eq!(view.months.len(), 1);
        assert_eq!(view.months[0].label, "02/2024");
        assert_eq!(view.range_label, "01/02/2024 a 29/02/2024");
        assert!(view.periods.iter().any(|p| p.selected && p.value == "month"));
    }

    #[test]
    fn report_months_follow_the_configured_order() {
        let gateway = seeded();
        let range = DateRange::new(date("2024-01-01"), date("2024-02-29"));
        let view = reports(&gateway, ReportPeriod::ThreeMonths, range, &AppConfig::default());
        let labels: Vec<&str> = view.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["01/2024", "02/2024"]);
    }

    #[test]
    fn explicit_bounds_override_the_preset() {
        let today = date("2024-03-10");
        let range = report_range(ReportPeriod::Year, Some(date("2024-02-01")), None, today);
        assert_eq!(range, DateRange::new(date("2024-02-01"), date("2024-03-31")));
        let swapped = report_range(ReportPeriod::Month, Some(date("2024-03-31")), Some(date("2024-03-01")), today);
        assert_eq!(swapped.start, date("2024-03-01"));
    }

    #[test]
    fn report_data_feeds_the_document() {
        let gateway = seeded();
        gateway.currency.set(Currency::Usd);
        let data = load_report(&gateway, DateRange::month_of(date("2024-01-10")), &AppConfig::default());
        assert_eq!(data.totals.expense_cents, 10_000);
        assert_eq!(crate::aggregate::tests::amount_of(&data.breakdown, "Mercado"), Some(10_000));
        assert_eq!(data.currency, Currency::Usd);
    }

    #[test]
    fn categories_need_a_name_and_a_hex_color() {
        let gateway = StubGateway::default();
        let mut input = CategoryInput {
            name: "  Lazer ".to_string(),
            kind: Kind::Expense,
            color: "#12ab9F".to_string(),
            icon: " film ".to_string(),
        };
        let saved = save_category(&gateway, None, input.clone()).unwrap();
        assert_eq!(saved.name, "Lazer");
        assert_eq!(saved.icon, "film");

        input.color = "red".to_string();
        assert!(matches!(save_category(&gateway, None, input.clone()), Err(AppError::Validation(_))));
        input.color = "#000000".to_string();
        input.name = " ".to_string();
        assert!(matches!(save_category(&gateway, Some(saved.id), input), Err(AppError::Validation(_))));

        assert_eq!(edit_category(&gateway, saved.id).unwrap().name, "Lazer");
        delete_category(&gateway, saved.id).unwrap();
        assert!(settings(&gateway, "x@y.z", &AppConfig::default()).categories.is_empty());
    }

    #[test]
    fn profile_update_changes_display_currency() {
        let gateway = seeded();
        let profile = update_profile(
            &gateway,
            ProfileUpdate {
                full_name: " Ana Souza ".to_string(),
                currency: Currency::Eur,
            },
        )
        .unwrap();
        assert_eq!(profile.full_name, "Ana Souza");
        let view = settings(&gateway, "x@y.z", &AppConfig::default());
        assert!(view.currencies.iter().any(|c| c.selected && c.code == "EUR"));
        let dash = dashboard(&gateway, date("2024-02-20"), &AppConfig::default());
        assert_eq!(dash.expense, "€ 25,00");
    }
}
