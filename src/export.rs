//! Downloadable renderings of data the screens already hold.

use std::io::Cursor;

use chrono::NaiveDate;
use csv::Writer;
use rocket::http::ContentType;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};

use crate::aggregate::{CategoryBreakdown, Totals};
use crate::error::AppError;
use crate::models::Transaction;
use crate::money::{format_money, Currency};
use crate::period::DateRange;

pub const CSV_HEADERS: [&str; 6] = ["Data", "Descrição", "Categoria", "Valor", "Tipo", "Status"];

const DISPLAY_DATE: &str = "%d/%m/%Y";

/// One row per transaction, header first. No rows still yields the header.
pub fn transactions_csv<'a, I>(transactions: I) -> Result<Vec<u8>, AppError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADERS)?;
    for transaction in transactions {
        wtr.write_record([
            transaction.occurred_on.format(DISPLAY_DATE).to_string().as_str(),
            transaction.description.as_str(),
            transaction.category_label(),
            format_money(transaction.amount_cents).as_str(),
            transaction.kind.label(),
            transaction.status.label(),
        ])?;
    }
    wtr.into_inner()
        .map_err(|err| AppError::Export(err.to_string()))
}

pub struct ReportDocument<'a> {
    pub range: DateRange,
    pub totals: Totals,
    pub breakdown: &'a CategoryBreakdown,
    pub currency: Currency,
}

impl ReportDocument<'_> {
    pub fn render(&self) -> String {
        let money = |cents: i64| self.currency.format(cents);
        let mut lines = vec![
            "Relatório Financeiro".to_string(),
            format!(
                "Período: {} a {}",
                self.range.start.format(DISPLAY_DATE),
                self.range.end.format(DISPLAY_DATE)
            ),
            String::new(),
            "Resumo Financeiro".to_string(),
            format!("Receitas Totais: {}", money(self.totals.income_cents)),
            format!("Despesas Totais: {}", money(self.totals.expense_cents)),
            format!("Saldo: {}", money(self.totals.balance_cents)),
            String::new(),
            "Despesas por Categoria".to_string(),
        ];
        for entry in self.breakdown.iter() {
            lines.push(format!("{}: {}", entry.name, money(entry.amount_cents)));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

pub struct Download {
    pub file_name: String,
    pub content_type: ContentType,
    pub body: Vec<u8>,
}

impl Download {
    pub fn csv(today: NaiveDate, body: Vec<u8>) -> Self {
        Download {
            file_name: format!("transacoes_{}.csv", today.format("%Y-%m-%d")),
            content_type: ContentType::CSV,
            body,
        }
    }

    pub fn report(today: NaiveDate, body: String) -> Self {
        Download {
            file_name: format!("relatorio_financeiro_{}.txt", today.format("%Y-%m-%d")),
            content_type: ContentType::Plain,
            body: body.into_bytes(),
        }
    }
}

impl<'r> Responder<'r, 'static> for Download {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(self.content_type)
            .raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.file_name),
            )
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}
