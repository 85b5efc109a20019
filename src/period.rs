use chrono::{Datelike, Months, NaiveDate};
use rocket::form::FromFormField;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the bounds when they arrive inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            DateRange { start, end }
        } else {
            DateRange { start: end, end: start }
        }
    }

    pub fn month_of(date: NaiveDate) -> Self {
        DateRange {
            start: first_of_month(date),
            end: last_of_month(date),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromFormField)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    #[default]
    #[field(value = "month")]
    Month,
    #[field(value = "3months")]
    ThreeMonths,
    #[field(value = "6months")]
    SixMonths,
    #[field(value = "year")]
    Year,
}

impl ReportPeriod {
    pub const ALL: [ReportPeriod; 4] = [
        ReportPeriod::Month,
        ReportPeriod::ThreeMonths,
        ReportPeriod::SixMonths,
        ReportPeriod::Year,
    ];

    pub fn value(self) -> &'static str {
        match self {
            ReportPeriod::Month => "month",
            ReportPeriod::ThreeMonths => "3months",
            ReportPeriod::SixMonths => "6months",
            ReportPeriod::Year => "year",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportPeriod::Month => "Último mês",
            ReportPeriod::ThreeMonths => "Últimos 3 meses",
            ReportPeriod::SixMonths => "Últimos 6 meses",
            ReportPeriod::Year => "Último ano",
        }
    }

    fn months_back(self) -> u32 {
        match self {
            ReportPeriod::Month => 0,
            ReportPeriod::ThreeMonths => 2,
            ReportPeriod::SixMonths => 5,
            ReportPeriod::Year => 11,
        }
    }

    /// Whole calendar months ending with the month of `today`.
    pub fn range(self, today: NaiveDate) -> DateRange {
        let first = today
            .checked_sub_months(Months::new(self.months_back()))
            .unwrap_or(today);
        DateRange {
            start: first_of_month(first),
            end: last_of_month(today),
        }
    }
}
