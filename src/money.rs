use rocket::form::FromFormField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    #[field(value = "BRL")]
    Brl,
    #[field(value = "USD")]
    Usd,
    #[field(value = "EUR")]
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Brl, Currency::Usd, Currency::Eur];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Brl => "R$",
            Currency::Usd => "US$",
            Currency::Eur => "€",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Currency::Brl => "Real",
            Currency::Usd => "Dólar",
            Currency::Eur => "Euro",
        }
    }

    /// Stored codes that are no longer offered read back as the default.
    pub fn from_code(code: &str) -> Currency {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Currency::Usd,
            "EUR" => Currency::Eur,
            _ => Currency::Brl,
        }
    }

    /// pt-BR layout: `R$ 1.234,56`.
    pub fn format(self, cents: i64) -> String {
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        let whole = group_thousands(abs / 100);
        let frac = abs % 100;
        format!("{sign}{} {whole},{frac:02}", self.symbol())
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    let whole = abs / 100;
    let frac = abs % 100;
    format!("{sign}{whole}.{frac:02}")
}

/// Largest amount a single entry may carry: 100 billion in whole units.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000_000;

pub fn parse_amount_to_cents(input: &str) -> Option<i64> {
    let s = input.trim().replace(',', ".");
    if s.is_empty() || s.starts_with('-') {
        return None;
    }
    let mut parts = s.split('.');
    let whole_str = parts.next()?;
    let frac_str = parts.next();
    if parts.next().is_some() {
        return None;
    }
    let whole: i64 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().ok()?
    };
    let frac = match frac_str {
        None => 0,
        Some(frac) => {
            if frac.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let mut padded = frac.to_string();
            while padded.len() < 2 {
                padded.push('0');
            }
            padded.parse::<i64>().ok()?
        }
    };
    whole
        .checked_mul(100)?
        .checked_add(frac)
        .filter(|cents| *cents <= MAX_AMOUNT_CENTS)
}
