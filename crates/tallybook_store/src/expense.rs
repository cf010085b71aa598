//! Fixed expense schema.

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;

use tallybook_csv::Record;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names in document order for the given parties.
pub fn expense_columns(parties: &[String; 2]) -> Vec<String> {
    vec![
        "Date".to_string(),
        "Description".to_string(),
        "Category".to_string(),
        "Amount (EUR)".to_string(),
        "Amount (USD)".to_string(),
        "Payer".to_string(),
        format!("{} Amount (EUR)", parties[0]),
        format!("{} Amount (EUR)", parties[1]),
    ]
}

/// One shared expense, split between two parties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub date: NaiveDateTime,
    pub description: String,
    pub category: String,
    pub amount_eur: Decimal,
    pub amount_usd: Decimal,
    pub payer: String,
    /// Each party's share in EUR, in `parties` order
    pub shares: [Decimal; 2],
}

impl Expense {
    /// New expense dated now, local time.
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        amount_eur: Decimal,
        amount_usd: Decimal,
        payer: impl Into<String>,
        shares: [Decimal; 2],
    ) -> Self {
        Self {
            date: Local::now().naive_local(),
            description: description.into(),
            category: category.into(),
            amount_eur,
            amount_usd,
            payer: payer.into(),
            shares,
        }
    }

    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = date;
        self
    }

    pub fn to_record(&self, parties: &[String; 2]) -> Record {
        let values = [
            self.date.format(DATE_FORMAT).to_string(),
            self.description.clone(),
            self.category.clone(),
            self.amount_eur.to_string(),
            self.amount_usd.to_string(),
            self.payer.clone(),
            self.shares[0].to_string(),
            self.shares[1].to_string(),
        ];
        expense_columns(parties).into_iter().zip(values).collect()
    }
}
