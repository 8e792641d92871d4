//! The merged fact table and the filters every chart shares.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// One transaction with its dimension attributes resolved
///
/// Dimension fields are `None` when the lookup found no match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactRow {
    pub transaction_id: i64,
    pub cust_id: i64,
    pub tran_date: NaiveDate,
    pub prod_subcat_code: i64,
    pub prod_cat_code: i64,
    pub qty: i64,
    pub rate: f64,
    pub tax: f64,
    pub total_amt: f64,
    pub store_type: String,
    pub prod_cat: Option<String>,
    pub prod_subcat: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub country_code: Option<i64>,
    pub country: Option<String>,
}

impl FactRow {
    /// Positive amounts are sales; zero and negative amounts are returns.
    pub fn is_sale(&self) -> bool {
        self.total_amt > 0.0
    }
}

/// Inclusive date range used by the time-filtered charts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The denormalized transactions table all reports read from
#[derive(Clone, Debug, Default)]
pub struct FactTable {
    rows: Vec<FactRow>,
}

impl FactTable {
    pub fn new(rows: Vec<FactRow>) -> Self {
        FactTable { rows }
    }

    pub fn rows(&self) -> &[FactRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with a positive amount
    pub fn sales(&self) -> impl Iterator<Item = &FactRow> {
        self.rows.iter().filter(|row| row.is_sale())
    }

    /// Sales rows whose date falls inside `range`
    pub fn sales_between(&self, range: DateRange) -> impl Iterator<Item = &FactRow> {
        self.sales().filter(move |row| range.contains(row.tran_date))
    }

    /// Earliest and latest transaction dates, or `None` for an empty table
    pub fn date_bounds(&self) -> Option<DateRange> {
        let start = self.rows.iter().map(|row| row.tran_date).min()?;
        let end = self.rows.iter().map(|row| row.tran_date).max()?;
        Some(DateRange { start, end })
    }

    /// Distinct store types in order of first appearance
    pub fn store_types(&self) -> Vec<String> {
        distinct(self.rows.iter().map(|row| Some(row.store_type.as_str())))
    }

    /// Distinct resolved category names in order of first appearance
    pub fn categories(&self) -> Vec<String> {
        distinct(self.rows.iter().map(|row| row.prod_cat.as_deref()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for value in values.flatten() {
        if !value.is_empty() && seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}
