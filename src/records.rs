//! Source record types, one per input table.

use chrono::NaiveDate;
use serde::Serialize;

/// A single retail transaction. Returns carry negative quantities and amounts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
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
}

/// Country code dimension row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountryCode {
    pub code: i64,
    pub country: String,
}

/// Customer dimension row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub customer_id: i64,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub country_code: Option<i64>,
}

/// Product hierarchy row: a sub-category inside a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductCategory {
    pub prod_cat_code: i64,
    pub prod_cat: String,
    pub prod_sub_cat_code: i64,
    pub prod_subcat: String,
}
