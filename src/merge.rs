//! Reconciles the four source tables into one fact table.
//!
//! Every join is a left join: the merged table has exactly one row per
//! transaction, in transaction order, and a dimension that cannot be resolved
//! leaves its fields empty instead of dropping the row. Each dimension table
//! is deduplicated on its key before joining, keeping the first occurrence.

use log::{info, warn};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use crate::error::Result;
use crate::fact::{FactRow, FactTable};
use crate::loader;
use crate::records::{CountryCode, Customer, ProductCategory, Transaction};

pub const TRANSACTIONS_DIR: &str = "transactions";
pub const COUNTRY_CODES_FILE: &str = "country_codes.csv";
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const PRODUCT_CATEGORIES_FILE: &str = "prod_cat_info.csv";

/// All source tables, as loaded
#[derive(Clone, Debug, Default)]
pub struct Database {
    pub transactions: Vec<Transaction>,
    pub country_codes: Vec<CountryCode>,
    pub customers: Vec<Customer>,
    pub product_categories: Vec<ProductCategory>,
}

/// Per-dimension count of fact rows left without a match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub rows: usize,
    pub missing_category: usize,
    pub missing_subcategory: usize,
    pub missing_customer: usize,
    pub missing_country: usize,
}

/// Customer attributes after the country lookup
struct CustomerDim<'a> {
    customer: &'a Customer,
    country: Option<&'a str>,
}

/// Build a first-occurrence-wins lookup
fn first_by_key<'a, T, K, F>(rows: &'a [T], key: F) -> HashMap<K, &'a T>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Entry::Vacant(slot) = map.entry(key(row)) {
            slot.insert(row);
        }
    }
    map
}

impl Database {
    /// Load every source table from a data directory
    ///
    /// # Arguments
    /// * `data_dir` - Directory containing `transactions/`, `country_codes.csv`,
    ///   `customers.csv` and `prod_cat_info.csv`
    ///
    /// # Examples
    /// ```no_run
    /// use dashboard::merge::Database;
    ///
    /// let db = Database::load("db").expect("data directory");
    /// let facts = db.merge();
    /// println!("{} fact rows", facts.len());
    /// ```
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        info!("Loading data from {}", dir.display());
        Ok(Database {
            transactions: loader::load_transactions(dir.join(TRANSACTIONS_DIR))?,
            country_codes: loader::load_country_codes(dir.join(COUNTRY_CODES_FILE))?,
            customers: loader::load_customers(dir.join(CUSTOMERS_FILE))?,
            product_categories: loader::load_product_categories(
                dir.join(PRODUCT_CATEGORIES_FILE),
            )?,
        })
    }

    /// Join all dimensions onto the transactions
    pub fn merge(&self) -> FactTable {
        self.merge_with_summary().0
    }

    /// Join all dimensions onto the transactions and report unmatched keys
    pub fn merge_with_summary(&self) -> (FactTable, MergeSummary) {
        let categories = first_by_key(&self.product_categories, |p| p.prod_cat_code);
        let subcategories = first_by_key(&self.product_categories, |p| {
            (p.prod_cat_code, p.prod_sub_cat_code)
        });
        let countries = first_by_key(&self.country_codes, |c| c.code);
        let customers: HashMap<i64, CustomerDim<'_>> =
            first_by_key(&self.customers, |c| c.customer_id)
                .into_iter()
                .map(|(id, customer)| {
                    let country = customer
                        .country_code
                        .and_then(|code| countries.get(&code).copied())
                        .map(|c| c.country.as_str());
                    (id, CustomerDim { customer, country })
                })
                .collect();

        let mut summary = MergeSummary {
            rows: self.transactions.len(),
            ..MergeSummary::default()
        };

        let rows = self
            .transactions
            .iter()
            .map(|t| {
                let prod_cat = categories.get(&t.prod_cat_code).map(|p| p.prod_cat.clone());
                let prod_subcat = subcategories
                    .get(&(t.prod_cat_code, t.prod_subcat_code))
                    .map(|p| p.prod_subcat.clone());
                let customer = customers.get(&t.cust_id);

                if prod_cat.is_none() {
                    summary.missing_category += 1;
                }
                if prod_subcat.is_none() {
                    summary.missing_subcategory += 1;
                }
                match customer {
                    None => summary.missing_customer += 1,
                    Some(dim) if dim.country.is_none() => summary.missing_country += 1,
                    Some(_) => {}
                }

                FactRow {
                    transaction_id: t.transaction_id,
                    cust_id: t.cust_id,
                    tran_date: t.tran_date,
                    prod_subcat_code: t.prod_subcat_code,
                    prod_cat_code: t.prod_cat_code,
                    qty: t.qty,
                    rate: t.rate,
                    tax: t.tax,
                    total_amt: t.total_amt,
                    store_type: t.store_type.clone(),
                    prod_cat,
                    prod_subcat,
                    dob: customer.and_then(|c| c.customer.dob),
                    gender: customer.and_then(|c| c.customer.gender.clone()),
                    country_code: customer.and_then(|c| c.customer.country_code),
                    country: customer.and_then(|c| c.country.map(str::to_string)),
                }
            })
            .collect();

        info!("Merged {} transactions into the fact table", summary.rows);
        if summary.missing_category + summary.missing_subcategory > 0 {
            warn!(
                "{} rows without a category, {} without a sub-category",
                summary.missing_category, summary.missing_subcategory
            );
        }
        if summary.missing_customer + summary.missing_country > 0 {
            warn!(
                "{} rows without a known customer, {} without a country",
                summary.missing_customer, summary.missing_country
            );
        }

        (FactTable::new(rows), summary)
    }
}
