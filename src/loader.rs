use chrono::NaiveDate;
use csv::StringRecord;
use log::{debug, info};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{DashboardError, Result};
use crate::records::{CountryCode, Customer, ProductCategory, Transaction};

/// Date formats accepted for `tran_date` and `DOB`, tried in order.
const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%d/%m/%Y"];

/// Parse a transaction date
///
/// Dates are written day first, separated either by dashes or by slashes.
/// The dash form is tried first.
///
/// # Arguments
/// * `value` - Raw cell text
///
/// # Returns
/// * `Option<NaiveDate>` - The parsed date, or `None` if neither format matches
///
/// # Examples
/// ```
/// use dashboard::loader::parse_tran_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(parse_tran_date("28-02-2014"), NaiveDate::from_ymd_opt(2014, 2, 28));
/// assert_eq!(parse_tran_date("28/02/2014"), NaiveDate::from_ymd_opt(2014, 2, 28));
/// assert_eq!(parse_tran_date("2014-02-28"), None);
/// ```
pub fn parse_tran_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse an integer code, tolerating float spellings such as `"4.0"`
///
/// Blank cells yield `Ok(None)`. Anything that is not a whole number is an error.
pub(crate) fn parse_code(value: &str) -> std::result::Result<Option<i64>, ()> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(code) = value.parse::<i64>() {
        return Ok(Some(code));
    }
    match value.parse::<f64>() {
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Some(f as i64))
        }
        _ => Err(()),
    }
}

/// Header lookup for one CSV file
struct Columns<'a> {
    file: &'a Path,
    headers: StringRecord,
}

impl<'a> Columns<'a> {
    fn new(file: &'a Path, headers: &StringRecord) -> Self {
        Columns {
            file,
            headers: headers.clone(),
        }
    }

    fn optional(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|name| h.trim() == *name))
    }

    fn required(&self, name: &str) -> Result<usize> {
        self.optional(&[name])
            .ok_or_else(|| DashboardError::MissingColumn {
                file: self.file.to_path_buf(),
                column: name.to_string(),
            })
    }
}

/// A record together with enough context to report bad cells
struct Row<'a> {
    file: &'a Path,
    line: u64,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn text(&self, index: usize) -> &'a str {
        self.record.get(index).unwrap_or("").trim()
    }

    fn invalid(&self, column: &str, value: &str) -> DashboardError {
        DashboardError::Value {
            file: self.file.to_path_buf(),
            row: self.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn code(&self, index: usize, column: &str) -> Result<Option<i64>> {
        let value = self.text(index);
        parse_code(value).map_err(|_| self.invalid(column, value))
    }

    fn required_code(&self, index: usize, column: &str) -> Result<i64> {
        self.code(index, column)?
            .ok_or_else(|| self.invalid(column, ""))
    }

    fn number(&self, index: usize, column: &str) -> Result<f64> {
        let value = self.text(index);
        value.parse::<f64>().map_err(|_| self.invalid(column, value))
    }

    fn optional_text(&self, index: Option<usize>) -> Option<String> {
        index
            .map(|i| self.text(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Build a CSV reader over any byte source
///
/// Rows may carry a leading unnamed index column and ragged trailing cells,
/// so the reader is flexible and all lookups go through header names.
fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        DashboardError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Iterate the records of a CSV source, handing each row to `parse`
fn read_rows<R, T, F>(reader: R, file: &Path, mut parse: F) -> Result<Vec<T>>
where
    R: Read,
    F: FnMut(&Columns<'_>, &Row<'_>) -> Result<T>,
{
    let mut csv = csv_reader(reader);
    let headers = csv
        .headers()
        .map_err(|e| DashboardError::csv(file, e))?
        .clone();
    let columns = Columns::new(file, &headers);

    let mut out = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match csv.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(DashboardError::csv(file, e)),
        }
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row = Row {
            file,
            line,
            record: &record,
        };
        out.push(parse(&columns, &row)?);
    }
    Ok(out)
}

/// Read transaction rows from one CSV source
///
/// # Arguments
/// * `reader` - CSV bytes with a header row
/// * `file` - Name used in error messages
///
/// # Returns
/// * `Result<Vec<Transaction>>` - Rows in file order
///
/// # Errors
/// * `MissingColumn` if a required header is absent
/// * `Date` if a `tran_date` cell matches neither accepted format
/// * `Value` if a numeric cell cannot be parsed
pub fn read_transactions<R: Read>(reader: R, file: &Path) -> Result<Vec<Transaction>> {
    let mut indices: Option<[usize; 10]> = None;
    read_rows(reader, file, |columns, row| {
        let idx = match indices {
            Some(idx) => idx,
            None => {
                let idx = [
                    columns.required("transaction_id")?,
                    columns.required("cust_id")?,
                    columns.required("tran_date")?,
                    columns.required("prod_subcat_code")?,
                    columns.required("prod_cat_code")?,
                    columns.required("Qty")?,
                    columns.required("Rate")?,
                    columns.required("Tax")?,
                    columns.required("total_amt")?,
                    columns.required("Store_type")?,
                ];
                indices = Some(idx);
                idx
            }
        };

        let raw_date = row.text(idx[2]);
        let tran_date = parse_tran_date(raw_date).ok_or_else(|| DashboardError::Date {
            file: file.to_path_buf(),
            row: row.line,
            value: raw_date.to_string(),
        })?;

        Ok(Transaction {
            transaction_id: row.required_code(idx[0], "transaction_id")?,
            cust_id: row.required_code(idx[1], "cust_id")?,
            tran_date,
            prod_subcat_code: row.required_code(idx[3], "prod_subcat_code")?,
            prod_cat_code: row.required_code(idx[4], "prod_cat_code")?,
            qty: row.required_code(idx[5], "Qty")?,
            rate: row.number(idx[6], "Rate")?,
            tax: row.number(idx[7], "Tax")?,
            total_amt: row.number(idx[8], "total_amt")?,
            store_type: row.text(idx[9]).to_string(),
        })
    })
}

/// Load every transaction file in a directory
///
/// All `*.csv` files are read in file-name order and their rows appended.
///
/// # Arguments
/// * `dir` - Directory holding the transaction CSV files
///
/// # Returns
/// * `Result<Vec<Transaction>>` - All transactions, file by file
///
/// # Examples
/// ```no_run
/// use dashboard::loader::load_transactions;
///
/// match load_transactions("db/transactions") {
///     Ok(rows) => println!("Loaded {} transactions", rows.len()),
///     Err(e) => eprintln!("Error loading transactions: {}", e),
/// }
/// ```
pub fn load_transactions(dir: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DashboardError::NoTransactions(dir.to_path_buf()));
    }

    let mut transactions = Vec::new();
    for path in &files {
        let rows = read_transactions(open(path)?, path)?;
        debug!("{}: {} transactions", path.display(), rows.len());
        transactions.extend(rows);
    }
    info!(
        "Loaded {} transactions from {} files in {}",
        transactions.len(),
        files.len(),
        dir.display()
    );
    Ok(transactions)
}

/// Read the country code table
///
/// The first column holds the code whatever its header says; the name comes
/// from the `country` column.
pub fn read_country_codes<R: Read>(reader: R, file: &Path) -> Result<Vec<CountryCode>> {
    read_rows(reader, file, |columns, row| {
        let country = columns.required("country")?;
        Ok(CountryCode {
            code: row.required_code(0, "country_code")?,
            country: row.text(country).to_string(),
        })
    })
}

pub fn load_country_codes(path: impl AsRef<Path>) -> Result<Vec<CountryCode>> {
    let path = path.as_ref();
    let rows = read_country_codes(open(path)?, path)?;
    info!("Loaded {} country codes", rows.len());
    Ok(rows)
}

/// Read the customer table
///
/// Only `customer_Id` is required. `DOB`, `Gender` and the country code column
/// (`country_code`, or `city_code` in older exports) are optional and blank
/// cells become `None`. A date of birth that does not parse is dropped rather
/// than failing the load.
pub fn read_customers<R: Read>(reader: R, file: &Path) -> Result<Vec<Customer>> {
    read_rows(reader, file, |columns, row| {
        let id = columns.required("customer_Id")?;
        let dob = columns.optional(&["DOB"]);
        let gender = columns.optional(&["Gender"]);
        let country = columns.optional(&["country_code", "city_code"]);

        let country_code = match country {
            Some(i) => row.code(i, "country_code")?,
            None => None,
        };

        Ok(Customer {
            customer_id: row.required_code(id, "customer_Id")?,
            dob: row.optional_text(dob).and_then(|s| parse_tran_date(&s)),
            gender: row.optional_text(gender),
            country_code,
        })
    })
}

pub fn load_customers(path: impl AsRef<Path>) -> Result<Vec<Customer>> {
    let path = path.as_ref();
    let rows = read_customers(open(path)?, path)?;
    info!("Loaded {} customers", rows.len());
    Ok(rows)
}

/// Read the product hierarchy table
pub fn read_product_categories<R: Read>(reader: R, file: &Path) -> Result<Vec<ProductCategory>> {
    read_rows(reader, file, |columns, row| {
        Ok(ProductCategory {
            prod_cat_code: row.required_code(columns.required("prod_cat_code")?, "prod_cat_code")?,
            prod_cat: row.text(columns.required("prod_cat")?).to_string(),
            prod_sub_cat_code: row
                .required_code(columns.required("prod_sub_cat_code")?, "prod_sub_cat_code")?,
            prod_subcat: row.text(columns.required("prod_subcat")?).to_string(),
        })
    })
}

pub fn load_product_categories(path: impl AsRef<Path>) -> Result<Vec<ProductCategory>> {
    let path = path.as_ref();
    let rows = read_product_categories(open(path)?, path)?;
    info!("Loaded {} product categories", rows.len());
    Ok(rows)
}
