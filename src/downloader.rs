use crate::error::{DashboardError, Result};
use crate::fact::FactRow;

/// Column headers of exported fact rows, in output order
pub const EXPORT_HEADERS: [&str; 16] = [
    "transaction_id",
    "cust_id",
    "tran_date",
    "prod_subcat_code",
    "prod_cat_code",
    "qty",
    "rate",
    "tax",
    "total_amt",
    "store_type",
    "prod_cat",
    "prod_subcat",
    "dob",
    "gender",
    "country_code",
    "country",
];

/// Convert fact rows to CSV
///
/// The header row comes from the field names of [`FactRow`]; missing
/// dimension values are written as empty cells and dates as `YYYY-MM-DD`.
///
/// # Arguments
/// * `rows` - Rows to export
///
/// # Returns
/// * `Result<String>` - CSV content
///
/// # Examples
/// ```
/// use dashboard::downloader::to_csv;
///
/// let csv = to_csv(&[]).unwrap();
/// assert!(csv.is_empty());
/// ```
pub fn to_csv(rows: &[FactRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DashboardError::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::Export(e.to_string()))
}

/// Convert fact rows to XLSX
///
/// One worksheet with a header row followed by one row per fact row. Numbers
/// are written as numbers and dates as ISO text.
///
/// # Arguments
/// * `rows` - Rows to export
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content
#[cfg(feature = "web")]
pub fn to_xlsx(rows: &[FactRow]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

    fn write_row(worksheet: &mut Worksheet, r: u32, row: &FactRow) -> std::result::Result<(), XlsxError> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        worksheet.write_number(r, 0, row.transaction_id as f64)?;
        worksheet.write_number(r, 1, row.cust_id as f64)?;
        worksheet.write_string(r, 2, &row.tran_date.format("%Y-%m-%d").to_string())?;
        worksheet.write_number(r, 3, row.prod_subcat_code as f64)?;
        worksheet.write_number(r, 4, row.prod_cat_code as f64)?;
        worksheet.write_number(r, 5, row.qty as f64)?;
        worksheet.write_number(r, 6, row.rate)?;
        worksheet.write_number(r, 7, row.tax)?;
        worksheet.write_number(r, 8, row.total_amt)?;
        worksheet.write_string(r, 9, &row.store_type)?;
        worksheet.write_string(r, 10, &text(&row.prod_cat))?;
        worksheet.write_string(r, 11, &text(&row.prod_subcat))?;
        if let Some(dob) = row.dob {
            worksheet.write_string(r, 12, &dob.format("%Y-%m-%d").to_string())?;
        }
        worksheet.write_string(r, 13, &text(&row.gender))?;
        if let Some(code) = row.country_code {
            worksheet.write_number(r, 14, code as f64)?;
        }
        worksheet.write_string(r, 15, &text(&row.country))?;
        Ok(())
    }

    let build = || -> std::result::Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();
        worksheet.set_name("transactions")?;

        for (c, name) in EXPORT_HEADERS.iter().enumerate() {
            worksheet.write_string(0, c as u16, *name)?;
        }
        for (r, row) in rows.iter().enumerate() {
            write_row(&mut worksheet, r as u32 + 1, row)?;
        }

        workbook.push_worksheet(worksheet);
        workbook.save_to_buffer()
    };

    build().map_err(|e| DashboardError::Export(e.to_string()))
}
