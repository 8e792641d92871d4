//! Chart aggregations over the fact table.
//!
//! Every report looks at sales rows only (`total_amt > 0`) and rounds money to
//! two decimals after summing.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::fact::{DateRange, FactTable};

/// Weekdays in chart order, Monday first
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Last calendar day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Revenue per store type for one month bucket at a time
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    /// Month buckets labelled by their last day, ascending
    pub months: Vec<NaiveDate>,
    /// One series per store type, sorted by store type
    pub series: Vec<StoreSeries>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreSeries {
    pub store_type: String,
    /// Aligned with `MonthlyRevenue::months`; `None` where the store sold nothing
    pub values: Vec<Option<f64>>,
    pub hover: Vec<Option<String>>,
}

/// Stacked monthly revenue by store type within a date range
pub fn revenue_by_month(table: &FactTable, range: DateRange) -> MonthlyRevenue {
    let mut sums: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
    let mut months = BTreeSet::new();
    let mut stores = BTreeSet::new();

    for row in table.sales_between(range) {
        let month = month_end(row.tran_date);
        months.insert(month);
        stores.insert(row.store_type.as_str());
        *sums.entry((month, row.store_type.as_str())).or_insert(0.0) += row.total_amt;
    }

    let months: Vec<NaiveDate> = months.into_iter().collect();
    let series = stores
        .into_iter()
        .map(|store| {
            let values: Vec<Option<f64>> = months
                .iter()
                .map(|month| sums.get(&(*month, store)).copied().map(round2))
                .collect();
            let hover = values
                .iter()
                .map(|v| v.map(|v| format!("{:.2}k", v / 1e3)))
                .collect();
            StoreSeries {
                store_type: store.to_string(),
                values,
                hover,
            }
        })
        .collect();

    MonthlyRevenue { months, series }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountrySales {
    pub country: String,
    pub total: f64,
}

/// Sales per country within a date range, sorted by country name
///
/// Rows whose customer has no resolved country are left out.
pub fn sales_by_country(table: &FactTable, range: DateRange) -> Vec<CountrySales> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for row in table.sales_between(range) {
        if let Some(country) = row.country.as_deref() {
            *sums.entry(country).or_insert(0.0) += row.total_amt;
        }
    }
    sums.into_iter()
        .map(|(country, total)| CountrySales {
            country: country.to_string(),
            total: round2(total),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubcategoryGender {
    pub subcategory: String,
    pub female: Option<f64>,
    pub male: Option<f64>,
    /// `female + male`; `None` if either side has no sales
    pub total: Option<f64>,
}

/// Sales of one category's sub-categories split by gender
///
/// Sorted by ascending total; sub-categories missing either gender come last.
pub fn subcategory_by_gender(table: &FactTable, category: &str) -> Vec<SubcategoryGender> {
    let mut pivot: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();

    for row in table.sales() {
        if row.prod_cat.as_deref() != Some(category) {
            continue;
        }
        let Some(subcat) = row.prod_subcat.as_deref() else {
            continue;
        };
        let female = match row.gender.as_deref() {
            Some("F") => true,
            Some("M") => false,
            _ => continue,
        };
        let cell = pivot.entry(subcat).or_insert((None, None));
        let side = if female { &mut cell.0 } else { &mut cell.1 };
        *side = Some(side.unwrap_or(0.0) + row.total_amt);
    }

    let mut rows: Vec<SubcategoryGender> = pivot
        .into_iter()
        .map(|(subcategory, (female, male))| SubcategoryGender {
            subcategory: subcategory.to_string(),
            female,
            male,
            total: female.zip(male).map(|(f, m)| f + m),
        })
        .collect();

    rows.sort_by(|a, b| match (a.total, b.total) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    for row in &mut rows {
        row.female = row.female.map(round2);
        row.male = row.male.map(round2);
        row.total = row.total.map(round2);
    }
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeekdayTotal {
    pub weekday: &'static str,
    pub sales: f64,
    pub transactions: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeekdaySales {
    /// Always seven entries, Monday first
    pub days: Vec<WeekdayTotal>,
    /// Index into `days` of the highest sales value
    pub best_day: Option<usize>,
}

/// Sales value and transaction count per weekday for one store type
pub fn weekday_sales(table: &FactTable, store_type: &str) -> WeekdaySales {
    let mut sales = [0.0f64; 7];
    let mut counts = [0usize; 7];

    for row in table.sales().filter(|row| row.store_type == store_type) {
        let idx = row.tran_date.weekday().num_days_from_monday() as usize;
        sales[idx] += row.total_amt;
        counts[idx] += 1;
    }

    let mut best_day: Option<usize> = None;
    if counts.iter().any(|&c| c > 0) {
        for idx in 0..7 {
            match best_day {
                Some(best) if sales[idx] <= sales[best] => {}
                _ => best_day = Some(idx),
            }
        }
    }

    let days = WEEKDAYS
        .iter()
        .enumerate()
        .map(|(idx, day)| WeekdayTotal {
            weekday: weekday_name(*day),
            sales: round2(sales[idx]),
            transactions: counts[idx],
        })
        .collect();

    WeekdaySales { days, best_day }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub gender: String,
    pub count: usize,
}

/// One ring of the customer sunburst: a country and its gender split
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountrySegment {
    pub country: String,
    pub total: usize,
    pub genders: Vec<GenderCount>,
}

/// Transactions per (country, gender) for one store type
pub fn customer_segments(table: &FactTable, store_type: &str) -> Vec<CountrySegment> {
    let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();

    for row in table.sales().filter(|row| row.store_type == store_type) {
        if let (Some(country), Some(gender)) = (row.country.as_deref(), row.gender.as_deref()) {
            *counts.entry(country).or_default().entry(gender).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(country, genders)| CountrySegment {
            country: country.to_string(),
            total: genders.values().sum(),
            genders: genders
                .into_iter()
                .map(|(gender, count)| GenderCount {
                    gender: gender.to_string(),
                    count,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FactRow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(day: NaiveDate, store: &str, amount: f64) -> FactRow {
        FactRow {
            transaction_id: 1,
            cust_id: 1,
            tran_date: day,
            prod_subcat_code: 1,
            prod_cat_code: 1,
            qty: 1,
            rate: amount,
            tax: 0.0,
            total_amt: amount,
            store_type: store.to_string(),
            prod_cat: Some("Books".to_string()),
            prod_subcat: Some("Fiction".to_string()),
            dob: None,
            gender: Some("F".to_string()),
            country_code: Some(1),
            country: Some("Poland".to_string()),
        }
    }

    #[test]
    fn month_end_handles_december_and_leap_years() {
        assert_eq!(month_end(date(2013, 12, 5)), date(2013, 12, 31));
        assert_eq!(month_end(date(2012, 2, 1)), date(2012, 2, 29));
        assert_eq!(month_end(date(2014, 4, 30)), date(2014, 4, 30));
    }

    #[test]
    fn revenue_leaves_gaps_for_missing_store_months() {
        let table = FactTable::new(vec![
            row(date(2014, 1, 3), "e-Shop", 100.004),
            row(date(2014, 1, 20), "e-Shop", 50.0),
            row(date(2014, 2, 2), "TeleShop", 1234.5),
            row(date(2014, 2, 3), "e-Shop", -80.0),
        ]);
        let range = DateRange::new(date(2014, 1, 1), date(2014, 12, 31)).unwrap();
        let report = revenue_by_month(&table, range);

        assert_eq!(report.months, vec![date(2014, 1, 31), date(2014, 2, 28)]);
        assert_eq!(report.series[0].store_type, "TeleShop");
        assert_eq!(report.series[0].values, vec![None, Some(1234.5)]);
        assert_eq!(report.series[0].hover[1].as_deref(), Some("1.23k"));
        assert_eq!(report.series[1].store_type, "e-Shop");
        assert_eq!(report.series[1].values, vec![Some(150.0), None]);
    }

    #[test]
    fn weekday_best_day_prefers_earliest_on_tie() {
        // 2014-01-06 is a Monday
        let table = FactTable::new(vec![
            row(date(2014, 1, 6), "Flagship store", 10.0),
            row(date(2014, 1, 8), "Flagship store", 10.0),
            row(date(2014, 1, 8), "MBR", 99.0),
        ]);
        let report = weekday_sales(&table, "Flagship store");
        assert_eq!(report.days.len(), 7);
        assert_eq!(report.best_day, Some(0));
        assert_eq!(report.days[2].transactions, 1);
        assert_eq!(report.days[6].sales, 0.0);

        assert_eq!(weekday_sales(&table, "nowhere").best_day, None);
    }

    #[test]
    fn subcategories_with_one_gender_sort_last() {
        let mut a = row(date(2014, 1, 6), "MBR", 30.0);
        a.prod_subcat = Some("Comics".to_string());
        let mut b = a.clone();
        b.gender = Some("M".to_string());
        b.total_amt = 5.0;
        let mut c = row(date(2014, 1, 6), "MBR", 1.0);
        c.prod_subcat = Some("Academic".to_string());
        let mut d = c.clone();
        d.gender = Some("M".to_string());
        let mut e = row(date(2014, 1, 6), "MBR", 500.0);
        e.prod_subcat = Some("Children".to_string());

        let table = FactTable::new(vec![a, b, c, d, e]);
        let report = subcategory_by_gender(&table, "Books");
        let names: Vec<&str> = report.iter().map(|r| r.subcategory.as_str()).collect();
        assert_eq!(names, vec!["Academic", "Comics", "Children"]);
        assert_eq!(report[1].total, Some(35.0));
        assert_eq!(report[2].male, None);
        assert_eq!(report[2].total, None);
    }

    #[test]
    fn rows_without_gender_add_no_subcategory() {
        let female = row(date(2014, 1, 6), "MBR", 10.0);
        let mut male = female.clone();
        male.gender = Some("M".to_string());
        male.total_amt = 5.0;
        let mut unknown = row(date(2014, 1, 6), "MBR", 99.0);
        unknown.prod_subcat = Some("Comics".to_string());
        unknown.gender = None;
        let mut other = unknown.clone();
        other.gender = Some("X".to_string());

        let table = FactTable::new(vec![female, male, unknown, other]);
        let report = subcategory_by_gender(&table, "Books");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].subcategory, "Fiction");
        assert_eq!(report[0].total, Some(15.0));
    }
}
