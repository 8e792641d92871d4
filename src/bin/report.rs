#![cfg(not(tarpaulin_include))]

use clap::Parser;
use dashboard::config;
use dashboard::fact::DateRange;
use dashboard::merge::Database;
use dashboard::reports;
use std::path::PathBuf;

/// Print every dashboard report as text
#[derive(Debug, Parser)]
#[command(name = "report")]
struct Args {
    /// Directory holding `transactions/` and the dimension CSV files
    #[arg(long, env = "DASHBOARD_DATA_DIR", default_value = "db")]
    data_dir: PathBuf,

    /// Category for the sub-category breakdown; first category if omitted
    #[arg(long)]
    category: Option<String>,

    /// Store type for the weekday and segment breakdowns; first store if omitted
    #[arg(long)]
    store: Option<String>,
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_logging();
    let args = Args::parse();

    let facts = Database::load(&args.data_dir)?.merge();
    let Some(bounds) = facts.date_bounds() else {
        println!("No transactions loaded");
        return Ok(());
    };
    let range = DateRange::new(bounds.start, bounds.end)?;

    println!("== Revenue by month ({} to {})", range.start, range.end);
    let revenue = reports::revenue_by_month(&facts, range);
    let header: Vec<&str> = revenue.series.iter().map(|s| s.store_type.as_str()).collect();
    println!("{:<12} {}", "month", header.join("\t"));
    for (i, month) in revenue.months.iter().enumerate() {
        let values: Vec<String> = revenue.series.iter().map(|s| cell(s.values[i])).collect();
        println!("{:<12} {}", month, values.join("\t"));
    }

    println!("\n== Sales by country");
    for country in reports::sales_by_country(&facts, range) {
        println!("{:<24} {:>14.2}", country.country, country.total);
    }

    let category = args
        .category
        .or_else(|| facts.categories().into_iter().next())
        .unwrap_or_default();
    println!("\n== {} by gender", category);
    for row in reports::subcategory_by_gender(&facts, &category) {
        println!(
            "{:<24} F {:>12} M {:>12} total {:>12}",
            row.subcategory,
            cell(row.female),
            cell(row.male),
            cell(row.total)
        );
    }

    let store = args
        .store
        .or_else(|| facts.store_types().into_iter().next())
        .unwrap_or_default();
    println!("\n== Weekday sales for {}", store);
    let weekdays = reports::weekday_sales(&facts, &store);
    for (i, day) in weekdays.days.iter().enumerate() {
        let marker = if weekdays.best_day == Some(i) { " *" } else { "" };
        println!(
            "{:<10} {:>14.2} {:>8}{}",
            day.weekday, day.sales, day.transactions, marker
        );
    }

    println!("\n== Customer segments for {}", store);
    for segment in reports::customer_segments(&facts, &store) {
        let split: Vec<String> = segment
            .genders
            .iter()
            .map(|g| format!("{} {}", g.gender, g.count))
            .collect();
        println!("{:<24} {:>6}  ({})", segment.country, segment.total, split.join(", "));
    }

    Ok(())
}
