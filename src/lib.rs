/*!
# Sales Dashboard

A small reporting dashboard for retail transactions, built in Rust.

## Overview

The application loads transaction records together with customer, country and
product reference tables, joins them into a single fact table and serves a set
of filterable charts behind a single-user login.

## Architecture

### Data Layer
- **loader**: CSV parsing for the four sources (transactions directory, country
  codes, customers, product hierarchy)
- **merge**: Left-joins every dimension onto the transactions, one fact row per
  transaction
- **fact**: The merged table plus the shared filters (sales rows, date ranges,
  distinct store types and categories)

### Reporting Layer
- **reports**: One aggregation per chart
  - Monthly revenue by store type
  - Sales by country
  - Sub-category sales by gender
  - Weekday sales value and transaction count
  - Customer segmentation by country and gender
- **charts**: Bar chart descriptions for each report and PNG rendering
- **downloader**: CSV and XLSX export of the fact table

### Web Layer (`web` feature)
- **app**: Routing, report/chart endpoints and the dashboard page
- **auth**: Argon2-hashed single account, cookie sessions and HTTP Basic

## Data Layout

```text
db/
├── transactions/        one or more .csv files
├── country_codes.csv
├── customers.csv
└── prod_cat_info.csv
```

## REST API Endpoints

- `/api/tabs/{tab}` - Controls for the `global`, `products` or `channels` tab
- `/api/revenue`, `/api/countries` - Date-filtered reports (`start`, `end`)
- `/api/subcategories` - Category breakdown (`category`)
- `/api/weekdays`, `/api/segments` - Store type breakdowns (`store`)
- `/charts/{name}.png` - The same reports drawn as PNG
- `/api/export.csv`, `/api/export.xlsx` - The merged fact table
*/

pub mod charts;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fact;
pub mod loader;
pub mod merge;
pub mod records;
pub mod reports;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod auth;

pub use error::{DashboardError, Result};
pub use fact::{DateRange, FactRow, FactTable};
pub use merge::Database;
