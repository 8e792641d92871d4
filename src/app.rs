#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::{self, Credentials, SessionStore};
use crate::charts::{self, ChartOptions, ChartSpec};
use crate::config::Config;
use crate::downloader;
use crate::error::DashboardError;
use crate::fact::{DateRange, FactRow, FactTable};
use crate::merge::Database;
use crate::reports;

/// Shared, read-only application state
pub struct AppState {
    pub facts: FactTable,
    pub credentials: Credentials,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(facts: FactTable, credentials: Credentials) -> Self {
        AppState {
            facts,
            credentials,
            sessions: SessionStore::default(),
        }
    }
}

/// Query parameters shared by every report and chart endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub category: Option<String>,
    pub store: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// Error wrapper that renders as a JSON body with a matching status code
pub struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.0.to_string()),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Controls and charts of one dashboard tab
#[derive(Debug, Serialize)]
pub struct TabContent {
    pub tab: &'static str,
    pub title: &'static str,
    pub date_range: Option<DateRange>,
    pub options: Vec<String>,
    pub default: Option<String>,
    pub charts: Vec<&'static str>,
}

fn parse_query_date(field: &str, value: &str) -> Result<NaiveDate, DashboardError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DashboardError::Query(format!("{} must be YYYY-MM-DD, got {:?}", field, value)))
}

impl ReportQuery {
    /// Requested range, defaulting each open end to the data bounds
    fn range(&self, facts: &FactTable) -> Result<DateRange, DashboardError> {
        let bounds = facts.date_bounds();
        let start = match self.start.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => parse_query_date("start", s)?,
            None => bounds.map_or(NaiveDate::MIN, |b| b.start),
        };
        let end = match self.end.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => parse_query_date("end", s)?,
            None => bounds.map_or(NaiveDate::MAX, |b| b.end),
        };
        DateRange::new(start, end)
    }

    fn category(&self, facts: &FactTable) -> String {
        self.category
            .clone()
            .or_else(|| facts.categories().into_iter().next())
            .unwrap_or_default()
    }

    fn store(&self, facts: &FactTable) -> String {
        self.store
            .clone()
            .or_else(|| facts.store_types().into_iter().next())
            .unwrap_or_default()
    }
}

/// Build the router
///
/// Everything except the login form sits behind [`auth::require_auth`].
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/tabs/:tab", get(tab_content))
        .route("/api/revenue", get(revenue))
        .route("/api/countries", get(countries))
        .route("/api/subcategories", get(subcategories))
        .route("/api/weekdays", get(weekdays))
        .route("/api/segments", get(segments))
        .route("/api/export.csv", get(export_csv))
        .route("/api/export.xlsx", get(export_xlsx))
        .route("/charts/:file", get(chart_png))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route(
            "/login",
            get(auth::serve_login_page).post(auth::handle_login),
        )
        .route("/logout", get(auth::handle_logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the data, merge it and serve the dashboard until shutdown
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.warn_on_defaults();

    let database = Database::load(&config.data_dir)?;
    let facts = database.merge();
    let credentials = Credentials::new(&config.username, &config.password)?;
    let state = Arc::new(AppState::new(facts, credentials));

    let app = router(state);

    let listener = TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn tab_content(
    Path(tab): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let facts = &state.facts;
    let content = match tab.as_str() {
        "global" => TabContent {
            tab: "global",
            title: "Global sales",
            date_range: facts.date_bounds(),
            options: Vec::new(),
            default: None,
            charts: vec!["revenue", "countries"],
        },
        "products" => {
            let options = facts.categories();
            TabContent {
                tab: "products",
                title: "Products",
                date_range: None,
                default: options.first().cloned(),
                options,
                charts: vec!["subcategories"],
            }
        }
        "channels" => {
            let options = facts.store_types();
            TabContent {
                tab: "channels",
                title: "Sales channels",
                date_range: None,
                default: options.first().cloned(),
                options,
                charts: vec!["weekdays", "segments"],
            }
        }
        _ => return (StatusCode::NOT_FOUND, "Unknown tab").into_response(),
    };
    Json(content).into_response()
}

async fn revenue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<reports::MonthlyRevenue>> {
    let range = query.range(&state.facts)?;
    Ok(Json(reports::revenue_by_month(&state.facts, range)))
}

async fn countries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<reports::CountrySales>>> {
    let range = query.range(&state.facts)?;
    Ok(Json(reports::sales_by_country(&state.facts, range)))
}

async fn subcategories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<reports::SubcategoryGender>> {
    let category = query.category(&state.facts);
    Json(reports::subcategory_by_gender(&state.facts, &category))
}

async fn weekdays(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Json<reports::WeekdaySales> {
    let store = query.store(&state.facts);
    Json(reports::weekday_sales(&state.facts, &store))
}

async fn segments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<reports::CountrySegment>> {
    let store = query.store(&state.facts);
    Json(reports::customer_segments(&state.facts, &store))
}

/// Chart description for a chart name, or `None` if the name is unknown
fn chart_spec(name: &str, facts: &FactTable, query: &ReportQuery) -> ApiResult<Option<ChartSpec>> {
    let spec = match name {
        "revenue" => {
            let range = query.range(facts)?;
            charts::revenue_chart(&reports::revenue_by_month(facts, range))
        }
        "countries" => {
            let range = query.range(facts)?;
            charts::country_chart(&reports::sales_by_country(facts, range))
        }
        "subcategories" => {
            let category = query.category(facts);
            charts::subcategory_chart(&category, &reports::subcategory_by_gender(facts, &category))
        }
        "weekdays" => {
            let store = query.store(facts);
            charts::weekday_chart(&store, &reports::weekday_sales(facts, &store))
        }
        "segments" => {
            let store = query.store(facts);
            charts::segments_chart(&reports::customer_segments(facts, &store))
        }
        _ => return Ok(None),
    };
    Ok(Some(spec))
}

async fn chart_png(
    Path(file): Path<String>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let spec = match file.strip_suffix(".png") {
        Some(name) => chart_spec(name, &state.facts, &query)?,
        None => None,
    };
    let Some(spec) = spec else {
        return Ok((StatusCode::NOT_FOUND, "Unknown chart").into_response());
    };

    let png = charts::render_png(&spec, ChartOptions::default())?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// Fact rows limited to the requested dates, if any were given
fn export_rows(facts: &FactTable, query: &ReportQuery) -> ApiResult<Vec<FactRow>> {
    if query.start.is_none() && query.end.is_none() {
        return Ok(facts.rows().to_vec());
    }
    let range = query.range(facts)?;
    Ok(facts
        .rows()
        .iter()
        .filter(|row| range.contains(row.tran_date))
        .cloned()
        .collect())
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let rows = export_rows(&state.facts, &query)?;
    let csv = downloader::to_csv(&rows)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let rows = export_rows(&state.facts, &query)?;
    let xlsx = downloader::to_xlsx(&rows)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.xlsx\"",
            ),
        ],
        xlsx,
    )
        .into_response())
}
