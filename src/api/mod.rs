use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, error, info};

use crate::config::Preferences;
use crate::core::{
    AmortizationPeriod, AmortizationYear, InvestmentParameters, LoanParameters,
    ProfitabilityResult, ScheduleSummary, compute_monthly_payment, compute_profitability,
    generate_schedule, summarize_schedule, yearly_breakdown,
};
use crate::error::ParameterError;

pub const MAX_DURATION_YEARS: u32 = 50;

const DEFAULT_LOAN_AMOUNT: f64 = 162_500.0;
const DEFAULT_PROPERTY_PRICE: f64 = 140_000.0;
const DEFAULT_INVESTMENT_LOAN: f64 = 130_000.0;
const DEFAULT_MONTHLY_RENT: f64 = 490.0;
const DEFAULT_RENOVATION_SHARE: f64 = 0.25;
const DEFAULT_NOTARY_FEES: f64 = 8_500.0;
const DEFAULT_LOAN_FEES: f64 = 2_500.0;
const DEFAULT_CABINET_COMMISSION: f64 = 1_500.0;
const DEFAULT_TAX_REDUCTION: f64 = 12_000.0;
const DEFAULT_PROPERTY_TAX: f64 = 2_400.0;

#[derive(Args, Debug, Clone)]
pub struct LoanArgs {
    #[arg(long, default_value_t = DEFAULT_LOAN_AMOUNT, help = "Amount to borrow")]
    pub amount: f64,
    #[arg(
        long,
        help = "Annual interest rate in percent, e.g. 3.1; defaults to the stored preference"
    )]
    pub interest_rate: Option<f64>,
    #[arg(
        long,
        help = "Loan duration in years; defaults to the stored preference"
    )]
    pub duration: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct InvestmentArgs {
    #[arg(long, default_value_t = DEFAULT_PROPERTY_PRICE, help = "Purchase price of the property")]
    pub property_price: f64,
    #[arg(long, default_value_t = DEFAULT_INVESTMENT_LOAN, help = "Amount borrowed")]
    pub loan_amount: f64,
    #[arg(
        long,
        help = "Annual interest rate in percent; defaults to the stored preference"
    )]
    pub interest_rate: Option<f64>,
    #[arg(
        long,
        help = "Loan duration in years; defaults to the stored preference"
    )]
    pub duration: Option<u32>,
    #[arg(long, default_value_t = DEFAULT_MONTHLY_RENT, help = "Monthly rent received")]
    pub monthly_rent: f64,
    #[arg(
        long,
        help = "Renovation works; defaults to 25% of the property price"
    )]
    pub renovation_costs: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_NOTARY_FEES)]
    pub notary_fees: f64,
    #[arg(long, default_value_t = DEFAULT_LOAN_FEES, help = "Loan arrangement fees")]
    pub loan_fees: f64,
    #[arg(long, default_value_t = DEFAULT_CABINET_COMMISSION, help = "Broker or advisory firm commission")]
    pub cabinet_commission: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_TAX_REDUCTION,
        help = "Tax reduction deducted from the initial outlay"
    )]
    pub tax_reduction: f64,
    #[arg(long, default_value_t = DEFAULT_PROPERTY_TAX, help = "Annual property tax")]
    pub property_tax: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoanPayload {
    amount: Option<f64>,
    interest_rate: Option<f64>,
    duration: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InvestmentPayload {
    property_price: Option<f64>,
    loan_amount: Option<f64>,
    interest_rate: Option<f64>,
    duration: Option<u32>,
    monthly_rent: Option<f64>,
    renovation_costs: Option<f64>,
    notary_fees: Option<f64>,
    loan_fees: Option<f64>,
    cabinet_commission: Option<f64>,
    tax_reduction: Option<f64>,
    property_tax: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PreferencesPayload {
    #[serde(alias = "durationYears")]
    duration: Option<u32>,
    #[serde(alias = "interestRatePercent")]
    interest_rate: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub parameters: LoanParameters,
    pub summary: ScheduleSummary,
    pub schedule: Vec<AmortizationPeriod>,
    pub years: Vec<AmortizationYear>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentResponse {
    pub parameters: InvestmentParameters,
    pub result: ProfitabilityResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Preferences shared by every request, plus where to persist changes.
#[derive(Clone)]
pub struct AppState {
    preferences: Arc<RwLock<Preferences>>,
    preferences_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(preferences: Preferences, preferences_path: Option<PathBuf>) -> Self {
        AppState {
            preferences: Arc::new(RwLock::new(preferences)),
            preferences_path,
        }
    }

    async fn snapshot(&self) -> Preferences {
        *self.preferences.read().await
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NonFiniteValue { field });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ParameterError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ParameterError::NegativeValue { field });
    }
    Ok(())
}

fn check_duration(duration: u32) -> Result<u32, ParameterError> {
    if duration == 0 {
        return Err(ParameterError::NonPositiveDuration);
    }
    if duration > MAX_DURATION_YEARS {
        return Err(ParameterError::DurationTooLong {
            max: MAX_DURATION_YEARS,
        });
    }
    Ok(duration)
}

/// Rates so close to zero that `1 + r` rounds to 1 make the annuity formula
/// divide by zero.
fn check_payment_is_finite(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Result<(), ParameterError> {
    if !compute_monthly_payment(principal, annual_rate_percent, term_years).is_finite() {
        return Err(ParameterError::DegenerateRate {
            rate: annual_rate_percent,
        });
    }
    Ok(())
}

pub fn build_loan_parameters(
    args: LoanArgs,
    prefs: &Preferences,
) -> Result<LoanParameters, ParameterError> {
    let annual_rate_percent = args.interest_rate.unwrap_or(prefs.interest_rate_percent);
    let term_years = check_duration(args.duration.unwrap_or(prefs.duration_years))?;

    check_non_negative("amount", args.amount)?;
    check_non_negative("interest-rate", annual_rate_percent)?;
    check_payment_is_finite(args.amount, annual_rate_percent, term_years)?;

    Ok(LoanParameters {
        principal: args.amount,
        annual_rate_percent,
        term_years,
    })
}

pub fn build_investment_parameters(
    args: InvestmentArgs,
    prefs: &Preferences,
) -> Result<InvestmentParameters, ParameterError> {
    let annual_rate_percent = args.interest_rate.unwrap_or(prefs.interest_rate_percent);
    let term_years = check_duration(args.duration.unwrap_or(prefs.duration_years))?;
    let renovation_costs = args
        .renovation_costs
        .unwrap_or(args.property_price * DEFAULT_RENOVATION_SHARE);

    for (field, value) in [
        ("property-price", args.property_price),
        ("loan-amount", args.loan_amount),
        ("interest-rate", annual_rate_percent),
        ("monthly-rent", args.monthly_rent),
        ("renovation-costs", renovation_costs),
        ("notary-fees", args.notary_fees),
        ("loan-fees", args.loan_fees),
        ("cabinet-commission", args.cabinet_commission),
        ("tax-reduction", args.tax_reduction),
        ("property-tax", args.property_tax),
    ] {
        check_non_negative(field, value)?;
    }
    check_payment_is_finite(args.loan_amount, annual_rate_percent, term_years)?;

    Ok(InvestmentParameters {
        property_price: args.property_price,
        loan_amount: args.loan_amount,
        annual_rate_percent,
        term_years,
        monthly_rent: args.monthly_rent,
        renovation_costs,
        notary_fees: args.notary_fees,
        loan_fees: args.loan_fees,
        broker_commission: args.cabinet_commission,
        tax_reduction: args.tax_reduction,
        annual_property_tax: args.property_tax,
    })
}

/// Validates and applies a preference change. Nothing is modified when any
/// value is rejected.
pub fn apply_preferences_update(
    prefs: &mut Preferences,
    duration: Option<u32>,
    interest_rate: Option<f64>,
) -> Result<(), ParameterError> {
    if let Some(d) = duration {
        check_duration(d)?;
    }
    if let Some(rate) = interest_rate {
        check_non_negative("interest-rate", rate)?;
    }

    if let Some(d) = duration {
        prefs.set_duration(d);
    }
    if let Some(rate) = interest_rate {
        prefs.set_interest_rate(rate);
    }
    Ok(())
}

pub fn build_loan_response(loan: &LoanParameters) -> LoanResponse {
    let schedule = generate_schedule(loan);
    let summary = summarize_schedule(&schedule);
    let years = yearly_breakdown(&schedule);
    debug!(
        periods = summary.periods,
        monthly_payment = summary.monthly_payment,
        total_interest = summary.total_interest,
        "generated amortization schedule"
    );

    LoanResponse {
        parameters: *loan,
        summary,
        schedule,
        years,
    }
}

pub fn build_investment_response(data: &InvestmentParameters) -> InvestmentResponse {
    let result = compute_profitability(data);
    debug!(
        initial_investment = result.initial_investment,
        monthly_net_cash_flow = result.monthly_net_cash_flow,
        roi = result.roi_percent,
        "computed investment profitability"
    );

    InvestmentResponse {
        parameters: *data,
        result,
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/loan", get(loan_get_handler).post(loan_post_handler))
        .route(
            "/api/investment",
            get(investment_get_handler).post(investment_post_handler),
        )
        .route(
            "/api/preferences",
            get(preferences_get_handler)
                .put(preferences_put_handler)
                .delete(preferences_reset_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Loan and investment HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/loan");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn loan_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<LoanPayload>,
) -> Response {
    loan_handler_impl(&state, payload).await
}

async fn loan_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoanPayload>,
) -> Response {
    loan_handler_impl(&state, payload).await
}

async fn loan_handler_impl(state: &AppState, payload: LoanPayload) -> Response {
    let prefs = state.snapshot().await;
    match loan_parameters_from_payload(payload, &prefs) {
        Ok(loan) => json_response(StatusCode::OK, build_loan_response(&loan)),
        Err(e) => {
            debug!(error = %e, "rejected loan parameters");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

async fn investment_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<InvestmentPayload>,
) -> Response {
    investment_handler_impl(&state, payload).await
}

async fn investment_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<InvestmentPayload>,
) -> Response {
    investment_handler_impl(&state, payload).await
}

async fn investment_handler_impl(state: &AppState, payload: InvestmentPayload) -> Response {
    let prefs = state.snapshot().await;
    match investment_parameters_from_payload(payload, &prefs) {
        Ok(data) => json_response(StatusCode::OK, build_investment_response(&data)),
        Err(e) => {
            debug!(error = %e, "rejected investment parameters");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

async fn preferences_get_handler(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, state.snapshot().await)
}

async fn preferences_put_handler(
    State(state): State<AppState>,
    Json(payload): Json<PreferencesPayload>,
) -> Response {
    preferences_update_impl(&state, payload).await
}

async fn preferences_reset_handler(State(state): State<AppState>) -> Response {
    commit_preferences(&state, |prefs| {
        prefs.reset_all();
        Ok(())
    })
    .await
}

async fn preferences_update_impl(state: &AppState, payload: PreferencesPayload) -> Response {
    commit_preferences(state, |prefs| {
        apply_preferences_update(prefs, payload.duration, payload.interest_rate)
    })
    .await
}

/// Applies `change` to a copy of the shared preferences and publishes it only
/// once it has been persisted. The write lock is held throughout so the file
/// and memory see updates in the same order.
async fn commit_preferences<F>(state: &AppState, change: F) -> Response
where
    F: FnOnce(&mut Preferences) -> Result<(), ParameterError>,
{
    let mut current = state.preferences.write().await;
    let mut candidate = *current;
    if let Err(e) = change(&mut candidate) {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }

    if let Some(path) = &state.preferences_path {
        if let Err(e) = candidate.save_to_path(path) {
            error!(error = %e, "failed to persist preferences");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save preferences");
        }
    }

    *current = candidate;
    info!(
        duration = candidate.duration_years,
        interest_rate = candidate.interest_rate_percent,
        "preferences updated"
    );
    json_response(StatusCode::OK, candidate)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn loan_request_from_json(json: &str, prefs: &Preferences) -> Result<LoanParameters, String> {
    let payload = serde_json::from_str::<LoanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    loan_parameters_from_payload(payload, prefs).map_err(|e| e.to_string())
}

#[cfg(test)]
fn investment_request_from_json(
    json: &str,
    prefs: &Preferences,
) -> Result<InvestmentParameters, String> {
    let payload = serde_json::from_str::<InvestmentPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    investment_parameters_from_payload(payload, prefs).map_err(|e| e.to_string())
}

fn loan_parameters_from_payload(
    payload: LoanPayload,
    prefs: &Preferences,
) -> Result<LoanParameters, ParameterError> {
    let mut args = default_loan_args();

    if let Some(v) = payload.amount {
        args.amount = v;
    }
    if let Some(v) = payload.interest_rate {
        args.interest_rate = Some(v);
    }
    if let Some(v) = payload.duration {
        args.duration = Some(v);
    }

    build_loan_parameters(args, prefs)
}

fn investment_parameters_from_payload(
    payload: InvestmentPayload,
    prefs: &Preferences,
) -> Result<InvestmentParameters, ParameterError> {
    let mut args = default_investment_args();

    if let Some(v) = payload.property_price {
        args.property_price = v;
    }
    if let Some(v) = payload.loan_amount {
        args.loan_amount = v;
    }
    if let Some(v) = payload.interest_rate {
        args.interest_rate = Some(v);
    }
    if let Some(v) = payload.duration {
        args.duration = Some(v);
    }
    if let Some(v) = payload.monthly_rent {
        args.monthly_rent = v;
    }
    if let Some(v) = payload.renovation_costs {
        args.renovation_costs = Some(v);
    }
    if let Some(v) = payload.notary_fees {
        args.notary_fees = v;
    }
    if let Some(v) = payload.loan_fees {
        args.loan_fees = v;
    }
    if let Some(v) = payload.cabinet_commission {
        args.cabinet_commission = v;
    }
    if let Some(v) = payload.tax_reduction {
        args.tax_reduction = v;
    }
    if let Some(v) = payload.property_tax {
        args.property_tax = v;
    }

    build_investment_parameters(args, prefs)
}

fn default_loan_args() -> LoanArgs {
    LoanArgs {
        amount: DEFAULT_LOAN_AMOUNT,
        interest_rate: None,
        duration: None,
    }
}

fn default_investment_args() -> InvestmentArgs {
    InvestmentArgs {
        property_price: DEFAULT_PROPERTY_PRICE,
        loan_amount: DEFAULT_INVESTMENT_LOAN,
        interest_rate: None,
        duration: None,
        monthly_rent: DEFAULT_MONTHLY_RENT,
        renovation_costs: None,
        notary_fees: DEFAULT_NOTARY_FEES,
        loan_fees: DEFAULT_LOAN_FEES,
        cabinet_commission: DEFAULT_CABINET_COMMISSION,
        tax_reduction: DEFAULT_TAX_REDUCTION,
        property_tax: DEFAULT_PROPERTY_TAX,
    }
}
