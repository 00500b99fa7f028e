use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::core::{
    EgarchParameters, MAX_INITIAL_INVESTMENT, MAX_MONTHLY_INVESTMENT, MAX_MONTHS,
    MAX_SIMULATIONS, MAX_TOTAL_INVESTMENT, ProjectionReport, SimulationError, SimulationRequest,
    run_projection,
};

#[derive(Parser, Debug)]
#[command(
    name = "fundpath",
    about = "Monte Carlo projection of a monthly investment plan under EGARCH returns"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one projection and print the JSON report
    Run {
        #[command(flatten)]
        args: ProjectionArgs,
        #[arg(long, help = "Pretty-print the JSON report")]
        pretty: bool,
    },
    /// Serve the projection HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProjectionArgs {
    #[arg(
        long = "months",
        default_value_t = 120,
        allow_negative_numbers = true,
        help = "Projection horizon in months (0-480)"
    )]
    pub total_month: i64,
    #[arg(
        long = "initial",
        default_value_t = 100.0,
        allow_negative_numbers = true,
        help = "Amount invested in the first month (0-500)"
    )]
    pub initial_investment: f64,
    #[arg(
        long = "monthly",
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Amount added each following month (0-10)"
    )]
    pub monthly_investment: f64,
    #[arg(
        long = "cap",
        default_value_t = 1000.0,
        allow_negative_numbers = true,
        help = "Total amount after which monthly contributions stop (0-1800)"
    )]
    pub total_investment: f64,
    #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
    pub simulations: i64,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl Default for ProjectionArgs {
    fn default() -> Self {
        Self {
            total_month: 120,
            initial_investment: 100.0,
            monthly_investment: 5.0,
            total_investment: 1000.0,
            simulations: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    total_month: Option<i64>,
    initial_investment: Option<f64>,
    monthly_investment: Option<f64>,
    total_investment: Option<f64>,
    simulations: Option<i64>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputLimits {
    max_months: usize,
    max_initial_investment: f64,
    max_monthly_investment: f64,
    max_total_investment: f64,
    max_simulations: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelResponse {
    parameters: EgarchParameters,
    limits: InputLimits,
    defaults: SimulationRequest,
}

pub fn build_request(args: &ProjectionArgs) -> Result<SimulationRequest, SimulationError> {
    let total_month = usize::try_from(args.total_month)
        .map_err(|_| SimulationError::validation("totalMonth", "must be >= 0"))?;
    let simulations = usize::try_from(args.simulations)
        .map_err(|_| SimulationError::validation("simulations", "must be >= 0"))?;

    let request = SimulationRequest {
        total_month,
        initial_investment: args.initial_investment,
        monthly_investment: args.monthly_investment,
        total_investment: args.total_investment,
        simulations,
        seed: args.seed,
    };
    request.validate()?;
    Ok(request)
}

/// Run one projection from command-line arguments.
pub fn run_once(args: &ProjectionArgs) -> Result<ProjectionReport, SimulationError> {
    let request = build_request(args)?;
    run_projection(&request)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Projection HTTP API listening");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/model", get(model_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", None)
}

async fn model_handler() -> Response {
    let defaults = match build_request(&ProjectionArgs::default()) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), None),
    };
    json_response(
        StatusCode::OK,
        ModelResponse {
            parameters: EgarchParameters::default(),
            limits: InputLimits {
                max_months: MAX_MONTHS,
                max_initial_investment: MAX_INITIAL_INVESTMENT,
                max_monthly_investment: MAX_MONTHLY_INVESTMENT,
                max_total_investment: MAX_TOTAL_INVESTMENT,
                max_simulations: MAX_SIMULATIONS,
            },
            defaults,
        },
    )
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(e) => return simulation_error_response(&e),
    };

    match tokio::task::spawn_blocking(move || run_projection(&request)).await {
        Ok(Ok(report)) => json_response(StatusCode::OK, report),
        Ok(Err(e)) => simulation_error_response(&e),
        Err(e) => {
            error!(error = %e, "Projection task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Projection task failed",
                None,
            )
        }
    }
}

fn simulation_error_response(err: &SimulationError) -> Response {
    let status = match err {
        SimulationError::Validation { .. } | SimulationError::Degenerate(_) => {
            StatusCode::BAD_REQUEST
        }
        SimulationError::NumericAnomaly { .. } => {
            error!(error = %err, "Projection produced a non-finite value");
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    error_response(status, &err.to_string(), err.field())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str, field: Option<&'static str>) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            field,
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<SimulationRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload).map_err(|e| e.to_string())
}

fn request_from_payload(payload: SimulatePayload) -> Result<SimulationRequest, SimulationError> {
    let mut args = ProjectionArgs::default();

    if let Some(v) = payload.total_month {
        args.total_month = v;
    }
    if let Some(v) = payload.initial_investment {
        args.initial_investment = v;
    }
    if let Some(v) = payload.monthly_investment {
        args.monthly_investment = v;
    }
    if let Some(v) = payload.total_investment {
        args.total_investment = v;
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }

    build_request(&args)
}
