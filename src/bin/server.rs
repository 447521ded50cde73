use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use rail_optimizer::scenarios::{self, Scenario};
use rail_optimizer::types::{CutPlan, OptimizeParams, SolveError, Strategy};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    #[serde(flatten)]
    params: OptimizeParams,
    #[serde(default)]
    strategy: Strategy,
}

#[derive(Serialize)]
struct ScenarioResponse {
    cost_best: Scenario,
    length_best: Scenario,
    joints_best: Scenario,
    all: Vec<Scenario>,
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<CutPlan>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    req.strategy.solve(&req.params).map(Json).map_err(reject)
}

async fn scenario_sweep(
    Json(params): Json<OptimizeParams>,
) -> Result<Json<ScenarioResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&params).unwrap_or_default(),
        "POST /scenarios"
    );

    match scenarios::generate_scenarios(&params) {
        Some(set) => {
            let response = ScenarioResponse {
                cost_best: set.cost_best().clone(),
                length_best: set.length_best().clone(),
                joints_best: set.joints_best().clone(),
                all: set.all,
            };
            Ok(Json(response))
        }
        None => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "no scenario produced a feasible plan".to_string(),
        )),
    }
}

fn reject(err: SolveError) -> (StatusCode, String) {
    let status = match err {
        SolveError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SolveError::ProblemTooLarge { .. } | SolveError::Infeasible(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    (status, err.to_string())
}

#[tokio::main]
async fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/scenarios", post(scenario_sweep))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
