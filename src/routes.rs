use axum::{
    Form, Json, Router,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use include_dir::{include_dir, Dir};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::{error, warn};

use crate::{
    error::{ApiError, ApiResult, ValidationError},
    fabric::analyze_fabric,
    flow::FlowState,
    models::{DesignReport, FabricAnalysisInput, FabricAnalysisResult, SuitDesignBatch, SuitDesignInput},
    pipeline::DesignPipeline,
    render::{render_page, FormView},
    schema::{validate_fabric_analysis_input, validate_suit_design_input},
    suit_design::generate_suit_designs,
};

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

pub const INVALID_INPUT: &str = "Invalid input provided";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: DesignPipeline,
    /// Cancelled on shutdown; every submission runs under a child token.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(submit_form))
        .route("/api/fabric-analysis", post(fabric_analysis_api))
        .route("/api/suit-designs", post(suit_designs_api))
        .route("/api/designs", post(designs_api))
        .route("/health", get(health))
        .route("/static/*path", get(static_asset))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn index() -> Html<String> {
    Html(render_page(&FlowState::Idle, &FormView::default()))
}

pub async fn submit_form(State(state): State<AppState>, Form(input): Form<FabricAnalysisInput>) -> (StatusCode, Html<String>) {
    let mut form = FormView { fabric_image_url: input.fabric_image_url.clone(), field_error: None };

    let request = match validate_fabric_analysis_input(&input) {
        Ok(request) => request,
        Err(e) => {
            warn!(field = e.field(), value = %input.fabric_image_url, "Rejected form input");
            form.field_error = Some(e.to_string());
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(render_page(&FlowState::Idle, &form)));
        }
    };

    let flow = FlowState::Idle.submit();
    let flow = match state.pipeline.run(request, &state.shutdown.child_token()).await {
        Ok(report) => flow.succeed(report),
        Err(e) => {
            error!(stage = %e.stage, error = %e, "❌ Submission failed");
            flow.fail(e.to_string(), e.analysis)
        }
    };

    (StatusCode::OK, Html(render_page(&flow, &form)))
}

pub async fn fabric_analysis_api(
    State(state): State<AppState>,
    payload: Result<Json<FabricAnalysisInput>, JsonRejection>,
) -> ApiResult<Json<FabricAnalysisResult>> {
    let Json(input) = payload.map_err(ValidationError::from)?;
    let request = validate_fabric_analysis_input(&input)?;
    let result = analyze_fabric(state.pipeline.model(), &request).await?;
    Ok(Json(result))
}

/// Validation failures answer with an empty batch carrying an error list;
/// generation failures are regular API errors.
pub async fn suit_designs_api(State(state): State<AppState>, payload: Result<Json<SuitDesignInput>, JsonRejection>) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected suit design body");
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(SuitDesignBatch::rejected(INVALID_INPUT))).into_response();
        }
    };

    let request = match validate_suit_design_input(&input) {
        Ok(request) => request,
        Err(e) => {
            warn!(field = e.field(), error = %e, "Rejected suit design input");
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(SuitDesignBatch::rejected(INVALID_INPUT))).into_response();
        }
    };

    match generate_suit_designs(state.pipeline.model(), &request).await {
        Ok(batch) => Json(batch).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn designs_api(
    State(state): State<AppState>,
    payload: Result<Json<FabricAnalysisInput>, JsonRejection>,
) -> ApiResult<Json<DesignReport>> {
    let Json(input) = payload.map_err(ValidationError::from)?;
    let request = validate_fabric_analysis_input(&input)?;
    let report = state.pipeline.run(request, &state.shutdown.child_token()).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.pipeline.model().name().to_string(),
    })
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    let Some(file) = STATIC_DIR.get_file(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let content_type = match path.rsplit('.').next() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    };
    ([(header::CONTENT_TYPE, content_type)], file.contents()).into_response()
}
