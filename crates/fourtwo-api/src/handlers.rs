//! API Handlers
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fourtwo_core::{
    apply_failures, create_initial_context, flatten_log, run_pipeline, FailureConfig, Stage,
    SupportingSystem, ENGINE_VERSION,
};
use fourtwo_registry::{StageSelection, Unresolved};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub block_ids: StageSelection,
    #[serde(default)]
    pub fixture_id: Option<String>,
    #[serde(default)]
    pub failure_config: FailureConfig,
}

/// Resolve every identifier up front; the runner only sees complete pipelines.
pub async fn simulate(
    State(state): State<AppState>,
    Json(request): Json<SimulateRequest>,
) -> (StatusCode, Json<Value>) {
    let mut unresolved = Vec::new();

    let config = match state.blocks.resolve(&request.block_ids) {
        Ok(config) => Some(config),
        Err(errors) => {
            unresolved.extend(errors);
            None
        }
    };

    let fixture_id = request.fixture_id.as_deref().map(str::trim).unwrap_or("");
    let fixture = if fixture_id.is_empty() {
        unresolved.push(Unresolved::new("fixtureId", None, "no fixture selected"));
        None
    } else {
        let found = state.fixtures.get(fixture_id);
        if found.is_none() {
            unresolved.push(Unresolved::new("fixtureId", Some(fixture_id), "unknown fixture"));
        }
        found
    };

    let (Some(config), Some(fixture)) = (config, fixture) else {
        tracing::info!(count = unresolved.len(), "simulation request rejected");
        state.metrics.record_rejected();
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid simulation request",
                "unresolved": unresolved,
            })),
        );
    };

    let mut ctx = create_initial_context(fixture.input.clone());
    if !request.failure_config.is_empty() {
        ctx = apply_failures(&ctx, &request.failure_config);
    }
    let ctx = run_pipeline(&config, ctx).await;
    state.metrics.record_run(ctx.success);

    (
        StatusCode::OK,
        Json(json!({
            "runId": ctx.run_id,
            "sessionId": request.session_id,
            "fixtureId": fixture.id,
            "pipeline": config.pipeline_id(),
            "success": ctx.success,
            "steps": flatten_log(&ctx.log),
            "state": Value::Object(ctx.state.clone()),
            "digest": ctx.trace_digest(),
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct BlocksQuery {
    pub stage: Option<String>,
}

pub async fn list_blocks(
    State(state): State<AppState>,
    Query(query): Query<BlocksQuery>,
) -> (StatusCode, Json<Value>) {
    let stage = match query.stage.as_deref().map(str::parse::<Stage>).transpose() {
        Ok(stage) => stage,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
        }
    };

    let supporting: Vec<Value> = SupportingSystem::SUPPORTING
        .iter()
        .map(|system| json!({ "id": system, "description": system.description() }))
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "stages": Stage::ALL,
            "supporting": supporting,
            "blocks": state.blocks.info(stage),
        })),
    )
}

pub async fn list_fixtures(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "fixtures": state.fixtures.list() })),
    )
}

pub async fn get_fixture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.fixtures.get(&id) {
        Some(fixture) => (StatusCode::OK, Json(json!(fixture))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Fixture not found", "id": id })),
        ),
    }
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": ENGINE_VERSION })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
