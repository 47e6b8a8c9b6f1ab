//! JSON API.
//!
//! Endpoints (nested under `/api`):
//!
//! - `GET  /status`            — Controller status and run progress
//! - `GET  /kit`               — Current reference kit
//! - `POST /kit`               — Replace the reference kit
//! - `GET  /shulker-items`     — The 27-slot kit layout
//! - `POST /shulker-items`     — Submit a 27-slot layout (sets the kit)
//! - `POST /sequence`          — Start a full run in the background
//! - `POST /cancel`            — Cancel the operation in flight
//! - `POST /scan`              — Rebuild the location index
//! - `POST /read-reference`    — Load the kit from the reference container
//! - `POST /acquire`           — Place a working source for one item
//! - `GET  /items`             — Full item catalogue
//! - `GET  /available-items`   — Item types present in the index
//! - `GET  /events`            — WebSocket stream of run events
//! - `GET  /logs`              — SSE stream of run events

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use kitsmith_core::{ItemInfo, StageError, StageReport, Status};
use kitsmith_workflow::{ControllerStatus, KIT_SLOTS, ReferenceKit};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SharedState;
use crate::events;

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/status", get(status_handler))
        .route("/kit", get(get_kit_handler).post(set_kit_handler))
        .route(
            "/shulker-items",
            get(get_layout_handler).post(set_layout_handler),
        )
        .route("/sequence", post(start_sequence_handler))
        .route("/cancel", post(cancel_handler))
        .route("/scan", post(scan_handler))
        .route("/read-reference", post(read_reference_handler))
        .route("/acquire", post(acquire_handler))
        .route("/items", get(items_handler))
        .route("/available-items", get(available_items_handler))
        .route("/events", get(events::ws_handler))
        .route("/logs", get(events::sse_handler))
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn stage_error(e: StageError) -> ApiError {
    let status = match &e {
        StageError::Busy => StatusCode::CONFLICT,
        StageError::Index(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    status: ControllerStatus,
    uptime_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KitBody {
    pub items: Vec<String>,
}

/// One slot of a submitted layout: a bare item name, or an item object
/// from the catalogue (only `name` is read).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlotEntry {
    Name(String),
    Item { name: String },
}

impl SlotEntry {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Item { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LayoutRequest {
    items: Vec<Option<SlotEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub success: bool,
    pub items: Vec<Option<String>>,
    pub kit: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SequenceStarted {
    pub success: bool,
    pub run_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// A stage report with its rendered status line.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
    pub report: StageReport,
}

impl From<StageReport> for ReportResponse {
    fn from(report: StageReport) -> Self {
        Self {
            success: report.status != Status::Failure,
            message: report.to_string(),
            report,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AcquireRequest {
    item: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub stack_size: u32,
}

impl From<ItemInfo> for ItemDto {
    fn from(info: ItemInfo) -> Self {
        Self {
            id: info.id.0,
            display_name: info.label(),
            name: info.name,
            stack_size: info.stack_size,
        }
    }
}

fn sorted_items(items: Vec<ItemInfo>) -> Vec<ItemDto> {
    let mut dtos: Vec<ItemDto> = items.into_iter().map(ItemDto::from).collect();
    dtos.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    dtos
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.controller.status().await,
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

async fn get_kit_handler(State(state): State<SharedState>) -> Result<Json<KitBody>, ApiError> {
    let kit = state.controller.kit().await.map_err(stage_error)?;
    Ok(Json(KitBody {
        items: kit.items().to_vec(),
    }))
}

async fn set_kit_handler(
    State(state): State<SharedState>,
    Json(req): Json<KitBody>,
) -> Result<Json<KitBody>, ApiError> {
    let kit = state
        .controller
        .set_kit(req.items)
        .await
        .map_err(stage_error)?;
    info!(items = kit.len(), "Reference kit set over HTTP");
    Ok(Json(KitBody {
        items: kit.items().to_vec(),
    }))
}

async fn get_layout_handler(State(state): State<SharedState>) -> Json<Vec<Option<String>>> {
    Json(state.layout.read().await.clone())
}

async fn set_layout_handler(
    State(state): State<SharedState>,
    Json(req): Json<LayoutRequest>,
) -> Result<Json<LayoutResponse>, ApiError> {
    if req.items.len() != KIT_SLOTS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Expected exactly {KIT_SLOTS} slots, got {}", req.items.len()),
        ));
    }

    let layout: Vec<Option<String>> = req
        .items
        .into_iter()
        .map(|slot| slot.map(SlotEntry::into_name))
        .collect();
    let kit = ReferenceKit::from_slots(layout.iter().cloned());
    let kit = state
        .controller
        .set_kit(kit.items().to_vec())
        .await
        .map_err(stage_error)?;
    *state.layout.write().await = layout.clone();

    info!(items = kit.len(), "Kit layout updated");
    Ok(Json(LayoutResponse {
        success: true,
        items: layout,
        kit: kit.items().to_vec(),
    }))
}

/// Start a run and answer immediately; the outcome arrives on the event
/// stream as `sequence-completed` or `sequence-error`.
async fn start_sequence_handler(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<SequenceStarted>), ApiError> {
    let run_id = state.controller.start_sequence().map_err(stage_error)?;
    info!(run_id = %run_id, "Sequence started over HTTP");
    Ok((
        StatusCode::ACCEPTED,
        Json(SequenceStarted {
            success: true,
            run_id,
            message: "Sequence started".into(),
        }),
    ))
}

async fn cancel_handler(State(state): State<SharedState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.controller.cancel(),
    })
}

async fn scan_handler(State(state): State<SharedState>) -> Result<Json<ReportResponse>, ApiError> {
    let report = state.controller.scan().await.map_err(stage_error)?;
    Ok(Json(report.into()))
}

async fn read_reference_handler(
    State(state): State<SharedState>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .controller
        .read_reference()
        .await
        .map_err(stage_error)?;
    Ok(Json(report.into()))
}

async fn acquire_handler(
    State(state): State<SharedState>,
    Json(req): Json<AcquireRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let item = req.item.trim();
    if item.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Item name is required"));
    }
    let report = state.controller.acquire(item).await.map_err(stage_error)?;
    Ok(Json(report.into()))
}

async fn items_handler(State(state): State<SharedState>) -> Json<Vec<ItemDto>> {
    Json(sorted_items(state.controller.items()))
}

async fn available_items_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ItemDto>>, ApiError> {
    let items = state
        .controller
        .available_items()
        .await
        .map_err(stage_error)?;
    Ok(Json(sorted_items(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use kitsmith_config::AppConfig;
    use kitsmith_core::{ItemId, Position};
    use kitsmith_index::{InMemoryStore, LocationIndex};
    use kitsmith_sim::SimWorld;
    use kitsmith_workflow::{Controller, Session};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn controller(world: SimWorld, index: LocationIndex) -> Controller {
        Controller::new(Session::new(
            Arc::new(world),
            Arc::new(InMemoryStore::with_index(index)),
            AppConfig::default(),
        ))
    }

    fn app(controller: Controller) -> Router {
        build_router(Arc::new(GatewayState::new(controller)))
    }

    fn default_app() -> Router {
        let world = SimWorld::builder().actor_at(Position::new(0, 64, 0)).build();
        app(controller(world, LocationIndex::new()))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn kit_round_trip() {
        let app = default_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/kit",
                serde_json::json!({ "items": ["golden_apple", "ender_pearl"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/api/kit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["items"], serde_json::json!(["golden_apple", "ender_pearl"]));
    }

    #[tokio::test]
    async fn layout_requires_27_slots() {
        let app = default_app();
        let response = app
            .oneshot(post_json(
                "/api/shulker-items",
                serde_json::json!({ "items": ["golden_apple"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["error"], "Expected exactly 27 slots, got 1");
    }

    #[tokio::test]
    async fn layout_drops_empty_slots_and_sets_kit() {
        let app = default_app();

        let mut slots = vec![serde_json::Value::Null; KIT_SLOTS];
        slots[3] = serde_json::json!({ "id": 11, "name": "ender_pearl", "displayName": "Ender Pearl" });
        slots[0] = serde_json::json!("golden_apple");
        slots[26] = serde_json::json!("arrow");

        let response = app
            .clone()
            .oneshot(post_json("/api/shulker-items", serde_json::json!({ "items": slots })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["kit"], serde_json::json!(["golden_apple", "ender_pearl", "arrow"]));

        let layout = json(app.clone().oneshot(get("/api/shulker-items")).await.unwrap()).await;
        assert_eq!(layout.as_array().unwrap().len(), KIT_SLOTS);
        assert_eq!(layout[3], "ender_pearl");
        assert!(layout[1].is_null());

        let kit = json(app.oneshot(get("/api/kit")).await.unwrap()).await;
        assert_eq!(kit["items"], serde_json::json!(["golden_apple", "ender_pearl", "arrow"]));
    }

    #[tokio::test]
    async fn second_sequence_start_conflicts() {
        let world = SimWorld::builder().actor_at(Position::new(0, 64, 0)).build();
        // The reference read blocks, keeping the first run in flight
        world.hang_opens(Position::ORIGIN).await;
        let app = app(controller(world, LocationIndex::new()));

        let response = app.clone().oneshot(post_json("/api/sequence", serde_json::json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json(response).await;
        assert!(!body["run_id"].as_str().unwrap().is_empty());

        let response = app.clone().oneshot(post_json("/api/sequence", serde_json::json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json(response).await;
        assert_eq!(body["error"], "A run is already in progress");

        let status = json(app.clone().oneshot(get("/api/status")).await.unwrap()).await;
        assert_eq!(status["busy"], true);

        let response = app.oneshot(post_json("/api/cancel", serde_json::json!({}))).await.unwrap();
        assert_eq!(json(response).await["cancelled"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_returns_failure_report() {
        let app = default_app();
        let response = app.oneshot(post_json("/api/scan", serde_json::json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error: No chests found within 64 blocks.");
        assert_eq!(body["report"]["stage"], "scan");
    }

    #[tokio::test]
    async fn acquire_rejects_blank_item() {
        let app = default_app();
        let response = app
            .oneshot(post_json("/api/acquire", serde_json::json!({ "item": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn acquire_unknown_item_reports_failure() {
        let app = default_app();
        let response = app
            .oneshot(post_json("/api/acquire", serde_json::json!({ "item": "moon_rock" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error: Unknown item: moon_rock");
    }

    #[tokio::test]
    async fn available_items_come_from_the_index() {
        let mut index = LocationIndex::new();
        index.record(Position::new(10, 64, 10), [ItemId(10), ItemId(11)]);
        let app = app(controller(SimWorld::builder().build(), index));

        let body = json(app.clone().oneshot(get("/api/available-items")).await.unwrap()).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ender_pearl", "golden_apple"]);
        assert_eq!(body[0]["stackSize"], 16);

        let all = json(app.oneshot(get("/api/items")).await.unwrap()).await;
        assert!(all.as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn events_route_requires_upgrade() {
        let app = default_app();
        let response = app.oneshot(get("/api/events")).await.unwrap();
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
        assert_ne!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logs_stream_is_sse() {
        let app = default_app();
        let response = app.oneshot(get("/api/logs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(content_type.contains("text/event-stream"));
    }
}
