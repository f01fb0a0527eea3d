//! JSON API over the orchestrator, inventory, alerts and weather risk.
//!
//! - `GET  /`                           service status
//! - `POST /query`                      route a question to an agent
//! - `GET  /api/products`               inventory with stock status
//! - `GET  /api/products/{id}`          one product by id, sku or name
//! - `PUT  /api/products/{id}/stock`    replace the stock level
//! - `GET  /api/alerts`                 active alerts, newest first
//! - `GET  /api/alerts/summary`         active alerts grouped by severity
//! - `POST /api/alerts/check`           run an alert scan now
//! - `POST /api/alerts/{id}/resolve`    mark an alert resolved
//! - `GET  /api/weather/{location}/risk` logistics risk for a location

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use guardian_agent::agents::ops::{self, ProductStatusView};
use guardian_agent::{ActionOrigin, AgentContext, Orchestrator, ToolError};
use guardian_alerting::{AlertService, AlertSummary, CheckReport};
use guardian_core::domain::alert::{Alert, AlertId};
use guardian_core::domain::weather::LogisticsRisk;
use guardian_core::errors::{ApplicationError, DomainError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub const SERVICE_NAME: &str = "Supply Chain Guardian";

#[derive(Clone)]
pub struct ApiState {
    pub context: Arc<AgentContext>,
    pub orchestrator: Arc<Orchestrator>,
    pub alerts: Arc<AlertService>,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub mode: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub agent: &'static str,
    pub routing: &'static str,
    pub response: String,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub new_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

/// Interface error rendered as a JSON body with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn not_found(what: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::NotFound {
            message: what.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_string(),
        })
    }

    fn from_application(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        Self(error.into().into_interface(correlation_id))
    }

    fn from_tool(error: ToolError, correlation_id: &str) -> Self {
        match error {
            ToolError::ProductNotFound(reference) => {
                Self::not_found(format!("product not found: {reference}"), correlation_id)
            }
            ToolError::Denied { message, .. } => Self::bad_request(message, correlation_id),
            ToolError::InvalidArguments { message, .. } => {
                Self::bad_request(message, correlation_id)
            }
            ToolError::Repository(error) => Self::from_application(error, correlation_id),
            other => Self(InterfaceError::Internal {
                message: other.to_string(),
                correlation_id: correlation_id.to_string(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(
                event_name = "api.request.failed",
                correlation_id = self.0.correlation_id(),
                error = %self.0,
                "request failed"
            );
        }
        let body = ApiErrorBody {
            error: self.0.user_message(),
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(service_status))
        .route("/query", post(query))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/products/{id}/stock", put(update_stock))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/summary", get(alert_summary))
        .route("/api/alerts/check", post(check_alerts))
        .route("/api/alerts/{id}/resolve", post(resolve_alert))
        .route("/api/weather/{location}/risk", get(weather_risk))
        .with_state(state)
}

pub async fn service_status(State(state): State<ApiState>) -> Json<ServiceStatus> {
    Json(ServiceStatus { status: "running", service: SERVICE_NAME, mode: state.orchestrator.mode() })
}

pub async fn query(
    State(state): State<ApiState>,
    Json(body): Json<QueryRequest>,
) -> ApiResult<QueryResponse> {
    let correlation_id = correlation_id();
    if body.input.trim().is_empty() {
        return Err(ApiError::bad_request("input must not be empty", &correlation_id));
    }

    let reply = state
        .orchestrator
        .handle(&body.input, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    info!(
        event_name = "api.query.answered",
        correlation_id = %correlation_id,
        agent = reply.agent_label(),
        routing = reply.route.method.as_str(),
        "query answered"
    );

    Ok(Json(QueryResponse {
        agent: reply.agent_label(),
        routing: reply.route.method.as_str(),
        response: reply.text,
        correlation_id,
    }))
}

pub async fn list_products(State(state): State<ApiState>) -> ApiResult<Vec<ProductStatusView>> {
    ops::all_inventory(&state.context)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_tool(error, &correlation_id()))
}

pub async fn get_product(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<ProductStatusView> {
    ops::inventory_status(&state.context, &id)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_tool(error, &correlation_id()))
}

pub async fn update_stock(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<StockUpdateRequest>,
) -> ApiResult<ProductStatusView> {
    let correlation_id = correlation_id();
    let updated = ops::update_stock_level(&state.context, &id, body.new_stock, ActionOrigin::Operator)
        .await
        .map_err(|error| ApiError::from_tool(error, &correlation_id))?;
    Ok(Json(ProductStatusView::from(&updated)))
}

pub async fn list_alerts(State(state): State<ApiState>) -> ApiResult<Vec<Alert>> {
    state
        .alerts
        .active_alerts()
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &correlation_id()))
}

pub async fn alert_summary(State(state): State<ApiState>) -> ApiResult<AlertSummary> {
    state
        .alerts
        .summary()
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &correlation_id()))
}

pub async fn check_alerts(State(state): State<ApiState>) -> ApiResult<CheckReport> {
    state
        .alerts
        .check_and_alert(Utc::now())
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &correlation_id()))
}

pub async fn resolve_alert(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Alert> {
    let correlation_id = correlation_id();
    match state.alerts.resolve(AlertId(id), Utc::now()).await {
        Ok(Some(alert)) => Ok(Json(alert)),
        Ok(None) => Err(ApiError::not_found(format!("alert {id} not found"), &correlation_id)),
        Err(error) => Err(ApiError::from_application(error, &correlation_id)),
    }
}

pub async fn weather_risk(
    State(state): State<ApiState>,
    Path(location): Path<String>,
) -> ApiResult<LogisticsRisk> {
    if location.trim().is_empty() {
        return Err(ApiError::from_application(
            DomainError::InvariantViolation("location must not be empty".to_string()),
            &correlation_id(),
        ));
    }
    Ok(Json(state.context.weather.assess_logistics_risk(location.trim()).await))
}
