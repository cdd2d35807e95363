use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use dops_service::{Error as ServiceError, PipelineRun, RunRequest, SearchRequest, SearchResponse};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/incidents/run", post(run_incident))
		.route("/v1/evidence/search", post(search_evidence))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn run_incident(
	State(state): State<AppState>,
	payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<PipelineRun>, ApiError> {
	let Json(payload) = payload?;
	let run = state.service.run(payload).await?;

	Ok(Json(run))
}

async fn search_evidence(
	State(state): State<AppState>,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Json(payload) = payload?;
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::Configuration { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "configuration", message),
			ServiceError::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "provider", message),
			ServiceError::MissingResource { message } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "missing_resource", message),
		}
	}
}
impl From<JsonRejection> for ApiError {
	fn from(err: JsonRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", err.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}
