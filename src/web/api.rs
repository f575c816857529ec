use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{ApplicationDetails, Car};
use crate::services::autocomplete;
use crate::services::coerce::parse_uuid;
use crate::services::inventory_service::CarFilter;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/cars", get(list_cars))
        .route("/api/cars/:id", get(get_car))
        .route("/api/pre-approval", post(submit_pre_approval))
        .route("/api/autocomplete", get(autocomplete_suggestions))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_cars(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Car>> {
    Json(state.inventory.search(&CarFilter::from_query(&params)).await)
}

async fn get_car(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Car>> {
    let car = match parse_uuid(Some(id.as_str())) {
        Some(uuid) => state.inventory.get(uuid).await?,
        None => None,
    };
    car.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("car {}", id)))
}

async fn submit_pre_approval(
    State(state): State<AppState>,
    payload: Result<Json<ApplicationDetails>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(details) =
        payload.map_err(|e| AppError::Validation(format!("Invalid request body: {}", e.body_text())))?;

    let application = state.pre_approvals.submit(details).await?;
    Ok(Json(json!({
        "success": true,
        "reference_number": application.reference_number,
        "application": application,
    })))
}

#[derive(Debug, Deserialize)]
struct AutocompleteQuery {
    field: String,
    #[serde(default)]
    q: String,
    #[serde(default)]
    brand: String,
}

async fn autocomplete_suggestions(
    Query(query): Query<AutocompleteQuery>,
) -> AppResult<Json<Vec<&'static str>>> {
    match query.field.as_str() {
        "brand" => Ok(Json(autocomplete::suggest_brands(&query.q))),
        "model" => Ok(Json(autocomplete::suggest_models(&query.brand, &query.q))),
        other => Err(AppError::Validation(format!("unknown autocomplete field: {}", other))),
    }
}
