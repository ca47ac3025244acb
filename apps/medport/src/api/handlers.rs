//! Route handlers.
//!
//! Each handler takes the store lock for the shortest span it can: a read
//! lock for lookups, a write lock for anything that allocates an id or
//! saves a record. Store calls are synchronous, so no lock is held across
//! an `.await`.

use super::{ApiError, AppState};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::HOST};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use medport_client::HealthResponse;
use medport_core::{
    ColorId, ColorRecord, Medication, MedicationDetail, MedicationId, MedicationInput,
    MedicationPatch, MedportError, NewColor, NewMedication, NewReminder, RecordKind, Reminder,
    ReminderId,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Body of the 404 answered when a medication has no reminders.
pub const MSG_NO_REMINDERS: &str = "No reminders found for this medication.";

type Body<T> = Result<Json<T>, JsonRejection>;
type Id = Result<Path<u64>, PathRejection>;

fn body<T>(payload: Body<T>) -> Result<T, ApiError> {
    Ok(payload?.0)
}

fn id(path: Id) -> Result<u64, ApiError> {
    Ok(path?.0)
}

// =============================================================================
// SERVICE
// =============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Links to the record collections, absolute against the request's Host.
pub async fn api_root(headers: HeaderMap) -> Json<Value> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let link = |collection: &str| format!("http://{}/{}/", host, collection);

    Json(json!({
        "colors": link("colors"),
        "medications": link("medications"),
        "reminders": link("reminders"),
    }))
}

// =============================================================================
// FORM SUBMISSIONS
// =============================================================================

/// `POST /api/medications`: store a whole form submission.
pub async fn submit_medication(
    State(state): State<AppState>,
    payload: Body<MedicationInput>,
) -> Result<(StatusCode, Json<MedicationDetail>), ApiError> {
    let input = body(payload)?;
    let detail = state.store.write().await.create_from_input(&input)?;
    tracing::info!(
        medication_id = %detail.id,
        reminders = detail.reminders.len(),
        "medication created from form"
    );
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /api/medications`: every medication with its color and reminders.
pub async fn list_medication_details(
    State(state): State<AppState>,
) -> Result<Json<Vec<MedicationDetail>>, ApiError> {
    Ok(Json(state.store.read().await.medication_details()?))
}

// =============================================================================
// MEDICATIONS
// =============================================================================

pub async fn list_medications(
    State(state): State<AppState>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    Ok(Json(state.store.read().await.list_medications()?))
}

pub async fn create_medication(
    State(state): State<AppState>,
    payload: Body<NewMedication>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    let medication = state.store.write().await.create_medication(body(payload)?)?;
    tracing::info!(medication_id = %medication.id, "medication created");
    Ok((StatusCode::CREATED, Json(medication)))
}

/// The medication joined with its color and reminders.
pub async fn get_medication(
    State(state): State<AppState>,
    path: Id,
) -> Result<Json<MedicationDetail>, ApiError> {
    let id = id(path)?;
    state
        .store
        .read()
        .await
        .medication_detail(MedicationId(id))?
        .map(Json)
        .ok_or_else(|| MedportError::not_found(RecordKind::Medication, id).into())
}

pub async fn update_medication(
    State(state): State<AppState>,
    path: Id,
    payload: Body<NewMedication>,
) -> Result<Json<Medication>, ApiError> {
    let id = MedicationId(id(path)?);
    let medication = state.store.write().await.update_medication(id, body(payload)?)?;
    Ok(Json(medication))
}

pub async fn patch_medication(
    State(state): State<AppState>,
    path: Id,
    payload: Body<MedicationPatch>,
) -> Result<Json<Medication>, ApiError> {
    let id = MedicationId(id(path)?);
    let medication = state.store.write().await.patch_medication(id, body(payload)?)?;
    Ok(Json(medication))
}

pub async fn delete_medication(
    State(state): State<AppState>,
    path: Id,
) -> Result<StatusCode, ApiError> {
    let id = MedicationId(id(path)?);
    state.store.write().await.delete_medication(id)?;
    tracing::info!(medication_id = %id, "medication deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// COLORS
// =============================================================================

pub async fn list_colors(State(state): State<AppState>) -> Result<Json<Vec<ColorRecord>>, ApiError> {
    Ok(Json(state.store.read().await.list_colors()?))
}

pub async fn create_color(
    State(state): State<AppState>,
    payload: Body<NewColor>,
) -> Result<(StatusCode, Json<ColorRecord>), ApiError> {
    let color = state.store.write().await.create_color(body(payload)?)?;
    tracing::info!(color_id = %color.id, hex = %color.hex, "color created");
    Ok((StatusCode::CREATED, Json(color)))
}

pub async fn get_color(State(state): State<AppState>, path: Id) -> Result<Json<ColorRecord>, ApiError> {
    let id = id(path)?;
    state
        .store
        .read()
        .await
        .load_color(ColorId(id))?
        .map(Json)
        .ok_or_else(|| MedportError::not_found(RecordKind::Color, id).into())
}

pub async fn update_color(
    State(state): State<AppState>,
    path: Id,
    payload: Body<NewColor>,
) -> Result<Json<ColorRecord>, ApiError> {
    let id = ColorId(id(path)?);
    let color = state.store.write().await.update_color(id, body(payload)?)?;
    Ok(Json(color))
}

pub async fn delete_color(State(state): State<AppState>, path: Id) -> Result<StatusCode, ApiError> {
    let id = ColorId(id(path)?);
    state.store.write().await.delete_color(id)?;
    tracing::info!(color_id = %id, "color deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// REMINDERS
// =============================================================================

pub async fn list_reminders(State(state): State<AppState>) -> Result<Json<Vec<Reminder>>, ApiError> {
    Ok(Json(state.store.read().await.list_reminders()?))
}

pub async fn create_reminder(
    State(state): State<AppState>,
    payload: Body<NewReminder>,
) -> Result<(StatusCode, Json<Reminder>), ApiError> {
    let reminder = state.store.write().await.create_reminder(body(payload)?)?;
    tracing::info!(
        reminder_id = %reminder.id,
        medication_id = %reminder.medication_id,
        "reminder created"
    );
    Ok((StatusCode::CREATED, Json(reminder)))
}

pub async fn get_reminder(State(state): State<AppState>, path: Id) -> Result<Json<Reminder>, ApiError> {
    let id = id(path)?;
    state
        .store
        .read()
        .await
        .load_reminder(ReminderId(id))?
        .map(Json)
        .ok_or_else(|| MedportError::not_found(RecordKind::Reminder, id).into())
}

pub async fn update_reminder(
    State(state): State<AppState>,
    path: Id,
    payload: Body<NewReminder>,
) -> Result<Json<Reminder>, ApiError> {
    let id = ReminderId(id(path)?);
    let reminder = state.store.write().await.update_reminder(id, body(payload)?)?;
    Ok(Json(reminder))
}

pub async fn delete_reminder(State(state): State<AppState>, path: Id) -> Result<StatusCode, ApiError> {
    let id = ReminderId(id(path)?);
    state.store.write().await.delete_reminder(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /reminders/by-medication/{id}`; an empty result is a 404.
pub async fn reminders_by_medication(
    State(state): State<AppState>,
    path: Id,
) -> Result<Response, ApiError> {
    let id = MedicationId(id(path)?);
    let reminders = state.store.read().await.reminders_for(id)?;
    if reminders.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": MSG_NO_REMINDERS })),
        )
            .into_response());
    }
    Ok(Json(reminders).into_response())
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    /// Local time to check against; defaults to now.
    pub at: Option<NaiveDateTime>,
}

/// `GET /reminders/due[?at=YYYY-MM-DDTHH:MM:SS]`
pub async fn due_reminders(
    State(state): State<AppState>,
    query: Result<Query<DueQuery>, QueryRejection>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    let Query(query) = query?;
    let now = query
        .at
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    Ok(Json(state.store.read().await.due_reminders(now)?))
}
