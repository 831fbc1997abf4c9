//! REST handlers for the calendar API.
//!
//! Thin translation only: decode JSON, call the store, map StoreError
//! to a status code. All routes here sit behind auth::auth_middleware,
//! so the owner arrives as a User extension. Field names are camelCase
//! to match what the dashboard scripts send.

use crate::auth::SharedState;
use crate::store::{ReviewView, StoreError, User};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn store_error(e: StoreError) -> (StatusCode, String) {
    let status = match e {
        StoreError::EmptyTopic | StoreError::RatingOutOfRange | StoreError::InvalidDateRange => {
            StatusCode::BAD_REQUEST
        }
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::DateConflict | StoreError::UsernameTaken => StatusCode::CONFLICT,
        StoreError::Storage(_) | StoreError::Decode(_) | StoreError::Encode(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

// ── Request/response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub topic_name: String,
    pub familiarity: u8,
    pub difficulty: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// The add-task form sends this as `taskColor`.
    #[serde(default, alias = "taskColor")]
    pub color: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleResponse {
    pub success: bool,
    pub task_id: Uuid,
    pub review_count: usize,
}

/// One calendar entry, shaped for the FullCalendar feed: `title` and
/// `start` are what the widget reads, the rest rides along for the
/// detail popup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub start: NaiveDate,
    pub color: String,
    pub completed: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<ReviewView> for CalendarEvent {
    fn from(view: ReviewView) -> Self {
        CalendarEvent {
            id: view.id,
            title: view.topic,
            start: view.date,
            color: view.color,
            completed: view.completed,
            start_date: view.start_date,
            end_date: view.end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEventRequest {
    pub event_id: Uuid,
    pub new_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub event_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteScheduleRequest {
    pub topic_name: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteScheduleResponse {
    pub success: bool,
    pub tasks_deleted: usize,
    pub reviews_deleted: usize,
}

// ── Handlers ───────────────────────────────────────────────────

// POST /api/tasks
pub async fn create_schedule(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<CreateScheduleResponse>), (StatusCode, String)> {
    let (task, reviews) = state
        .store
        .create_schedule(
            user.id,
            &payload.topic_name,
            payload.familiarity,
            payload.difficulty,
            payload.start_date,
            payload.end_date,
            &payload.color,
        )
        .map_err(store_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateScheduleResponse {
            success: true,
            task_id: task.id,
            review_count: reviews.len(),
        }),
    ))
}

// GET /api/events
pub async fn list_events(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<CalendarEvent>>, (StatusCode, String)> {
    let views = state.store.list_reviews(user.id).map_err(store_error)?;
    Ok(Json(views.into_iter().map(CalendarEvent::from).collect()))
}

// POST /api/move-task
pub async fn move_event(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<MoveEventRequest>,
) -> Result<Json<ActionResponse>, (StatusCode, String)> {
    state
        .store
        .move_review(user.id, payload.event_id, payload.new_date)
        .map_err(store_error)?;

    Ok(Json(ActionResponse { success: true }))
}

// POST /api/complete-task
pub async fn complete_event(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<EventRequest>,
) -> Result<Json<ActionResponse>, (StatusCode, String)> {
    state
        .store
        .complete_review(user.id, payload.event_id)
        .map_err(store_error)?;

    Ok(Json(ActionResponse { success: true }))
}

// POST /api/delete-task
pub async fn delete_event(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<EventRequest>,
) -> Result<Json<ActionResponse>, (StatusCode, String)> {
    state
        .store
        .delete_review(user.id, payload.event_id)
        .map_err(store_error)?;

    Ok(Json(ActionResponse { success: true }))
}

// POST /api/delete-schedule
pub async fn delete_schedule(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<DeleteScheduleRequest>,
) -> Result<Json<DeleteScheduleResponse>, (StatusCode, String)> {
    let (tasks_deleted, reviews_deleted) = state
        .store
        .delete_schedule(user.id, payload.topic_name.trim())
        .map_err(store_error)?;

    Ok(Json(DeleteScheduleResponse {
        success: true,
        tasks_deleted,
        reviews_deleted,
    }))
}

// GET /api/user
pub async fn current_user(
    Extension(user): Extension<User>,
) -> Json<crate::auth::UserResponse> {
    Json(crate::auth::UserResponse {
        id: user.id,
        username: user.username,
    })
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_the_add_task_form_payload() {
        // Exactly what the form script submits, taskColor included.
        let payload = r##"{
            "topicName": "Ownership",
            "familiarity": 3,
            "difficulty": 4,
            "startDate": "2024-01-01",
            "endDate": "2024-01-31",
            "taskColor": "#475569"
        }"##;

        let req: CreateScheduleRequest = serde_json::from_str(payload).unwrap();
        assert_eq!(req.topic_name, "Ownership");
        assert_eq!(req.color, "#475569");

        // Newer clients may send the plain field name instead.
        let req: CreateScheduleRequest =
            serde_json::from_str(r##"{"topicName":"T","familiarity":1,"difficulty":1,"startDate":"2024-01-01","endDate":"2024-01-02","color":"#fff"}"##)
                .unwrap();
        assert_eq!(req.color, "#fff");
    }

    #[test]
    fn move_request_ignores_legacy_extras() {
        // The dashboard also sends topicName and originalDate; only the
        // id and target date matter.
        let payload = r#"{
            "eventId": "7f1f4132-6a3b-4a0e-9c3e-2e1b5d3f8a00",
            "topicName": "Ownership",
            "originalDate": "2024-01-04",
            "newDate": "2024-02-10"
        }"#;

        let req: MoveEventRequest = serde_json::from_str(payload).unwrap();
        assert_eq!(req.new_date, chrono::NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
    }
}
