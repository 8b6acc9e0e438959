//! Handlers for reminders.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/vehicles/{id}/reminders` | Soonest due first |
//! | `POST` | `/vehicles/{id}/reminders` | Body: [`NewReminder`]; 201 |
//! | `GET`  | `/reminders/{id}` | |
//! | `PUT` / `PATCH` | `/reminders/{id}` | Body: [`ReminderPatch`] |
//! | `DELETE` | `/reminders/{id}` | 204 |
//! | `POST` | `/reminders/{id}/complete` | Schedules the successor of a recurring reminder |
//! | `GET`  | `/reminders/due` | Optional `?today=YYYY-MM-DD`, defaults to the current UTC date |

use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use wrench_core::{
  UserId,
  cache::{Mutation, Scope},
  reminder::{DueReminder, NewReminder, Reminder, ReminderCompletion, ReminderPatch},
  store::MaintenanceStore,
};

use crate::{ApiState, error::ApiError, extract::{Json, Path, Query}};

// ─── CRUD ────────────────────────────────────────────────────────────────────

/// `GET /vehicles/{id}/reminders`
pub async fn list<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
  let reminders = state
    .read_through(&actor, Scope::Reminders(vehicle_id), || {
      state.store.list_reminders(&actor, vehicle_id)
    })
    .await?;
  Ok(Json(reminders))
}

/// `POST /vehicles/{id}/reminders`
pub async fn create<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(vehicle_id): Path<Uuid>,
  Json(body): Json<NewReminder>,
) -> Result<impl IntoResponse, ApiError> {
  let reminder = state
    .store
    .create_reminder(&actor, vehicle_id, body)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::Reminder {
    vehicle_id,
    reminder_id: reminder.reminder_id,
  });
  Ok((StatusCode::CREATED, Json(reminder)))
}

/// `GET /reminders/{id}`
pub async fn get_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Reminder>, ApiError> {
  let reminder = state
    .read_through(&actor, Scope::Reminder(id), || state.store.get_reminder(&actor, id))
    .await?;
  Ok(Json(reminder))
}

/// `PUT /reminders/{id}` and `PATCH /reminders/{id}`
pub async fn update<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ReminderPatch>,
) -> Result<Json<Reminder>, ApiError> {
  let reminder = state
    .store
    .update_reminder(&actor, id, patch)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::Reminder { vehicle_id: reminder.vehicle_id, reminder_id: id });
  Ok(Json(reminder))
}

/// `DELETE /reminders/{id}`
pub async fn delete_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let reminder = state
    .store
    .delete_reminder(&actor, id)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::Reminder { vehicle_id: reminder.vehicle_id, reminder_id: id });
  Ok(StatusCode::NO_CONTENT)
}

// ─── Completion ──────────────────────────────────────────────────────────────

/// `POST /reminders/{id}/complete`
pub async fn complete<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<Json<ReminderCompletion>, ApiError> {
  let completion = state
    .store
    .complete_reminder(&actor, id, Utc::now().date_naive())
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::Reminder {
    vehicle_id:  completion.completed.vehicle_id,
    reminder_id: id,
  });
  Ok(Json(completion))
}

// ─── Due ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DueParams {
  pub today: Option<NaiveDate>,
}

/// `GET /reminders/due[?today=YYYY-MM-DD]`
///
/// Only the default (current date) view is cached; an explicit `today` always
/// reads through to the store.
pub async fn due<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Query(params): Query<DueParams>,
) -> Result<Json<Vec<DueReminder>>, ApiError> {
  let due = match params.today {
    Some(today) => state
      .store
      .due_reminders(&actor, today)
      .await
      .map_err(ApiError::from_store)?,
    None => {
      let today = Utc::now().date_naive();
      state
        .read_through(&actor, Scope::DueReminders, || state.store.due_reminders(&actor, today))
        .await?
    }
  };
  Ok(Json(due))
}
