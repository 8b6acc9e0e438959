//! Handlers for service events.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/vehicles/{id}/services` | Newest date first |
//! | `POST` | `/vehicles/{id}/services` | Body: [`NewServiceEvent`], optional inline `items`; 201 |
//! | `GET`  | `/services/{id}` | |
//! | `PUT` / `PATCH` | `/services/{id}` | Body: [`ServiceEventPatch`] |
//! | `DELETE` | `/services/{id}` | Removes the event's items too; 204 |

use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use wrench_core::{
  UserId,
  cache::{Mutation, Scope},
  service::{NewServiceEvent, ServiceEvent, ServiceEventPatch},
  store::MaintenanceStore,
};

use crate::{ApiState, error::ApiError, extract::{Json, Path}};

/// `GET /vehicles/{id}/services`
pub async fn list<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(vehicle_id): Path<Uuid>,
) -> Result<Json<Vec<ServiceEvent>>, ApiError> {
  let events = state
    .read_through(&actor, Scope::ServiceEvents(vehicle_id), || {
      state.store.list_service_events(&actor, vehicle_id)
    })
    .await?;
  Ok(Json(events))
}

/// `POST /vehicles/{id}/services`
pub async fn create<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(vehicle_id): Path<Uuid>,
  Json(body): Json<NewServiceEvent>,
) -> Result<impl IntoResponse, ApiError> {
  let event = state
    .store
    .create_service_event(&actor, vehicle_id, body)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::ServiceEvent { vehicle_id, event_id: event.event_id });
  Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /services/{id}`
pub async fn get_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<Json<ServiceEvent>, ApiError> {
  let event = state
    .read_through(&actor, Scope::ServiceEvent(id), || state.store.get_service_event(&actor, id))
    .await?;
  Ok(Json(event))
}

/// `PUT /services/{id}` and `PATCH /services/{id}`
pub async fn update<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ServiceEventPatch>,
) -> Result<Json<ServiceEvent>, ApiError> {
  let event = state
    .store
    .update_service_event(&actor, id, patch)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::ServiceEvent {
    vehicle_id: event.vehicle_id,
    event_id:   id,
  });
  Ok(Json(event))
}

/// `DELETE /services/{id}`
pub async fn delete_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let event = state
    .store
    .delete_service_event(&actor, id)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::ServiceEventDeleted {
    vehicle_id: event.vehicle_id,
    event_id:   id,
  });
  Ok(StatusCode::NO_CONTENT)
}
