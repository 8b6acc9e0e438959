//! Handlers for `/vehicles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/vehicles` | Caller's vehicles, newest first |
//! | `POST` | `/vehicles` | Body: [`NewVehicle`]; returns 201 |
//! | `GET`  | `/vehicles/{id}` | |
//! | `PUT` / `PATCH` | `/vehicles/{id}` | Body: [`VehiclePatch`]; `null` clears |
//! | `DELETE` | `/vehicles/{id}` | Cascades to events, items and reminders; 204 |

use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use wrench_core::{
  UserId,
  cache::{Mutation, Scope},
  store::MaintenanceStore,
  vehicle::{NewVehicle, Vehicle, VehiclePatch},
};

use crate::{ApiState, error::ApiError, extract::{Json, Path}};

/// `GET /vehicles`
pub async fn list<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
) -> Result<Json<Vec<Vehicle>>, ApiError> {
  let vehicles = state
    .read_through(&actor, Scope::Vehicles, || state.store.list_vehicles(&actor))
    .await?;
  Ok(Json(vehicles))
}

/// `POST /vehicles`
pub async fn create<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Json(body): Json<NewVehicle>,
) -> Result<impl IntoResponse, ApiError> {
  let vehicle = state
    .store
    .create_vehicle(&actor, body)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::Vehicle { vehicle_id: vehicle.vehicle_id });
  Ok((StatusCode::CREATED, Json(vehicle)))
}

/// `GET /vehicles/{id}`
pub async fn get_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, ApiError> {
  let vehicle = state
    .read_through(&actor, Scope::Vehicle(id), || state.store.get_vehicle(&actor, id))
    .await?;
  Ok(Json(vehicle))
}

/// `PUT /vehicles/{id}` and `PATCH /vehicles/{id}`; both apply only the
/// fields present in the body.
pub async fn update<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
  Json(patch): Json<VehiclePatch>,
) -> Result<Json<Vehicle>, ApiError> {
  let vehicle = state
    .store
    .update_vehicle(&actor, id, patch)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::Vehicle { vehicle_id: id });
  Ok(Json(vehicle))
}

/// `DELETE /vehicles/{id}`
pub async fn delete_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_vehicle(&actor, id)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::VehicleDeleted { vehicle_id: id });
  Ok(StatusCode::NO_CONTENT)
}
