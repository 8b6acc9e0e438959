//! Handlers for service items. Every write recomputes the owning event's
//! total before responding.

use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use wrench_core::{
  UserId,
  cache::{Mutation, Scope},
  service::{NewServiceItem, ServiceItem, ServiceItemPatch},
  store::MaintenanceStore,
};

use crate::{ApiState, error::ApiError, extract::{Json, Path}};

/// `GET /services/{id}/items`
pub async fn list<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<ServiceItem>>, ApiError> {
  let items = state
    .read_through(&actor, Scope::ServiceItems(event_id), || {
      state.store.list_service_items(&actor, event_id)
    })
    .await?;
  Ok(Json(items))
}

/// `POST /services/{id}/items`
pub async fn create<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(event_id): Path<Uuid>,
  Json(body): Json<NewServiceItem>,
) -> Result<impl IntoResponse, ApiError> {
  let item = state
    .store
    .create_service_item(&actor, event_id, body)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::ServiceItem { event_id, item_id: item.item_id });
  Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /items/{id}`
pub async fn get_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<Json<ServiceItem>, ApiError> {
  let item = state
    .read_through(&actor, Scope::ServiceItem(id), || state.store.get_service_item(&actor, id))
    .await?;
  Ok(Json(item))
}

/// `PUT /items/{id}` and `PATCH /items/{id}`
pub async fn update<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ServiceItemPatch>,
) -> Result<Json<ServiceItem>, ApiError> {
  let item = state
    .store
    .update_service_item(&actor, id, patch)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::ServiceItem { event_id: item.event_id, item_id: id });
  Ok(Json(item))
}

/// `DELETE /items/{id}`
pub async fn delete_one<S: MaintenanceStore>(
  State(state): State<ApiState<S>>,
  Extension(actor): Extension<UserId>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let item = state
    .store
    .delete_service_item(&actor, id)
    .await
    .map_err(ApiError::from_store)?;
  state.invalidate(&actor, Mutation::ServiceItem { event_id: item.event_id, item_id: id });
  Ok(StatusCode::NO_CONTENT)
}
