//! JSON REST API for Wrench.
//!
//! Exposes an axum [`Router`] backed by any
//! [`wrench_core::store::MaintenanceStore`]. Authentication is the caller's
//! responsibility: every handler expects the acting [`UserId`] as a request
//! extension.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", wrench_api::api_router(store.clone(), cache.clone()))
//! ```

pub mod catalog;
pub mod error;
pub mod extract;
pub mod items;
pub mod reminders;
pub mod services;
pub mod vehicles;

use std::{future::Future, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::{Serialize, de::DeserializeOwned};
use wrench_core::{
  UserId,
  cache::{Mutation, QueryCache, Scope},
  store::MaintenanceStore,
};

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through all API handlers.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub cache: Arc<QueryCache>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone(), cache: self.cache.clone() } }
}

impl<S: MaintenanceStore> ApiState<S> {
  /// Serve `scope` from the cache, or run `load` and remember its result.
  async fn read_through<T, Fut>(
    &self,
    owner: &UserId,
    scope: Scope,
    load: impl FnOnce() -> Fut,
  ) -> Result<T, ApiError>
  where
    T: Serialize + DeserializeOwned,
    Fut: Future<Output = Result<T, S::Error>>,
  {
    if let Some(hit) = self.cache.get(owner, scope) {
      return Ok(hit);
    }
    let seen = self.cache.generation(owner);
    let value = load().await.map_err(ApiError::from_store)?;
    if !self.cache.put(owner, scope, seen, &value) {
      tracing::trace!(?scope, "read not cached");
    }
    Ok(value)
  }

  fn invalidate(&self, owner: &UserId, mutation: Mutation) {
    let dropped = self.cache.invalidate(owner, &mutation);
    tracing::trace!(?mutation, dropped, "cache invalidated");
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, cache: Arc<QueryCache>) -> Router<()>
where
  S: MaintenanceStore + 'static,
{
  Router::new()
    // Vehicles
    .route("/vehicles", get(vehicles::list::<S>).post(vehicles::create::<S>))
    .route(
      "/vehicles/{id}",
      get(vehicles::get_one::<S>)
        .put(vehicles::update::<S>)
        .patch(vehicles::update::<S>)
        .delete(vehicles::delete_one::<S>),
    )
    // Service events
    .route(
      "/vehicles/{id}/services",
      get(services::list::<S>).post(services::create::<S>),
    )
    .route(
      "/services/{id}",
      get(services::get_one::<S>)
        .put(services::update::<S>)
        .patch(services::update::<S>)
        .delete(services::delete_one::<S>),
    )
    // Service items
    .route("/services/{id}/items", get(items::list::<S>).post(items::create::<S>))
    .route(
      "/items/{id}",
      get(items::get_one::<S>)
        .put(items::update::<S>)
        .patch(items::update::<S>)
        .delete(items::delete_one::<S>),
    )
    // Reminders
    .route(
      "/vehicles/{id}/reminders",
      get(reminders::list::<S>).post(reminders::create::<S>),
    )
    .route("/reminders/due", get(reminders::due::<S>))
    .route(
      "/reminders/{id}",
      get(reminders::get_one::<S>)
        .put(reminders::update::<S>)
        .patch(reminders::update::<S>)
        .delete(reminders::delete_one::<S>),
    )
    .route("/reminders/{id}/complete", post(reminders::complete::<S>))
    // Catalog
    .route("/service-types", get(catalog::list))
    .with_state(ApiState { store, cache })
}

#[cfg(test)]
mod tests;
