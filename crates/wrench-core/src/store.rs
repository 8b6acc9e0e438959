//! The `MaintenanceStore` trait.
//!
//! Implemented by storage backends (e.g. `wrench-store-sqlite`). The API
//! layer depends on this abstraction, not on any concrete backend.
//!
//! Every operation takes the acting user. Single-record operations and lists
//! scoped under a parent run the ownership guard first; see
//! [`crate::guard::authorize`].

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  UserId,
  derived::ReconcileReport,
  reminder::{DueReminder, NewReminder, Reminder, ReminderCompletion, ReminderPatch},
  service::{
    NewServiceEvent, NewServiceItem, ServiceEvent, ServiceEventPatch, ServiceItem,
    ServiceItemPatch,
  },
  vehicle::{NewVehicle, Vehicle, VehiclePatch},
};

/// What a vehicle delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
  pub vehicle_id:     Uuid,
  pub service_events: usize,
  pub service_items:  usize,
  pub reminders:      usize,
}

/// Abstraction over a maintenance-log backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MaintenanceStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Vehicles ──────────────────────────────────────────────────────────

  /// Vehicles owned by `owner`, newest first.
  fn list_vehicles<'a>(
    &'a self,
    owner: &'a UserId,
  ) -> impl Future<Output = Result<Vec<Vehicle>, Self::Error>> + Send + 'a;

  fn get_vehicle<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
  ) -> impl Future<Output = Result<Vehicle, Self::Error>> + Send + 'a;

  /// Fails with a conflict when the normalized VIN or license plate is
  /// already used by another vehicle of the same owner.
  fn create_vehicle<'a>(
    &'a self,
    owner: &'a UserId,
    input: NewVehicle,
  ) -> impl Future<Output = Result<Vehicle, Self::Error>> + Send + 'a;

  fn update_vehicle<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
    patch: VehiclePatch,
  ) -> impl Future<Output = Result<Vehicle, Self::Error>> + Send + 'a;

  /// Delete the vehicle and, atomically, everything beneath it.
  fn delete_vehicle<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
  ) -> impl Future<Output = Result<CascadeSummary, Self::Error>> + Send + 'a;

  // ── Service events ────────────────────────────────────────────────────

  /// Events of a vehicle ordered by service date, latest first.
  fn list_service_events<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ServiceEvent>, Self::Error>> + Send + 'a;

  fn get_service_event<'a>(
    &'a self,
    owner: &'a UserId,
    event_id: Uuid,
  ) -> impl Future<Output = Result<ServiceEvent, Self::Error>> + Send + 'a;

  /// Log a visit, propagating its mileage to the vehicle.
  fn create_service_event<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
    input: NewServiceEvent,
  ) -> impl Future<Output = Result<ServiceEvent, Self::Error>> + Send + 'a;

  fn update_service_event<'a>(
    &'a self,
    owner: &'a UserId,
    event_id: Uuid,
    patch: ServiceEventPatch,
  ) -> impl Future<Output = Result<ServiceEvent, Self::Error>> + Send + 'a;

  /// Delete an event and its items. The vehicle's mileage is left as is.
  fn delete_service_event<'a>(
    &'a self,
    owner: &'a UserId,
    event_id: Uuid,
  ) -> impl Future<Output = Result<ServiceEvent, Self::Error>> + Send + 'a;

  // ── Service items ─────────────────────────────────────────────────────

  fn list_service_items<'a>(
    &'a self,
    owner: &'a UserId,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ServiceItem>, Self::Error>> + Send + 'a;

  fn get_service_item<'a>(
    &'a self,
    owner: &'a UserId,
    item_id: Uuid,
  ) -> impl Future<Output = Result<ServiceItem, Self::Error>> + Send + 'a;

  /// Add an item and recompute the event's total cost.
  fn create_service_item<'a>(
    &'a self,
    owner: &'a UserId,
    event_id: Uuid,
    input: NewServiceItem,
  ) -> impl Future<Output = Result<ServiceItem, Self::Error>> + Send + 'a;

  fn update_service_item<'a>(
    &'a self,
    owner: &'a UserId,
    item_id: Uuid,
    patch: ServiceItemPatch,
  ) -> impl Future<Output = Result<ServiceItem, Self::Error>> + Send + 'a;

  /// Remove an item and recompute the event's total cost.
  fn delete_service_item<'a>(
    &'a self,
    owner: &'a UserId,
    item_id: Uuid,
  ) -> impl Future<Output = Result<ServiceItem, Self::Error>> + Send + 'a;

  // ── Reminders ─────────────────────────────────────────────────────────

  /// Reminders of a vehicle, soonest due date first.
  fn list_reminders<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Reminder>, Self::Error>> + Send + 'a;

  fn get_reminder<'a>(
    &'a self,
    owner: &'a UserId,
    reminder_id: Uuid,
  ) -> impl Future<Output = Result<Reminder, Self::Error>> + Send + 'a;

  fn create_reminder<'a>(
    &'a self,
    owner: &'a UserId,
    vehicle_id: Uuid,
    input: NewReminder,
  ) -> impl Future<Output = Result<Reminder, Self::Error>> + Send + 'a;

  fn update_reminder<'a>(
    &'a self,
    owner: &'a UserId,
    reminder_id: Uuid,
    patch: ReminderPatch,
  ) -> impl Future<Output = Result<Reminder, Self::Error>> + Send + 'a;

  /// Mark a reminder done; recurring reminders get a successor in the same
  /// transaction. Idempotent for already-completed reminders.
  fn complete_reminder<'a>(
    &'a self,
    owner: &'a UserId,
    reminder_id: Uuid,
    today: NaiveDate,
  ) -> impl Future<Output = Result<ReminderCompletion, Self::Error>> + Send + 'a;

  fn delete_reminder<'a>(
    &'a self,
    owner: &'a UserId,
    reminder_id: Uuid,
  ) -> impl Future<Output = Result<Reminder, Self::Error>> + Send + 'a;

  /// Open reminders across all of `owner`'s vehicles that are overdue or
  /// upcoming on `today`.
  fn due_reminders<'a>(
    &'a self,
    owner: &'a UserId,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DueReminder>, Self::Error>> + Send + 'a;

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Recompute every derived value from its detail rows.
  fn reconcile(&self) -> impl Future<Output = Result<ReconcileReport, Self::Error>> + Send + '_;
}
