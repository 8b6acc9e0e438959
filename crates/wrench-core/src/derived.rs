//! Derived state: the two denormalized numbers kept consistent with their
//! authoritative detail rows.
//!
//! - **Mileage high-water mark**: `vehicle.current_mileage :=
//!   max(vehicle.current_mileage, event.mileage)` once per event creation (or
//!   mileage edit). It never decreases and is not recomputed when an event is
//!   deleted.
//! - **Event total cost**: `event.total_cost := sum(item.cost)` fully
//!   recomputed after every item write. Backends must do this as a single
//!   atomic aggregate, never as read-add-write in application code.
//!
//! Both run after the primary write has committed. A failure leaves the
//! primary write in place and is reported as
//! [`Error::DegradedConsistency`](crate::Error::DegradedConsistency).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A secondary write owed after a primary write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedWrite {
  MileageHighWater { vehicle_id: Uuid, mileage: i64 },
  EventTotal { event_id: Uuid },
}

impl fmt::Display for DerivedWrite {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MileageHighWater { vehicle_id, mileage } => {
        write!(f, "raise mileage of vehicle {vehicle_id} to {mileage}")
      }
      Self::EventTotal { event_id } => write!(f, "recompute total of service event {event_id}"),
    }
  }
}

/// Rows corrected by a reconcile sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
  pub event_totals:     usize,
  pub vehicle_mileages: usize,
}

impl ReconcileReport {
  pub fn is_clean(&self) -> bool { self.event_totals == 0 && self.vehicle_mileages == 0 }
}
