//! Ownership resolution and single-record loaders.
//!
//! Every record is owned transitively through its vehicle. The lookups here
//! walk that chain in one query and hand the result to
//! [`wrench_core::guard::authorize`].

use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;
use wrench_core::{
  AccessPolicy, Resource, ResourceKind, UserId,
  guard::authorize,
  reminder::Reminder,
  service::{ServiceEvent, ServiceItem},
  vehicle::Vehicle,
};

use crate::{
  Result,
  encode::{
    EVENT_COLUMNS, ITEM_COLUMNS, REMINDER_COLUMNS, RawReminder, RawServiceEvent, RawServiceItem,
    RawVehicle, VEHICLE_COLUMNS, encode_uuid,
  },
};

// ─── Guard ───────────────────────────────────────────────────────────────────

/// The user that transitively owns `target`, or `None` if it does not exist.
pub fn owner_of(conn: &Connection, target: Resource) -> Result<Option<UserId>> {
  let sql = match target.kind {
    ResourceKind::Vehicle => "SELECT owner_id FROM vehicles WHERE vehicle_id = ?1",
    ResourceKind::ServiceEvent => {
      "SELECT v.owner_id FROM service_events e
         JOIN vehicles v ON v.vehicle_id = e.vehicle_id
        WHERE e.event_id = ?1"
    }
    ResourceKind::ServiceItem => {
      "SELECT v.owner_id FROM service_items i
         JOIN service_events e ON e.event_id = i.event_id
         JOIN vehicles v ON v.vehicle_id = e.vehicle_id
        WHERE i.item_id = ?1"
    }
    ResourceKind::Reminder => {
      "SELECT v.owner_id FROM reminders r
         JOIN vehicles v ON v.vehicle_id = r.vehicle_id
        WHERE r.reminder_id = ?1"
    }
  };
  let owner: Option<String> = conn
    .query_row(sql, rusqlite::params![encode_uuid(target.id)], |r| r.get(0))
    .optional()?;
  Ok(owner.map(UserId::new))
}

/// Authorize `actor` against `target` under `policy`.
pub fn guard(
  conn: &Connection,
  policy: AccessPolicy,
  target: Resource,
  actor: &UserId,
) -> Result<()> {
  let owner = owner_of(conn, target)?;
  if owner.as_ref().is_some_and(|o| o != actor) {
    tracing::debug!(resource = %target, "access to foreign record denied");
  }
  authorize(policy, target, owner.as_ref(), actor)?;
  Ok(())
}

// ─── Loaders ─────────────────────────────────────────────────────────────────

fn missing(target: Resource) -> crate::Error { wrench_core::Error::NotFound(target).into() }

pub fn load_vehicle(conn: &Connection, vehicle_id: Uuid) -> Result<Vehicle> {
  let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE vehicle_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(vehicle_id)], RawVehicle::from_row)
    .optional()?
    .ok_or_else(|| missing(Resource::vehicle(vehicle_id)))?
    .into_vehicle()
}

pub fn load_event(conn: &Connection, event_id: Uuid) -> Result<ServiceEvent> {
  let sql = format!("SELECT {EVENT_COLUMNS} FROM service_events WHERE event_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(event_id)], RawServiceEvent::from_row)
    .optional()?
    .ok_or_else(|| missing(Resource::service_event(event_id)))?
    .into_event()
}

pub fn load_item(conn: &Connection, item_id: Uuid) -> Result<ServiceItem> {
  let sql = format!("SELECT {ITEM_COLUMNS} FROM service_items WHERE item_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(item_id)], RawServiceItem::from_row)
    .optional()?
    .ok_or_else(|| missing(Resource::service_item(item_id)))?
    .into_item()
}

pub fn load_reminder(conn: &Connection, reminder_id: Uuid) -> Result<Reminder> {
  let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE reminder_id = ?1");
  conn
    .query_row(&sql, rusqlite::params![encode_uuid(reminder_id)], RawReminder::from_row)
    .optional()?
    .ok_or_else(|| missing(Resource::reminder(reminder_id)))?
    .into_reminder()
}
