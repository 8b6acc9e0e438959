//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with fixed microsecond precision, so they
//! sort lexicographically. Calendar dates are `YYYY-MM-DD`. UUIDs are
//! hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;
use wrench_core::{
  UserId, reminder::Reminder, service::ServiceEvent, service::ServiceItem, vehicle::Vehicle,
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const VEHICLE_COLUMNS: &str = "vehicle_id, owner_id, name, make, model, year, vin, \
   license_plate, current_mileage, service_interval_months, service_interval_km, notes, \
   created_at";

/// Raw values read directly from a `vehicles` row.
pub struct RawVehicle {
  pub vehicle_id:              String,
  pub owner_id:                String,
  pub name:                    Option<String>,
  pub make:                    String,
  pub model:                   String,
  pub year:                    i32,
  pub vin:                     Option<String>,
  pub license_plate:           Option<String>,
  pub current_mileage:         i64,
  pub service_interval_months: Option<i64>,
  pub service_interval_km:     Option<i64>,
  pub notes:                   Option<String>,
  pub created_at:              String,
}

impl RawVehicle {
  /// Read a row selected with [`VEHICLE_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vehicle_id:              row.get(0)?,
      owner_id:                row.get(1)?,
      name:                    row.get(2)?,
      make:                    row.get(3)?,
      model:                   row.get(4)?,
      year:                    row.get(5)?,
      vin:                     row.get(6)?,
      license_plate:           row.get(7)?,
      current_mileage:         row.get(8)?,
      service_interval_months: row.get(9)?,
      service_interval_km:     row.get(10)?,
      notes:                   row.get(11)?,
      created_at:              row.get(12)?,
    })
  }

  pub fn into_vehicle(self) -> Result<Vehicle> {
    Ok(Vehicle {
      vehicle_id:              decode_uuid(&self.vehicle_id)?,
      owner:                   UserId::new(self.owner_id),
      name:                    self.name,
      make:                    self.make,
      model:                   self.model,
      year:                    self.year,
      vin:                     self.vin,
      license_plate:           self.license_plate,
      current_mileage:         self.current_mileage,
      service_interval_months: self.service_interval_months,
      service_interval_km:     self.service_interval_km,
      notes:                   self.notes,
      created_at:              decode_dt(&self.created_at)?,
    })
  }
}

pub const EVENT_COLUMNS: &str =
  "event_id, vehicle_id, service_date, mileage, total_cost, notes, created_at";

pub struct RawServiceEvent {
  pub event_id:     String,
  pub vehicle_id:   String,
  pub service_date: String,
  pub mileage:      i64,
  pub total_cost:   i64,
  pub notes:        Option<String>,
  pub created_at:   String,
}

impl RawServiceEvent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      vehicle_id:   row.get(1)?,
      service_date: row.get(2)?,
      mileage:      row.get(3)?,
      total_cost:   row.get(4)?,
      notes:        row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<ServiceEvent> {
    Ok(ServiceEvent {
      event_id:   decode_uuid(&self.event_id)?,
      vehicle_id: decode_uuid(&self.vehicle_id)?,
      date:       decode_date(&self.service_date)?,
      mileage:    self.mileage,
      total_cost: self.total_cost,
      notes:      self.notes,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const ITEM_COLUMNS: &str = "item_id, event_id, kind, description, cost, created_at";

pub struct RawServiceItem {
  pub item_id:     String,
  pub event_id:    String,
  pub kind:        String,
  pub description: Option<String>,
  pub cost:        i64,
  pub created_at:  String,
}

impl RawServiceItem {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:     row.get(0)?,
      event_id:    row.get(1)?,
      kind:        row.get(2)?,
      description: row.get(3)?,
      cost:        row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_item(self) -> Result<ServiceItem> {
    Ok(ServiceItem {
      item_id:     decode_uuid(&self.item_id)?,
      event_id:    decode_uuid(&self.event_id)?,
      kind:        self.kind,
      description: self.description,
      cost:        self.cost,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const REMINDER_COLUMNS: &str = "reminder_id, vehicle_id, kind, due_date, due_mileage, \
   recurring, interval_months, interval_distance, completed, notes, created_at";

pub struct RawReminder {
  pub reminder_id:       String,
  pub vehicle_id:        String,
  pub kind:              String,
  pub due_date:          Option<String>,
  pub due_mileage:       Option<i64>,
  pub recurring:         bool,
  pub interval_months:   Option<i64>,
  pub interval_distance: Option<i64>,
  pub completed:         bool,
  pub notes:             Option<String>,
  pub created_at:        String,
}

impl RawReminder {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reminder_id:       row.get(0)?,
      vehicle_id:        row.get(1)?,
      kind:              row.get(2)?,
      due_date:          row.get(3)?,
      due_mileage:       row.get(4)?,
      recurring:         row.get(5)?,
      interval_months:   row.get(6)?,
      interval_distance: row.get(7)?,
      completed:         row.get(8)?,
      notes:             row.get(9)?,
      created_at:        row.get(10)?,
    })
  }

  pub fn into_reminder(self) -> Result<Reminder> {
    Ok(Reminder {
      reminder_id:       decode_uuid(&self.reminder_id)?,
      vehicle_id:        decode_uuid(&self.vehicle_id)?,
      kind:              self.kind,
      due_date:          self.due_date.as_deref().map(decode_date).transpose()?,
      due_mileage:       self.due_mileage,
      recurring:         self.recurring,
      interval_months:   self.interval_months,
      interval_distance: self.interval_distance,
      completed:         self.completed,
      notes:             self.notes,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}
