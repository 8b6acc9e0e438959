//! [`SqliteStore`], the SQLite implementation of [`MaintenanceStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, Row};
use uuid::Uuid;
use wrench_core::{
  AccessPolicy, Resource, UserId,
  cache::QueryCache,
  derived::{DerivedWrite, ReconcileReport},
  normalize,
  reminder::{
    DueReminder, DueStatus, DueWindow, NewReminder, Reminder, ReminderCompletion, ReminderPatch,
  },
  service::{
    NewServiceEvent, NewServiceItem, ServiceEvent, ServiceEventPatch, ServiceItem,
    ServiceItemPatch,
  },
  store::{CascadeSummary, MaintenanceStore},
  vehicle::{NewVehicle, Vehicle, VehiclePatch},
};

use crate::{
  Error, Result,
  access::{guard, load_event, load_item, load_reminder, load_vehicle},
  derived,
  encode::{
    EVENT_COLUMNS, ITEM_COLUMNS, REMINDER_COLUMNS, RawReminder, RawServiceEvent, RawServiceItem,
    RawVehicle, VEHICLE_COLUMNS, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Wrench maintenance store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and the degraded-write counter are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:          tokio_rusqlite::Connection,
  access_policy: AccessPolicy,
  due_window:    DueWindow,
  degraded:      Arc<AtomicU64>,
  cache:         Option<Arc<QueryCache>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      access_policy: AccessPolicy::default(),
      due_window: DueWindow::default(),
      degraded: Arc::new(AtomicU64::new(0)),
      cache: None,
    })
  }

  pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
    self.access_policy = policy;
    self
  }

  pub fn with_due_window(mut self, window: DueWindow) -> Self {
    self.due_window = window;
    self
  }

  /// Cleared whenever derived state is repaired by a background retry or by
  /// [`MaintenanceStore::reconcile`], since those writes have no request to
  /// invalidate on their behalf.
  pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
    self.cache = Some(cache);
    self
  }

  /// Number of derived writes that failed on their first attempt since the
  /// store was opened.
  pub fn degraded_writes(&self) -> u64 { self.degraded.load(Ordering::Relaxed) }

  /// Run `f` on the connection thread.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  async fn settle(&self, writes: impl IntoIterator<Item = DerivedWrite>) {
    derived::settle(&self.conn, &self.degraded, self.cache.as_ref(), writes).await;
  }

  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self.run(move |conn| Ok(conn.execute_batch(sql)?)).await
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

fn collect<R, P: rusqlite::Params>(
  conn: &Connection,
  sql: &str,
  params: P,
  from_row: fn(&Row<'_>) -> rusqlite::Result<R>,
) -> Result<Vec<R>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn vehicles_of(conn: &Connection, owner: &UserId) -> Result<Vec<Vehicle>> {
  let sql = format!(
    "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE owner_id = ?1
      ORDER BY created_at DESC, rowid DESC"
  );
  collect(conn, &sql, rusqlite::params![owner.as_str()], RawVehicle::from_row)?
    .into_iter()
    .map(RawVehicle::into_vehicle)
    .collect()
}

fn reminders_of(conn: &Connection, vehicle_id: Uuid, open_only: bool) -> Result<Vec<Reminder>> {
  let filter = if open_only { "AND completed = 0" } else { "" };
  let sql = format!(
    "SELECT {REMINDER_COLUMNS} FROM reminders WHERE vehicle_id = ?1 {filter}
      ORDER BY due_date IS NULL, due_date, due_mileage IS NULL, due_mileage, created_at"
  );
  collect(conn, &sql, rusqlite::params![encode_uuid(vehicle_id)], RawReminder::from_row)?
    .into_iter()
    .map(RawReminder::into_reminder)
    .collect()
}

/// Reject `vehicle` if another vehicle of the same owner already uses its VIN
/// or license plate.
fn check_unique(conn: &Connection, vehicle: &Vehicle) -> Result<()> {
  for (field, value) in [("vin", &vehicle.vin), ("license_plate", &vehicle.license_plate)] {
    let Some(value) = value else { continue };
    let sql = format!(
      "SELECT 1 FROM vehicles WHERE owner_id = ?1 AND {field} = ?2 AND vehicle_id <> ?3"
    );
    let taken = conn
      .query_row(
        &sql,
        rusqlite::params![vehicle.owner.as_str(), value, encode_uuid(vehicle.vehicle_id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some();
    if taken {
      return Err(
        wrench_core::Error::conflict(field, format!("{value} is registered to another vehicle"))
          .into(),
      );
    }
  }
  Ok(())
}

fn insert_vehicle(conn: &Connection, v: &Vehicle) -> Result<()> {
  conn.execute(
    "INSERT INTO vehicles (
       vehicle_id, owner_id, name, make, model, year, vin, license_plate,
       current_mileage, service_interval_months, service_interval_km, notes, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    rusqlite::params![
      encode_uuid(v.vehicle_id),
      v.owner.as_str(),
      v.name,
      v.make,
      v.model,
      v.year,
      v.vin,
      v.license_plate,
      v.current_mileage,
      v.service_interval_months,
      v.service_interval_km,
      v.notes,
      encode_dt(v.created_at),
    ],
  )?;
  Ok(())
}

fn write_vehicle(conn: &Connection, v: &Vehicle) -> Result<()> {
  conn.execute(
    "UPDATE vehicles
        SET name = ?2, make = ?3, model = ?4, year = ?5, vin = ?6, license_plate = ?7,
            current_mileage = ?8, service_interval_months = ?9,
            service_interval_km = ?10, notes = ?11
      WHERE vehicle_id = ?1",
    rusqlite::params![
      encode_uuid(v.vehicle_id),
      v.name,
      v.make,
      v.model,
      v.year,
      v.vin,
      v.license_plate,
      v.current_mileage,
      v.service_interval_months,
      v.service_interval_km,
      v.notes,
    ],
  )?;
  Ok(())
}

/// Reject an item write that would push its event's total past
/// [`normalize::MAX_COST`].
fn check_event_total(conn: &Connection, item: &ServiceItem) -> Result<()> {
  let others: i64 = conn.query_row(
    "SELECT COALESCE(SUM(cost), 0) FROM service_items WHERE event_id = ?1 AND item_id <> ?2",
    rusqlite::params![encode_uuid(item.event_id), encode_uuid(item.item_id)],
    |row| row.get(0),
  )?;
  normalize::total_cost([others, item.cost])?;
  Ok(())
}

fn insert_item(conn: &Connection, item: &ServiceItem) -> Result<()> {
  conn.execute(
    "INSERT INTO service_items (item_id, event_id, kind, description, cost, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(item.item_id),
      encode_uuid(item.event_id),
      item.kind,
      item.description,
      item.cost,
      encode_dt(item.created_at),
    ],
  )?;
  Ok(())
}

fn insert_reminder(conn: &Connection, r: &Reminder) -> Result<()> {
  conn.execute(
    "INSERT INTO reminders (
       reminder_id, vehicle_id, kind, due_date, due_mileage, recurring,
       interval_months, interval_distance, completed, notes, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    rusqlite::params![
      encode_uuid(r.reminder_id),
      encode_uuid(r.vehicle_id),
      r.kind,
      r.due_date.map(encode_date),
      r.due_mileage,
      r.recurring,
      r.interval_months,
      r.interval_distance,
      r.completed,
      r.notes,
      encode_dt(r.created_at),
    ],
  )?;
  Ok(())
}

fn write_reminder(conn: &Connection, r: &Reminder) -> Result<()> {
  conn.execute(
    "UPDATE reminders
        SET kind = ?2, due_date = ?3, due_mileage = ?4, recurring = ?5,
            interval_months = ?6, interval_distance = ?7, completed = ?8, notes = ?9
      WHERE reminder_id = ?1",
    rusqlite::params![
      encode_uuid(r.reminder_id),
      r.kind,
      r.due_date.map(encode_date),
      r.due_mileage,
      r.recurring,
      r.interval_months,
      r.interval_distance,
      r.completed,
      r.notes,
    ],
  )?;
  Ok(())
}

fn new_reminder(vehicle_id: Uuid, input: NewReminder) -> Reminder {
  Reminder {
    reminder_id: Uuid::new_v4(),
    vehicle_id,
    kind: input.kind,
    due_date: input.due_date,
    due_mileage: input.due_mileage,
    recurring: input.recurring,
    interval_months: input.interval_months,
    interval_distance: input.interval_distance,
    completed: false,
    notes: input.notes,
    created_at: Utc::now(),
  }
}

fn today() -> NaiveDate { Utc::now().date_naive() }

// ─── MaintenanceStore impl ───────────────────────────────────────────────────

impl MaintenanceStore for SqliteStore {
  type Error = Error;

  // ── Vehicles ──────────────────────────────────────────────────────────────

  async fn list_vehicles(&self, owner: &UserId) -> Result<Vec<Vehicle>> {
    let owner = owner.clone();
    self.run(move |conn| vehicles_of(conn, &owner)).await
  }

  async fn get_vehicle(&self, owner: &UserId, vehicle_id: Uuid) -> Result<Vehicle> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::vehicle(vehicle_id), &owner)?;
        load_vehicle(conn, vehicle_id)
      })
      .await
  }

  async fn create_vehicle(&self, owner: &UserId, input: NewVehicle) -> Result<Vehicle> {
    let input = input.normalize(today())?;
    let vehicle = Vehicle {
      vehicle_id:              Uuid::new_v4(),
      owner:                   owner.clone(),
      name:                    input.name,
      make:                    input.make,
      model:                   input.model,
      year:                    input.year,
      vin:                     input.vin,
      license_plate:           input.license_plate,
      current_mileage:         input.current_mileage,
      service_interval_months: input.service_interval_months,
      service_interval_km:     input.service_interval_km,
      notes:                   input.notes,
      created_at:              Utc::now(),
    };

    let vehicle = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        check_unique(&tx, &vehicle)?;
        insert_vehicle(&tx, &vehicle)?;
        tx.commit()?;
        Ok(vehicle)
      })
      .await?;
    tracing::info!(vehicle_id = %vehicle.vehicle_id, owner = %owner, "vehicle created");
    Ok(vehicle)
  }

  async fn update_vehicle(
    &self,
    owner: &UserId,
    vehicle_id: Uuid,
    patch: VehiclePatch,
  ) -> Result<Vehicle> {
    let (owner, policy, today) = (owner.clone(), self.access_policy, today());
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        guard(&tx, policy, Resource::vehicle(vehicle_id), &owner)?;
        let mut vehicle = load_vehicle(&tx, vehicle_id)?;
        let mileage_edited = patch.current_mileage.is_some();
        patch.apply(&mut vehicle, today)?;

        if mileage_edited {
          let recorded: i64 = tx.query_row(
            "SELECT COALESCE(MAX(mileage), 0) FROM service_events WHERE vehicle_id = ?1",
            rusqlite::params![encode_uuid(vehicle_id)],
            |r| r.get(0),
          )?;
          if vehicle.current_mileage < recorded {
            return Err(
              wrench_core::Error::validation(
                "current_mileage",
                format!("must be at least {recorded}, the highest mileage in the service history"),
              )
              .into(),
            );
          }
        }

        check_unique(&tx, &vehicle)?;
        write_vehicle(&tx, &vehicle)?;
        tx.commit()?;
        Ok(vehicle)
      })
      .await
  }

  async fn delete_vehicle(&self, owner: &UserId, vehicle_id: Uuid) -> Result<CascadeSummary> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    let summary = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        guard(&tx, policy, Resource::vehicle(vehicle_id), &owner)?;
        let id = encode_uuid(vehicle_id);
        let service_items = tx.execute(
          "DELETE FROM service_items WHERE event_id IN
             (SELECT event_id FROM service_events WHERE vehicle_id = ?1)",
          rusqlite::params![id],
        )?;
        let service_events =
          tx.execute("DELETE FROM service_events WHERE vehicle_id = ?1", rusqlite::params![id])?;
        let reminders =
          tx.execute("DELETE FROM reminders WHERE vehicle_id = ?1", rusqlite::params![id])?;
        tx.execute("DELETE FROM vehicles WHERE vehicle_id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(CascadeSummary { vehicle_id, service_events, service_items, reminders })
      })
      .await?;
    tracing::info!(
      vehicle_id = %vehicle_id,
      service_events = summary.service_events,
      service_items = summary.service_items,
      reminders = summary.reminders,
      "vehicle deleted"
    );
    Ok(summary)
  }

  // ── Service events ────────────────────────────────────────────────────────

  async fn list_service_events(
    &self,
    owner: &UserId,
    vehicle_id: Uuid,
  ) -> Result<Vec<ServiceEvent>> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::vehicle(vehicle_id), &owner)?;
        let sql = format!(
          "SELECT {EVENT_COLUMNS} FROM service_events WHERE vehicle_id = ?1
            ORDER BY service_date DESC, created_at DESC, rowid DESC"
        );
        collect(conn, &sql, rusqlite::params![encode_uuid(vehicle_id)], RawServiceEvent::from_row)?
          .into_iter()
          .map(RawServiceEvent::into_event)
          .collect()
      })
      .await
  }

  async fn get_service_event(&self, owner: &UserId, event_id: Uuid) -> Result<ServiceEvent> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::service_event(event_id), &owner)?;
        load_event(conn, event_id)
      })
      .await
  }

  async fn create_service_event(
    &self,
    owner: &UserId,
    vehicle_id: Uuid,
    input: NewServiceEvent,
  ) -> Result<ServiceEvent> {
    let input = input.normalize()?;
    let now = Utc::now();
    let event_id = Uuid::new_v4();
    let items: Vec<ServiceItem> = input
      .items
      .into_iter()
      .map(|item| ServiceItem {
        item_id:     Uuid::new_v4(),
        event_id,
        kind:        item.kind,
        description: item.description,
        cost:        item.cost,
        created_at:  now,
      })
      .collect();
    let event = ServiceEvent {
      event_id,
      vehicle_id,
      date: input.date,
      mileage: input.mileage,
      total_cost: normalize::total_cost(items.iter().map(|i| i.cost))?,
      notes: input.notes,
      created_at: now,
    };

    let (actor, policy, row) = (owner.clone(), self.access_policy, event.clone());
    let item_count = items.len();
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        guard(&tx, policy, Resource::vehicle(vehicle_id), &actor)?;
        tx.execute(
          "INSERT INTO service_events (
             event_id, vehicle_id, service_date, mileage, total_cost, notes, created_at
           ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
          rusqlite::params![
            encode_uuid(row.event_id),
            encode_uuid(row.vehicle_id),
            encode_date(row.date),
            row.mileage,
            row.notes,
            encode_dt(row.created_at),
          ],
        )?;
        for item in &items {
          insert_item(&tx, item)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::info!(
      event_id = %event_id,
      vehicle_id = %vehicle_id,
      mileage = event.mileage,
      items = item_count,
      "service event recorded"
    );

    let mut writes = Vec::with_capacity(2);
    if item_count > 0 {
      writes.push(DerivedWrite::EventTotal { event_id });
    }
    writes.push(DerivedWrite::MileageHighWater { vehicle_id, mileage: event.mileage });
    self.settle(writes).await;

    match self.run(move |conn| load_event(conn, event_id)).await {
      Ok(stored) => Ok(stored),
      Err(err) => {
        tracing::warn!(event_id = %event_id, error = %err, "re-read after create failed");
        Ok(event)
      }
    }
  }

  async fn update_service_event(
    &self,
    owner: &UserId,
    event_id: Uuid,
    patch: ServiceEventPatch,
  ) -> Result<ServiceEvent> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    let mileage_edited = patch.mileage.is_some();
    let event = self
      .run(move |conn| {
        guard(conn, policy, Resource::service_event(event_id), &owner)?;
        let mut event = load_event(conn, event_id)?;
        patch.apply(&mut event)?;
        conn.execute(
          "UPDATE service_events SET service_date = ?2, mileage = ?3, notes = ?4
            WHERE event_id = ?1",
          rusqlite::params![
            encode_uuid(event_id),
            encode_date(event.date),
            event.mileage,
            event.notes,
          ],
        )?;
        Ok(event)
      })
      .await?;

    if mileage_edited {
      self
        .settle([DerivedWrite::MileageHighWater {
          vehicle_id: event.vehicle_id,
          mileage:    event.mileage,
        }])
        .await;
    }
    Ok(event)
  }

  async fn delete_service_event(&self, owner: &UserId, event_id: Uuid) -> Result<ServiceEvent> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    let event = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        guard(&tx, policy, Resource::service_event(event_id), &owner)?;
        let event = load_event(&tx, event_id)?;
        let id = encode_uuid(event_id);
        tx.execute("DELETE FROM service_items WHERE event_id = ?1", rusqlite::params![id])?;
        tx.execute("DELETE FROM service_events WHERE event_id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(event)
      })
      .await?;
    tracing::info!(event_id = %event_id, vehicle_id = %event.vehicle_id, "service event deleted");
    Ok(event)
  }

  // ── Service items ─────────────────────────────────────────────────────────

  async fn list_service_items(&self, owner: &UserId, event_id: Uuid) -> Result<Vec<ServiceItem>> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::service_event(event_id), &owner)?;
        let sql = format!(
          "SELECT {ITEM_COLUMNS} FROM service_items WHERE event_id = ?1
            ORDER BY created_at, rowid"
        );
        collect(conn, &sql, rusqlite::params![encode_uuid(event_id)], RawServiceItem::from_row)?
          .into_iter()
          .map(RawServiceItem::into_item)
          .collect()
      })
      .await
  }

  async fn get_service_item(&self, owner: &UserId, item_id: Uuid) -> Result<ServiceItem> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::service_item(item_id), &owner)?;
        load_item(conn, item_id)
      })
      .await
  }

  async fn create_service_item(
    &self,
    owner: &UserId,
    event_id: Uuid,
    input: NewServiceItem,
  ) -> Result<ServiceItem> {
    let input = input.normalize()?;
    let item = ServiceItem {
      item_id: Uuid::new_v4(),
      event_id,
      kind: input.kind,
      description: input.description,
      cost: input.cost,
      created_at: Utc::now(),
    };
    let (owner, policy) = (owner.clone(), self.access_policy);
    let item = self
      .run(move |conn| {
        guard(conn, policy, Resource::service_event(event_id), &owner)?;
        check_event_total(conn, &item)?;
        insert_item(conn, &item)?;
        Ok(item)
      })
      .await?;
    tracing::debug!(item_id = %item.item_id, event_id = %event_id, cost = item.cost, "service item added");
    self.settle([DerivedWrite::EventTotal { event_id }]).await;
    Ok(item)
  }

  async fn update_service_item(
    &self,
    owner: &UserId,
    item_id: Uuid,
    patch: ServiceItemPatch,
  ) -> Result<ServiceItem> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    let item = self
      .run(move |conn| {
        guard(conn, policy, Resource::service_item(item_id), &owner)?;
        let mut item = load_item(conn, item_id)?;
        patch.apply(&mut item)?;
        check_event_total(conn, &item)?;
        conn.execute(
          "UPDATE service_items SET kind = ?2, description = ?3, cost = ?4 WHERE item_id = ?1",
          rusqlite::params![encode_uuid(item_id), item.kind, item.description, item.cost],
        )?;
        Ok(item)
      })
      .await?;
    self.settle([DerivedWrite::EventTotal { event_id: item.event_id }]).await;
    Ok(item)
  }

  async fn delete_service_item(&self, owner: &UserId, item_id: Uuid) -> Result<ServiceItem> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    let item = self
      .run(move |conn| {
        guard(conn, policy, Resource::service_item(item_id), &owner)?;
        let item = load_item(conn, item_id)?;
        conn.execute(
          "DELETE FROM service_items WHERE item_id = ?1",
          rusqlite::params![encode_uuid(item_id)],
        )?;
        Ok(item)
      })
      .await?;
    tracing::debug!(item_id = %item_id, event_id = %item.event_id, "service item deleted");
    self.settle([DerivedWrite::EventTotal { event_id: item.event_id }]).await;
    Ok(item)
  }

  // ── Reminders ─────────────────────────────────────────────────────────────

  async fn list_reminders(&self, owner: &UserId, vehicle_id: Uuid) -> Result<Vec<Reminder>> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::vehicle(vehicle_id), &owner)?;
        reminders_of(conn, vehicle_id, false)
      })
      .await
  }

  async fn get_reminder(&self, owner: &UserId, reminder_id: Uuid) -> Result<Reminder> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::reminder(reminder_id), &owner)?;
        load_reminder(conn, reminder_id)
      })
      .await
  }

  async fn create_reminder(
    &self,
    owner: &UserId,
    vehicle_id: Uuid,
    input: NewReminder,
  ) -> Result<Reminder> {
    let reminder = new_reminder(vehicle_id, input.normalize()?);
    let (owner, policy) = (owner.clone(), self.access_policy);
    let reminder = self
      .run(move |conn| {
        guard(conn, policy, Resource::vehicle(vehicle_id), &owner)?;
        insert_reminder(conn, &reminder)?;
        Ok(reminder)
      })
      .await?;
    tracing::debug!(reminder_id = %reminder.reminder_id, vehicle_id = %vehicle_id, "reminder created");
    Ok(reminder)
  }

  async fn update_reminder(
    &self,
    owner: &UserId,
    reminder_id: Uuid,
    patch: ReminderPatch,
  ) -> Result<Reminder> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::reminder(reminder_id), &owner)?;
        let mut reminder = load_reminder(conn, reminder_id)?;
        patch.apply(&mut reminder)?;
        write_reminder(conn, &reminder)?;
        Ok(reminder)
      })
      .await
  }

  async fn complete_reminder(
    &self,
    owner: &UserId,
    reminder_id: Uuid,
    today: NaiveDate,
  ) -> Result<ReminderCompletion> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    let completion = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        guard(&tx, policy, Resource::reminder(reminder_id), &owner)?;
        let mut reminder = load_reminder(&tx, reminder_id)?;
        if reminder.completed {
          return Ok(ReminderCompletion { completed: reminder, next: None });
        }

        reminder.completed = true;
        write_reminder(&tx, &reminder)?;
        let scheduled: Option<String> = tx.query_row(
          "SELECT successor_id FROM reminders WHERE reminder_id = ?1",
          rusqlite::params![encode_uuid(reminder_id)],
          |row| row.get(0),
        )?;
        let mileage = load_vehicle(&tx, reminder.vehicle_id)?.current_mileage;
        let next = match reminder.successor(today, mileage) {
          // Reopened and completed again: the follow-up already exists.
          Some(_) if scheduled.is_some() => None,
          Some(input) => {
            let next = new_reminder(reminder.vehicle_id, input);
            insert_reminder(&tx, &next)?;
            tx.execute(
              "UPDATE reminders SET successor_id = ?2 WHERE reminder_id = ?1",
              rusqlite::params![encode_uuid(reminder_id), encode_uuid(next.reminder_id)],
            )?;
            Some(next)
          }
          None => None,
        };
        tx.commit()?;
        Ok(ReminderCompletion { completed: reminder, next })
      })
      .await?;

    if let Some(next) = &completion.next {
      tracing::info!(
        reminder_id = %reminder_id,
        next_id = %next.reminder_id,
        "recurring reminder completed, successor scheduled"
      );
    }
    Ok(completion)
  }

  async fn delete_reminder(&self, owner: &UserId, reminder_id: Uuid) -> Result<Reminder> {
    let (owner, policy) = (owner.clone(), self.access_policy);
    self
      .run(move |conn| {
        guard(conn, policy, Resource::reminder(reminder_id), &owner)?;
        let reminder = load_reminder(conn, reminder_id)?;
        conn.execute(
          "DELETE FROM reminders WHERE reminder_id = ?1",
          rusqlite::params![encode_uuid(reminder_id)],
        )?;
        Ok(reminder)
      })
      .await
  }

  async fn due_reminders(&self, owner: &UserId, today: NaiveDate) -> Result<Vec<DueReminder>> {
    let (owner, window) = (owner.clone(), self.due_window);
    let mut due = self
      .run(move |conn| {
        let mut due = Vec::new();
        for vehicle in vehicles_of(conn, &owner)? {
          for reminder in reminders_of(conn, vehicle.vehicle_id, true)? {
            let Some(status) = reminder.due_status(today, vehicle.current_mileage, window) else {
              continue;
            };
            due.push(DueReminder {
              reminder,
              vehicle_label: vehicle.label(),
              current_mileage: vehicle.current_mileage,
              status,
            });
          }
        }
        Ok(due)
      })
      .await?;
    due.sort_by_key(|d| {
      (
        d.status != DueStatus::Overdue,
        d.reminder.due_date.is_none(),
        d.reminder.due_date,
        d.reminder.due_mileage,
      )
    });
    Ok(due)
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn reconcile(&self) -> Result<ReconcileReport> {
    let report = self.run(derived::reconcile).await?;
    if report.is_clean() {
      tracing::debug!("reconcile found no drift");
    } else {
      tracing::warn!(
        event_totals = report.event_totals,
        vehicle_mileages = report.vehicle_mileages,
        "reconcile repaired derived state"
      );
      derived::repaired(self.cache.as_ref());
    }
    Ok(report)
  }
}
