//! Derived-state writes: the vehicle mileage high-water mark and the event
//! cost total.
//!
//! Both are single SQL statements so that concurrent writers can never lose
//! a contribution. They run after the primary write has committed; a failure
//! leaves the primary write in place, bumps the degraded counter and hands the
//! write to a background retry task.

use std::{
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use rusqlite::Connection;
use wrench_core::{
  cache::QueryCache,
  derived::{DerivedWrite, ReconcileReport},
};

use crate::{Result, encode::encode_uuid};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

// ─── Statements ──────────────────────────────────────────────────────────────

pub fn apply(conn: &Connection, write: DerivedWrite) -> Result<()> {
  match write {
    DerivedWrite::MileageHighWater { vehicle_id, mileage } => {
      conn.execute(
        "UPDATE vehicles SET current_mileage = MAX(current_mileage, ?2)
          WHERE vehicle_id = ?1",
        rusqlite::params![encode_uuid(vehicle_id), mileage],
      )?;
    }
    DerivedWrite::EventTotal { event_id } => {
      conn.execute(
        "UPDATE service_events
            SET total_cost = (SELECT COALESCE(SUM(cost), 0) FROM service_items
                               WHERE event_id = ?1)
          WHERE event_id = ?1",
        rusqlite::params![encode_uuid(event_id)],
      )?;
    }
  }
  Ok(())
}

/// Recompute every event total and raise every vehicle to the highest
/// mileage among its events. Returns the number of rows that changed.
pub fn reconcile(conn: &mut Connection) -> Result<ReconcileReport> {
  let tx = conn.transaction()?;
  let event_totals = tx.execute(
    "UPDATE service_events
        SET total_cost = (SELECT COALESCE(SUM(i.cost), 0) FROM service_items i
                           WHERE i.event_id = service_events.event_id)
      WHERE total_cost <> (SELECT COALESCE(SUM(i.cost), 0) FROM service_items i
                            WHERE i.event_id = service_events.event_id)",
    [],
  )?;
  let vehicle_mileages = tx.execute(
    "UPDATE vehicles
        SET current_mileage = (SELECT MAX(e.mileage) FROM service_events e
                                WHERE e.vehicle_id = vehicles.vehicle_id)
      WHERE current_mileage < (SELECT COALESCE(MAX(e.mileage), 0) FROM service_events e
                                WHERE e.vehicle_id = vehicles.vehicle_id)",
    [],
  )?;
  tx.commit()?;
  Ok(ReconcileReport { event_totals, vehicle_mileages })
}

// ─── Settling ────────────────────────────────────────────────────────────────

async fn run_once(conn: &tokio_rusqlite::Connection, write: DerivedWrite) -> Result<()> {
  conn.call(move |conn| Ok(apply(conn, write))).await?
}

/// Apply `writes` in order. Failures are logged, counted and retried in the
/// background; they are never reported to the caller.
pub async fn settle(
  conn: &tokio_rusqlite::Connection,
  degraded: &Arc<AtomicU64>,
  cache: Option<&Arc<QueryCache>>,
  writes: impl IntoIterator<Item = DerivedWrite>,
) {
  for write in writes {
    if let Err(err) = run_once(conn, write).await {
      let degraded_error = wrench_core::Error::DegradedConsistency(write);
      tracing::warn!(error = %err, "{degraded_error}");
      degraded.fetch_add(1, Ordering::Relaxed);
      tokio::spawn(retry(conn.clone(), cache.cloned(), write));
    }
  }
}

/// Drop cached reads after derived state changed outside a request.
pub fn repaired(cache: Option<&Arc<QueryCache>>) {
  if let Some(cache) = cache {
    let dropped = cache.clear();
    tracing::debug!(dropped, "cache cleared after derived state repair");
  }
}

async fn retry(
  conn: tokio_rusqlite::Connection,
  cache: Option<Arc<QueryCache>>,
  write: DerivedWrite,
) {
  let mut delay = RETRY_BASE_DELAY;
  for attempt in 1..=RETRY_ATTEMPTS {
    tokio::time::sleep(delay).await;
    match run_once(&conn, write).await {
      Ok(()) => {
        tracing::info!(attempt, "derived write recovered: {write}");
        repaired(cache.as_ref());
        return;
      }
      Err(err) => {
        tracing::debug!(attempt, error = %err, "derived write retry failed: {write}");
        delay *= 2;
      }
    }
  }
  tracing::error!(
    attempts = RETRY_ATTEMPTS,
    "derived write abandoned, run reconcile to repair: {write}"
  );
}
