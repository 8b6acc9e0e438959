//! Read cache with explicit invalidation keys.
//!
//! Results are cached per `(owner, Scope)`. Every write maps to a
//! [`Mutation`], and [`Mutation::invalidates`] is the single place that
//! decides which cached scopes that write makes stale. Because the owner is
//! part of every key, a cached result is never served to a different user.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
  time::{Duration, Instant},
};

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::UserId;

/// Entries are only swept for expiry once the map grows past this size.
const SWEEP_THRESHOLD: usize = 4096;

/// A cacheable read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
  Vehicles,
  Vehicle(Uuid),
  /// Events of a vehicle.
  ServiceEvents(Uuid),
  ServiceEvent(Uuid),
  /// Items of an event.
  ServiceItems(Uuid),
  ServiceItem(Uuid),
  /// Reminders of a vehicle.
  Reminders(Uuid),
  Reminder(Uuid),
  DueReminders,
}

/// A completed write, described by the ids it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  /// Vehicle created or updated.
  Vehicle { vehicle_id: Uuid },
  VehicleDeleted { vehicle_id: Uuid },
  /// Event created or updated; may have raised the vehicle's mileage.
  ServiceEvent { vehicle_id: Uuid, event_id: Uuid },
  ServiceEventDeleted { vehicle_id: Uuid, event_id: Uuid },
  /// Item created, updated or deleted; changes the event total.
  ServiceItem { event_id: Uuid, item_id: Uuid },
  /// Reminder created, updated, completed or deleted.
  Reminder { vehicle_id: Uuid, reminder_id: Uuid },
}

impl Mutation {
  pub fn invalidates(&self, scope: &Scope) -> bool {
    use Scope as S;
    match *self {
      Self::Vehicle { vehicle_id } => {
        matches!(scope, S::Vehicles | S::DueReminders)
          || *scope == S::Vehicle(vehicle_id)
      }
      Self::VehicleDeleted { .. } => true,
      Self::ServiceEvent { vehicle_id, event_id } => {
        matches!(scope, S::Vehicles | S::DueReminders)
          || *scope == S::Vehicle(vehicle_id)
          || *scope == S::ServiceEvents(vehicle_id)
          || *scope == S::ServiceEvent(event_id)
          || *scope == S::ServiceItems(event_id)
      }
      Self::ServiceEventDeleted { vehicle_id, event_id } => {
        matches!(scope, S::Vehicles | S::DueReminders | S::ServiceItem(_))
          || *scope == S::Vehicle(vehicle_id)
          || *scope == S::ServiceEvents(vehicle_id)
          || *scope == S::ServiceEvent(event_id)
          || *scope == S::ServiceItems(event_id)
      }
      Self::ServiceItem { event_id, item_id } => {
        matches!(scope, S::ServiceEvents(_))
          || *scope == S::ServiceEvent(event_id)
          || *scope == S::ServiceItems(event_id)
          || *scope == S::ServiceItem(item_id)
      }
      Self::Reminder { vehicle_id, reminder_id } => {
        matches!(scope, S::DueReminders)
          || *scope == S::Reminders(vehicle_id)
          || *scope == S::Reminder(reminder_id)
      }
    }
  }
}

struct Entry {
  value:     serde_json::Value,
  stored_at: Instant,
}

/// Snapshot of the invalidation state seen by a read before it loads.
///
/// A result loaded under a stale generation is never stored, so a write
/// that lands while the load is in flight cannot be masked by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
  epoch: u64,
  owner: u64,
}

#[derive(Default)]
struct Inner {
  entries:     HashMap<(UserId, Scope), Entry>,
  /// Bumped per owner by [`QueryCache::invalidate`].
  generations: HashMap<UserId, u64>,
  /// Bumped for everyone by [`QueryCache::clear`].
  epoch:       u64,
}

impl Inner {
  fn generation(&self, owner: &UserId) -> Generation {
    Generation { epoch: self.epoch, owner: self.generations.get(owner).copied().unwrap_or(0) }
  }
}

/// In-process cache of serialized read results.
pub struct QueryCache {
  ttl:   Duration,
  inner: RwLock<Inner>,
}

impl QueryCache {
  /// A zero `ttl` disables caching.
  pub fn new(ttl: Duration) -> Self { Self { ttl, inner: RwLock::new(Inner::default()) } }

  pub fn get<T: DeserializeOwned>(&self, owner: &UserId, scope: Scope) -> Option<T> {
    let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
    let entry = inner.entries.get(&(owner.clone(), scope))?;
    if entry.stored_at.elapsed() >= self.ttl {
      return None;
    }
    serde_json::from_value(entry.value.clone()).ok()
  }

  /// Record before loading; pass the result to [`QueryCache::put`].
  pub fn generation(&self, owner: &UserId) -> Generation {
    self.inner.read().unwrap_or_else(PoisonError::into_inner).generation(owner)
  }

  /// Store `value` unless `owner` saw an invalidation since `seen` was
  /// taken. Returns whether the value was stored.
  pub fn put<T: Serialize>(
    &self,
    owner: &UserId,
    scope: Scope,
    seen: Generation,
    value: &T,
  ) -> bool {
    if self.ttl.is_zero() {
      return false;
    }
    let Ok(value) = serde_json::to_value(value) else { return false };
    let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
    if inner.generation(owner) != seen {
      return false;
    }
    if inner.entries.len() >= SWEEP_THRESHOLD {
      let ttl = self.ttl;
      inner.entries.retain(|_, e| e.stored_at.elapsed() < ttl);
    }
    inner.entries.insert((owner.clone(), scope), Entry { value, stored_at: Instant::now() });
    true
  }

  /// Drop every entry of `owner` made stale by `mutation`. Returns the
  /// number of entries removed.
  pub fn invalidate(&self, owner: &UserId, mutation: &Mutation) -> usize {
    let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
    *inner.generations.entry(owner.clone()).or_default() += 1;
    let before = inner.entries.len();
    inner
      .entries
      .retain(|(key_owner, scope), _| key_owner != owner || !mutation.invalidates(scope));
    before - inner.entries.len()
  }

  /// Drop everything. Used when derived state is repaired outside a request,
  /// where the affected owner is not known.
  pub fn clear(&self) -> usize {
    let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
    inner.epoch += 1;
    let dropped = inner.entries.len();
    inner.entries.clear();
    dropped
  }

  #[cfg(test)]
  fn len(&self) -> usize { self.inner.read().unwrap_or_else(PoisonError::into_inner).entries.len() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cache() -> QueryCache { QueryCache::new(Duration::from_secs(60)) }

  #[test]
  fn entries_are_per_owner() {
    let c = cache();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    c.put(&alice, Scope::Vehicles, c.generation(&alice), &vec![1, 2, 3]);
    assert_eq!(c.get::<Vec<i32>>(&alice, Scope::Vehicles), Some(vec![1, 2, 3]));
    assert_eq!(c.get::<Vec<i32>>(&bob, Scope::Vehicles), None);
  }

  #[test]
  fn zero_ttl_disables_caching() {
    let c = QueryCache::new(Duration::ZERO);
    let alice = UserId::new("alice");
    c.put(&alice, Scope::Vehicles, c.generation(&alice), &1);
    assert_eq!(c.len(), 0);
    assert_eq!(c.get::<i32>(&alice, Scope::Vehicles), None);
  }

  #[test]
  fn item_write_invalidates_event_but_not_reminders() {
    let c = cache();
    let alice = UserId::new("alice");
    let (vehicle, event, item) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    c.put(&alice, Scope::ServiceEvent(event), c.generation(&alice), &1);
    c.put(&alice, Scope::ServiceEvents(vehicle), c.generation(&alice), &1);
    c.put(&alice, Scope::ServiceItems(event), c.generation(&alice), &1);
    c.put(&alice, Scope::Reminders(vehicle), c.generation(&alice), &1);
    c.put(&alice, Scope::Vehicle(vehicle), c.generation(&alice), &1);

    let removed = c.invalidate(&alice, &Mutation::ServiceItem { event_id: event, item_id: item });
    assert_eq!(removed, 3);
    assert_eq!(c.get::<i32>(&alice, Scope::Reminders(vehicle)), Some(1));
    assert_eq!(c.get::<i32>(&alice, Scope::Vehicle(vehicle)), Some(1));
  }

  #[test]
  fn event_write_invalidates_vehicle_mileage() {
    let (vehicle, event) = (Uuid::new_v4(), Uuid::new_v4());
    let m = Mutation::ServiceEvent { vehicle_id: vehicle, event_id: event };
    assert!(m.invalidates(&Scope::Vehicle(vehicle)));
    assert!(m.invalidates(&Scope::Vehicles));
    assert!(m.invalidates(&Scope::DueReminders));
    assert!(!m.invalidates(&Scope::Vehicle(Uuid::new_v4())));
    assert!(!m.invalidates(&Scope::ServiceItem(Uuid::new_v4())));

    let d = Mutation::ServiceEventDeleted { vehicle_id: vehicle, event_id: event };
    assert!(d.invalidates(&Scope::ServiceItem(Uuid::new_v4())));
  }

  #[test]
  fn vehicle_delete_clears_only_that_owner() {
    let c = cache();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    c.put(&alice, Scope::Vehicles, c.generation(&alice), &1);
    c.put(&alice, Scope::DueReminders, c.generation(&alice), &1);
    c.put(&bob, Scope::Vehicles, c.generation(&bob), &1);
    c.invalidate(&alice, &Mutation::VehicleDeleted { vehicle_id: Uuid::new_v4() });
    assert_eq!(c.len(), 1);
    assert_eq!(c.get::<i32>(&bob, Scope::Vehicles), Some(1));
  }

  #[test]
  fn load_that_races_an_invalidation_is_not_stored() {
    let c = cache();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let vehicle = Uuid::new_v4();

    let seen = c.generation(&alice);
    let bob_seen = c.generation(&bob);
    c.invalidate(&alice, &Mutation::Vehicle { vehicle_id: vehicle });

    assert!(!c.put(&alice, Scope::Vehicle(vehicle), seen, &50_000));
    assert_eq!(c.get::<i64>(&alice, Scope::Vehicle(vehicle)), None);

    // Other owners are unaffected.
    assert!(c.put(&bob, Scope::Vehicles, bob_seen, &1));

    let fresh = c.generation(&alice);
    assert!(c.put(&alice, Scope::Vehicle(vehicle), fresh, &52_000));
    assert_eq!(c.get::<i64>(&alice, Scope::Vehicle(vehicle)), Some(52_000));
  }

  #[test]
  fn clear_drops_everything_and_in_flight_loads() {
    let c = cache();
    let alice = UserId::new("alice");
    let seen = c.generation(&alice);
    c.put(&alice, Scope::Vehicles, seen, &1);
    assert_eq!(c.clear(), 1);
    assert!(!c.put(&alice, Scope::DueReminders, seen, &1));
    assert_eq!(c.len(), 0);
  }
}
