//! Ownership guard.
//!
//! Every record belongs to exactly one user through its vehicle. Backends look
//! up the user owning a target record and pass it to [`authorize`] before any
//! single-record read, any list scoped under a parent, and any write.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque user identifier supplied by the caller identity provider.
///
/// The core trusts this value without re-verifying credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// How a record that exists but belongs to someone else is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
  /// Report it exactly like a missing record, so existence never leaks
  /// across users.
  #[default]
  Conceal,
  /// Report [`Error::Forbidden`]; useful for operator diagnostics.
  Distinguish,
}

// ─── Targets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  #[strum(serialize = "vehicle")]
  Vehicle,
  #[strum(serialize = "service event")]
  ServiceEvent,
  #[strum(serialize = "service item")]
  ServiceItem,
  #[strum(serialize = "reminder")]
  Reminder,
}

/// A record addressed by kind and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
  pub kind: ResourceKind,
  pub id:   Uuid,
}

impl Resource {
  pub fn vehicle(id: Uuid) -> Self { Self { kind: ResourceKind::Vehicle, id } }

  pub fn service_event(id: Uuid) -> Self { Self { kind: ResourceKind::ServiceEvent, id } }

  pub fn service_item(id: Uuid) -> Self { Self { kind: ResourceKind::ServiceItem, id } }

  pub fn reminder(id: Uuid) -> Self { Self { kind: ResourceKind::Reminder, id } }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.kind, self.id)
  }
}

// ─── Check ───────────────────────────────────────────────────────────────────

/// Decide whether `actor` may act on `target`, whose transitively-owning user
/// is `owner` (`None` when the record does not exist).
pub fn authorize(
  policy: AccessPolicy,
  target: Resource,
  owner: Option<&UserId>,
  actor: &UserId,
) -> Result<()> {
  match owner {
    None => Err(Error::NotFound(target)),
    Some(owner) if owner == actor => Ok(()),
    Some(_) => match policy {
      AccessPolicy::Conceal => Err(Error::NotFound(target)),
      AccessPolicy::Distinguish => Err(Error::Forbidden(target)),
    },
  }
}
