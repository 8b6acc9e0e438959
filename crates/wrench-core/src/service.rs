//! Service events (one per workshop visit) and their itemized line items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  normalize::{self, non_negative, nullable, optional_text, required_text},
};

// ─── Service event ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEvent {
  pub event_id:   Uuid,
  pub vehicle_id: Uuid,
  /// The day the service was performed; lists sort on this, not on
  /// `created_at`.
  pub date:       NaiveDate,
  /// Odometer reading at the time of service.
  pub mileage:    i64,
  /// Derived: the sum of the costs of this event's items.
  pub total_cost: i64,
  pub notes:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input for logging a visit. Items may be supplied inline; they are stored
/// in the same transaction as the event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewServiceEvent {
  pub date:    NaiveDate,
  pub mileage: i64,
  pub notes:   Option<String>,
  #[serde(default)]
  pub items:   Vec<NewServiceItem>,
}

impl NewServiceEvent {
  pub fn new(date: NaiveDate, mileage: i64) -> Self {
    Self { date, mileage, notes: None, items: Vec::new() }
  }

  pub fn with_item(mut self, item: NewServiceItem) -> Self {
    self.items.push(item);
    self
  }

  pub fn normalize(self) -> Result<Self> {
    let items: Vec<NewServiceItem> = self
      .items
      .into_iter()
      .map(NewServiceItem::normalize)
      .collect::<Result<_>>()?;
    normalize::total_cost(items.iter().map(|i| i.cost))?;
    Ok(Self {
      date: self.date,
      mileage: non_negative("mileage", self.mileage)?,
      notes: optional_text(self.notes),
      items,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceEventPatch {
  pub date:    Option<NaiveDate>,
  pub mileage: Option<i64>,
  #[serde(default, deserialize_with = "nullable")]
  pub notes:   Option<Option<String>>,
}

impl ServiceEventPatch {
  pub fn apply(self, event: &mut ServiceEvent) -> Result<()> {
    let mileage = self.mileage.map(|m| non_negative("mileage", m)).transpose()?;
    if let Some(date) = self.date {
      event.date = date;
    }
    if let Some(mileage) = mileage {
      event.mileage = mileage;
    }
    if let Some(notes) = self.notes {
      event.notes = optional_text(notes);
    }
    Ok(())
  }
}

// ─── Service item ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
  pub item_id:     Uuid,
  pub event_id:    Uuid,
  /// Category label, usually one from [`crate::catalog`].
  pub kind:        String,
  pub description: Option<String>,
  /// Smallest currency unit.
  pub cost:        i64,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewServiceItem {
  #[serde(alias = "type")]
  pub kind:        String,
  pub description: Option<String>,
  #[serde(default)]
  pub cost:        i64,
}

impl NewServiceItem {
  pub fn new(kind: impl Into<String>, cost: i64) -> Self {
    Self { kind: kind.into(), description: None, cost }
  }

  pub fn normalize(self) -> Result<Self> {
    Ok(Self {
      kind:        required_text("kind", self.kind)?,
      description: optional_text(self.description),
      cost:        normalize::cost(self.cost)?,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceItemPatch {
  #[serde(alias = "type")]
  pub kind:        Option<String>,
  #[serde(default, deserialize_with = "nullable")]
  pub description: Option<Option<String>>,
  pub cost:        Option<i64>,
}

impl ServiceItemPatch {
  pub fn apply(self, item: &mut ServiceItem) -> Result<()> {
    let kind = self.kind.map(|k| required_text("kind", k)).transpose()?;
    let cost = self.cost.map(normalize::cost).transpose()?;
    if let Some(kind) = kind {
      item.kind = kind;
    }
    if let Some(description) = self.description {
      item.description = optional_text(description);
    }
    if let Some(cost) = cost {
      item.cost = cost;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn item_accepts_type_alias_and_defaults_cost() {
    let item: NewServiceItem = serde_json::from_str(r#"{"type":"Motorolja"}"#).unwrap();
    assert_eq!(item.kind, "Motorolja");
    assert_eq!(item.cost, 0);
  }

  #[test]
  fn event_normalization_checks_items() {
    let date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
    let bad = NewServiceEvent::new(date, 1000).with_item(NewServiceItem::new("Oljefilter", -1));
    assert_eq!(bad.normalize().unwrap_err().field(), Some("cost"));

    let blank = NewServiceEvent::new(date, 1000).with_item(NewServiceItem::new(" ", 10));
    assert_eq!(blank.normalize().unwrap_err().field(), Some("kind"));

    assert!(NewServiceEvent::new(date, -1).normalize().is_err());
  }

  #[test]
  fn inline_items_cannot_overflow_the_total() {
    let date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
    let half = i64::MAX / 2 + 1;
    let huge = NewServiceEvent::new(date, 1000)
      .with_item(NewServiceItem::new("Motorolja", half))
      .with_item(NewServiceItem::new("Oljefilter", half));
    assert_eq!(huge.normalize().unwrap_err().field(), Some("cost"));

    let max = normalize::MAX_COST;
    let over = NewServiceEvent::new(date, 1000)
      .with_item(NewServiceItem::new("Motorolja", max))
      .with_item(NewServiceItem::new("Oljefilter", 1));
    assert_eq!(over.normalize().unwrap_err().field(), Some("cost"));
  }

  #[test]
  fn event_patch() {
    let mut event = ServiceEvent {
      event_id:   Uuid::new_v4(),
      vehicle_id: Uuid::new_v4(),
      date:       NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
      mileage:    10,
      total_cost: 0,
      notes:      Some("x".into()),
      created_at: Utc::now(),
    };
    let patch: ServiceEventPatch =
      serde_json::from_str(r#"{"mileage":20,"notes":"  "}"#).unwrap();
    patch.apply(&mut event).unwrap();
    assert_eq!(event.mileage, 20);
    assert_eq!(event.notes, None);
  }
}
