//! Reminders: user-configured future maintenance triggers.
//!
//! A reminder is due by date, by mileage, or both. Recurring reminders roll
//! forward on completion: see [`Reminder::successor`].

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  normalize::{non_negative, nullable, optional_text, positive, required_text},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
  pub reminder_id:       Uuid,
  pub vehicle_id:        Uuid,
  pub kind:              String,
  pub due_date:          Option<NaiveDate>,
  pub due_mileage:       Option<i64>,
  pub recurring:         bool,
  pub interval_months:   Option<i64>,
  /// Interval in the same distance unit as vehicle mileage.
  pub interval_distance: Option<i64>,
  pub completed:         bool,
  pub notes:             Option<String>,
  pub created_at:        DateTime<Utc>,
}

// ─── Input ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReminder {
  #[serde(alias = "type")]
  pub kind:              String,
  pub due_date:          Option<NaiveDate>,
  pub due_mileage:       Option<i64>,
  #[serde(default)]
  pub recurring:         bool,
  pub interval_months:   Option<i64>,
  pub interval_distance: Option<i64>,
  pub notes:             Option<String>,
}

impl NewReminder {
  pub fn new(kind: impl Into<String>) -> Self {
    Self { kind: kind.into(), ..Self::default() }
  }

  pub fn normalize(self) -> Result<Self> {
    let reminder = Self {
      kind:              required_text("kind", self.kind)?,
      due_date:          self.due_date,
      due_mileage:       self.due_mileage.map(|m| non_negative("due_mileage", m)).transpose()?,
      recurring:         self.recurring,
      interval_months:   positive("interval_months", self.interval_months)?,
      interval_distance: positive("interval_distance", self.interval_distance)?,
      notes:             optional_text(self.notes),
    };
    check_schedule(
      reminder.due_date,
      reminder.due_mileage,
      reminder.recurring,
      reminder.interval_months,
      reminder.interval_distance,
    )?;
    Ok(reminder)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderPatch {
  #[serde(alias = "type")]
  pub kind:              Option<String>,
  #[serde(default, deserialize_with = "nullable")]
  pub due_date:          Option<Option<NaiveDate>>,
  #[serde(default, deserialize_with = "nullable")]
  pub due_mileage:       Option<Option<i64>>,
  pub recurring:         Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub interval_months:   Option<Option<i64>>,
  #[serde(default, deserialize_with = "nullable")]
  pub interval_distance: Option<Option<i64>>,
  /// Sets the flag only. Use the store's `complete_reminder` to also roll a
  /// recurring reminder forward.
  pub completed:         Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub notes:             Option<Option<String>>,
}

impl ReminderPatch {
  /// Apply the patch; the resulting reminder must still be actionable.
  /// On error `reminder` is unchanged.
  pub fn apply(self, reminder: &mut Reminder) -> Result<()> {
    let mut next = reminder.clone();
    if let Some(kind) = self.kind {
      next.kind = required_text("kind", kind)?;
    }
    if let Some(due_date) = self.due_date {
      next.due_date = due_date;
    }
    if let Some(due_mileage) = self.due_mileage {
      next.due_mileage = due_mileage.map(|m| non_negative("due_mileage", m)).transpose()?;
    }
    if let Some(recurring) = self.recurring {
      next.recurring = recurring;
    }
    if let Some(months) = self.interval_months {
      next.interval_months = positive("interval_months", months)?;
    }
    if let Some(distance) = self.interval_distance {
      next.interval_distance = positive("interval_distance", distance)?;
    }
    if let Some(completed) = self.completed {
      next.completed = completed;
    }
    if let Some(notes) = self.notes {
      next.notes = optional_text(notes);
    }
    check_schedule(
      next.due_date,
      next.due_mileage,
      next.recurring,
      next.interval_months,
      next.interval_distance,
    )?;
    *reminder = next;
    Ok(())
  }
}

fn check_schedule(
  due_date: Option<NaiveDate>,
  due_mileage: Option<i64>,
  recurring: bool,
  interval_months: Option<i64>,
  interval_distance: Option<i64>,
) -> Result<()> {
  if due_date.is_none() && due_mileage.is_none() {
    return Err(Error::validation("due_date", "a due date or a due mileage is required"));
  }
  if recurring && interval_months.is_none() && interval_distance.is_none() {
    return Err(Error::validation(
      "interval_months",
      "a recurring reminder needs an interval in months or distance",
    ));
  }
  Ok(())
}

// ─── Recurrence ──────────────────────────────────────────────────────────────

/// Result of completing a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderCompletion {
  pub completed: Reminder,
  /// The follow-up created for a recurring reminder. `None` when a reopened
  /// reminder is completed again while its earlier follow-up still exists.
  pub next:      Option<Reminder>,
}

impl Reminder {
  /// The follow-up reminder created when this one is completed, or `None`
  /// when it does not recur.
  ///
  /// Each interval advances from the old due value, falling back to `today`
  /// and `current_mileage` when the old reminder had no such due value.
  pub fn successor(&self, today: NaiveDate, current_mileage: i64) -> Option<NewReminder> {
    if !self.recurring {
      return None;
    }
    let due_date = self.interval_months.and_then(|months| {
      let months = u32::try_from(months).ok()?;
      self.due_date.unwrap_or(today).checked_add_months(Months::new(months))
    });
    let due_mileage = self
      .interval_distance
      .map(|distance| self.due_mileage.unwrap_or(current_mileage).saturating_add(distance));
    if due_date.is_none() && due_mileage.is_none() {
      return None;
    }
    Some(NewReminder {
      kind: self.kind.clone(),
      due_date,
      due_mileage,
      recurring: true,
      interval_months: self.interval_months,
      interval_distance: self.interval_distance,
      notes: self.notes.clone(),
    })
  }
}

// ─── Due reminders ───────────────────────────────────────────────────────────

/// How far ahead a reminder counts as upcoming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueWindow {
  pub horizon_days:   u64,
  pub mileage_margin: i64,
}

impl Default for DueWindow {
  fn default() -> Self { Self { horizon_days: 14, mileage_margin: 500 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
  Overdue,
  Upcoming,
}

impl Reminder {
  /// Whether this reminder should be surfaced on `today` for a vehicle at
  /// `current_mileage`. Completed reminders are never due.
  pub fn due_status(
    &self,
    today: NaiveDate,
    current_mileage: i64,
    window: DueWindow,
  ) -> Option<DueStatus> {
    if self.completed {
      return None;
    }
    let date_overdue = self.due_date.is_some_and(|d| d <= today);
    let mileage_overdue = self.due_mileage.is_some_and(|m| m <= current_mileage);
    if date_overdue || mileage_overdue {
      return Some(DueStatus::Overdue);
    }

    let horizon = today.checked_add_days(Days::new(window.horizon_days));
    let date_upcoming = matches!((self.due_date, horizon), (Some(d), Some(h)) if d <= h);
    let mileage_upcoming = self
      .due_mileage
      .is_some_and(|m| m <= current_mileage.saturating_add(window.mileage_margin));
    if date_upcoming || mileage_upcoming {
      return Some(DueStatus::Upcoming);
    }
    None
  }
}

/// A due reminder together with the vehicle context a notifier needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueReminder {
  pub reminder:        Reminder,
  pub vehicle_label:   String,
  pub current_mileage: i64,
  pub status:          DueStatus,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn reminder() -> Reminder {
    Reminder {
      reminder_id:       Uuid::new_v4(),
      vehicle_id:        Uuid::new_v4(),
      kind:              "Oljeservice".into(),
      due_date:          Some(date(2026, 1, 31)),
      due_mileage:       Some(60_000),
      recurring:         true,
      interval_months:   Some(12),
      interval_distance: Some(15_000),
      completed:         false,
      notes:             None,
      created_at:        Utc::now(),
    }
  }

  #[test]
  fn requires_date_or_mileage() {
    let err = NewReminder::new("Besiktning").normalize().unwrap_err();
    assert_eq!(err.field(), Some("due_date"));
    let ok = NewReminder { due_mileage: Some(1000), ..NewReminder::new("Besiktning") };
    assert!(ok.normalize().is_ok());
  }

  #[test]
  fn recurring_requires_interval() {
    let input = NewReminder {
      due_date: Some(date(2026, 6, 1)),
      recurring: true,
      ..NewReminder::new("Däckbyte")
    };
    assert!(input.normalize().is_err());
  }

  #[test]
  fn patch_cannot_remove_both_due_values() {
    let mut r = reminder();
    let patch: ReminderPatch =
      serde_json::from_str(r#"{"due_date":null,"due_mileage":null}"#).unwrap();
    assert!(patch.apply(&mut r).is_err());
    assert_eq!(r.due_date, Some(date(2026, 1, 31)));

    let patch: ReminderPatch = serde_json::from_str(r#"{"due_date":null}"#).unwrap();
    patch.apply(&mut r).unwrap();
    assert_eq!(r.due_date, None);
    assert_eq!(r.due_mileage, Some(60_000));
  }

  #[test]
  fn successor_advances_both_intervals() {
    let next = reminder().successor(date(2026, 2, 10), 61_000).unwrap();
    assert_eq!(next.due_date, Some(date(2027, 1, 31)));
    assert_eq!(next.due_mileage, Some(75_000));
    assert!(next.recurring);
  }

  #[test]
  fn successor_falls_back_to_today_and_current_mileage() {
    let r = Reminder { due_date: None, due_mileage: None, ..reminder() };
    let next = r.successor(date(2026, 2, 10), 61_000).unwrap();
    assert_eq!(next.due_date, Some(date(2027, 2, 10)));
    assert_eq!(next.due_mileage, Some(76_000));
  }

  #[test]
  fn month_end_clamps() {
    let r = Reminder { interval_months: Some(1), interval_distance: None, ..reminder() };
    let next = r.successor(date(2026, 1, 1), 0).unwrap();
    assert_eq!(next.due_date, Some(date(2026, 2, 28)));
    assert_eq!(next.due_mileage, None);
  }

  #[test]
  fn one_off_has_no_successor() {
    let r = Reminder { recurring: false, ..reminder() };
    assert!(r.successor(date(2026, 1, 1), 0).is_none());
  }

  #[test]
  fn due_status() {
    let window = DueWindow { horizon_days: 14, mileage_margin: 500 };
    let r = reminder();
    assert_eq!(r.due_status(date(2026, 2, 1), 10_000, window), Some(DueStatus::Overdue));
    assert_eq!(r.due_status(date(2026, 1, 1), 60_000, window), Some(DueStatus::Overdue));
    assert_eq!(r.due_status(date(2026, 1, 20), 10_000, window), Some(DueStatus::Upcoming));
    assert_eq!(r.due_status(date(2025, 6, 1), 59_600, window), Some(DueStatus::Upcoming));
    assert_eq!(r.due_status(date(2025, 6, 1), 10_000, window), None);

    let done = Reminder { completed: true, ..r };
    assert_eq!(done.due_status(date(2027, 1, 1), 99_999, window), None);
  }
}
