//! Field normalization and validation shared by every entity.
//!
//! All user-supplied values pass through these helpers once, at the store
//! boundary, so call sites never repeat empty-string or range handling.

use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// Trim an optional text field. Empty and whitespace-only values become
/// `None`; they are never stored as empty strings.
pub fn optional_text(value: Option<String>) -> Option<String> {
  value.and_then(|v| {
    let trimmed = v.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
  })
}

/// Canonical form of a unique identifier (VIN, license plate): trimmed and
/// upper-cased, absent when empty.
pub fn identifier(value: Option<String>) -> Option<String> {
  optional_text(value).map(|v| v.to_uppercase())
}

/// Trim a required text field, rejecting empty values.
pub fn required_text(field: &'static str, value: String) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::validation(field, "must not be empty"));
  }
  Ok(trimmed.to_owned())
}

pub fn non_negative(field: &'static str, value: i64) -> Result<i64> {
  if value < 0 {
    return Err(Error::validation(field, "must not be negative"));
  }
  Ok(value)
}

/// Upper bound on an item cost and on an event total, in the smallest
/// currency unit. Keeps every stored `SUM(cost)` far from `i64` overflow.
pub const MAX_COST: i64 = 1_000_000_000_000_000;

/// A single item cost: non-negative and at most [`MAX_COST`].
pub fn cost(value: i64) -> Result<i64> {
  let value = non_negative("cost", value)?;
  if value > MAX_COST {
    return Err(Error::validation("cost", format!("must not exceed {MAX_COST}")));
  }
  Ok(value)
}

/// Sum item costs for one event, rejecting totals above [`MAX_COST`].
pub fn total_cost(costs: impl IntoIterator<Item = i64>) -> Result<i64> {
  costs
    .into_iter()
    .try_fold(0i64, |total, c| total.checked_add(c))
    .filter(|total| *total <= MAX_COST)
    .ok_or_else(|| Error::validation("cost", format!("event total must not exceed {MAX_COST}")))
}

/// Intervals are either absent or strictly positive.
pub fn positive(field: &'static str, value: Option<i64>) -> Result<Option<i64>> {
  match value {
    Some(v) if v <= 0 => Err(Error::validation(field, "must be greater than zero")),
    other => Ok(other),
  }
}

/// Deserializer for patch fields that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: an absent key
/// yields `None`, an explicit `null` yields `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_optional_text_is_absent() {
    assert_eq!(optional_text(Some(String::new())), None);
    assert_eq!(optional_text(Some("   ".into())), None);
    assert_eq!(optional_text(None), None);
    assert_eq!(optional_text(Some("  hi ".into())), Some("hi".into()));
  }

  #[test]
  fn identifiers_are_canonical() {
    assert_eq!(identifier(Some(" abc123 ".into())), Some("ABC123".into()));
    assert_eq!(identifier(Some("".into())), None);
  }

  #[test]
  fn required_text_rejects_blank() {
    let err = required_text("make", "  ".into()).unwrap_err();
    assert_eq!(err.field(), Some("make"));
    assert_eq!(required_text("make", " Volvo ".into()).unwrap(), "Volvo");
  }

  #[test]
  fn ranges() {
    assert!(non_negative("mileage", -1).is_err());
    assert_eq!(non_negative("mileage", 0).unwrap(), 0);
    assert!(positive("interval_months", Some(0)).is_err());
    assert_eq!(positive("interval_months", None).unwrap(), None);
  }

  #[test]
  fn costs_are_bounded() {
    assert_eq!(cost(MAX_COST).unwrap(), MAX_COST);
    assert_eq!(cost(MAX_COST + 1).unwrap_err().field(), Some("cost"));
    assert!(cost(-1).is_err());

    assert_eq!(total_cost([500, 150]).unwrap(), 650);
    assert_eq!(total_cost(Vec::new()).unwrap(), 0);
    assert!(total_cost([MAX_COST, 1]).is_err());
    assert!(total_cost([i64::MAX / 2 + 1, i64::MAX / 2 + 1]).is_err());
  }

  #[derive(Deserialize)]
  struct Patch {
    #[serde(default, deserialize_with = "nullable")]
    notes: Option<Option<String>>,
  }

  #[test]
  fn nullable_distinguishes_absent_from_null() {
    let absent: Patch = serde_json::from_str("{}").unwrap();
    assert_eq!(absent.notes, None);
    let null: Patch = serde_json::from_str(r#"{"notes":null}"#).unwrap();
    assert_eq!(null.notes, Some(None));
    let set: Patch = serde_json::from_str(r#"{"notes":"x"}"#).unwrap();
    assert_eq!(set.notes, Some(Some("x".into())));
  }
}
