//! Vehicles, the root of every ownership chain.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result, UserId,
  normalize::{identifier, non_negative, nullable, optional_text, positive, required_text},
};

/// Earliest model year accepted.
pub const MIN_YEAR: i32 = 1900;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
  pub vehicle_id:              Uuid,
  pub owner:                   UserId,
  pub name:                    Option<String>,
  pub make:                    String,
  pub model:                   String,
  pub year:                    i32,
  pub vin:                     Option<String>,
  pub license_plate:           Option<String>,
  /// High-water mark; never lowered by service-event writes.
  pub current_mileage:         i64,
  pub service_interval_months: Option<i64>,
  pub service_interval_km:     Option<i64>,
  pub notes:                   Option<String>,
  pub created_at:              DateTime<Utc>,
}

impl Vehicle {
  /// The user-facing label: the display name, or "make model".
  pub fn label(&self) -> String {
    match &self.name {
      Some(name) => name.clone(),
      None => format!("{} {}", self.make, self.model),
    }
  }
}

/// Input for creating a vehicle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVehicle {
  pub name:                    Option<String>,
  pub make:                    String,
  pub model:                   String,
  pub year:                    i32,
  pub vin:                     Option<String>,
  pub license_plate:           Option<String>,
  #[serde(default)]
  pub current_mileage:         i64,
  pub service_interval_months: Option<i64>,
  pub service_interval_km:     Option<i64>,
  pub notes:                   Option<String>,
}

impl NewVehicle {
  pub fn new(make: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
    Self { make: make.into(), model: model.into(), year, ..Self::default() }
  }

  /// Validate every field and return the canonical form.
  pub fn normalize(self, today: NaiveDate) -> Result<Self> {
    Ok(Self {
      name:                    optional_text(self.name),
      make:                    required_text("make", self.make)?,
      model:                   required_text("model", self.model)?,
      year:                    check_year(self.year, today)?,
      vin:                     identifier(self.vin),
      license_plate:           identifier(self.license_plate),
      current_mileage:         non_negative("current_mileage", self.current_mileage)?,
      service_interval_months: positive("service_interval_months", self.service_interval_months)?,
      service_interval_km:     positive("service_interval_km", self.service_interval_km)?,
      notes:                   optional_text(self.notes),
    })
  }
}

/// Partial update. Absent fields are left untouched; `null` clears an
/// optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehiclePatch {
  #[serde(default, deserialize_with = "nullable")]
  pub name:                    Option<Option<String>>,
  pub make:                    Option<String>,
  pub model:                   Option<String>,
  pub year:                    Option<i32>,
  #[serde(default, deserialize_with = "nullable")]
  pub vin:                     Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub license_plate:           Option<Option<String>>,
  pub current_mileage:         Option<i64>,
  #[serde(default, deserialize_with = "nullable")]
  pub service_interval_months: Option<Option<i64>>,
  #[serde(default, deserialize_with = "nullable")]
  pub service_interval_km:     Option<Option<i64>>,
  #[serde(default, deserialize_with = "nullable")]
  pub notes:                   Option<Option<String>>,
}

impl VehiclePatch {
  /// Normalize the provided fields and write them onto `vehicle`.
  ///
  /// Validation happens before anything is written, so on error `vehicle`
  /// is unchanged.
  pub fn apply(self, vehicle: &mut Vehicle, today: NaiveDate) -> Result<()> {
    let make = self.make.map(|v| required_text("make", v)).transpose()?;
    let model = self.model.map(|v| required_text("model", v)).transpose()?;
    let year = self.year.map(|y| check_year(y, today)).transpose()?;
    let mileage = self
      .current_mileage
      .map(|m| non_negative("current_mileage", m))
      .transpose()?;
    let months = self
      .service_interval_months
      .map(|v| positive("service_interval_months", v))
      .transpose()?;
    let km = self
      .service_interval_km
      .map(|v| positive("service_interval_km", v))
      .transpose()?;

    if let Some(name) = self.name {
      vehicle.name = optional_text(name);
    }
    if let Some(make) = make {
      vehicle.make = make;
    }
    if let Some(model) = model {
      vehicle.model = model;
    }
    if let Some(year) = year {
      vehicle.year = year;
    }
    if let Some(vin) = self.vin {
      vehicle.vin = identifier(vin);
    }
    if let Some(plate) = self.license_plate {
      vehicle.license_plate = identifier(plate);
    }
    if let Some(mileage) = mileage {
      vehicle.current_mileage = mileage;
    }
    if let Some(months) = months {
      vehicle.service_interval_months = months;
    }
    if let Some(km) = km {
      vehicle.service_interval_km = km;
    }
    if let Some(notes) = self.notes {
      vehicle.notes = optional_text(notes);
    }
    Ok(())
  }
}

fn check_year(year: i32, today: NaiveDate) -> Result<i32> {
  let max = today.year() + 1;
  if !(MIN_YEAR..=max).contains(&year) {
    return Err(Error::validation(
      "year",
      format!("must be between {MIN_YEAR} and {max}"),
    ));
  }
  Ok(year)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() }

  fn stored() -> Vehicle {
    Vehicle {
      vehicle_id:              Uuid::new_v4(),
      owner:                   UserId::new("alice"),
      name:                    None,
      make:                    "Toyota".into(),
      model:                   "Camry".into(),
      year:                    2020,
      vin:                     Some("VIN1".into()),
      license_plate:           None,
      current_mileage:         50_000,
      service_interval_months: None,
      service_interval_km:     None,
      notes:                   Some("daily driver".into()),
      created_at:              Utc::now(),
    }
  }

  #[test]
  fn year_bounds() {
    assert!(NewVehicle::new("Volvo", "240", 1899).normalize(today()).is_err());
    assert!(NewVehicle::new("Volvo", "240", 1900).normalize(today()).is_ok());
    assert!(NewVehicle::new("Volvo", "EX30", 2027).normalize(today()).is_ok());
    let err = NewVehicle::new("Volvo", "EX90", 2028).normalize(today()).unwrap_err();
    assert_eq!(err.field(), Some("year"));
  }

  #[test]
  fn empty_identifiers_normalize_to_absent() {
    let input = NewVehicle {
      vin: Some(String::new()),
      license_plate: Some("  ".into()),
      ..NewVehicle::new("Saab", "900", 1990)
    };
    let v = input.normalize(today()).unwrap();
    assert_eq!(v.vin, None);
    assert_eq!(v.license_plate, None);
  }

  #[test]
  fn negative_mileage_rejected() {
    let input = NewVehicle { current_mileage: -5, ..NewVehicle::new("Saab", "900", 1990) };
    let err = input.normalize(today()).unwrap_err();
    assert_eq!(err.field(), Some("current_mileage"));
  }

  #[test]
  fn patch_applies_only_present_fields() {
    let mut v = stored();
    let patch: VehiclePatch =
      serde_json::from_str(r#"{"model":" Corolla ","notes":null,"license_plate":"abc 123"}"#)
        .unwrap();
    patch.apply(&mut v, today()).unwrap();
    assert_eq!(v.model, "Corolla");
    assert_eq!(v.make, "Toyota");
    assert_eq!(v.notes, None);
    assert_eq!(v.license_plate.as_deref(), Some("ABC 123"));
    assert_eq!(v.vin.as_deref(), Some("VIN1"));
    assert_eq!(v.current_mileage, 50_000);
  }

  #[test]
  fn invalid_patch_leaves_vehicle_untouched() {
    let mut v = stored();
    let before = v.clone();
    let patch = VehiclePatch {
      notes: Some(None),
      year: Some(1800),
      ..VehiclePatch::default()
    };
    assert!(patch.apply(&mut v, today()).is_err());
    assert_eq!(v, before);
  }

  #[test]
  fn label_falls_back_to_make_and_model() {
    let mut v = stored();
    assert_eq!(v.label(), "Toyota Camry");
    v.name = Some("Blixten".into());
    assert_eq!(v.label(), "Blixten");
  }
}
