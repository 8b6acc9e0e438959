//! The curated taxonomy of maintenance work offered when logging items.
//!
//! Item kinds are free text; this list only drives suggestions.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceCategory {
  pub name:  &'static str,
  pub kinds: &'static [&'static str],
}

pub const CATALOG: &[ServiceCategory] = &[
  ServiceCategory { name: "Oljeservice", kinds: &["Motorolja", "Oljefilter"] },
  ServiceCategory {
    name:  "Bromsservice",
    kinds: &["Bromsbelägg", "Bromsskivor", "Bromsvätska"],
  },
  ServiceCategory { name: "Filter", kinds: &["Luftfilter", "Kupéfilter", "Bränslefilter"] },
  ServiceCategory { name: "Tändsystem", kinds: &["Tändstift", "Tändspolar"] },
  ServiceCategory { name: "Kylsystem", kinds: &["Kylvätskebyte", "Termostat", "Vattenpump"] },
  ServiceCategory {
    name:  "Chassi & slitdelar",
    kinds: &[
      "Däckbyte (sommar/vinter)",
      "Däckrotation",
      "Hjulinställning",
      "Stötdämpare",
      "Fjädrar",
      "Hjullager",
    ],
  },
  ServiceCategory {
    name:  "Drivlina",
    kinds: &["Växellådsolja (manuell / automat)", "Koppling", "Drivaxlar", "Differentialolja"],
  },
  ServiceCategory {
    name:  "El & elektronik",
    kinds: &["Batteribyte", "Generator", "Startmotor", "Lampor", "Säkringar"],
  },
  ServiceCategory {
    name:  "Vätskor & kontroller",
    kinds: &[
      "Servoolja",
      "Spolarvätska",
      "AC-service (påfyllning / läcktest)",
      "Bromsvätskekontroll",
    ],
  },
  ServiceCategory {
    name:  "Service & kontroller",
    kinds: &[
      "Årlig service",
      "Inspektion",
      "Besiktning (för- / efterkontroll)",
      "Diagnos / felkoder (DTC)",
    ],
  },
  ServiceCategory {
    name:  "Kaross & komfort",
    kinds: &["Rostskydd", "Vindruta", "Torkarblad", "Lås & gångjärn (smörjning)"],
  },
];
