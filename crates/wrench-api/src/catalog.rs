//! `GET /service-types`: the fixed maintenance taxonomy.

use axum::Json;
use wrench_core::catalog::{CATALOG, ServiceCategory};

pub async fn list() -> Json<&'static [ServiceCategory]> { Json(CATALOG) }
