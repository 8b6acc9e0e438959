//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory store.

use std::{sync::Arc, time::Duration};

use axum::{
  Extension, Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use wrench_core::{AccessPolicy, UserId, cache::QueryCache};
use wrench_store_sqlite::SqliteStore;

use crate::api_router;

struct Harness {
  store: Arc<SqliteStore>,
  cache: Arc<QueryCache>,
}

impl Harness {
  async fn new() -> Self { Self::with_policy(AccessPolicy::Conceal).await }

  async fn with_policy(policy: AccessPolicy) -> Self {
    let store = SqliteStore::open_in_memory()
      .await
      .expect("in-memory store")
      .with_access_policy(policy);
    Self {
      store: Arc::new(store),
      cache: Arc::new(QueryCache::new(Duration::from_secs(60))),
    }
  }

  fn router(&self, user: &str) -> Router {
    api_router(self.store.clone(), self.cache.clone()).layer(Extension(UserId::new(user)))
  }

  async fn send(&self, user: &str, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = self
      .router(user)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn camry(&self, user: &str) -> String {
    let (status, body) = self
      .send(user, "POST", "/vehicles", Some(json!({
        "make": "Toyota",
        "model": "Camry",
        "year": 2020,
        "current_mileage": 50000
      })))
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["vehicle_id"].as_str().unwrap().to_owned()
  }
}

// ─── Vehicles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_list_and_get_vehicle() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;

  let (status, list) = h.send("alice", "GET", "/vehicles", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);

  let (status, vehicle) = h.send("alice", "GET", &format!("/vehicles/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(vehicle["make"], "Toyota");
  assert_eq!(vehicle["current_mileage"], 50000);
}

#[tokio::test]
async fn validation_error_body_names_field() {
  let h = Harness::new().await;
  let (status, body) = h
    .send("alice", "POST", "/vehicles", Some(json!({
      "make": "  ",
      "model": "Camry",
      "year": 2020
    })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "validation_error");
  assert_eq!(body["field"], "make");
}

#[tokio::test]
async fn malformed_requests_use_the_error_body() {
  let h = Harness::new().await;
  let (status, body) = h
    .send("alice", "POST", "/vehicles", Some(json!({ "model": "Camry", "year": 2020 })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "validation_error");
  assert_eq!(body["field"], "body");
  assert!(body["message"].as_str().unwrap().contains("make"), "{body}");

  let (status, body) = h
    .send("alice", "POST", "/vehicles", Some(json!({ "make": "Volvo", "model": "V70", "year": "old" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["code"], "validation_error");

  let (status, body) = h.send("alice", "GET", "/vehicles/not-a-uuid", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "id");

  let (status, body) = h.send("alice", "GET", "/reminders/due?today=soon", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "query");
}

#[tokio::test]
async fn oversized_item_cost_is_a_validation_error() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;
  let half = i64::MAX / 2 + 1;
  let (status, body) = h
    .send("alice", "POST", &format!("/vehicles/{id}/services"), Some(json!({
      "date": "2024-05-01",
      "mileage": 50100,
      "items": [{ "kind": "Motorolja", "cost": half }, { "kind": "Oljefilter", "cost": half }]
    })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["field"], "cost");
}

#[tokio::test]
async fn duplicate_plate_is_conflict() {
  let h = Harness::new().await;
  let vehicle = json!({ "make": "Volvo", "model": "V70", "year": 2008, "license_plate": "abc123" });
  let (status, _) = h.send("alice", "POST", "/vehicles", Some(vehicle.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, body) = h.send("alice", "POST", "/vehicles", Some(vehicle)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["code"], "conflict");
  assert_eq!(body["field"], "license_plate");
}

#[tokio::test]
async fn patch_with_null_clears_field() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;
  let uri = format!("/vehicles/{id}");

  let (status, v) = h.send("alice", "PATCH", &uri, Some(json!({ "notes": "garage" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["notes"], "garage");

  let (status, v) = h.send("alice", "PUT", &uri, Some(json!({ "notes": null }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["notes"], Value::Null);
  assert_eq!(v["make"], "Toyota");
}

// ─── Service history ─────────────────────────────────────────────────────────

#[tokio::test]
async fn service_flow_keeps_cached_reads_fresh() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;

  // Prime the vehicle cache before logging the visit.
  h.send("alice", "GET", &format!("/vehicles/{id}"), None).await;

  let (status, event) = h
    .send("alice", "POST", &format!("/vehicles/{id}/services"), Some(json!({
      "date": "2024-03-01",
      "mileage": 52000,
      "items": [
        { "type": "Motorolja", "cost": 500 },
        { "type": "Oljefilter", "cost": 150 }
      ]
    })))
    .await;
  assert_eq!(status, StatusCode::CREATED, "{event}");
  assert_eq!(event["total_cost"], 650);
  let event_id = event["event_id"].as_str().unwrap().to_owned();

  let (_, vehicle) = h.send("alice", "GET", &format!("/vehicles/{id}"), None).await;
  assert_eq!(vehicle["current_mileage"], 52000);

  let (_, items) = h.send("alice", "GET", &format!("/services/{event_id}/items"), None).await;
  let filter = items
    .as_array()
    .unwrap()
    .iter()
    .find(|i| i["kind"] == "Oljefilter")
    .unwrap()["item_id"]
    .as_str()
    .unwrap()
    .to_owned();

  // Prime the event list, then delete an item.
  h.send("alice", "GET", &format!("/vehicles/{id}/services"), None).await;
  let (status, _) = h.send("alice", "DELETE", &format!("/items/{filter}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, events) = h.send("alice", "GET", &format!("/vehicles/{id}/services"), None).await;
  assert_eq!(events[0]["total_cost"], 500);
  let (_, event) = h.send("alice", "GET", &format!("/services/{event_id}"), None).await;
  assert_eq!(event["total_cost"], 500);
}

#[tokio::test]
async fn deleting_vehicle_hides_its_events() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;
  let (_, event) = h
    .send("alice", "POST", &format!("/vehicles/{id}/services"), Some(json!({
      "date": "2024-03-01",
      "mileage": 52000
    })))
    .await;
  let event_uri = format!("/services/{}", event["event_id"].as_str().unwrap());
  let (status, _) = h.send("alice", "GET", &event_uri, None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = h.send("alice", "DELETE", &format!("/vehicles/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = h.send("alice", "GET", &event_uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["code"], "not_found");
}

// ─── Ownership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn other_users_see_not_found_by_default() {
  let h = Harness::new().await;
  let id = h.camry("bob").await;
  h.send("bob", "GET", &format!("/vehicles/{id}"), None).await;

  let (status, _) = h.send("alice", "GET", &format!("/vehicles/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = h.send("alice", "DELETE", &format!("/vehicles/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, list) = h.send("alice", "GET", "/vehicles", None).await;
  assert!(list.as_array().unwrap().is_empty());

  let (status, _) = h.send("bob", "GET", &format!("/vehicles/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn distinguish_policy_returns_forbidden() {
  let h = Harness::with_policy(AccessPolicy::Distinguish).await;
  let id = h.camry("bob").await;
  let (status, body) = h.send("alice", "GET", &format!("/vehicles/{id}"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["code"], "forbidden");
}

// ─── Reminders ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_recurring_reminder_returns_successor() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;
  let (status, reminder) = h
    .send("alice", "POST", &format!("/vehicles/{id}/reminders"), Some(json!({
      "type": "Oljeservice",
      "due_mileage": 55000,
      "recurring": true,
      "interval_distance": 15000
    })))
    .await;
  assert_eq!(status, StatusCode::CREATED, "{reminder}");
  let reminder_id = reminder["reminder_id"].as_str().unwrap();

  let (status, done) = h
    .send("alice", "POST", &format!("/reminders/{reminder_id}/complete"), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["completed"]["completed"], true);
  assert_eq!(done["next"]["due_mileage"], 70000);

  let (_, list) = h.send("alice", "GET", &format!("/vehicles/{id}/reminders"), None).await;
  assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn due_reminders_accept_explicit_date() {
  let h = Harness::new().await;
  let id = h.camry("alice").await;
  h.send("alice", "POST", &format!("/vehicles/{id}/reminders"), Some(json!({
    "type": "Besiktning",
    "due_date": "2025-05-01"
  })))
  .await;

  let (status, due) = h.send("alice", "GET", "/reminders/due?today=2025-06-01", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(due[0]["status"], "overdue");
  assert_eq!(due[0]["vehicle_label"], "Toyota Camry");

  let (_, due) = h.send("alice", "GET", "/reminders/due?today=2025-01-01", None).await;
  assert!(due.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn service_types_lists_catalog() {
  let h = Harness::new().await;
  let (status, body) = h.send("alice", "GET", "/service-types", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["name"], "Oljeservice");
  assert_eq!(body[0]["kinds"][0], "Motorolja");
}
