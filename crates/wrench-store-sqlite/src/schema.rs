//! SQL schema for the Wrench SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- VIN and plate are unique per owner. NULLs never collide, which is why
-- blank values are normalized to NULL before they reach this table.
CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id              TEXT PRIMARY KEY,
    owner_id                TEXT NOT NULL,
    name                    TEXT,
    make                    TEXT NOT NULL,
    model                   TEXT NOT NULL,
    year                    INTEGER NOT NULL,
    vin                     TEXT,
    license_plate           TEXT,
    current_mileage         INTEGER NOT NULL DEFAULT 0 CHECK (current_mileage >= 0),
    service_interval_months INTEGER,
    service_interval_km     INTEGER,
    notes                   TEXT,
    created_at              TEXT NOT NULL,   -- RFC 3339 UTC, microseconds
    UNIQUE (owner_id, vin),
    UNIQUE (owner_id, license_plate)
);

CREATE TABLE IF NOT EXISTS service_events (
    event_id     TEXT PRIMARY KEY,
    vehicle_id   TEXT NOT NULL REFERENCES vehicles(vehicle_id) ON DELETE CASCADE,
    service_date TEXT NOT NULL,              -- YYYY-MM-DD
    mileage      INTEGER NOT NULL CHECK (mileage >= 0),
    total_cost   INTEGER NOT NULL DEFAULT 0 CHECK (total_cost >= 0),  -- derived
    notes        TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS service_items (
    item_id     TEXT PRIMARY KEY,
    event_id    TEXT NOT NULL REFERENCES service_events(event_id) ON DELETE CASCADE,
    kind        TEXT NOT NULL,
    description TEXT,
    cost        INTEGER NOT NULL DEFAULT 0 CHECK (cost >= 0),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reminders (
    reminder_id       TEXT PRIMARY KEY,
    vehicle_id        TEXT NOT NULL REFERENCES vehicles(vehicle_id) ON DELETE CASCADE,
    kind              TEXT NOT NULL,
    due_date          TEXT,
    due_mileage       INTEGER,
    recurring         INTEGER NOT NULL DEFAULT 0,
    interval_months   INTEGER,
    interval_distance INTEGER,
    completed         INTEGER NOT NULL DEFAULT 0,
    notes             TEXT,
    created_at        TEXT NOT NULL,
    -- set once a recurring reminder has scheduled its follow-up
    successor_id      TEXT REFERENCES reminders(reminder_id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS vehicles_owner_idx   ON vehicles(owner_id);
CREATE INDEX IF NOT EXISTS events_vehicle_idx   ON service_events(vehicle_id);
CREATE INDEX IF NOT EXISTS items_event_idx      ON service_items(event_id);
CREATE INDEX IF NOT EXISTS reminders_vehicle_idx ON reminders(vehicle_id);

PRAGMA user_version = 1;
";
