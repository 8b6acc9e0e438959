//! Core types and trait definitions for the Wrench maintenance log.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; storage backends implement
//! [`store::MaintenanceStore`].

pub mod cache;
pub mod catalog;
pub mod derived;
pub mod error;
pub mod guard;
pub mod normalize;
pub mod reminder;
pub mod service;
pub mod store;
pub mod vehicle;

pub use error::{Error, ErrorCode, Result};
pub use guard::{AccessPolicy, Resource, ResourceKind, UserId};
