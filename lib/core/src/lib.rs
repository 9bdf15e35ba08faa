//! Core domain types and utilities for the LonquiExpress client.
//!
//! This crate provides the identifiers and error plumbing shared by the
//! session, routing and API client crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParcelId, ParseIdError, TrackingCode, UserId};
