//! REST client for the LonquiExpress parcel-tracking API.
//!
//! This crate provides:
//! - The [`Authenticator`]: login, logout and account administration
//! - The [`RequestAugmenter`]: bearer token on every request, and the
//!   session-wide reaction to 401/403/404/5xx and unreachable servers
//! - Parcel and tracking services over the shared [`ApiClient`]
//! - [`RequestScope`] to cancel in-flight calls when a view goes away
//!
//! Session state and route authorization come from
//! `lonquiexpress-platform-access`; [`ClientContext`] wires both together.

pub mod api;
pub mod augment;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod parcels;
pub mod scope;
pub mod tracking;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types at crate root
pub use api::ApiClient;
pub use augment::{RequestAugmenter, ResponseEffect};
pub use auth::{Authenticator, PasswordPolicy};
pub use config::ClientConfig;
pub use context::{ClientContext, Host};
pub use error::{ApiError, ConfigError, TransportError};
pub use models::{
    Ack, AssignedDriver, DeliveryConfirmation, DriverAssignment, GlobalStats, NewAccount,
    NewParcel, Parcel, ParcelStatus, ParcelUpdate, Party, ProfileChanges, TrackingEvent,
    TrackingLookup,
};
pub use parcels::ParcelService;
pub use scope::RequestScope;
pub use tracking::TrackingService;
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
