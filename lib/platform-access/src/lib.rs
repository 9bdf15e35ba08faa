//! Session state and access control for the LonquiExpress client.
//!
//! This crate provides:
//! - Roles and per-view allowed role sets (`Role`, `RoleSet`)
//! - The user profile and the session pairing it with a bearer token
//! - The session store, persisted to a key-value storage backend
//! - The route authorizer gating the role dashboards
//! - Navigation and notice seams for the hosting UI
//!
//! # Session lifecycle
//!
//! `LoggedOut → (login) → LoggedIn → (logout | 401) → LoggedOut`. The initial
//! state comes from [`SessionStore::restore`]. Profile updates keep the
//! session logged in.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lonquiexpress_core::UserId;
//! use lonquiexpress_platform_access::{
//!     MemoryNavigator, MemoryStorage, RecordingNotifier, Role, RouteAuthorizer, RouteTable,
//!     Session, SessionStore, UserProfile, View,
//! };
//!
//! let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
//! store.restore();
//!
//! let profile = UserProfile::new(UserId::new("u1"), "admin@x.cl", "Admin", Some(Role::Admin));
//! store.set(Session::new("abc", profile).unwrap()).unwrap();
//!
//! let authorizer = RouteAuthorizer::new(
//!     store.clone(),
//!     RouteTable::default(),
//!     Arc::new(MemoryNavigator::default()),
//!     Arc::new(RecordingNotifier::new()),
//! );
//! assert!(authorizer.authorize(View::AdminDashboard).is_allowed());
//! assert!(!authorizer.authorize(View::DriverAssigned).is_allowed());
//! ```

pub mod error;
pub mod navigation;
pub mod notice;
pub mod role;
pub mod route;
pub mod session;
pub mod storage;
pub mod store;
pub mod user;

// Re-export main types at crate root
pub use error::{AuthenticationError, AuthorizationError, StorageError};
#[cfg(feature = "web")]
pub use navigation::BrowserNavigator;
pub use navigation::{MemoryNavigator, Navigator, View, navigate_once};
#[cfg(feature = "web")]
pub use notice::BrowserNotifier;
pub use notice::{LogNotifier, Notice, Notifier, RecordingNotifier};
pub use role::{Role, RoleSet, UnknownRole};
pub use route::{Access, RouteAccessRule, RouteAuthorizer, RouteTable, home_view};
pub use session::Session;
#[cfg(feature = "web")]
pub use storage::BrowserStorage;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{RestoreOutcome, SessionStore, TOKEN_KEY, USER_KEY};
pub use user::UserProfile;
