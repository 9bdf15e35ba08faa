//! User profile as returned by the backend and persisted with the session.
//!
//! The backend serializes accounts with Spanish field names and may send the
//! document id as either `_id` or `id`. The profile keeps the wire format on
//! both sides so the persisted snapshot is the exact shape the server sent.

use chrono::{DateTime, Utc};
use lonquiexpress_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::role::Role;

/// Profile of the logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireProfile", into = "WireProfile")]
pub struct UserProfile {
    id: UserId,
    email: String,
    display_name: String,
    /// `None` when the backend sent no role or one the client does not know.
    role: Option<Role>,
    phone: Option<String>,
    national_id: Option<String>,
    active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Creates a profile with the required fields.
    #[must_use]
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Option<Role>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
            role,
            phone: None,
            national_id: None,
            active: None,
            created_at: None,
        }
    }

    /// Sets the contact phone.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the national id (RUT).
    #[must_use]
    pub fn with_national_id(mut self, national_id: impl Into<String>) -> Self {
        self.national_id = Some(national_id.into());
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Returns the account id.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the account email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the role, if it is one the client recognizes.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    #[must_use]
    pub fn national_id(&self) -> Option<&str> {
        self.national_id.as_deref()
    }

    #[must_use]
    pub fn active(&self) -> Option<bool> {
        self.active
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Backend representation of an account.
#[derive(Serialize, Deserialize)]
struct WireProfile {
    #[serde(rename = "_id", default, skip_serializing)]
    mongo_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<UserId>,
    email: String,
    nombre: String,
    #[serde(default, alias = "role", skip_serializing_if = "Option::is_none")]
    rol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    telefono: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    activo: Option<bool>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireProfile> for UserProfile {
    type Error = String;

    fn try_from(wire: WireProfile) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or(wire.mongo_id)
            .ok_or_else(|| "profile has neither `id` nor `_id`".to_string())?;

        let role = match wire.rol.as_deref() {
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(err) => {
                    warn!(user_id = %id, %err, "profile carries an unrecognized role");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            id,
            email: wire.email,
            display_name: wire.nombre,
            role,
            phone: wire.telefono,
            national_id: wire.rut,
            active: wire.activo,
            created_at: wire.created_at,
        })
    }
}

impl From<UserProfile> for WireProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            mongo_id: None,
            id: Some(profile.id),
            email: profile.email,
            nombre: profile.display_name,
            rol: profile.role.map(|role| role.as_str().to_string()),
            telefono: profile.phone,
            rut: profile.national_id,
            activo: profile.active,
            created_at: profile.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_profile_with_mongo_id() {
        let json = r#"{
            "_id": "6650f0a1",
            "email": "ana@lonqui.cl",
            "nombre": "Ana",
            "rol": "operador",
            "telefono": "+56912345678",
            "rut": "12.345.678-9",
            "activo": true,
            "createdAt": "2025-11-08T12:00:00Z"
        }"#;
        let profile: UserProfile = serde_json::from_str(json).expect("deserialize");

        assert_eq!(profile.id().as_str(), "6650f0a1");
        assert_eq!(profile.email(), "ana@lonqui.cl");
        assert_eq!(profile.display_name(), "Ana");
        assert_eq!(profile.role(), Some(Role::Operator));
        assert_eq!(profile.phone(), Some("+56912345678"));
        assert_eq!(profile.national_id(), Some("12.345.678-9"));
        assert_eq!(profile.active(), Some(true));
        assert!(profile.created_at().is_some());
    }

    #[test]
    fn accepts_both_id_keys_at_once() {
        let json = r#"{"_id": "a", "id": "b", "email": "x@y.cl", "nombre": "X", "rol": "admin"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("deserialize");
        assert_eq!(profile.id().as_str(), "b");
    }

    #[test]
    fn unknown_role_becomes_none() {
        let json = r#"{"id": "1", "email": "x@y.cl", "nombre": "X", "rol": "superuser"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("deserialize");
        assert_eq!(profile.role(), None);
    }

    #[test]
    fn missing_role_becomes_none() {
        let json = r#"{"id": "1", "email": "x@y.cl", "nombre": "X"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("deserialize");
        assert_eq!(profile.role(), None);
    }

    #[test]
    fn missing_id_is_rejected() {
        let json = r#"{"email": "x@y.cl", "nombre": "X", "rol": "admin"}"#;
        assert!(serde_json::from_str::<UserProfile>(json).is_err());
    }

    #[test]
    fn serializes_with_backend_field_names() {
        let profile = UserProfile::new(UserId::new("42"), "c@d.cl", "Carla", Some(Role::Driver))
            .with_phone("+56900000000");
        let value = serde_json::to_value(&profile).expect("serialize");

        assert_eq!(value["id"], "42");
        assert_eq!(value["nombre"], "Carla");
        assert_eq!(value["rol"], "chofer");
        assert_eq!(value["telefono"], "+56900000000");
        assert!(value.get("rut").is_none());

        let parsed: UserProfile = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, profile);
    }
}
