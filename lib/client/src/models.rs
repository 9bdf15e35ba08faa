//! Wire models of the parcel and account endpoints.
//!
//! The backend uses Spanish field names; Rust names follow the domain. List
//! and single-item responses arrive either bare or wrapped in an envelope
//! (`{"encomiendas": [...]}`, `{"encomienda": {...}}`), and both are
//! accepted.

use lonquiexpress_core::{ParcelId, TrackingCode, UserId};
use lonquiexpress_platform_access::{Role, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ApiError;

/// Minimum length of a normalized tracking code.
pub const MIN_TRACKING_CODE_LEN: usize = 10;

/// Minimum declared value of a parcel, in CLP.
pub const MIN_DECLARED_VALUE: f64 = 1000.0;

/// Minimum length of the receiver name on delivery.
pub const MIN_RECEIVER_NAME_LEN: usize = 3;

/// Lifecycle state of a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Incident,
    Cancelled,
    /// A state this client does not know, kept verbatim.
    Other(String),
}

impl ParcelStatus {
    /// Returns the backend name of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pendiente",
            Self::Assigned => "asignado",
            Self::InTransit => "en_transito",
            Self::Delivered => "entregada",
            Self::Incident => "incidencia",
            Self::Cancelled => "cancelada",
            Self::Other(raw) => raw,
        }
    }

    /// Returns true once the parcel can no longer change.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl From<String> for ParcelStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pendiente" => Self::Pending,
            "asignado" | "asignada" => Self::Assigned,
            "en_transito" | "en transito" => Self::InTransit,
            "entregada" | "entregado" => Self::Delivered,
            "incidencia" => Self::Incident,
            "cancelada" | "cancelado" => Self::Cancelled,
            _ => Self::Other(raw),
        }
    }
}

impl From<ParcelStatus> for String {
    fn from(status: ParcelStatus) -> Self {
        match status {
            ParcelStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sender or recipient of a parcel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "ciudad", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Party {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A parcel ("encomienda") as the backend returns it.
///
/// Fields the client does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    mongo_id: Option<ParcelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ParcelId>,
    #[serde(rename = "codigoSeguimiento")]
    pub tracking_code: TrackingCode,
    #[serde(rename = "remitente", default)]
    pub sender: Party,
    #[serde(rename = "destinatario", default)]
    pub recipient: Party,
    #[serde(rename = "valor", default)]
    pub declared_value: f64,
    #[serde(rename = "peso", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(rename = "estado")]
    pub status: ParcelStatus,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "fechaCreacion", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(rename = "fechaEntrega", default, skip_serializing_if = "Option::is_none")]
    pub delivered_on: Option<String>,
    /// Driver id, or the populated driver document.
    #[serde(rename = "chofer", default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<JsonValue>,
    #[serde(rename = "porcentajeEntrega", default, skip_serializing_if = "Option::is_none")]
    pub delivery_progress: Option<f64>,
    #[serde(rename = "nombreRecibidor", default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(rename = "rutRecibidor", default, skip_serializing_if = "Option::is_none")]
    pub receiver_national_id: Option<String>,
    #[serde(rename = "ubicacionEntrega", default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Parcel {
    /// Returns the document id, whichever key the backend used.
    #[must_use]
    pub fn id(&self) -> Option<&ParcelId> {
        self.id.as_ref().or(self.mongo_id.as_ref())
    }

    /// Returns the driver id when the driver is a bare id or a document.
    #[must_use]
    pub fn driver_id(&self) -> Option<UserId> {
        match self.driver.as_ref()? {
            JsonValue::String(id) => Some(UserId::new(id.clone())),
            JsonValue::Object(doc) => doc
                .get("_id")
                .or_else(|| doc.get("id"))
                .and_then(JsonValue::as_str)
                .map(UserId::new),
            _ => None,
        }
    }
}

/// Input of the create-parcel form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewParcel {
    pub tracking_code: String,
    pub sender: Party,
    pub recipient: Party,
    pub declared_value: f64,
    pub weight: Option<f64>,
    pub description: Option<String>,
}

/// Request body of `POST /encomiendas`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateParcelBody {
    #[serde(rename = "codigoSeguimiento")]
    pub tracking_code: TrackingCode,
    #[serde(rename = "remitente")]
    pub sender: Party,
    #[serde(rename = "destinatario")]
    pub recipient: Party,
    #[serde(rename = "valor")]
    pub declared_value: f64,
    #[serde(rename = "peso", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "estado")]
    pub status: ParcelStatus,
    #[serde(rename = "porcentajeEntrega")]
    pub delivery_progress: f64,
}

impl NewParcel {
    /// Checks the form and builds the request body.
    ///
    /// The tracking code is trimmed and uppercased before its length is
    /// checked.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<CreateParcelBody, ApiError> {
        let tracking_code = TrackingCode::normalize(&self.tracking_code);
        if tracking_code.len() < MIN_TRACKING_CODE_LEN {
            return Err(invalid(
                "tracking_code",
                format!("must be at least {MIN_TRACKING_CODE_LEN} characters"),
            ));
        }
        if self.sender.name.trim().is_empty() {
            return Err(invalid("sender", "name is required"));
        }
        if self.recipient.name.trim().is_empty() {
            return Err(invalid("recipient", "name is required"));
        }
        if self.declared_value.is_nan() || self.declared_value < MIN_DECLARED_VALUE {
            return Err(invalid(
                "declared_value",
                format!("must be at least {MIN_DECLARED_VALUE}"),
            ));
        }
        if let Some(weight) = self.weight {
            if weight.is_nan() || weight <= 0.0 {
                return Err(invalid("weight", "must be positive"));
            }
        }

        Ok(CreateParcelBody {
            tracking_code,
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            declared_value: self.declared_value,
            weight: self.weight,
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToString::to_string),
            status: ParcelStatus::Pending,
            delivery_progress: 0.0,
        })
    }
}

/// Partial update of a parcel. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParcelUpdate {
    #[serde(rename = "remitente", skip_serializing_if = "Option::is_none")]
    pub sender: Option<Party>,
    #[serde(rename = "destinatario", skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Party>,
    #[serde(rename = "valor", skip_serializing_if = "Option::is_none")]
    pub declared_value: Option<f64>,
    #[serde(rename = "peso", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "chofer", skip_serializing_if = "Option::is_none")]
    pub driver: Option<UserId>,
    #[serde(rename = "porcentajeEntrega", skip_serializing_if = "Option::is_none")]
    pub delivery_progress: Option<f64>,
}

/// Delivery confirmation entered by the driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryConfirmation {
    #[serde(rename = "nombreRecibidor")]
    pub receiver_name: String,
    #[serde(rename = "rutRecibidor", skip_serializing_if = "Option::is_none")]
    pub receiver_national_id: Option<String>,
    #[serde(rename = "ubicacionEntrega", skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
}

impl DeliveryConfirmation {
    /// Checks the receiver name and returns the trimmed confirmation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the receiver name is too short.
    pub fn validate(&self) -> Result<Self, ApiError> {
        let name = self.receiver_name.trim();
        if name.chars().count() < MIN_RECEIVER_NAME_LEN {
            return Err(invalid(
                "receiver_name",
                format!("must be at least {MIN_RECEIVER_NAME_LEN} characters"),
            ));
        }
        Ok(Self {
            receiver_name: name.to_string(),
            receiver_national_id: trimmed(self.receiver_national_id.as_deref()),
            delivery_location: trimmed(self.delivery_location.as_deref()),
        })
    }
}

/// One entry of a parcel's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    #[serde(rename = "estado", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ParcelStatus>,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "ubicacion", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "fecha", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Result of a public tracking lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackingLookup {
    #[serde(rename = "encomienda", default)]
    pub parcel: Option<Parcel>,
    #[serde(rename = "historial", alias = "eventos", default)]
    pub events: Vec<TrackingEvent>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Global counters of the tracking dashboard.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalStats {
    #[serde(flatten)]
    pub values: BTreeMap<String, JsonValue>,
}

impl GlobalStats {
    /// Returns a counter by name, looking inside a `stats` envelope too.
    #[must_use]
    pub fn count(&self, name: &str) -> Option<u64> {
        self.values
            .get(name)
            .or_else(|| self.values.get("stats").and_then(|stats| stats.get(name)))
            .and_then(JsonValue::as_u64)
    }
}

/// Request body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "usuario", default)]
    pub user: Option<UserProfile>,
    #[serde(alias = "mensaje", default)]
    pub message: Option<String>,
}

/// Editable fields of the own profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileChanges {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "rut", skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
}

/// Request body of `POST /auth/cambiar-password`.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange<'a> {
    #[serde(rename = "passwordActual")]
    pub current: &'a str,
    #[serde(rename = "passwordNueva")]
    pub new: &'a str,
}

/// Account created by an administrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    #[serde(rename = "nombre")]
    pub display_name: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "rut", skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
}

/// Generic acknowledgement of a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(alias = "mensaje", default)]
    pub message: Option<String>,
}

/// Driver picked by the backend for a parcel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssignedDriver {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<UserId>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
}

/// Outcome of an automatic driver assignment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DriverAssignment {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(alias = "mensaje", default)]
    pub message: Option<String>,
    #[serde(rename = "chofer", default)]
    pub driver: Option<AssignedDriver>,
}

/// A list that may arrive bare or inside a named envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Parcels { encomiendas: Vec<T> },
    Users { usuarios: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Parcels { encomiendas } => encomiendas,
            Self::Users { usuarios } => usuarios,
            Self::Bare(items) => items,
        }
    }
}

/// A single item that may arrive bare or inside a named envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope<T> {
    Parcel { encomienda: T },
    User { usuario: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Parcel { encomienda: item } | Self::User { usuario: item } | Self::Bare(item) => {
                item
            }
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ApiError {
    ApiError::InvalidInput {
        field,
        reason: reason.into(),
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
