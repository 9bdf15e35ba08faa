//! Public and customer tracking lookups.

use lonquiexpress_core::TrackingCode;
use rootcause::prelude::Report;
use tracing::instrument;

use crate::api::{ApiClient, route};
use crate::error::ApiError;
use crate::models::{GlobalStats, ListEnvelope, Parcel, TrackingLookup};
use crate::transport::Method;

/// Client of the `/tracking` endpoints.
#[derive(Debug, Clone)]
pub struct TrackingService {
    api: ApiClient,
}

impl TrackingService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Looks up a parcel and its history by code. Works without a session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank or malformed code, or the request
    /// failure.
    #[instrument(skip(self))]
    pub async fn track(&self, code: &TrackingCode) -> Result<TrackingLookup, Report<ApiError>> {
        ensure_code(code)?;
        Ok(self.api.get(&route(&["tracking", code.as_str()], &[])?).await?)
    }

    /// Lists the parcels of the logged-in customer.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn my_parcels(&self) -> Result<Vec<Parcel>, Report<ApiError>> {
        Ok(self
            .api
            .call::<ListEnvelope<Parcel>>(Method::Get, "/tracking/usuario/mis-encomiendas", None)
            .await?
            .into_vec())
    }

    /// Returns the detailed view of one parcel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank or malformed code, or the request
    /// failure.
    #[instrument(skip(self))]
    pub async fn details(&self, code: &TrackingCode) -> Result<TrackingLookup, Report<ApiError>> {
        ensure_code(code)?;
        let path = route(&["tracking", "detalles", code.as_str()], &[])?;
        Ok(self.api.get(&path).await?)
    }

    /// Returns the dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn global_stats(&self) -> Result<GlobalStats, Report<ApiError>> {
        Ok(self.api.get("/tracking/stats/globales").await?)
    }
}

/// Rejects codes a user could not have been issued before they reach a URL.
fn ensure_code(code: &TrackingCode) -> Result<(), ApiError> {
    if code.is_empty() {
        return Err(ApiError::InvalidInput {
            field: "tracking_code",
            reason: "is required".to_string(),
        });
    }
    code.as_str()
        .parse::<TrackingCode>()
        .map(drop)
        .map_err(|e| ApiError::InvalidInput {
            field: "tracking_code",
            reason: e.reason,
        })
}
