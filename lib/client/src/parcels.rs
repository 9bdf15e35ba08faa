//! Parcel management for operators, drivers and administrators.

use lonquiexpress_core::{ParcelId, TrackingCode, UserId};
use rootcause::prelude::Report;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, encode, route};
use crate::error::ApiError;
use crate::models::{
    Ack, DeliveryConfirmation, DriverAssignment, ItemEnvelope, ListEnvelope, NewParcel, Parcel,
    ParcelStatus, ParcelUpdate,
};
use crate::transport::Method;

/// Client of the `/encomiendas` endpoints.
#[derive(Debug, Clone)]
pub struct ParcelService {
    api: ApiClient,
}

impl ParcelService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Lists parcels, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn list(&self, status: Option<&ParcelStatus>) -> Result<Vec<Parcel>, Report<ApiError>> {
        let path = match status {
            Some(status) => route(&["encomiendas"], &[("estado", status.as_str())])?,
            None => route(&["encomiendas"], &[])?,
        };
        Ok(self
            .api
            .call::<ListEnvelope<Parcel>>(Method::Get, &path, None)
            .await?
            .into_vec())
    }

    /// # Errors
    ///
    /// Returns the request failure; `NotFound` for an unknown id.
    pub async fn get(&self, id: &ParcelId) -> Result<Parcel, Report<ApiError>> {
        self.item(Method::Get, &route(&["encomiendas", id.as_str()], &[])?, None)
            .await
    }

    /// Validates and registers a new parcel in the pending state, then asks
    /// the backend to assign a driver.
    ///
    /// A failed assignment is logged and does not fail the creation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` without contacting the server, or the request
    /// failure.
    #[instrument(skip(self, parcel), fields(code = %parcel.tracking_code.trim()))]
    pub async fn create(&self, parcel: &NewParcel) -> Result<Parcel, Report<ApiError>> {
        let body = parcel.validate()?;
        let created = self
            .item(Method::Post, "/encomiendas", Some(encode(&body)?))
            .await?;
        info!(code = %created.tracking_code, "parcel created");

        if let Some(id) = created.id() {
            match self.assign_driver(id).await {
                Ok(assignment) => info!(
                    driver = assignment
                        .driver
                        .as_ref()
                        .and_then(|driver| driver.name.as_deref())
                        .unwrap_or("unknown"),
                    "driver assigned"
                ),
                Err(err) => warn!(error = %err, "no driver assigned"),
            }
        }
        Ok(created)
    }

    /// Asks the backend to pick an available driver for a parcel.
    ///
    /// # Errors
    ///
    /// Returns the request failure, typically when no driver is available.
    #[instrument(skip(self))]
    pub async fn assign_driver(&self, id: &ParcelId) -> Result<DriverAssignment, Report<ApiError>> {
        let path = route(&["encomiendas", id.as_str(), "asignar-chofer"], &[])?;
        Ok(self.api.call(Method::Post, &path, Some(json!({}))).await?)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: &ParcelId,
        update: &ParcelUpdate,
    ) -> Result<Parcel, Report<ApiError>> {
        self.item(
            Method::Patch,
            &route(&["encomiendas", id.as_str()], &[])?,
            Some(encode(update)?),
        )
        .await
    }

    /// Moves a parcel to another state.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &ParcelId,
        status: &ParcelStatus,
    ) -> Result<Parcel, Report<ApiError>> {
        self.item(
            Method::Patch,
            &route(&["encomiendas", id.as_str(), "estado"], &[])?,
            Some(json!({ "estado": status })),
        )
        .await
    }

    /// Marks a parcel delivered from the driver view.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a short receiver name, or the request
    /// failure.
    #[instrument(skip(self, confirmation))]
    pub async fn mark_delivered(
        &self,
        id: &ParcelId,
        confirmation: &DeliveryConfirmation,
    ) -> Result<Ack, Report<ApiError>> {
        let path = route(&["encomiendas", id.as_str(), "entregar"], &[])?;
        self.deliver(Method::Patch, &path, confirmation).await
    }

    /// Confirms a delivery with the receiver's details.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a short receiver name, or the request
    /// failure.
    #[instrument(skip(self, confirmation))]
    pub async fn confirm_delivery(
        &self,
        id: &ParcelId,
        confirmation: &DeliveryConfirmation,
    ) -> Result<Ack, Report<ApiError>> {
        let path = route(&["encomiendas", id.as_str(), "confirmar-entrega"], &[])?;
        self.deliver(Method::Put, &path, confirmation).await
    }

    /// Lists the parcels assigned to a driver.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn assigned_to(&self, driver: &UserId) -> Result<Vec<Parcel>, Report<ApiError>> {
        self.list_at(&["encomiendas", "asignadas", driver.as_str()])
            .await
    }

    /// Lists every parcel of a driver, delivered ones included.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn driver_parcels(&self, driver: &UserId) -> Result<Vec<Parcel>, Report<ApiError>> {
        self.list_at(&["encomiendas", "chofer", driver.as_str()])
            .await
    }

    /// Looks a parcel up by tracking code.
    ///
    /// # Errors
    ///
    /// Returns the request failure; `NotFound` for an unknown code.
    #[instrument(skip(self))]
    pub async fn track(&self, code: &TrackingCode) -> Result<Parcel, Report<ApiError>> {
        let path = route(&["encomiendas", "rastrear", code.as_str()], &[])?;
        self.item(Method::Get, &path, None).await
    }

    async fn list_at(&self, segments: &[&str]) -> Result<Vec<Parcel>, Report<ApiError>> {
        Ok(self
            .api
            .call::<ListEnvelope<Parcel>>(Method::Get, &route(segments, &[])?, None)
            .await?
            .into_vec())
    }

    async fn deliver(
        &self,
        method: Method,
        path: &str,
        confirmation: &DeliveryConfirmation,
    ) -> Result<Ack, Report<ApiError>> {
        let confirmation = confirmation.validate()?;
        let ack: Ack = self
            .api
            .call(method, path, Some(encode(&confirmation)?))
            .await?;
        info!(path, receiver = %confirmation.receiver_name, "delivery recorded");
        Ok(ack)
    }

    async fn item(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Parcel, Report<ApiError>> {
        Ok(self
            .api
            .call::<ItemEnvelope<Parcel>>(method, path, body)
            .await?
            .into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Party;
    use crate::testing::{admin_session, harness};
    use serde_json::Value as JsonValue;

    fn parcel(code: &str, status: &str) -> JsonValue {
        json!({
            "_id": format!("id-{code}"),
            "codigoSeguimiento": code,
            "remitente": {"nombre": "Juan"},
            "destinatario": {"nombre": "María"},
            "valor": 5000,
            "estado": status
        })
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        h.transport.reply(
            200,
            json!({"encomiendas": [parcel("LQE0000000001", "pendiente")]}),
        );
        let service = ParcelService::new(h.api.clone());

        let parcels = service.list(Some(&ParcelStatus::Pending)).await.expect("list");

        assert_eq!(parcels.len(), 1);
        assert_eq!(parcels[0].status, ParcelStatus::Pending);
        let request = h.transport.last_request();
        assert_eq!(
            request.url,
            "http://localhost:3000/api/encomiendas?estado=pendiente"
        );
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn list_accepts_bare_array() {
        let h = harness();
        h.transport.reply(
            200,
            json!([parcel("LQE0000000001", "asignado"), parcel("LQE0000000002", "entregada")]),
        );
        let service = ParcelService::new(h.api.clone());

        let parcels = service.list(None).await.expect("list");

        assert_eq!(parcels.len(), 2);
        assert_eq!(h.transport.last_request().url, "http://localhost:3000/api/encomiendas");
    }

    #[tokio::test]
    async fn create_validates_before_sending() {
        let h = harness();
        let service = ParcelService::new(h.api.clone());
        let mut new = NewParcel {
            tracking_code: "short".to_string(),
            sender: Party::named("Juan"),
            recipient: Party::named("María"),
            declared_value: 5000.0,
            weight: Some(1.2),
            description: None,
        };

        assert!(service.create(&new).await.is_err());
        assert!(h.transport.requests().is_empty());

        new.tracking_code = " lqe0000000009 ".to_string();
        h.transport.reply(
            201,
            json!({"success": true, "encomienda": parcel("LQE0000000009", "pendiente")}),
        );
        h.transport.reply(200, json!({"success": true, "chofer": {"_id": "d-7", "nombre": "Pedro"}}));
        let created = service.create(&new).await.expect("create");

        assert_eq!(created.tracking_code.as_str(), "LQE0000000009");
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        let request = requests[0].clone();
        assert_eq!(request.method, Method::Post);
        let body = request.body.expect("body");
        assert_eq!(body["codigoSeguimiento"], "LQE0000000009");
        assert_eq!(body["estado"], "pendiente");
        assert_eq!(body["peso"], 1.2);
    }

    #[tokio::test]
    async fn update_status_patches_estado() {
        let h = harness();
        h.transport.reply(200, parcel("LQE0000000001", "en_transito"));
        let service = ParcelService::new(h.api.clone());

        let updated = service
            .update_status(&ParcelId::new("p1"), &ParcelStatus::InTransit)
            .await
            .expect("update");

        assert_eq!(updated.status, ParcelStatus::InTransit);
        let request = h.transport.last_request();
        assert_eq!(request.method, Method::Patch);
        assert!(request.url.ends_with("/encomiendas/p1/estado"));
        assert_eq!(request.body, Some(json!({"estado": "en_transito"})));
    }

    #[tokio::test]
    async fn update_sends_only_set_fields() {
        let h = harness();
        h.transport.reply(200, parcel("LQE0000000001", "asignado"));
        let service = ParcelService::new(h.api.clone());
        let update = ParcelUpdate {
            driver: Some(UserId::new("d-7")),
            ..ParcelUpdate::default()
        };

        service
            .update(&ParcelId::new("p1"), &update)
            .await
            .expect("update");

        let request = h.transport.last_request();
        assert!(request.url.ends_with("/encomiendas/p1"));
        assert_eq!(request.body, Some(json!({"chofer": "d-7"})));
    }

    #[tokio::test]
    async fn delivery_endpoints_validate_receiver() {
        let h = harness();
        let service = ParcelService::new(h.api.clone());
        let id = ParcelId::new("p1");
        let short = DeliveryConfirmation {
            receiver_name: "Al".to_string(),
            ..DeliveryConfirmation::default()
        };

        assert!(service.confirm_delivery(&id, &short).await.is_err());
        assert!(service.mark_delivered(&id, &short).await.is_err());
        assert!(h.transport.requests().is_empty());

        let ok = DeliveryConfirmation {
            receiver_name: "Ana Pérez".to_string(),
            receiver_national_id: Some("11.111.111-1".to_string()),
            delivery_location: None,
        };
        h.transport.reply(200, json!({"success": true, "message": "Entrega confirmada"}));
        let ack = service.confirm_delivery(&id, &ok).await.expect("confirm");
        assert_eq!(ack.message.as_deref(), Some("Entrega confirmada"));
        let request = h.transport.last_request();
        assert_eq!(request.method, Method::Put);
        assert!(request.url.ends_with("/encomiendas/p1/confirmar-entrega"));

        h.transport.reply(200, json!({"success": true}));
        service.mark_delivered(&id, &ok).await.expect("deliver");
        let request = h.transport.last_request();
        assert_eq!(request.method, Method::Patch);
        assert!(request.url.ends_with("/encomiendas/p1/entregar"));
        assert_eq!(request.body.expect("body")["nombreRecibidor"], "Ana Pérez");
    }

    #[tokio::test]
    async fn assigned_and_track() {
        let h = harness();
        let service = ParcelService::new(h.api.clone());

        h.transport.reply(200, json!({"encomiendas": [parcel("LQE0000000001", "asignado")]}));
        let assigned = service
            .assigned_to(&UserId::new("d-7"))
            .await
            .expect("assigned");
        assert_eq!(assigned.len(), 1);
        assert!(h.transport.last_request().url.ends_with("/encomiendas/asignadas/d-7"));

        h.transport.reply(404, json!({"message": "No encontrada"}));
        let err = service
            .track(&TrackingCode::normalize("lqe0000000404"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(h
            .transport
            .last_request()
            .url
            .ends_with("/encomiendas/rastrear/LQE0000000404"));
        assert!(h.notifier.take().is_empty());
    }

    #[tokio::test]
    async fn forbidden_keeps_session_and_fails() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        h.transport.reply(403, json!({"message": "Sin permisos"}));
        let service = ParcelService::new(h.api.clone());

        let err = service.get(&ParcelId::new("p1")).await.unwrap_err();

        assert!(err.to_string().contains("Sin permisos"));
        assert!(h.store.is_logged_in());
    }

    #[tokio::test]
    async fn create_requests_driver_assignment() {
        let h = harness();
        let service = ParcelService::new(h.api.clone());
        let new = NewParcel {
            tracking_code: "LQE0000000010".to_string(),
            sender: Party::named("Juan"),
            recipient: Party::named("María"),
            declared_value: 5000.0,
            weight: None,
            description: None,
        };
        h.transport.reply(201, json!({"encomienda": parcel("LQE0000000010", "pendiente")}));
        h.transport.reply(200, json!({"success": true, "chofer": {"_id": "d-7", "nombre": "Pedro"}}));

        service.create(&new).await.expect("create");

        let assign = h.transport.last_request();
        assert_eq!(assign.method, Method::Post);
        assert_eq!(
            assign.url,
            "http://localhost:3000/api/encomiendas/id-LQE0000000010/asignar-chofer"
        );
        assert_eq!(assign.body, Some(json!({})));
    }

    #[tokio::test]
    async fn create_survives_missing_driver() {
        let h = harness();
        let service = ParcelService::new(h.api.clone());
        let new = NewParcel {
            tracking_code: "LQE0000000011".to_string(),
            sender: Party::named("Juan"),
            recipient: Party::named("María"),
            declared_value: 5000.0,
            weight: None,
            description: None,
        };
        h.transport.reply(201, json!({"encomienda": parcel("LQE0000000011", "pendiente")}));
        h.transport.reply(400, json!({"message": "No hay choferes disponibles"}));

        let created = service.create(&new).await.expect("create");

        assert_eq!(created.tracking_code.as_str(), "LQE0000000011");
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn assign_driver_reports_driver() {
        let h = harness();
        h.transport.reply(200, json!({"success": true, "chofer": {"_id": "d-7", "nombre": "Pedro"}}));
        let service = ParcelService::new(h.api.clone());

        let assignment = service
            .assign_driver(&ParcelId::new("p1"))
            .await
            .expect("assign");

        let driver = assignment.driver.expect("driver");
        assert_eq!(driver.id, Some(UserId::new("d-7")));
        assert_eq!(driver.name.as_deref(), Some("Pedro"));
    }

    #[tokio::test]
    async fn driver_parcels_hits_driver_endpoint() {
        let h = harness();
        h.transport.reply(
            200,
            json!({"encomiendas": [
                parcel("LQE0000000001", "asignado"),
                parcel("LQE0000000002", "entregada")
            ]}),
        );
        let service = ParcelService::new(h.api.clone());

        let parcels = service
            .driver_parcels(&UserId::new("d-7"))
            .await
            .expect("driver parcels");

        assert_eq!(parcels.len(), 2);
        assert_eq!(
            h.transport.last_request().url,
            "http://localhost:3000/api/encomiendas/chofer/d-7"
        );
    }

    #[tokio::test]
    async fn ids_and_statuses_are_escaped() {
        let h = harness();
        let service = ParcelService::new(h.api.clone());

        h.transport.reply(200, parcel("LQE0000000001", "pendiente"));
        service
            .get(&ParcelId::new("../auth/usuarios"))
            .await
            .expect("get");
        assert_eq!(
            h.transport.last_request().url,
            "http://localhost:3000/api/encomiendas/..%2Fauth%2Fusuarios"
        );

        h.transport.reply(200, json!([]));
        service
            .list(Some(&ParcelStatus::Other("x&estado=entregada".to_string())))
            .await
            .expect("list");
        assert_eq!(
            h.transport.last_request().url,
            "http://localhost:3000/api/encomiendas?estado=x%26estado%3Dentregada"
        );

        assert!(service.get(&ParcelId::new("..")).await.is_err());
        assert_eq!(h.transport.requests().len(), 2);
    }
}
