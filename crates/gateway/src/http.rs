//! HTTP implementation of [`CollaboratorGateway`] using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use homefix_core::types::BookingId;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{CollaboratorGateway, GatewayError, NewBooking};

/// Base URLs of the collaborator services.
#[derive(Debug, Clone)]
pub struct GatewayEndpoints {
    /// e.g. `http://host:5003/services`
    pub service_api_url: String,
    /// e.g. `http://host:5002/technicians`
    pub technician_api_url: String,
    /// e.g. `http://host:5004/bookings`
    pub booking_api_url: String,
}

/// Gateway backed by the collaborators' REST APIs.
pub struct HttpGateway {
    client: reqwest::Client,
    service_api: Url,
    technician_api: Url,
    booking_api: Url,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    #[serde(rename = "serviceCategory")]
    service_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TechnicianRecord {
    #[serde(alias = "specialization")]
    service_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TechnicianAuthRecord {
    hashed_password: Option<String>,
}

impl HttpGateway {
    /// Build a gateway whose every request is bounded by `timeout`.
    ///
    /// Fails if a base URL does not parse or cannot take path segments.
    pub fn new(endpoints: GatewayEndpoints, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            service_api: base_url(&endpoints.service_api_url)?,
            technician_api: base_url(&endpoints.technician_api_url)?,
            booking_api: base_url(&endpoints.booking_api_url)?,
            timeout,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        entity: &'static str,
        id: &str,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::ensure_success(response, entity, id).await?;
        response.json::<T>().await.map_err(|e| self.classify(e))
    }

    /// Map a 404 to [`GatewayError::NotFound`] and any other non-2xx status
    /// to [`GatewayError::Api`].
    async fn ensure_success(
        response: reqwest::Response,
        entity: &'static str,
        id: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound {
                entity,
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn classify(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Request(err)
        }
    }
}

#[async_trait]
impl CollaboratorGateway for HttpGateway {
    async fn service_category(&self, service_id: &str) -> Result<String, GatewayError> {
        let url = record_url(&self.service_api, &[service_id])?;
        let record: ServiceRecord = self.get_json(url, "Service", service_id).await?;
        record
            .service_category
            .ok_or(GatewayError::MissingField("serviceCategory"))
    }

    async fn technician_category(&self, technician_id: &str) -> Result<String, GatewayError> {
        let url = record_url(&self.technician_api, &[technician_id])?;
        let record: TechnicianRecord = self.get_json(url, "Technician", technician_id).await?;
        record
            .service_category
            .ok_or(GatewayError::MissingField("service_category"))
    }

    async fn technician_credential(&self, technician_id: &str) -> Result<String, GatewayError> {
        let url = record_url(&self.technician_api, &[technician_id, "auth"])?;
        let record: TechnicianAuthRecord = self.get_json(url, "Technician", technician_id).await?;
        record
            .hashed_password
            .ok_or(GatewayError::MissingField("hashed_password"))
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<BookingId, GatewayError> {
        let response = self
            .client
            .post(self.booking_api.clone())
            .json(&booking_body(booking, chrono::Utc::now()))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::ensure_success(response, "Booking", &booking.customer_id).await?;
        let body: Value = response.json().await.map_err(|e| self.classify(e))?;
        tracing::debug!(body = %body, "Booking store response");
        parse_booking_id(&body)
    }
}

fn base_url(raw: &str) -> Result<Url, GatewayError> {
    let url = Url::parse(raw).map_err(|e| GatewayError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(GatewayError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }
    Ok(url)
}

/// Append `segments` to `base`, percent-encoding each one so an id cannot
/// change the path or add a query.
fn record_url(base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GatewayError::InvalidUrl {
            url: base.to_string(),
            reason: "not a hierarchical URL".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// JSON body accepted by the booking store.
fn booking_body(booking: &NewBooking, now: chrono::DateTime<chrono::Utc>) -> Value {
    // The catalogue uses integer service ids; keep them numeric when they are.
    let sid = booking
        .service_id
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(booking.service_id.clone()));

    json!({
        "UID": booking.customer_id,
        "TID": booking.technician_id,
        "SID": sid,
        "booking_date": now.to_rfc3339(),
        "booking_time": now.format("%H:%M:%S").to_string(),
        "status": "pending",
        "address": booking.address,
        "latitude": booking.latitude,
        "longitude": booking.longitude,
    })
}

fn parse_booking_id(body: &Value) -> Result<BookingId, GatewayError> {
    match body.get("BID") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(GatewayError::MissingField("BID")),
    }
}
