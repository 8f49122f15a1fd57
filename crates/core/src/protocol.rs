//! Real-time wire protocol.
//!
//! Every WebSocket text frame is a JSON object of the form
//! `{"event": "<name>", "data": { ... }}`. Inbound frames decode into
//! [`InboundEvent`]; everything the engine pushes to a participant is an
//! [`OutboundEvent`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::GeoPoint;
use crate::status::{Role, TechnicianStatus};
use crate::types::{Participant, ParticipantId, ServiceId};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Technician availability change, sent over the socket or `POST
/// /technicians/status`. Both fields are optional at the decode layer so a
/// missing one surfaces as [`CoreError::MissingField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub technician_id: Option<ParticipantId>,
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusUpdate {
    /// Extract the technician id and parsed status.
    pub fn into_parts(self) -> Result<(ParticipantId, TechnicianStatus), CoreError> {
        let technician_id = self
            .technician_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(CoreError::MissingField("technician_id"))?;
        let status = self
            .status
            .ok_or(CoreError::MissingField("status"))?
            .parse::<TechnicianStatus>()?;
        Ok((technician_id, status))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub customer_id: ParticipantId,
    pub service_id: ServiceId,
    /// Service address passed through to the booking store.
    #[serde(default)]
    pub address: Option<String>,
    /// Where the work is to be done; falls back to the customer's last
    /// known location.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingAccept {
    pub technician_id: ParticipantId,
    pub customer_id: ParticipantId,
    pub customer_location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub technician_id: ParticipantId,
    pub customer_id: ParticipantId,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDone {
    pub technician_id: ParticipantId,
    pub customer_id: ParticipantId,
    #[serde(default)]
    pub work_report: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRequest {
    pub customer_id: ParticipantId,
    pub technician_id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpVerification {
    pub customer_id: ParticipantId,
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub customer_id: ParticipantId,
    pub technician_id: ParticipantId,
    #[serde(default)]
    pub payment_info: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    pub customer_id: ParticipantId,
    pub technician_id: ParticipantId,
    pub issue_description: String,
}

/// An event received from a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    StatusUpdate(StatusUpdate),
    BookingRequest(BookingRequest),
    BookingAccept(BookingAccept),
    LocationUpdate(LocationUpdate),
    WorkDone(WorkDone),
    OtpRequest(OtpRequest),
    OtpVerification(OtpVerification),
    PaymentRequest(PaymentRequest),
    IssueReport(IssueReport),
}

impl InboundEvent {
    /// Decode a text frame and check that every identifier it carries is
    /// non-empty.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let event: Self = serde_json::from_str(text)
            .map_err(|e| CoreError::Validation(format!("malformed event: {e}")))?;
        event.validate()?;
        Ok(event)
    }

    /// Wire name of the event, used in logs and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusUpdate(_) => "status_update",
            Self::BookingRequest(_) => "booking_request",
            Self::BookingAccept(_) => "booking_accept",
            Self::LocationUpdate(_) => "location_update",
            Self::WorkDone(_) => "work_done",
            Self::OtpRequest(_) => "otp_request",
            Self::OtpVerification(_) => "otp_verification",
            Self::PaymentRequest(_) => "payment_request",
            Self::IssueReport(_) => "issue_report",
        }
    }

    /// The role allowed to send this event and the id it claims to act as.
    ///
    /// `None` for the id means the payload did not name one; that case is
    /// reported as a missing field when the event is applied.
    pub fn actor(&self) -> (Role, Option<&str>) {
        match self {
            Self::StatusUpdate(e) => (Role::Technician, e.technician_id.as_deref()),
            Self::BookingAccept(e) => (Role::Technician, Some(e.technician_id.as_str())),
            Self::LocationUpdate(e) => (Role::Technician, Some(e.technician_id.as_str())),
            Self::WorkDone(e) => (Role::Technician, Some(e.technician_id.as_str())),
            Self::BookingRequest(e) => (Role::Customer, Some(e.customer_id.as_str())),
            Self::OtpRequest(e) => (Role::Customer, Some(e.customer_id.as_str())),
            Self::OtpVerification(e) => (Role::Customer, Some(e.customer_id.as_str())),
            Self::PaymentRequest(e) => (Role::Customer, Some(e.customer_id.as_str())),
            Self::IssueReport(e) => (Role::Customer, Some(e.customer_id.as_str())),
        }
    }

    /// Check that `sender` may send this event: its role must match and the
    /// payload must not speak for someone else.
    pub fn authorize(&self, sender: &Participant) -> Result<(), CoreError> {
        let (role, actor_id) = self.actor();
        if sender.role != role {
            return Err(CoreError::Validation(format!(
                "{} cannot be sent by a {}",
                self.name(),
                sender.role
            )));
        }
        match actor_id {
            Some(id) if id != sender.id => Err(CoreError::Validation(format!(
                "{} names {id} but the connection belongs to {}",
                self.name(),
                sender.id
            ))),
            _ => Ok(()),
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        let required: Vec<(&'static str, &str)> = match self {
            // Status updates are validated when they are applied.
            Self::StatusUpdate(_) => vec![],
            Self::BookingRequest(e) => vec![
                ("customer_id", e.customer_id.as_str()),
                ("service_id", e.service_id.as_str()),
            ],
            Self::BookingAccept(e) => vec![
                ("technician_id", e.technician_id.as_str()),
                ("customer_id", e.customer_id.as_str()),
            ],
            Self::LocationUpdate(e) => vec![
                ("technician_id", e.technician_id.as_str()),
                ("customer_id", e.customer_id.as_str()),
            ],
            Self::WorkDone(e) => vec![
                ("technician_id", e.technician_id.as_str()),
                ("customer_id", e.customer_id.as_str()),
            ],
            Self::OtpRequest(e) => vec![
                ("customer_id", e.customer_id.as_str()),
                ("technician_id", e.technician_id.as_str()),
            ],
            Self::OtpVerification(e) => vec![
                ("customer_id", e.customer_id.as_str()),
                ("otp", e.otp.as_str()),
            ],
            Self::PaymentRequest(e) => vec![
                ("customer_id", e.customer_id.as_str()),
                ("technician_id", e.technician_id.as_str()),
            ],
            Self::IssueReport(e) => vec![
                ("customer_id", e.customer_id.as_str()),
                ("technician_id", e.technician_id.as_str()),
            ],
        };
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(CoreError::MissingField(*field)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingResponseStatus {
    Pending,
    Accepted,
    NoTechnicianAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpStatus {
    Verified,
    Invalid,
}

/// Error acknowledgment codes sent back to the originator of a rejected event.
pub const ERROR_VALIDATION: &str = "VALIDATION_ERROR";
pub const ERROR_DUPLICATE_REQUEST: &str = "DUPLICATE_REQUEST";

/// An event pushed to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Greeting sent right after a participant connects.
    Response { message: String },
    BookingResponse {
        status: BookingResponseStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        technician_id: Option<ParticipantId>,
    },
    BookingRequest {
        customer_id: ParticipantId,
        service_id: ServiceId,
    },
    CustomerLocation { location: GeoPoint },
    LocationUpdate {
        technician_id: ParticipantId,
        location: GeoPoint,
    },
    WorkDone {
        technician_id: ParticipantId,
        work_report: serde_json::Value,
    },
    OtpResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hashed_password: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    OtpVerificationResponse { status: OtpStatus },
    PaymentReceived { technician_id: ParticipantId },
    IssueReported {
        customer_id: ParticipantId,
        issue_description: String,
    },
    Error { code: String, message: String },
}

impl OutboundEvent {
    pub fn booking_response(
        status: BookingResponseStatus,
        technician_id: Option<ParticipantId>,
    ) -> Self {
        Self::BookingResponse {
            status,
            technician_id,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Response { .. } => "response",
            Self::BookingResponse { .. } => "booking_response",
            Self::BookingRequest { .. } => "booking_request",
            Self::CustomerLocation { .. } => "customer_location",
            Self::LocationUpdate { .. } => "location_update",
            Self::WorkDone { .. } => "work_done",
            Self::OtpResponse { .. } => "otp_response",
            Self::OtpVerificationResponse { .. } => "otp_verification_response",
            Self::PaymentReceived { .. } => "payment_received",
            Self::IssueReported { .. } => "issue_reported",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
