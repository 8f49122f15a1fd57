//! Booking-lifecycle choreography.
//!
//! [`Choreographer::handle`] is the single router for every inbound
//! real-time event. Booking events (`booking_request`, `booking_accept`,
//! `location_update`, `work_done`) drive the customer's [`BookingSession`];
//! the side-flows (`otp_*`, `payment_request`, `issue_report`) are stateless
//! relays keyed by the ids in their payload.
//!
//! Every failure is handled here. Validation problems are acknowledged to
//! the sender, out-of-order events are logged and ignored, and collaborator
//! failures degrade to `no_technician_available`. Nothing propagates to the
//! connection loop.
//!
//! [`BookingSession`]: homefix_core::booking::BookingSession

use std::sync::Arc;
use std::time::Duration;

use homefix_core::error::CoreError;
use homefix_core::geo::GeoPoint;
use homefix_core::protocol::{
    BookingAccept, BookingRequest, BookingResponseStatus, InboundEvent, IssueReport,
    LocationUpdate, OtpRequest, OtpStatus, OtpVerification, OutboundEvent, PaymentRequest,
    StatusUpdate, WorkDone, ERROR_DUPLICATE_REQUEST, ERROR_VALIDATION,
};
use homefix_core::status::{Role, TechnicianStatus};
use homefix_core::types::{Participant, ParticipantId};
use homefix_gateway::{CollaboratorGateway, NewBooking};

use super::{bounded, AvailabilityIndex, LocationBook, MatchEngine, SessionTable};
use crate::ws::ConnectionRegistry;

/// Greeting pushed to every participant right after it connects.
pub const CONNECTED_MESSAGE: &str = "Connected to WebSocket server";

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Upper bound on every collaborator call.
    pub lookup_timeout: Duration,
    /// One-time code accepted by `otp_verification`.
    pub otp_code: String,
}

pub struct Choreographer {
    registry: Arc<ConnectionRegistry>,
    availability: Arc<AvailabilityIndex>,
    sessions: SessionTable,
    locations: LocationBook,
    matcher: MatchEngine,
    gateway: Arc<dyn CollaboratorGateway>,
    settings: DispatchSettings,
}

impl Choreographer {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        availability: Arc<AvailabilityIndex>,
        gateway: Arc<dyn CollaboratorGateway>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            availability,
            sessions: SessionTable::new(),
            locations: LocationBook::new(),
            matcher: MatchEngine::new(Arc::clone(&gateway), settings.lookup_timeout),
            gateway,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn availability(&self) -> &Arc<AvailabilityIndex> {
        &self.availability
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn locations(&self) -> &LocationBook {
        &self.locations
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    pub async fn connected(&self, participant: &Participant) {
        tracing::info!(
            participant_id = %participant.id,
            role = %participant.role,
            "Participant connected"
        );
        self.emit(
            &participant.id,
            OutboundEvent::Response {
                message: CONNECTED_MESSAGE.to_string(),
            },
        )
        .await;
    }

    /// Tear down after the socket identified by `conn_id` has closed.
    ///
    /// A socket that was already superseded by a reconnect leaves the
    /// participant's state alone. For a current one, availability is updated
    /// before the channel is unregistered so a concurrent match stops seeing
    /// the technician as early as possible. Offers the technician had not
    /// answered yet are withdrawn so those customers can ask again.
    pub async fn disconnected(&self, participant: &Participant, conn_id: &str) {
        if !self.registry.is_current(&participant.id, conn_id).await {
            tracing::debug!(
                participant_id = %participant.id,
                conn_id,
                "Superseded connection closed"
            );
            return;
        }

        match participant.role {
            Role::Technician => {
                if self.availability.deactivate_if_active(&participant.id).await {
                    tracing::info!(
                        technician_id = %participant.id,
                        "Technician status updated to inactive on disconnect"
                    );
                }
                for customer_id in self.sessions.withdraw_offers(&participant.id).await {
                    tracing::info!(
                        customer_id = %customer_id,
                        technician_id = %participant.id,
                        "Technician left before answering, offer withdrawn"
                    );
                    self.emit(
                        &customer_id,
                        OutboundEvent::booking_response(
                            BookingResponseStatus::NoTechnicianAvailable,
                            None,
                        ),
                    )
                    .await;
                }
            }
            Role::Customer => {
                if let Some(session) = self.sessions.remove(&participant.id).await {
                    tracing::info!(
                        customer_id = %participant.id,
                        state = ?session.state,
                        "Customer disconnected, booking session removed"
                    );
                }
            }
        }

        self.registry.unregister(&participant.id, conn_id).await;
        tracing::info!(participant_id = %participant.id, "Participant disconnected");
    }

    // -----------------------------------------------------------------------
    // Inbound routing
    // -----------------------------------------------------------------------

    /// Decode a text frame from `sender` and route it.
    pub async fn handle_text(&self, sender: &Participant, text: &str) {
        match InboundEvent::parse(text) {
            Ok(event) => self.handle(sender, event).await,
            Err(e) => self.report(sender, "unknown", e).await,
        }
    }

    /// Route one inbound event. Never fails; see the module docs.
    ///
    /// The event must be one `sender`'s role may send, and must name
    /// `sender` as its actor.
    pub async fn handle(&self, sender: &Participant, event: InboundEvent) {
        let name = event.name();
        tracing::debug!(participant_id = %sender.id, event = name, "Inbound event");

        if let Err(e) = event.authorize(sender) {
            self.report(sender, name, e).await;
            return;
        }

        let result = match event {
            InboundEvent::StatusUpdate(e) => self.apply_status_update(e).await.map(|_| ()),
            InboundEvent::BookingRequest(e) => self.on_booking_request(e).await,
            InboundEvent::BookingAccept(e) => self.on_booking_accept(e).await,
            InboundEvent::LocationUpdate(e) => self.on_location_update(e).await,
            InboundEvent::WorkDone(e) => self.on_work_done(e).await,
            InboundEvent::OtpRequest(e) => self.on_otp_request(e).await,
            InboundEvent::OtpVerification(e) => self.on_otp_verification(e).await,
            InboundEvent::PaymentRequest(e) => self.on_payment_request(e).await,
            InboundEvent::IssueReport(e) => self.on_issue_report(e).await,
        };

        if let Err(e) = result {
            self.report(sender, name, e).await;
        }
    }

    /// Set a technician's availability. Shared by the socket event and the
    /// HTTP route.
    pub async fn apply_status_update(
        &self,
        update: StatusUpdate,
    ) -> Result<(ParticipantId, TechnicianStatus), CoreError> {
        self.availability.apply(update).await
    }

    async fn report(&self, sender: &Participant, event: &'static str, err: CoreError) {
        match err {
            CoreError::Validation(_) | CoreError::MissingField(_) | CoreError::InvalidStatus(_) => {
                tracing::warn!(participant_id = %sender.id, event, error = %err, "Rejected invalid event");
                self.emit(&sender.id, OutboundEvent::error(ERROR_VALIDATION, err.to_string()))
                    .await;
            }
            CoreError::Conflict(_) => {
                tracing::warn!(participant_id = %sender.id, event, error = %err, "Rejected duplicate request");
                self.emit(
                    &sender.id,
                    OutboundEvent::error(ERROR_DUPLICATE_REQUEST, err.to_string()),
                )
                .await;
            }
            CoreError::InvalidTransition { .. } => {
                tracing::warn!(participant_id = %sender.id, event, error = %err, "Ignoring out-of-order event");
            }
            CoreError::NotFound { .. } | CoreError::Internal(_) => {
                tracing::error!(participant_id = %sender.id, event, error = %err, "Event handling failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Booking lifecycle
    // -----------------------------------------------------------------------

    async fn on_booking_request(&self, req: BookingRequest) -> Result<(), CoreError> {
        let customer_id = req.customer_id.as_str();
        tracing::info!(customer_id, service_id = %req.service_id, "Booking request received");

        let request_id = self.sessions.begin(customer_id, &req.service_id).await?;
        if let Some(location) = req.location {
            self.locations.record_customer(customer_id, location).await;
        }

        let available = self.availability.active_ids().await;
        tracing::debug!(customer_id, candidates = available.len(), "Matching against active technicians");

        let Some(technician_id) = self.matcher.find_technician(&available, &req.service_id).await
        else {
            return self.no_technician(customer_id, &request_id).await;
        };

        // The technician may have gone inactive while categories were resolved.
        if !self.availability.is_active(&technician_id).await {
            tracing::warn!(customer_id, technician_id = %technician_id, "Matched technician went inactive");
            return self.no_technician(customer_id, &request_id).await;
        }

        // The booking is stored before either party hears about the offer.
        let location = match req.location {
            Some(location) => location,
            None => self
                .locations
                .customer(customer_id)
                .await
                .unwrap_or(GeoPoint::new(0.0, 0.0)),
        };
        let booking = NewBooking {
            customer_id: customer_id.to_string(),
            technician_id: technician_id.clone(),
            service_id: req.service_id.clone(),
            address: req.address.clone().unwrap_or_default(),
            latitude: location.lat,
            longitude: location.lon,
        };
        let booking_id = match bounded(
            self.settings.lookup_timeout,
            self.gateway.create_booking(&booking),
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(customer_id, technician_id = %technician_id, error = %e, "Failed to create booking");
                return self.no_technician(customer_id, &request_id).await;
            }
        };
        tracing::info!(customer_id, booking_id = %booking_id, "Booking created in booking store");

        if let Err(e) = self
            .sessions
            .update_request(customer_id, &request_id, "offer", |s| {
                s.offer(technician_id.clone(), booking_id.clone())
            })
            .await
        {
            // The customer disconnected, or started another request, while
            // the booking was being stored.
            tracing::warn!(
                customer_id,
                request_id = %request_id,
                booking_id = %booking_id,
                error = %e,
                "Request superseded before offer, booking not offered"
            );
            return Ok(());
        }

        self.emit(
            customer_id,
            OutboundEvent::booking_response(
                BookingResponseStatus::Pending,
                Some(technician_id.clone()),
            ),
        )
        .await;
        self.emit(
            &technician_id,
            OutboundEvent::BookingRequest {
                customer_id: customer_id.to_string(),
                service_id: req.service_id,
            },
        )
        .await;
        tracing::info!(customer_id, technician_id = %technician_id, "Booking request forwarded to technician");
        Ok(())
    }

    async fn no_technician(&self, customer_id: &str, request_id: &str) -> Result<(), CoreError> {
        if let Err(e) = self
            .sessions
            .update_request(customer_id, request_id, "no_technician_available", |s| {
                s.fail_to_match()
            })
            .await
        {
            tracing::debug!(customer_id, request_id, error = %e, "Request superseded, nothing to close");
            return Ok(());
        }
        self.emit(
            customer_id,
            OutboundEvent::booking_response(BookingResponseStatus::NoTechnicianAvailable, None),
        )
        .await;
        tracing::warn!(customer_id, "No technician available");
        Ok(())
    }

    async fn on_booking_accept(&self, accept: BookingAccept) -> Result<(), CoreError> {
        let BookingAccept {
            technician_id,
            customer_id,
            customer_location,
        } = accept;

        self.sessions
            .update(&customer_id, "booking_accept", |s| s.accept(&technician_id))
            .await?;
        tracing::info!(customer_id = %customer_id, technician_id = %technician_id, "Booking accepted");

        self.locations
            .record_customer(&customer_id, customer_location)
            .await;

        self.emit(
            &customer_id,
            OutboundEvent::booking_response(
                BookingResponseStatus::Accepted,
                Some(technician_id.clone()),
            ),
        )
        .await;
        self.emit(
            &technician_id,
            OutboundEvent::CustomerLocation {
                location: customer_location,
            },
        )
        .await;
        tracing::info!(technician_id = %technician_id, "Customer location sent to technician");
        Ok(())
    }

    async fn on_location_update(&self, update: LocationUpdate) -> Result<(), CoreError> {
        let LocationUpdate {
            technician_id,
            customer_id,
            location,
        } = update;

        self.sessions
            .update(&customer_id, "location_update", |s| {
                s.ensure_engaged(&technician_id, "location_update")
            })
            .await?;

        self.locations
            .record_technician(&technician_id, location)
            .await;
        self.emit(
            &customer_id,
            OutboundEvent::LocationUpdate {
                technician_id,
                location,
            },
        )
        .await;
        Ok(())
    }

    async fn on_work_done(&self, done: WorkDone) -> Result<(), CoreError> {
        let WorkDone {
            technician_id,
            customer_id,
            work_report,
        } = done;

        self.sessions
            .update(&customer_id, "work_done", |s| s.complete(&technician_id))
            .await?;
        tracing::info!(customer_id = %customer_id, technician_id = %technician_id, "Work done");

        self.emit(
            &customer_id,
            OutboundEvent::WorkDone {
                technician_id,
                work_report,
            },
        )
        .await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Side-flows
    // -----------------------------------------------------------------------

    async fn on_otp_request(&self, req: OtpRequest) -> Result<(), CoreError> {
        tracing::info!(
            customer_id = %req.customer_id,
            technician_id = %req.technician_id,
            "OTP request received"
        );

        let response = match bounded(
            self.settings.lookup_timeout,
            self.gateway.technician_credential(&req.technician_id),
        )
        .await
        {
            Ok(hashed_password) => OutboundEvent::OtpResponse {
                hashed_password: Some(hashed_password),
                error: None,
            },
            Err(e) => {
                tracing::error!(technician_id = %req.technician_id, error = %e, "Technician credential lookup failed");
                OutboundEvent::OtpResponse {
                    hashed_password: None,
                    error: Some("Technician not found".to_string()),
                }
            }
        };
        self.emit(&req.customer_id, response).await;
        Ok(())
    }

    async fn on_otp_verification(&self, verification: OtpVerification) -> Result<(), CoreError> {
        let customer_id = verification.customer_id.as_str();
        let status = if verification.otp == self.settings.otp_code {
            OtpStatus::Verified
        } else {
            OtpStatus::Invalid
        };

        if status == OtpStatus::Verified {
            tracing::info!(customer_id, "OTP verified");
            // Work starts once the customer has verified the technician.
            let started = self
                .sessions
                .update(customer_id, "otp_verification", |s| Ok(s.start_work()))
                .await
                .unwrap_or(false);
            if started {
                tracing::info!(customer_id, "Booking in progress");
            }
        } else {
            tracing::warn!(customer_id, "Invalid OTP");
        }

        self.emit(customer_id, OutboundEvent::OtpVerificationResponse { status })
            .await;
        Ok(())
    }

    async fn on_payment_request(&self, req: PaymentRequest) -> Result<(), CoreError> {
        tracing::info!(
            customer_id = %req.customer_id,
            technician_id = %req.technician_id,
            has_payment_info = !req.payment_info.is_null(),
            "Payment request received"
        );
        self.emit(
            &req.technician_id,
            OutboundEvent::PaymentReceived {
                technician_id: req.technician_id.clone(),
            },
        )
        .await;
        Ok(())
    }

    async fn on_issue_report(&self, report: IssueReport) -> Result<(), CoreError> {
        tracing::info!(
            customer_id = %report.customer_id,
            technician_id = %report.technician_id,
            "Issue reported"
        );
        self.emit(
            &report.technician_id,
            OutboundEvent::IssueReported {
                customer_id: report.customer_id,
                issue_description: report.issue_description,
            },
        )
        .await;
        Ok(())
    }

    async fn emit(&self, participant_id: &str, event: OutboundEvent) {
        self.registry.send(participant_id, &event).await;
    }
}
