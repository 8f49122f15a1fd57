//! Booking session state machine.
//!
//! A [`BookingSession`] correlates one in-flight dispatch attempt for a
//! customer. All transitions go through the methods below so an event that
//! arrives out of order (or names a different technician than the one the
//! session was offered to) is rejected with [`CoreError::InvalidTransition`]
//! instead of acting on stale identifiers.
//!
//! ```text
//! Requested ──match──► Offered ──accept──► Accepted ──otp──► InProgress
//!     │                   │                   │                  │
//!     │ no match          │ technician left   └────work_done─────┴──► Completed
//!     ▼                   │
//! NoTechnicianAvailable ◄─┘
//! ```

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{BookingId, ParticipantId, ServiceId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Requested,
    Offered,
    Accepted,
    InProgress,
    Completed,
    NoTechnicianAvailable,
}

impl BookingState {
    /// Terminal sessions are dropped from the session table.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::NoTechnicianAvailable)
    }

    /// States in which the technician is on the job and may relay
    /// location updates or report completion.
    pub fn is_engaged(self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingSession {
    /// Identifies the `booking_request` that opened this session, so work
    /// started for an earlier request cannot act on a later one.
    pub request_id: String,
    pub customer_id: ParticipantId,
    pub technician_id: Option<ParticipantId>,
    pub service_id: ServiceId,
    pub state: BookingState,
    pub created_at: Timestamp,
    /// Set once the booking store has persisted the booking.
    pub booking_id: Option<BookingId>,
}

impl BookingSession {
    pub fn new(
        request_id: impl Into<String>,
        customer_id: impl Into<ParticipantId>,
        service_id: impl Into<ServiceId>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            customer_id: customer_id.into(),
            technician_id: None,
            service_id: service_id.into(),
            state: BookingState::Requested,
            created_at: chrono::Utc::now(),
            booking_id: None,
        }
    }

    /// `Requested -> Offered`.
    pub fn offer(
        &mut self,
        technician_id: impl Into<ParticipantId>,
        booking_id: impl Into<BookingId>,
    ) -> Result<(), CoreError> {
        self.require(BookingState::Requested == self.state, "offer")?;
        self.technician_id = Some(technician_id.into());
        self.booking_id = Some(booking_id.into());
        self.state = BookingState::Offered;
        Ok(())
    }

    /// `Requested -> NoTechnicianAvailable`.
    pub fn fail_to_match(&mut self) -> Result<(), CoreError> {
        self.require(self.state == BookingState::Requested, "no_technician_available")?;
        self.state = BookingState::NoTechnicianAvailable;
        Ok(())
    }

    /// `Offered -> Accepted`, only for the technician the offer went to.
    pub fn accept(&mut self, technician_id: &str) -> Result<(), CoreError> {
        let ok = self.state == BookingState::Offered && self.is_assigned_to(technician_id);
        self.require(ok, "booking_accept")?;
        self.state = BookingState::Accepted;
        Ok(())
    }

    /// `Offered -> NoTechnicianAvailable` when the technician the offer went
    /// to leaves before answering.
    pub fn withdraw_offer(&mut self, technician_id: &str) -> Result<(), CoreError> {
        let ok = self.state == BookingState::Offered && self.is_assigned_to(technician_id);
        self.require(ok, "offer_withdrawn")?;
        self.state = BookingState::NoTechnicianAvailable;
        Ok(())
    }

    /// Check that `technician_id` may relay `event` to the customer.
    pub fn ensure_engaged(&self, technician_id: &str, event: &'static str) -> Result<(), CoreError> {
        self.require(
            self.state.is_engaged() && self.is_assigned_to(technician_id),
            event,
        )
    }

    /// `Accepted -> InProgress`. Returns `false` when the session was in any
    /// other state, which is not an error: OTP verification is a side-flow.
    pub fn start_work(&mut self) -> bool {
        if self.state == BookingState::Accepted {
            self.state = BookingState::InProgress;
            true
        } else {
            false
        }
    }

    /// `Accepted | InProgress -> Completed`.
    pub fn complete(&mut self, technician_id: &str) -> Result<(), CoreError> {
        self.ensure_engaged(technician_id, "work_done")?;
        self.state = BookingState::Completed;
        Ok(())
    }

    pub fn is_assigned_to(&self, technician_id: &str) -> bool {
        self.technician_id.as_deref() == Some(technician_id)
    }

    fn require(&self, ok: bool, event: &'static str) -> Result<(), CoreError> {
        if ok {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                customer_id: self.customer_id.clone(),
                state: Some(self.state),
                event,
            })
        }
    }
}
