//! In-flight booking sessions, one per customer.

use std::collections::HashMap;

use homefix_core::booking::BookingSession;
use homefix_core::error::CoreError;
use homefix_core::types::ParticipantId;
use tokio::sync::Mutex;

/// Booking sessions keyed by customer id.
///
/// A customer has at most one non-terminal session. Sessions that reach a
/// terminal state are dropped by [`SessionTable::update`].
#[derive(Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<ParticipantId, BookingSession>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a `Requested` session for the customer and return its request id.
    ///
    /// Fails with [`CoreError::Conflict`] while another request from the same
    /// customer is still in flight; the existing session is left untouched.
    pub async fn begin(&self, customer_id: &str, service_id: &str) -> Result<String, CoreError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(customer_id) {
            return Err(CoreError::Conflict(format!(
                "customer {customer_id} already has a booking in state {:?}",
                existing.state
            )));
        }
        let request_id = uuid::Uuid::new_v4().to_string();
        sessions.insert(
            customer_id.to_string(),
            BookingSession::new(request_id.clone(), customer_id, service_id),
        );
        Ok(request_id)
    }

    /// Apply `f` to the customer's session under the table lock.
    ///
    /// A missing session is an [`CoreError::InvalidTransition`] for `event`.
    /// If `f` leaves the session terminal it is removed.
    pub async fn update<R>(
        &self,
        customer_id: &str,
        event: &'static str,
        f: impl FnOnce(&mut BookingSession) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(customer_id)
            .ok_or_else(|| CoreError::InvalidTransition {
                customer_id: customer_id.to_string(),
                state: None,
                event,
            })?;
        let result = f(session)?;
        if session.state.is_terminal() {
            sessions.remove(customer_id);
        }
        Ok(result)
    }

    /// Like [`SessionTable::update`], but only for the session opened by
    /// `request_id`. A session the customer opened since then is reported as
    /// [`CoreError::InvalidTransition`] and left alone.
    pub async fn update_request<R>(
        &self,
        customer_id: &str,
        request_id: &str,
        event: &'static str,
        f: impl FnOnce(&mut BookingSession) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        self.update(customer_id, event, |session| {
            if session.request_id != request_id {
                return Err(CoreError::InvalidTransition {
                    customer_id: session.customer_id.clone(),
                    state: Some(session.state),
                    event,
                });
            }
            f(session)
        })
        .await
    }

    /// End every `Offered` session whose offer went to `technician_id`.
    ///
    /// Returns the affected customers.
    pub async fn withdraw_offers(&self, technician_id: &str) -> Vec<ParticipantId> {
        let mut sessions = self.sessions.lock().await;
        let withdrawn: Vec<ParticipantId> = sessions
            .iter_mut()
            .filter_map(|(customer_id, session)| {
                session
                    .withdraw_offer(technician_id)
                    .ok()
                    .map(|()| customer_id.clone())
            })
            .collect();
        for customer_id in &withdrawn {
            sessions.remove(customer_id);
        }
        withdrawn
    }

    pub async fn get(&self, customer_id: &str) -> Option<BookingSession> {
        self.sessions.lock().await.get(customer_id).cloned()
    }

    pub async fn remove(&self, customer_id: &str) -> Option<BookingSession> {
        self.sessions.lock().await.remove(customer_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
