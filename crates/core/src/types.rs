/// Opaque participant identifier (customer or technician).
pub type ParticipantId = String;

/// Opaque service identifier as known to the service catalogue.
pub type ServiceId = String;

/// Identifier returned by the booking store once a booking is persisted.
pub type BookingId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A connected endpoint: who it is and which side of a booking it is on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Participant {
    pub id: ParticipantId,
    pub role: crate::status::Role,
}

impl Participant {
    pub fn customer(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            role: crate::status::Role::Customer,
        }
    }

    pub fn technician(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            role: crate::status::Role::Technician,
        }
    }
}
