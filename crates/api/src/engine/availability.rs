//! Technician availability index.
//!
//! Availability is set explicitly (HTTP or socket status update) and is
//! independent of whether the technician's channel is open. Technicians are
//! kept in first-registration order, which is the order the match engine
//! scans them in.

use homefix_core::error::CoreError;
use homefix_core::protocol::StatusUpdate;
use homefix_core::status::TechnicianStatus;
use homefix_core::types::ParticipantId;
use indexmap::IndexMap;
use tokio::sync::RwLock;

pub struct AvailabilityIndex {
    statuses: RwLock<IndexMap<ParticipantId, TechnicianStatus>>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(IndexMap::new()),
        }
    }

    pub async fn set_status(
        &self,
        technician_id: &str,
        status: TechnicianStatus,
    ) -> Result<(), CoreError> {
        if technician_id.trim().is_empty() {
            return Err(CoreError::MissingField("technician_id"));
        }
        self.statuses
            .write()
            .await
            .insert(technician_id.to_string(), status);
        tracing::info!(technician_id, status = %status, "Technician status updated");
        Ok(())
    }

    /// Validate and apply a raw status update.
    pub async fn apply(
        &self,
        update: StatusUpdate,
    ) -> Result<(ParticipantId, TechnicianStatus), CoreError> {
        let (technician_id, status) = update.into_parts()?;
        self.set_status(&technician_id, status).await?;
        Ok((technician_id, status))
    }

    /// `None` means the technician never registered a status.
    pub async fn status_of(&self, technician_id: &str) -> Option<TechnicianStatus> {
        self.statuses.read().await.get(technician_id).copied()
    }

    pub async fn is_active(&self, technician_id: &str) -> bool {
        self.status_of(technician_id)
            .await
            .is_some_and(TechnicianStatus::is_active)
    }

    /// Active technicians in registration order.
    pub async fn active_ids(&self) -> Vec<ParticipantId> {
        self.statuses
            .read()
            .await
            .iter()
            .filter(|(_, status)| status.is_active())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub async fn active_count(&self) -> usize {
        self.statuses
            .read()
            .await
            .values()
            .filter(|status| status.is_active())
            .count()
    }

    /// Flip an active technician to inactive. Returns `true` if it was active.
    pub async fn deactivate_if_active(&self, technician_id: &str) -> bool {
        let mut statuses = self.statuses.write().await;
        match statuses.get_mut(technician_id) {
            Some(status) if status.is_active() => {
                *status = TechnicianStatus::Inactive;
                true
            }
            _ => false,
        }
    }

    pub async fn remove(&self, technician_id: &str) -> Option<TechnicianStatus> {
        self.statuses.write().await.shift_remove(technician_id)
    }
}

impl Default for AvailabilityIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn active_ids_follow_registration_order() {
        let index = AvailabilityIndex::new();
        index.set_status("T2", TechnicianStatus::Active).await.unwrap();
        index.set_status("T1", TechnicianStatus::Active).await.unwrap();
        index.set_status("T3", TechnicianStatus::Inactive).await.unwrap();
        // Re-activating keeps the original position.
        index.set_status("T2", TechnicianStatus::Active).await.unwrap();

        assert_eq!(index.active_ids().await, vec!["T2".to_string(), "T1".to_string()]);
        assert_eq!(index.active_count().await, 2);
    }

    #[tokio::test]
    async fn inactive_is_removed_from_active_ids_immediately() {
        let index = AvailabilityIndex::new();
        index.set_status("T1", TechnicianStatus::Active).await.unwrap();
        index.set_status("T1", TechnicianStatus::Inactive).await.unwrap();

        assert!(index.active_ids().await.is_empty());
        assert_eq!(index.status_of("T1").await, Some(TechnicianStatus::Inactive));
    }

    #[tokio::test]
    async fn apply_rejects_bad_updates_without_mutating() {
        let index = AvailabilityIndex::new();

        let missing = StatusUpdate {
            technician_id: None,
            status: Some("active".into()),
        };
        assert_matches!(index.apply(missing).await, Err(CoreError::MissingField("technician_id")));

        let invalid = StatusUpdate {
            technician_id: Some("T1".into()),
            status: Some("sleeping".into()),
        };
        assert_matches!(index.apply(invalid).await, Err(CoreError::InvalidStatus(_)));
        assert_eq!(index.status_of("T1").await, None);
    }

    #[tokio::test]
    async fn deactivate_only_touches_active_technicians() {
        let index = AvailabilityIndex::new();
        index.set_status("T1", TechnicianStatus::Active).await.unwrap();

        assert!(index.deactivate_if_active("T1").await);
        assert!(!index.deactivate_if_active("T1").await);
        assert!(!index.deactivate_if_active("unknown").await);
        assert_eq!(index.status_of("unknown").await, None);
    }

    #[tokio::test]
    async fn remove_forgets_the_technician() {
        let index = AvailabilityIndex::new();
        index.set_status("T1", TechnicianStatus::Active).await.unwrap();

        assert_eq!(index.remove("T1").await, Some(TechnicianStatus::Active));
        assert!(!index.is_active("T1").await);
    }
}
