//! First-match technician selection.
//!
//! Resolves the requested service's category, then walks the available
//! technicians in order and returns the first whose category is equal. There
//! is no distance or rating ranking. Collaborator failures never
//! reach the caller: they are logged and degrade to "no match".

use std::sync::Arc;
use std::time::Duration;

use homefix_core::types::ParticipantId;
use homefix_gateway::CollaboratorGateway;

use super::bounded;

pub struct MatchEngine {
    gateway: Arc<dyn CollaboratorGateway>,
    lookup_timeout: Duration,
}

impl MatchEngine {
    pub fn new(gateway: Arc<dyn CollaboratorGateway>, lookup_timeout: Duration) -> Self {
        Self {
            gateway,
            lookup_timeout,
        }
    }

    pub async fn find_technician(
        &self,
        available: &[ParticipantId],
        service_id: &str,
    ) -> Option<ParticipantId> {
        let wanted = match bounded(self.lookup_timeout, self.gateway.service_category(service_id)).await
        {
            Ok(category) => category,
            Err(e) if e.is_not_found() => {
                tracing::warn!(service_id, "Service not found");
                return None;
            }
            Err(e) => {
                tracing::error!(service_id, error = %e, "Failed to resolve service category");
                return None;
            }
        };

        for technician_id in available {
            match bounded(
                self.lookup_timeout,
                self.gateway.technician_category(technician_id),
            )
            .await
            {
                Ok(category) if category == wanted => {
                    tracing::info!(
                        service_id,
                        technician_id = %technician_id,
                        category = %category,
                        "Technician matched"
                    );
                    return Some(technician_id.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        technician_id = %technician_id,
                        error = %e,
                        "Skipping technician whose category could not be resolved"
                    );
                }
            }
        }

        tracing::warn!(service_id, category = %wanted, candidates = available.len(), "No matching technician found");
        None
    }
}

#[cfg(test)]
mod tests {
    use homefix_gateway::InMemoryGateway;

    use super::*;

    fn ids(ids: &[&str]) -> Vec<ParticipantId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn engine(gateway: InMemoryGateway) -> MatchEngine {
        MatchEngine::new(Arc::new(gateway), Duration::from_millis(200))
    }

    fn directory() -> InMemoryGateway {
        InMemoryGateway::new()
            .with_service("S1", "Plumbing")
            .with_service("S2", "Electrical")
            .with_technician("T1", "Electrical")
            .with_technician("T2", "Plumbing")
            .with_technician("T3", "Plumbing")
    }

    #[tokio::test]
    async fn returns_first_technician_in_order_with_matching_category() {
        let engine = engine(directory());

        assert_eq!(
            engine.find_technician(&ids(&["T1", "T2", "T3"]), "S1").await.as_deref(),
            Some("T2")
        );
        assert_eq!(
            engine.find_technician(&ids(&["T3", "T2"]), "S1").await.as_deref(),
            Some("T3")
        );
    }

    #[tokio::test]
    async fn no_candidate_with_category_yields_none() {
        let engine = engine(directory());

        assert_eq!(engine.find_technician(&ids(&["T2", "T3"]), "S2").await, None);
        assert_eq!(engine.find_technician(&[], "S1").await, None);
    }

    #[tokio::test]
    async fn unknown_service_yields_none() {
        let engine = engine(directory());

        assert_eq!(engine.find_technician(&ids(&["T2"]), "S404").await, None);
    }

    #[tokio::test]
    async fn service_lookup_failure_yields_none() {
        let engine = engine(directory().failing_service_lookups());

        assert_eq!(engine.find_technician(&ids(&["T2"]), "S1").await, None);
    }

    #[tokio::test]
    async fn unresolvable_technician_is_skipped() {
        let engine = engine(directory());

        assert_eq!(
            engine.find_technician(&ids(&["ghost", "T2"]), "S1").await.as_deref(),
            Some("T2")
        );
    }

    #[tokio::test]
    async fn slow_collaborator_times_out_to_none() {
        let gateway = directory().with_latency(Duration::from_secs(5));
        let engine = MatchEngine::new(Arc::new(gateway), Duration::from_millis(20));

        assert_eq!(engine.find_technician(&ids(&["T2"]), "S1").await, None);
    }
}
