//! In-process datastore.
//!
//! All tables live behind one `tokio::sync::RwLock`, so every trait call
//! is atomic with respect to the others. Natural-key uniqueness and the
//! compare-and-swap contract match [`super::PostgresStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::PaymentStore;
use crate::domain::{
    Event, EventId, Organizer, OrganizerId, Participant, ParticipantId, PaymentConfig,
    PaymentConfigId, PaymentStatus, PaymentStatusId,
};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct Tables {
    organizers: HashMap<OrganizerId, Organizer>,
    events: HashMap<EventId, Event>,
    configs: HashMap<PaymentConfigId, PaymentConfig>,
    participants: HashMap<ParticipantId, Participant>,
    statuses: HashMap<PaymentStatusId, PaymentStatus>,
}

/// Datastore kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn upsert_organizer(&self, organizer: &Organizer) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        tables.organizers.insert(organizer.id, organizer.clone());
        Ok(())
    }

    async fn get_organizer(&self, id: OrganizerId) -> Result<Option<Organizer>, GatewayError> {
        Ok(self.tables.read().await.organizers.get(&id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        if tables
            .events
            .values()
            .any(|e| e.payment_token == event.payment_token)
        {
            return Err(GatewayError::PersistenceError(
                "duplicate payment token".to_string(),
            ));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        match tables.events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn get_event_by_token(&self, token: &str) -> Result<Option<Event>, GatewayError> {
        Ok(self
            .tables
            .read()
            .await
            .events
            .values()
            .find(|e| e.payment_token == token)
            .cloned())
    }

    async fn list_events(&self, organizer_id: OrganizerId) -> Result<Vec<Event>, GatewayError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn insert_config(&self, config: &PaymentConfig) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        tables.configs.insert(config.id, config.clone());
        Ok(())
    }

    async fn update_config(&self, config: &PaymentConfig) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        match tables.configs.get_mut(&config.id) {
            Some(stored) => {
                *stored = config.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_config(
        &self,
        id: PaymentConfigId,
    ) -> Result<Option<PaymentConfig>, GatewayError> {
        Ok(self.tables.read().await.configs.get(&id).cloned())
    }

    async fn list_configs(
        &self,
        organizer_id: OrganizerId,
    ) -> Result<Vec<PaymentConfig>, GatewayError> {
        let tables = self.tables.read().await;
        let mut configs: Vec<PaymentConfig> = tables
            .configs
            .values()
            .filter(|c| c.organizer_id == organizer_id)
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(configs)
    }

    async fn delete_config(&self, id: PaymentConfigId) -> Result<bool, GatewayError> {
        Ok(self.tables.write().await.configs.remove(&id).is_some())
    }

    async fn insert_participant_if_absent(
        &self,
        participant: &Participant,
    ) -> Result<Participant, GatewayError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .participants
            .values()
            .find(|p| p.email == participant.email)
        {
            return Ok(existing.clone());
        }
        tables
            .participants
            .insert(participant.id, participant.clone());
        Ok(participant.clone())
    }

    async fn update_participant(&self, participant: &Participant) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        match tables.participants.get_mut(&participant.id) {
            Some(stored) => {
                *stored = participant.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_participant(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, GatewayError> {
        Ok(self.tables.read().await.participants.get(&id).cloned())
    }

    async fn get_participant_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Participant>, GatewayError> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn get_participant_by_auth_token(
        &self,
        token: &str,
    ) -> Result<Option<Participant>, GatewayError> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .find(|p| p.auth_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert_status_if_absent(
        &self,
        status: &PaymentStatus,
    ) -> Result<PaymentStatus, GatewayError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.statuses.values().find(|s| {
            s.participant_id == status.participant_id && s.event_id == status.event_id
        }) {
            return Ok(existing.clone());
        }
        tables.statuses.insert(status.id, status.clone());
        Ok(status.clone())
    }

    async fn get_status(
        &self,
        id: PaymentStatusId,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        Ok(self.tables.read().await.statuses.get(&id).cloned())
    }

    async fn find_status(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        Ok(self
            .tables
            .read()
            .await
            .statuses
            .values()
            .find(|s| s.participant_id == participant_id && s.event_id == event_id)
            .cloned())
    }

    async fn find_status_by_charge_handle(
        &self,
        handle: &str,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        Ok(self
            .tables
            .read()
            .await
            .statuses
            .values()
            .find(|s| s.charge_handle.as_deref() == Some(handle))
            .cloned())
    }

    async fn list_statuses(&self, event_id: EventId) -> Result<Vec<PaymentStatus>, GatewayError> {
        let tables = self.tables.read().await;
        let mut statuses: Vec<PaymentStatus> = tables
            .statuses
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        statuses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(statuses)
    }

    async fn compare_and_swap_status(&self, status: &PaymentStatus) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        let handle_taken = status.charge_handle.as_deref().is_some_and(|handle| {
            tables
                .statuses
                .values()
                .any(|s| s.id != status.id && s.charge_handle.as_deref() == Some(handle))
        });
        if handle_taken {
            return Err(GatewayError::PersistenceError(
                "duplicate charge handle".to_string(),
            ));
        }
        match tables.statuses.get_mut(&status.id) {
            Some(stored) if stored.version == status.version => {
                *stored = status.clone();
                stored.version = status.version.saturating_add(1);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_status(
        &self,
        id: PaymentStatusId,
        expected_version: i64,
    ) -> Result<bool, GatewayError> {
        let mut tables = self.tables.write().await;
        if tables
            .statuses
            .get(&id)
            .is_some_and(|s| s.version == expected_version)
        {
            tables.statuses.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}
