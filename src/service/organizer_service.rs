//! Organizer operations: events, payment configurations, the payment
//! board and manual payment administration.
//!
//! Every method takes the acting organizer and rejects access to rows
//! owned by someone else with [`GatewayError::Forbidden`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::{Notifier, StatusMachine};
use crate::domain::participant::{looks_like_email, normalize_email};
use crate::domain::{
    Condition, Event, EventId, Organizer, OrganizerId, Participant, PaymentConfig,
    PaymentConfigId, PaymentMethod, PaymentState, PaymentStatus, PaymentStatusId,
    ProviderSettings, StatusEdit,
};
use crate::error::GatewayError;
use crate::persistence::PaymentStore;

/// Fields of a new event.
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// Display name.
    pub name: String,
    /// Optional date.
    pub date: Option<NaiveDate>,
    /// Base amount.
    pub base_amount: i64,
    /// Condition catalog.
    pub conditions: Vec<Condition>,
    /// Enabled payment configurations; `None` applies the organizer's
    /// defaults.
    pub payment_config_ids: Option<Vec<PaymentConfigId>>,
    /// Whether cash is accepted.
    pub cash_enabled: bool,
}

/// Partial update of an event; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    /// New name.
    pub name: Option<String>,
    /// New date; `Some(None)` clears it.
    pub date: Option<Option<NaiveDate>>,
    /// New base amount.
    pub base_amount: Option<i64>,
    /// New condition catalog.
    pub conditions: Option<Vec<Condition>>,
    /// New enabled configurations.
    pub payment_config_ids: Option<Vec<PaymentConfigId>>,
    /// New cash flag.
    pub cash_enabled: Option<bool>,
    /// Activate or deactivate the event.
    pub is_active: Option<bool>,
}

/// Manual registration of a participant for an event.
#[derive(Debug, Clone)]
pub struct ParticipantRegistration {
    /// Participant email.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Mark the participant verified without the email round trip.
    pub skip_auth: bool,
    /// Mail the payment page link to the participant.
    pub send_email: bool,
}

/// One row of an event's payment board.
#[derive(Debug, Clone)]
pub struct PaymentBoardEntry {
    /// The payment row.
    pub status: PaymentStatus,
    /// The paying participant, if still present.
    pub participant: Option<Participant>,
}

/// Orchestration layer for organizer operations.
#[derive(Debug, Clone)]
pub struct OrganizerService {
    store: Arc<dyn PaymentStore>,
    machine: Arc<StatusMachine>,
    notifier: Notifier,
}

impl OrganizerService {
    /// Creates a new `OrganizerService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        machine: Arc<StatusMachine>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            machine,
            notifier,
        }
    }

    /// Resolves the organizer asserted by the authenticating proxy.
    ///
    /// An unknown organizer is registered on first sight when the proxy
    /// also supplies an email, which becomes the mail sender reference.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] for unknown organizers
    /// without an email.
    pub async fn resolve_organizer(
        &self,
        id: OrganizerId,
        email: Option<&str>,
    ) -> Result<Organizer, GatewayError> {
        let email = email.map(normalize_email).filter(|e| looks_like_email(e));
        match (self.store.get_organizer(id).await?, email) {
            (Some(organizer), Some(email)) if organizer.email != email => {
                let updated = Organizer {
                    mail_sender: Some(email.clone()),
                    email,
                    ..organizer
                };
                self.store.upsert_organizer(&updated).await?;
                Ok(updated)
            }
            (Some(organizer), _) => Ok(organizer),
            (None, Some(email)) => {
                let organizer = Organizer {
                    id,
                    mail_sender: Some(email.clone()),
                    email,
                    default_payment_config_ids: Vec::new(),
                };
                self.store.upsert_organizer(&organizer).await?;
                tracing::info!(organizer_id = %id, "organizer registered");
                Ok(organizer)
            }
            (None, None) => Err(GatewayError::Unauthorized),
        }
    }

    /// Creates an event with a fresh payment token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for invalid fields or
    /// configurations the organizer does not own.
    pub async fn create_event(
        &self,
        organizer: &Organizer,
        draft: EventDraft,
    ) -> Result<Event, GatewayError> {
        let mut event = Event::new(organizer.id, draft.name.trim().to_string(), draft.base_amount);
        event.date = draft.date;
        event.conditions = draft.conditions;
        event.payment_config_ids = match draft.payment_config_ids {
            Some(ids) => ids,
            None => self.default_payment_configs(organizer).await?,
        };
        event.cash_enabled = draft.cash_enabled;
        self.validate_event(&event).await?;

        self.store.insert_event(&event).await?;
        tracing::info!(event_id = %event.id, organizer_id = %organizer.id, "event created");
        Ok(event)
    }

    /// Returns the organizer's default configurations that still exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn default_payment_configs(
        &self,
        organizer: &Organizer,
    ) -> Result<Vec<PaymentConfigId>, GatewayError> {
        let mut ids = Vec::with_capacity(organizer.default_payment_config_ids.len());
        for id in &organizer.default_payment_config_ids {
            match self.store.get_config(*id).await? {
                Some(config) if config.organizer_id == organizer.id => ids.push(*id),
                _ => {
                    tracing::debug!(
                        organizer_id = %organizer.id,
                        config_id = %id,
                        "dropping stale default config"
                    );
                }
            }
        }
        Ok(ids)
    }

    /// Replaces the configurations enabled on new events by default.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for configurations the
    /// organizer does not own.
    pub async fn set_default_payment_configs(
        &self,
        organizer: &Organizer,
        ids: Vec<PaymentConfigId>,
    ) -> Result<Organizer, GatewayError> {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if unique.contains(&id) {
                continue;
            }
            let owned = self
                .store
                .get_config(id)
                .await?
                .is_some_and(|c| c.organizer_id == organizer.id);
            if !owned {
                return Err(GatewayError::InvalidRequest(format!(
                    "unknown payment config {id}"
                )));
            }
            unique.push(id);
        }
        let updated = Organizer {
            default_payment_config_ids: unique,
            ..organizer.clone()
        };
        self.store.upsert_organizer(&updated).await?;
        tracing::info!(
            organizer_id = %organizer.id,
            defaults = updated.default_payment_config_ids.len(),
            "default payment configs updated"
        );
        Ok(updated)
    }

    /// Lists the organizer's events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn list_events(&self, organizer: &Organizer) -> Result<Vec<Event>, GatewayError> {
        self.store.list_events(organizer.id).await
    }

    /// Loads one of the organizer's events.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or [`GatewayError::Forbidden`].
    pub async fn get_event(
        &self,
        organizer: &Organizer,
        id: EventId,
    ) -> Result<Event, GatewayError> {
        let event = self
            .store
            .get_event(id)
            .await?
            .ok_or(GatewayError::EventNotFound)?;
        if event.organizer_id != organizer.id {
            return Err(GatewayError::Forbidden);
        }
        Ok(event)
    }

    /// Applies a partial update to one of the organizer's events.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`], [`GatewayError::Forbidden`]
    /// or [`GatewayError::InvalidRequest`] for invalid fields.
    pub async fn update_event(
        &self,
        organizer: &Organizer,
        id: EventId,
        changes: EventChanges,
    ) -> Result<Event, GatewayError> {
        let mut event = self.get_event(organizer, id).await?;
        if let Some(name) = changes.name {
            event.name = name.trim().to_string();
        }
        if let Some(date) = changes.date {
            event.date = date;
        }
        if let Some(base_amount) = changes.base_amount {
            event.base_amount = base_amount;
        }
        if let Some(conditions) = changes.conditions {
            event.conditions = conditions;
        }
        if let Some(ids) = changes.payment_config_ids {
            event.payment_config_ids = ids;
        }
        if let Some(cash_enabled) = changes.cash_enabled {
            event.cash_enabled = cash_enabled;
        }
        if let Some(is_active) = changes.is_active {
            event.is_active = is_active;
        }
        self.validate_event(&event).await?;

        if !self.store.update_event(&event).await? {
            return Err(GatewayError::EventNotFound);
        }
        tracing::info!(event_id = %event.id, is_active = event.is_active, "event updated");
        Ok(event)
    }

    /// Lists every payment row of an event with its participant.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or [`GatewayError::Forbidden`].
    pub async fn payment_board(
        &self,
        organizer: &Organizer,
        event_id: EventId,
    ) -> Result<Vec<PaymentBoardEntry>, GatewayError> {
        let event = self.get_event(organizer, event_id).await?;
        let statuses = self.store.list_statuses(event.id).await?;
        let mut board = Vec::with_capacity(statuses.len());
        for status in statuses {
            let participant = self.store.get_participant(status.participant_id).await?;
            board.push(PaymentBoardEntry {
                status,
                participant,
            });
        }
        Ok(board)
    }

    /// Registers a participant for an event on the organizer's behalf.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for malformed emails and
    /// [`GatewayError::AlreadyRegistered`] if the participant already has
    /// a payment row for the event.
    pub async fn register_participant(
        &self,
        organizer: &Organizer,
        event_id: EventId,
        registration: ParticipantRegistration,
    ) -> Result<PaymentBoardEntry, GatewayError> {
        if !looks_like_email(&registration.email) {
            return Err(GatewayError::InvalidRequest(
                "a valid email address is required".to_string(),
            ));
        }
        let event = self.get_event(organizer, event_id).await?;
        let mut participant = self
            .store
            .insert_participant_if_absent(&Participant::new(&registration.email))
            .await?;
        if self
            .store
            .find_status(participant.id, event.id)
            .await?
            .is_some()
        {
            return Err(GatewayError::AlreadyRegistered);
        }

        let name = registration
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let changed = name.is_some() || (registration.skip_auth && !participant.is_authenticated);
        if let Some(name) = name {
            participant.name = Some(name);
        }
        if registration.skip_auth && !participant.is_authenticated {
            participant.mark_verified();
        }
        if changed && !self.store.update_participant(&participant).await? {
            return Err(GatewayError::ParticipantNotFound);
        }

        let status = self.machine.get_or_create(participant.id, event.id).await?;
        if registration.send_email {
            self.notifier.payment_link(&event, &participant.email).await;
        }
        tracing::info!(
            event_id = %event.id,
            participant_id = %participant.id,
            "participant registered by organizer"
        );
        Ok(PaymentBoardEntry {
            status,
            participant: Some(participant),
        })
    }

    /// Changes the state of and/or edits a payment row.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Locked`] for any change to a `PAID` row,
    /// plus the lookup and ownership errors of [`Self::get_event`].
    pub async fn update_payment(
        &self,
        organizer: &Organizer,
        event_id: EventId,
        status_id: PaymentStatusId,
        target: Option<PaymentState>,
        edit: StatusEdit,
    ) -> Result<PaymentStatus, GatewayError> {
        let event = self.get_event(organizer, event_id).await?;
        self.machine
            .admin_update(event.id, status_id, target, edit)
            .await
    }

    /// Deletes a non-paid payment row.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Locked`] for `PAID` rows, plus the lookup and
    /// ownership errors of [`Self::get_event`].
    pub async fn delete_payment(
        &self,
        organizer: &Organizer,
        event_id: EventId,
        status_id: PaymentStatusId,
    ) -> Result<(), GatewayError> {
        let event = self.get_event(organizer, event_id).await?;
        self.machine.admin_delete(event.id, status_id).await
    }

    /// Lists the organizer's payment configurations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn list_configs(
        &self,
        organizer: &Organizer,
    ) -> Result<Vec<PaymentConfig>, GatewayError> {
        self.store.list_configs(organizer.id).await
    }

    /// Creates a payment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `settings` cannot serve
    /// `method`.
    pub async fn create_config(
        &self,
        organizer: &Organizer,
        method: PaymentMethod,
        name: String,
        settings: ProviderSettings,
    ) -> Result<PaymentConfig, GatewayError> {
        let config = PaymentConfig::new(organizer.id, method, name.trim().to_string(), settings)?;
        self.store.insert_config(&config).await?;
        tracing::info!(config_id = %config.id, %method, "payment config created");
        Ok(config)
    }

    /// Updates a payment configuration. A blank provider secret keeps the
    /// stored one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PaymentConfigNotFound`],
    /// [`GatewayError::Forbidden`] or [`GatewayError::InvalidRequest`].
    pub async fn update_config(
        &self,
        organizer: &Organizer,
        id: PaymentConfigId,
        method: PaymentMethod,
        name: String,
        settings: ProviderSettings,
    ) -> Result<PaymentConfig, GatewayError> {
        let mut config = self.owned_config(organizer, id).await?;
        config.apply_update(method, name.trim().to_string(), settings)?;
        if !self.store.update_config(&config).await? {
            return Err(GatewayError::PaymentConfigNotFound);
        }
        tracing::info!(config_id = %config.id, %method, "payment config updated");
        Ok(config)
    }

    /// Deletes a payment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PaymentConfigNotFound`] or
    /// [`GatewayError::Forbidden`].
    pub async fn delete_config(
        &self,
        organizer: &Organizer,
        id: PaymentConfigId,
    ) -> Result<(), GatewayError> {
        let config = self.owned_config(organizer, id).await?;
        if !self.store.delete_config(config.id).await? {
            return Err(GatewayError::PaymentConfigNotFound);
        }
        tracing::info!(config_id = %config.id, "payment config deleted");
        Ok(())
    }

    async fn owned_config(
        &self,
        organizer: &Organizer,
        id: PaymentConfigId,
    ) -> Result<PaymentConfig, GatewayError> {
        let config = self
            .store
            .get_config(id)
            .await?
            .ok_or(GatewayError::PaymentConfigNotFound)?;
        if config.organizer_id != organizer.id {
            return Err(GatewayError::Forbidden);
        }
        Ok(config)
    }

    async fn validate_event(&self, event: &Event) -> Result<(), GatewayError> {
        if event.name.is_empty() {
            return Err(GatewayError::InvalidRequest("event name is required".to_string()));
        }
        if event.base_amount < 0 {
            return Err(GatewayError::InvalidRequest(
                "base_amount must not be negative".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for condition in &event.conditions {
            if condition.id.trim().is_empty() || !seen.insert(condition.id.as_str()) {
                return Err(GatewayError::InvalidRequest(format!(
                    "condition ids must be unique and non-empty: {:?}",
                    condition.id
                )));
            }
        }
        for id in &event.payment_config_ids {
            let owned = self
                .store
                .get_config(*id)
                .await?
                .is_some_and(|c| c.organizer_id == event.organizer_id);
            if !owned {
                return Err(GatewayError::InvalidRequest(format!(
                    "unknown payment config {id}"
                )));
            }
        }
        Ok(())
    }
}
