//! Persistence-aware driver of the payment status state machine.
//!
//! The transition rules themselves live on [`PaymentStatus`]; this type
//! owns the datastore side: lazy creation of the single row per
//! (participant, event) pair, optimistic compare-and-swap commits, and
//! the exactly-once completion mail, fired only by the writer whose
//! commit moved the row into `PAID`.

use std::sync::Arc;

use chrono::Utc;

use super::Notifier;
use crate::domain::{
    EventId, ParticipantId, PaymentState, PaymentStatus, PaymentStatusId, ProviderOutcome,
    StatusEdit, Transition,
};
use crate::error::GatewayError;
use crate::persistence::PaymentStore;

/// How many times a notification is re-applied after losing a
/// compare-and-swap race before giving up.
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Orchestration layer for payment status rows.
#[derive(Debug, Clone)]
pub struct StatusMachine {
    store: Arc<dyn PaymentStore>,
    notifier: Notifier,
}

impl StatusMachine {
    /// Creates a new `StatusMachine`.
    #[must_use]
    pub fn new(store: Arc<dyn PaymentStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Returns the row for the pair, creating an `UNPAID` one if absent.
    ///
    /// Concurrent callers converge on the same row.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn get_or_create(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
    ) -> Result<PaymentStatus, GatewayError> {
        if let Some(existing) = self.store.find_status(participant_id, event_id).await? {
            return Ok(existing);
        }
        let created = self
            .store
            .insert_status_if_absent(&PaymentStatus::new(participant_id, event_id))
            .await?;
        tracing::debug!(
            status_id = %created.id,
            %participant_id,
            %event_id,
            "payment status ready"
        );
        Ok(created)
    }

    /// Loads a row by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PaymentStatusNotFound`] if it does not exist.
    pub async fn load(&self, id: PaymentStatusId) -> Result<PaymentStatus, GatewayError> {
        self.store
            .get_status(id)
            .await?
            .ok_or(GatewayError::PaymentStatusNotFound)
    }

    /// Writes `status` if nobody else wrote the row since it was read.
    ///
    /// Returns the row as stored, with its bumped version.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConcurrentUpdate`] when the row changed
    /// underneath, or [`GatewayError::PersistenceError`] on storage failure.
    pub async fn commit(&self, mut status: PaymentStatus) -> Result<PaymentStatus, GatewayError> {
        status.updated_at = Utc::now();
        if !self.store.compare_and_swap_status(&status).await? {
            tracing::debug!(
                status_id = %status.id,
                version = status.version,
                "stale payment status write"
            );
            return Err(GatewayError::ConcurrentUpdate);
        }
        status.version = status.version.saturating_add(1);
        Ok(status)
    }

    /// Applies a provider outcome for the charge identified by `reference`.
    ///
    /// Safe under at-least-once delivery: repeats are no-ops and the
    /// completion mail goes out only for the delivery that actually moved
    /// the row into `PAID`. A completion for a charge that was already
    /// released is still honored, since the money arrived; a late failure
    /// for one is ignored. Returns `None` for unknown references.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConcurrentUpdate`] if the row kept changing
    /// underneath, or [`GatewayError::PersistenceError`] on storage failure.
    pub async fn apply_provider_notification(
        &self,
        reference: &str,
        outcome: ProviderOutcome,
        payload: Option<serde_json::Value>,
    ) -> Result<Option<Transition>, GatewayError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let Some(mut status) = self.find_by_reference(reference, outcome).await? else {
                tracing::warn!(reference, ?outcome, "provider notification for unknown charge");
                return Ok(None);
            };

            let transition = status.apply_outcome(outcome, payload.clone(), Utc::now());
            if transition.is_noop() {
                tracing::info!(
                    status_id = %status.id,
                    state = %status.state,
                    ?outcome,
                    "provider notification already applied"
                );
                return Ok(Some(transition));
            }

            match self.commit(status).await {
                Ok(saved) => {
                    tracing::info!(
                        status_id = %saved.id,
                        from = %transition.from,
                        to = %transition.to,
                        "provider notification applied"
                    );
                    if transition.entered_paid() {
                        self.notifier.payment_complete(&saved).await;
                    }
                    return Ok(Some(transition));
                }
                Err(GatewayError::ConcurrentUpdate) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(GatewayError::ConcurrentUpdate)
    }

    /// Applies an organizer edit and/or state change to a row of `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PaymentStatusNotFound`] if the row does not
    /// belong to the event, [`GatewayError::Locked`] for any change to a
    /// `PAID` row, or [`GatewayError::ConcurrentUpdate`] on a lost race.
    pub async fn admin_update(
        &self,
        event_id: EventId,
        status_id: PaymentStatusId,
        target: Option<PaymentState>,
        edit: StatusEdit,
    ) -> Result<PaymentStatus, GatewayError> {
        let mut status = self.load_for_event(event_id, status_id).await?;

        if !edit.is_empty() {
            status.apply_edit(edit)?;
        }
        let transition = match target {
            Some(target) => Some(status.admin_set_state(target, Utc::now())?),
            None => None,
        };

        let saved = self.commit(status).await?;
        if let Some(transition) = transition {
            tracing::info!(
                status_id = %saved.id,
                from = %transition.from,
                to = %transition.to,
                "payment status changed by organizer"
            );
            if transition.entered_paid() {
                self.notifier.payment_complete(&saved).await;
            }
        }
        Ok(saved)
    }

    /// Deletes a non-paid row of `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Locked`] for `PAID` rows,
    /// [`GatewayError::PaymentStatusNotFound`] if the row does not belong
    /// to the event, or [`GatewayError::ConcurrentUpdate`] on a lost race.
    pub async fn admin_delete(
        &self,
        event_id: EventId,
        status_id: PaymentStatusId,
    ) -> Result<(), GatewayError> {
        let status = self.load_for_event(event_id, status_id).await?;
        status.ensure_editable()?;
        if !self.store.delete_status(status.id, status.version).await? {
            return Err(GatewayError::ConcurrentUpdate);
        }
        tracing::info!(%status_id, %event_id, "payment status deleted by organizer");
        Ok(())
    }

    async fn load_for_event(
        &self,
        event_id: EventId,
        status_id: PaymentStatusId,
    ) -> Result<PaymentStatus, GatewayError> {
        let status = self.load(status_id).await?;
        if status.event_id != event_id {
            return Err(GatewayError::PaymentStatusNotFound);
        }
        Ok(status)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
        outcome: ProviderOutcome,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        if let Some(status) = self.store.find_status_by_charge_handle(reference).await? {
            return Ok(Some(status));
        }
        if outcome != ProviderOutcome::Completed {
            return Ok(None);
        }
        match status_id_from_reference(reference) {
            Some(id) => self.store.get_status(id).await,
            None => Ok(None),
        }
    }
}

/// Recovers the status id from a merchant reference (`<id>` or `<id>-<n>`).
fn status_id_from_reference(reference: &str) -> Option<PaymentStatusId> {
    let (id, suffix) = reference.split_at_checked(36)?;
    let suffix_ok = suffix.is_empty()
        || suffix
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    if !suffix_ok {
        return None;
    }
    id.parse().ok()
}
