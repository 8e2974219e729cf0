//! Persistence layer: the datastore behind every service.
//!
//! [`PaymentStore`] is the only datastore contract the services depend
//! on. It offers point lookups, natural-key lookups (email, payment token,
//! auth token, charge handle), scans by foreign key, insert-if-absent for
//! the (participant, event) join row, and a compare-and-swap update of
//! payment status rows guarded by their `version`.
//!
//! Two implementations exist: [`PostgresStore`] on `sqlx` and
//! [`InMemoryStore`], used when persistence is disabled and in tests.

pub mod documents;
pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    Event, EventId, Organizer, OrganizerId, Participant, ParticipantId, PaymentConfig,
    PaymentConfigId, PaymentStatus, PaymentStatusId,
};
use crate::error::GatewayError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Datastore contract of the payment core.
///
/// All methods return [`GatewayError::PersistenceError`] on storage
/// failure; absence is reported as `None` or `false`, never as an error.
#[async_trait]
pub trait PaymentStore: Send + Sync + fmt::Debug {
    /// Inserts an organizer, or refreshes its email and mail sender if the
    /// id already exists.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn upsert_organizer(&self, organizer: &Organizer) -> Result<(), GatewayError>;

    /// Loads an organizer by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_organizer(&self, id: OrganizerId) -> Result<Option<Organizer>, GatewayError>;

    /// Inserts a new event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn insert_event(&self, event: &Event) -> Result<(), GatewayError>;

    /// Overwrites an existing event. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn update_event(&self, event: &Event) -> Result<bool, GatewayError>;

    /// Loads an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError>;

    /// Loads an event by its public payment token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_event_by_token(&self, token: &str) -> Result<Option<Event>, GatewayError>;

    /// Lists an organizer's events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn list_events(&self, organizer_id: OrganizerId) -> Result<Vec<Event>, GatewayError>;

    /// Inserts a new payment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn insert_config(&self, config: &PaymentConfig) -> Result<(), GatewayError>;

    /// Overwrites a payment configuration. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn update_config(&self, config: &PaymentConfig) -> Result<bool, GatewayError>;

    /// Loads a payment configuration by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_config(&self, id: PaymentConfigId)
    -> Result<Option<PaymentConfig>, GatewayError>;

    /// Lists an organizer's payment configurations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn list_configs(
        &self,
        organizer_id: OrganizerId,
    ) -> Result<Vec<PaymentConfig>, GatewayError>;

    /// Deletes a payment configuration. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn delete_config(&self, id: PaymentConfigId) -> Result<bool, GatewayError>;

    /// Inserts `participant` unless one with the same email exists, and
    /// returns the stored row either way.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn insert_participant_if_absent(
        &self,
        participant: &Participant,
    ) -> Result<Participant, GatewayError>;

    /// Overwrites a participant. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn update_participant(&self, participant: &Participant) -> Result<bool, GatewayError>;

    /// Loads a participant by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_participant(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, GatewayError>;

    /// Loads a participant by normalized email.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_participant_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Participant>, GatewayError>;

    /// Loads the participant holding the pending verification `token`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_participant_by_auth_token(
        &self,
        token: &str,
    ) -> Result<Option<Participant>, GatewayError>;

    /// Inserts `status` unless a row for its (participant, event) pair
    /// exists, and returns the stored row either way.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn insert_status_if_absent(
        &self,
        status: &PaymentStatus,
    ) -> Result<PaymentStatus, GatewayError>;

    /// Loads a payment status by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_status(&self, id: PaymentStatusId)
    -> Result<Option<PaymentStatus>, GatewayError>;

    /// Loads the payment status of a (participant, event) pair.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_status(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
    ) -> Result<Option<PaymentStatus>, GatewayError>;

    /// Loads the payment status holding the live provider charge `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_status_by_charge_handle(
        &self,
        handle: &str,
    ) -> Result<Option<PaymentStatus>, GatewayError>;

    /// Lists all payment statuses of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn list_statuses(&self, event_id: EventId) -> Result<Vec<PaymentStatus>, GatewayError>;

    /// Writes `status` only if the stored row still has `status.version`,
    /// bumping the stored version by one. Returns `false` when another
    /// writer got there first or the row is gone.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn compare_and_swap_status(&self, status: &PaymentStatus) -> Result<bool, GatewayError>;

    /// Deletes a payment status if it still has `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn delete_status(
        &self,
        id: PaymentStatusId,
        expected_version: i64,
    ) -> Result<bool, GatewayError>;
}
